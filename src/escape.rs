use std::borrow::Cow;

/// Escape characters that Markdown or MDX would otherwise interpret.
///
/// Covers emphasis (`*`, `_`, `~`), code (`` ` ``), links (`[`, `]`),
/// JSX and HTML (`<`, `>`), MDX expressions (`{`, `}`), math (`$`), the
/// backslash itself, and `#` at the start of a line.
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    let mut at_line_start = true;

    for c in text.chars() {
        match c {
            '\\' | '*' | '_' | '~' | '`' | '[' | ']' | '<' | '>' | '{' | '}' | '$' => {
                result.push('\\');
                result.push(c);
            }
            '#' if at_line_start => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
        at_line_start = c == '\n';
    }

    result
}

/// Escape block-level markers at the start of each line of rendered inline
/// text: list markers (`-`, `+`, `1.`, `1)`), thematic breaks and setext
/// underlines (`---`, `===`).
pub fn escape_line_starts(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 2);

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            result.push('\n');
        }
        let body = line.trim_start_matches([' ', '\t']);
        result.push_str(&line[..line.len() - body.len()]);

        match body.chars().next() {
            Some('-' | '+' | '=') => {
                result.push('\\');
                result.push_str(body);
            }
            Some(c) if c.is_ascii_digit() => {
                let digits = body.bytes().take_while(u8::is_ascii_digit).count();
                let (number, rest) = body.split_at(digits);
                let mut after = rest.chars();
                let marker = matches!(after.next(), Some('.' | ')'))
                    && after.next().is_none_or(|c| c == ' ' || c == '\t');
                result.push_str(number);
                if marker {
                    result.push('\\');
                }
                result.push_str(rest);
            }
            _ => result.push_str(body),
        }
    }

    result
}

/// Link destinations containing spaces or parentheses need angle brackets.
pub fn link_destination(url: &str) -> Cow<'_, str> {
    if url.contains([' ', '(', ')']) {
        Cow::Owned(format!("<{}>", url.replace('<', "%3C").replace('>', "%3E")))
    } else {
        Cow::Borrowed(url)
    }
}

/// Escape a value for a double-quoted JSX attribute.
pub fn escape_attribute(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => result.push_str("&quot;"),
            '&' => result.push_str("&amp;"),
            '\n' => result.push(' '),
            _ => result.push(c),
        }
    }
    result
}

/// Escape the pipes that would split a GFM table cell.
pub fn escape_table_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', "<br />")
}

/// Smallest fence length (at least 3) longer than any run of `fence_char`.
pub fn fence_length(content: &str, fence_char: char) -> usize {
    longest_run(content, fence_char).max(2) + 1
}

/// Smallest backtick count that does not occur as a run in `content`.
pub fn inline_code_ticks(content: &str) -> usize {
    longest_run(content, '`') + 1
}

fn longest_run(content: &str, ch: char) -> usize {
    let mut max_run = 0;
    let mut current_run = 0;

    for c in content.chars() {
        if c == ch {
            current_run += 1;
            max_run = max_run.max(current_run);
        } else {
            current_run = 0;
        }
    }

    max_run
}
