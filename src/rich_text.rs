use std::borrow::Cow;

use crate::block::TextSpan;
use crate::escape::{escape_line_starts, escape_markdown, inline_code_ticks, link_destination};

/// Render a span sequence to inline Markdown.
///
/// Delimiters nest innermost first: code, bold, italic, strikethrough, then
/// the link. Underline has no Markdown form and is dropped.
pub fn render_rich_text(spans: &[TextSpan]) -> String {
    let merged = merge_adjacent(spans);
    let mut out = String::new();
    for (i, span) in merged.iter().enumerate() {
        let next = merged[i + 1..]
            .iter()
            .find_map(|span| span.content.chars().next());
        span_to_markdown(span, next, &mut out);
    }
    escape_line_starts(&out)
}

/// Join neighbouring spans that share styles and link, so that
/// `**a****b**` can never appear at a span boundary.
fn merge_adjacent(spans: &[TextSpan]) -> Vec<Cow<'_, TextSpan>> {
    let mut merged: Vec<Cow<'_, TextSpan>> = Vec::with_capacity(spans.len());

    for span in spans {
        if let Some(last) = merged.last_mut()
            && !last.equation
            && !span.equation
            && last.styles == span.styles
            && last.link == span.link
        {
            last.to_mut().content.push_str(&span.content);
            continue;
        }
        merged.push(Cow::Borrowed(span));
    }

    merged
}

/// `next` is the first character of the following span, if any.
fn span_to_markdown(span: &TextSpan, next: Option<char>, out: &mut String) {
    if span.content.is_empty() {
        return;
    }

    if span.equation {
        out.push('$');
        out.push_str(span.content.trim());
        out.push('$');
        return;
    }

    let styles = span.styles;
    let has_markup =
        styles.code || styles.bold || styles.italic || styles.strikethrough || span.link.is_some();
    if !has_markup {
        out.push_str(&escape_markdown(&span.content));
        return;
    }

    // Emphasis delimiters may not touch whitespace, so edge whitespace
    // is emitted outside them.
    let (leading, core, trailing) = split_edge_whitespace(&span.content);
    if core.is_empty() {
        out.push_str(&span.content);
        return;
    }

    let mut text = if styles.code {
        code_span(core)
    } else {
        escape_markdown(core)
    };

    let (before, after) = if span.link.is_some() {
        (Some('['), Some(']'))
    } else {
        (
            leading.chars().last().or(out.chars().last()),
            trailing.chars().next().or(next),
        )
    };
    let markdown_delimiters = delimiters_flank(before, &text, after);

    let wrap = |text: String, delimiter: &str, tag: &str| {
        if markdown_delimiters {
            format!("{delimiter}{text}{delimiter}")
        } else {
            format!("<{tag}>{text}</{tag}>")
        }
    };
    if styles.bold {
        text = wrap(text, "**", "strong");
    }
    if styles.italic {
        text = wrap(text, "*", "em");
    }
    if styles.strikethrough {
        text = wrap(text, "~~", "del");
    }
    if let Some(url) = &span.link {
        text = format!("[{text}]({})", link_destination(url));
    }

    out.push_str(leading);
    out.push_str(&text);
    out.push_str(trailing);
}

/// Whether `*`/`~` runs around `inner` would open and close as emphasis.
/// A delimiter between a word character and punctuation does neither.
fn delimiters_flank(before: Option<char>, inner: &str, after: Option<char>) -> bool {
    let opens = !(inner.chars().next().is_some_and(is_punctuation) && before.is_some_and(is_word));
    let closes = !(inner.chars().last().is_some_and(is_punctuation) && after.is_some_and(is_word));
    opens && closes
}

fn is_punctuation(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric()
}

fn split_edge_whitespace(content: &str) -> (&str, &str, &str) {
    let core = content.trim();
    if core.is_empty() {
        return (content, "", "");
    }
    let start = content.len() - content.trim_start().len();
    let end = start + core.len();
    (&content[..start], core, &content[end..])
}

fn code_span(content: &str) -> String {
    let ticks = "`".repeat(inline_code_ticks(content));
    let spacer = if content.starts_with('`') || content.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{ticks}{spacer}{content}{spacer}{ticks}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Styles;

    fn unescape(text: &str) -> String {
        let mut out = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn empty_sequence() {
        assert_eq!(render_rich_text(&[]), "");
    }

    #[test]
    fn plain_text_is_escaped() {
        let spans = [TextSpan::plain("a*b_c`d")];
        let rendered = render_rich_text(&spans);
        assert_eq!(rendered, "a\\*b\\_c\\`d");
        assert_eq!(unescape(&rendered), "a*b_c`d");
    }

    #[test]
    fn nesting_order() {
        let styles = Styles {
            bold: true,
            italic: true,
            strikethrough: true,
            code: true,
            ..Styles::PLAIN
        };
        let spans = [TextSpan {
            link: Some("https://example.com".into()),
            ..TextSpan::styled("x", styles)
        }];
        assert_eq!(
            render_rich_text(&spans),
            "[~~***`x`***~~](https://example.com)"
        );
    }

    #[test]
    fn code_content_is_not_escaped() {
        let spans = [TextSpan::styled("a_b*c", Styles::code())];
        assert_eq!(render_rich_text(&spans), "`a_b*c`");
    }

    #[test]
    fn code_with_backticks() {
        let spans = [TextSpan::styled("a ` b", Styles::code())];
        assert_eq!(render_rich_text(&spans), "``a ` b``");
        let spans = [TextSpan::styled("`x", Styles::code())];
        assert_eq!(render_rich_text(&spans), "`` `x ``");
    }

    #[test]
    fn adjacent_bold_spans_merge() {
        let spans = [
            TextSpan::styled("a", Styles::bold()),
            TextSpan::styled("b", Styles::bold()),
        ];
        assert_eq!(render_rich_text(&spans), "**ab**");
    }

    #[test]
    fn different_links_do_not_merge() {
        let spans = [
            TextSpan::linked("one", "https://a.example"),
            TextSpan::linked("two", "https://b.example"),
        ];
        assert_eq!(
            render_rich_text(&spans),
            "[one](https://a.example)[two](https://b.example)"
        );
    }

    #[test]
    fn whitespace_moves_outside_delimiters() {
        let spans = [
            TextSpan::plain("say"),
            TextSpan::styled(" hello ", Styles::bold()),
            TextSpan::plain("world"),
        ];
        assert_eq!(render_rich_text(&spans), "say **hello** world");
    }

    #[test]
    fn whitespace_only_styled_span() {
        let spans = [TextSpan::styled("  ", Styles::italic())];
        assert_eq!(render_rich_text(&spans), "  ");
    }

    #[test]
    fn equation_ignores_styles() {
        let spans = [TextSpan {
            styles: Styles::bold(),
            ..TextSpan::equation("e^{i\\pi} + 1 = 0")
        }];
        assert_eq!(render_rich_text(&spans), "$e^{i\\pi} + 1 = 0$");
    }

    #[test]
    fn equations_are_not_merged() {
        let spans = [TextSpan::equation("a"), TextSpan::equation("b")];
        assert_eq!(render_rich_text(&spans), "$a$$b$");
    }

    #[test]
    fn link_with_spaces() {
        let spans = [TextSpan::linked("doc", "https://x.example/a b")];
        assert_eq!(render_rich_text(&spans), "[doc](<https://x.example/a b>)");
    }

    #[test]
    fn link_text_is_escaped() {
        let spans = [TextSpan::linked("[1]", "https://x.example")];
        assert_eq!(render_rich_text(&spans), "[\\[1\\]](https://x.example)");
    }

    #[test]
    fn punctuation_against_word_uses_html_tags() {
        let spans = [
            TextSpan::plain("a"),
            TextSpan::styled("(x)", Styles::bold()),
            TextSpan::plain("b"),
        ];
        assert_eq!(render_rich_text(&spans), "a<strong>(x)</strong>b");

        let styles = Styles {
            italic: true,
            strikethrough: true,
            ..Styles::PLAIN
        };
        let spans = [TextSpan::plain("x"), TextSpan::styled("!", styles)];
        assert_eq!(render_rich_text(&spans), "x<del><em>!</em></del>");
    }

    #[test]
    fn punctuation_next_to_space_keeps_delimiters() {
        let spans = [
            TextSpan::plain("a "),
            TextSpan::styled("(x)", Styles::bold()),
            TextSpan::plain(" b"),
        ];
        assert_eq!(render_rich_text(&spans), "a **(x)** b");
    }

    #[test]
    fn emphasis_parses_as_emphasis() {
        use pulldown_cmark::{Event, Options, Parser, Tag};

        let cases = [
            vec![
                TextSpan::plain("a"),
                TextSpan::styled("(x)", Styles::bold()),
                TextSpan::plain("b"),
            ],
            vec![
                TextSpan::plain("say"),
                TextSpan::styled(" hello ", Styles::bold()),
                TextSpan::plain("world"),
            ],
            vec![
                TextSpan::styled("\"code\"", Styles::italic()),
                TextSpan::plain("s"),
            ],
        ];

        for spans in cases {
            let rendered = render_rich_text(&spans);
            let mut emphasis = 0;
            let mut literal_stars = false;
            for event in Parser::new_ext(&rendered, Options::ENABLE_STRIKETHROUGH) {
                match event {
                    Event::Start(Tag::Strong | Tag::Emphasis) => emphasis += 1,
                    Event::InlineHtml(html) if matches!(&*html, "<strong>" | "<em>") => {
                        emphasis += 1
                    }
                    Event::Text(text) if text.contains('*') => literal_stars = true,
                    _ => {}
                }
            }
            assert_eq!(emphasis, 1, "{rendered}");
            assert!(!literal_stars, "{rendered}");
        }
    }

    #[test]
    fn leading_list_marker_is_escaped() {
        assert_eq!(render_rich_text(&[TextSpan::plain("1. Intro")]), "1\\. Intro");
        let spans = [TextSpan::plain("- a\n+ b")];
        assert_eq!(render_rich_text(&spans), "\\- a\n\\+ b");
    }

    #[test]
    fn underline_is_dropped() {
        let styles = Styles {
            underline: true,
            ..Styles::PLAIN
        };
        assert_eq!(render_rich_text(&[TextSpan::styled("u", styles)]), "u");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn escape_round_trip(content in "[a-z0-9*_`<>{}\\[\\]$~.)+=\n -]{0,40}") {
                let rendered = render_rich_text(&[TextSpan::plain(content.clone())]);
                prop_assert_eq!(unescape(&rendered), content);
            }

            #[test]
            fn rendering_is_deterministic(content in ".{0,40}", bold in any::<bool>()) {
                let styles = Styles { bold, ..Styles::PLAIN };
                let spans = vec![TextSpan::styled(content, styles)];
                prop_assert_eq!(render_rich_text(&spans), render_rich_text(&spans));
            }
        }
    }
}
