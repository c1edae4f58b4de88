use crate::block::{Block, BlockKind, Color, TextSpan, plain_text};
use crate::config::{Flavor, RenderConfig, ToggleStyle};
use crate::diagnostic::Diagnostics;
use crate::escape::{
    escape_attribute, escape_markdown, escape_table_cell, fence_length, link_destination,
};
use crate::rich_text::render_rich_text;

/// Mutable state for one page render.
///
/// Holds the numbered-list counter for every open nesting level. Each page
/// render needs its own context; sharing one would corrupt the numbering.
#[derive(Debug)]
pub struct RenderContext<'a> {
    pub options: &'a RenderConfig,
    pub depth: usize,
    numbered_counters: Vec<usize>,
    pub diagnostics: Diagnostics,
}

impl<'a> RenderContext<'a> {
    pub fn new(options: &'a RenderConfig) -> Self {
        Self {
            options,
            depth: 0,
            numbered_counters: vec![0],
            diagnostics: Diagnostics::new(),
        }
    }

    /// Open a nesting level with a fresh counter scope.
    pub fn enter(&mut self) {
        self.depth += 1;
        self.numbered_counters.push(0);
    }

    /// Close the innermost nesting level.
    pub fn leave(&mut self) {
        if self.numbered_counters.len() > 1 {
            self.numbered_counters.pop();
            self.depth -= 1;
        }
    }

    fn next_number(&mut self) -> usize {
        match self.numbered_counters.last_mut() {
            Some(counter) => {
                *counter += 1;
                *counter
            }
            None => {
                self.numbered_counters.push(1);
                1
            }
        }
    }

    fn reset_number(&mut self) {
        if let Some(counter) = self.numbered_counters.last_mut() {
            *counter = 0;
        }
    }

    fn is_mdx(&self) -> bool {
        self.options.flavor == Flavor::Mdx
    }
}

/// Where a block's children go relative to its own lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildLayout {
    /// Directly under the block, indented by this many spaces
    Indented(usize),
    /// Inside the block's blockquote, prefixed with `> `
    Quoted,
    /// Between the block's lines and its closing lines, indented
    Enclosed(usize),
    /// After the block at the same indentation
    Following,
    /// Not rendered
    Skipped,
}

/// Kinds of list item that form one tight list when adjacent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListGroup {
    Bulleted,
    Numbered,
}

pub fn list_group(kind: &BlockKind) -> Option<ListGroup> {
    match kind {
        BlockKind::BulletListItem { .. } | BlockKind::ToDo { .. } => Some(ListGroup::Bulleted),
        BlockKind::NumberedListItem { .. } => Some(ListGroup::Numbered),
        _ => None,
    }
}

/// Output of a single block, excluding its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutput {
    pub lines: Vec<String>,
    /// Emitted after the children (closing tags)
    pub closing: Vec<String>,
    pub children: ChildLayout,
}

impl BlockOutput {
    fn new(lines: Vec<String>, children: ChildLayout) -> Self {
        Self {
            lines,
            closing: Vec::new(),
            children,
        }
    }

    fn line(line: impl Into<String>) -> Self {
        Self::new(vec![line.into()], ChildLayout::Following)
    }

    fn empty() -> Self {
        Self::new(Vec::new(), ChildLayout::Following)
    }

    fn skipped() -> Self {
        Self::new(Vec::new(), ChildLayout::Skipped)
    }
}

/// Render one block's own lines. Updates the numbered-list counter of the
/// current level: numbered items advance it, anything else resets it.
pub fn render_block(block: &Block, ctx: &mut RenderContext) -> BlockOutput {
    if let BlockKind::NumberedListItem { text, color } = &block.kind {
        let number = ctx.next_number();
        return list_item(&format!("{number}. "), text, *color, ctx);
    }
    ctx.reset_number();

    match &block.kind {
        BlockKind::Heading { level, text, color } => heading(block, *level, text, *color, ctx),
        BlockKind::Paragraph { text, color } => {
            let rendered = render_rich_text(text);
            if rendered.is_empty() {
                BlockOutput::empty()
            } else {
                BlockOutput::new(
                    split_lines(&colored(rendered, *color, ctx)),
                    ChildLayout::Following,
                )
            }
        }
        BlockKind::BulletListItem { text, color } => list_item("- ", text, *color, ctx),
        // Handled above
        BlockKind::NumberedListItem { .. } => BlockOutput::empty(),
        BlockKind::ToDo {
            text,
            checked,
            color,
        } => {
            let marker = if *checked { "- [x] " } else { "- [ ] " };
            let mut output = list_item(marker, text, *color, ctx);
            output.children = ChildLayout::Indented(ctx.options.indent_width.max(2));
            output
        }
        BlockKind::Toggle { summary, color } => toggle(summary, *color, ctx),
        BlockKind::Quote { text, color } => {
            let rendered = render_rich_text(text);
            let lines = if rendered.is_empty() {
                Vec::new()
            } else {
                quote_lines(&split_lines(&colored(rendered, *color, ctx)))
            };
            BlockOutput::new(lines, ChildLayout::Quoted)
        }
        BlockKind::Callout { icon, text, color } => callout(icon.as_deref(), text, *color, ctx),
        BlockKind::CodeBlock { language, text } => code_block(language, text),
        BlockKind::Image { url, caption } => {
            let Some(url) = required_url(block, url, ctx) else {
                return BlockOutput::skipped();
            };
            let caption = caption.as_deref().unwrap_or_default();
            if ctx.is_mdx() {
                let alt = plain_text(caption);
                if alt.is_empty() {
                    BlockOutput::line(format!("<Image src=\"{}\" />", escape_attribute(url)))
                } else {
                    BlockOutput::line(format!(
                        "<Image src=\"{}\" alt=\"{}\" />",
                        escape_attribute(url),
                        escape_attribute(&alt)
                    ))
                }
            } else {
                BlockOutput::line(format!(
                    "![{}]({})",
                    render_rich_text(caption),
                    link_destination(url)
                ))
            }
        }
        BlockKind::Video { url } => media(block, "Video", "Video", url, ctx),
        BlockKind::Audio { url } => media(block, "Audio", "Audio", url, ctx),
        BlockKind::Pdf { url } => media(block, "PDF", "PDF", url, ctx),
        BlockKind::File { url, name } => {
            let Some(url) = required_url(block, url, ctx) else {
                return BlockOutput::skipped();
            };
            let name: &str = if name.is_empty() { "file" } else { name };
            if ctx.is_mdx() {
                BlockOutput::line(format!(
                    "<FileDownload href=\"{}\" name=\"{}\" />",
                    escape_attribute(url),
                    escape_attribute(name)
                ))
            } else {
                BlockOutput::line(format!(
                    "[{}]({})",
                    escape_markdown(name),
                    link_destination(url)
                ))
            }
        }
        BlockKind::Bookmark { url, caption } => {
            let Some(url) = required_url(block, url, ctx) else {
                return BlockOutput::skipped();
            };
            let caption = caption.as_deref().unwrap_or_default();
            if ctx.is_mdx() {
                let title = plain_text(caption);
                let title: &str = if title.is_empty() { url } else { &title };
                BlockOutput::line(format!(
                    "<Bookmark url=\"{}\" title=\"{}\" />",
                    escape_attribute(url),
                    escape_attribute(title)
                ))
            } else {
                let text = render_rich_text(caption);
                let text = if text.is_empty() {
                    escape_markdown(url)
                } else {
                    text
                };
                BlockOutput::line(format!("[{text}]({})", link_destination(url)))
            }
        }
        BlockKind::Embed { url } => linked_component(block, "Embed", "Embed", url, ctx),
        BlockKind::LinkPreview { url } => linked_component(block, "LinkPreview", "Link", url, ctx),
        BlockKind::ChildPage { title } => titled(title, "ChildPage", "📄", ctx),
        BlockKind::ChildDatabase { title } => titled(title, "ChildDatabase", "🗄️", ctx),
        BlockKind::Table {
            rows,
            has_header_row,
        } => table(block, rows, *has_header_row, ctx),
        BlockKind::Divider => BlockOutput::line("---"),
        BlockKind::Equation { expression } => {
            let expression = expression.trim();
            if expression.is_empty() {
                ctx.diagnostics
                    .malformed_block(&block.id, "equation has no expression");
                return BlockOutput::skipped();
            }
            let mut lines = vec!["$$".to_string()];
            lines.extend(expression.lines().map(str::to_string));
            lines.push("$$".to_string());
            BlockOutput::new(lines, ChildLayout::Following)
        }
        BlockKind::TableOfContents => {
            if ctx.is_mdx() {
                BlockOutput::line("<TableOfContents />")
            } else {
                BlockOutput::line("[TOC]")
            }
        }
        BlockKind::Breadcrumb => BlockOutput::skipped(),
        BlockKind::ColumnList | BlockKind::Column => BlockOutput::empty(),
        BlockKind::Malformed { raw_kind, reason } => {
            ctx.diagnostics
                .malformed_block(&block.id, format!("{raw_kind}: {reason}"));
            BlockOutput::skipped()
        }
        BlockKind::Unsupported { raw_kind } => {
            ctx.diagnostics.unsupported(&block.id, raw_kind);
            BlockOutput::skipped()
        }
    }
}

fn heading(
    block: &Block,
    level: u8,
    text: &[TextSpan],
    color: Color,
    ctx: &mut RenderContext,
) -> BlockOutput {
    if !(1..=3).contains(&level) {
        ctx.diagnostics
            .malformed_block(&block.id, format!("heading level {level} out of range"));
        return BlockOutput::skipped();
    }
    let rendered = render_rich_text(text).replace('\n', " ");
    if rendered.trim().is_empty() {
        return BlockOutput::empty();
    }
    let hashes = "#".repeat(level as usize);
    BlockOutput::line(format!("{hashes} {}", colored(rendered, color, ctx)))
}

fn list_item(marker: &str, text: &[TextSpan], color: Color, ctx: &RenderContext) -> BlockOutput {
    let rendered = render_rich_text(text);
    let width = marker.len();
    let child_indent = ctx.options.indent_width.max(width);

    if rendered.is_empty() {
        return BlockOutput::new(
            vec![marker.trim_end().to_string()],
            ChildLayout::Indented(child_indent),
        );
    }

    // Continuation lines align with the item text
    let pad = " ".repeat(width);
    let lines = split_lines(&colored(rendered, color, ctx))
        .into_iter()
        .enumerate()
        .map(|(i, line)| match i {
            0 => format!("{marker}{line}"),
            _ if line.is_empty() => line,
            _ => format!("{pad}{line}"),
        })
        .collect();

    BlockOutput::new(lines, ChildLayout::Indented(child_indent))
}

fn toggle(summary: &[TextSpan], color: Color, ctx: &RenderContext) -> BlockOutput {
    match ctx.options.toggle {
        ToggleStyle::Details => {
            let (summary_line, body) = match ctx.options.flavor {
                Flavor::Mdx => {
                    let rendered = render_rich_text(summary).replace('\n', " ");
                    let line = if rendered.is_empty() {
                        "<summary></summary>".to_string()
                    } else {
                        format!(
                            "<summary>{}</summary>",
                            colored(format!("**{rendered}**"), color, ctx)
                        )
                    };
                    (line, ChildLayout::Enclosed(ctx.options.indent_width))
                }
                // Raw HTML blocks do not parse Markdown, so use HTML emphasis.
                // Body stays at column 0: indented after a blank line it is code.
                Flavor::Markdown => (
                    format!(
                        "<summary><strong>{}</strong></summary>",
                        escape_html(&plain_text(summary).replace('\n', " "))
                    ),
                    ChildLayout::Enclosed(0),
                ),
            };
            BlockOutput {
                lines: vec!["<details>".to_string(), summary_line, String::new()],
                closing: vec!["</details>".to_string()],
                children: body,
            }
        }
        ToggleStyle::Flatten => {
            let rendered = render_rich_text(summary).replace('\n', " ");
            if rendered.is_empty() {
                BlockOutput::empty()
            } else {
                BlockOutput::line(colored(format!("**{rendered}**"), color, ctx))
            }
        }
    }
}

fn callout(icon: Option<&str>, text: &[TextSpan], color: Color, ctx: &RenderContext) -> BlockOutput {
    let rendered = render_rich_text(text);
    let icon = icon.filter(|i| !i.is_empty());

    if ctx.is_mdx() {
        let mut open = String::from("<Callout");
        if let Some(icon) = icon {
            open.push_str(&format!(" icon=\"{}\"", escape_attribute(icon)));
        }
        if color != Color::Default {
            open.push_str(&format!(" color=\"{color}\""));
        }
        open.push('>');

        let mut lines = vec![open];
        lines.extend(split_lines(&rendered).into_iter().filter(|l| !l.is_empty()));
        return BlockOutput {
            lines,
            closing: vec!["</Callout>".to_string()],
            children: ChildLayout::Enclosed(0),
        };
    }

    let mut lines = split_lines(&rendered);
    if let Some(icon) = icon {
        match lines.first_mut() {
            Some(first) if !first.is_empty() => *first = format!("{icon} {first}"),
            Some(first) => *first = icon.to_string(),
            None => lines.push(icon.to_string()),
        }
    }
    BlockOutput::new(quote_lines(&lines), ChildLayout::Quoted)
}

fn code_block(language: &str, text: &str) -> BlockOutput {
    let fence = "`".repeat(fence_length(text, '`'));
    let mut lines = vec![format!("{fence}{}", normalize_language(language))];
    if !text.is_empty() {
        lines.extend(text.trim_end_matches('\n').split('\n').map(str::to_string));
    }
    lines.push(fence);
    BlockOutput::new(lines, ChildLayout::Following)
}

/// Map Notion's language labels to info strings highlighters recognise.
fn normalize_language(language: &str) -> String {
    match language.trim() {
        "plain text" => "text".to_string(),
        other => other.to_lowercase().replace(' ', "-"),
    }
}

fn table(
    block: &Block,
    rows: &[Vec<Vec<TextSpan>>],
    has_header_row: bool,
    ctx: &mut RenderContext,
) -> BlockOutput {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        ctx.diagnostics.malformed_block(&block.id, "table has no cells");
        return BlockOutput::skipped();
    }

    let render_row = |row: &[Vec<TextSpan>]| -> String {
        let mut cells: Vec<String> = row
            .iter()
            .map(|cell| escape_table_cell(&render_rich_text(cell)))
            .collect();
        cells.resize(width, String::new());
        format!("| {} |", cells.join(" | "))
    };

    let (header, body) = match rows.split_first() {
        Some((first, rest)) if has_header_row => (render_row(first), rest),
        _ => (render_row(&[]), rows),
    };

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(header);
    lines.push(format!("|{}", "---|".repeat(width)));
    lines.extend(body.iter().map(|row| render_row(row)));

    // Rows are folded into the table itself
    BlockOutput::new(lines, ChildLayout::Skipped)
}

fn media(
    block: &Block,
    component: &str,
    label: &str,
    url: &str,
    ctx: &mut RenderContext,
) -> BlockOutput {
    let Some(url) = required_url(block, url, ctx) else {
        return BlockOutput::skipped();
    };
    if ctx.is_mdx() {
        BlockOutput::line(format!("<{component} src=\"{}\" />", escape_attribute(url)))
    } else {
        BlockOutput::line(format!("[{label}]({})", link_destination(url)))
    }
}

fn linked_component(
    block: &Block,
    component: &str,
    label: &str,
    url: &str,
    ctx: &mut RenderContext,
) -> BlockOutput {
    let Some(url) = required_url(block, url, ctx) else {
        return BlockOutput::skipped();
    };
    if ctx.is_mdx() {
        BlockOutput::line(format!("<{component} url=\"{}\" />", escape_attribute(url)))
    } else {
        BlockOutput::line(format!("[{label}]({})", link_destination(url)))
    }
}

fn titled(title: &str, component: &str, icon: &str, ctx: &RenderContext) -> BlockOutput {
    if ctx.is_mdx() {
        BlockOutput::line(format!("<{component} title=\"{}\" />", escape_attribute(title)))
    } else {
        BlockOutput::line(format!("{icon} {}", escape_markdown(title)))
    }
}

/// Media blocks cannot render without a URL.
fn required_url<'b>(block: &Block, url: &'b str, ctx: &mut RenderContext) -> Option<&'b str> {
    let url = url.trim();
    if url.is_empty() {
        ctx.diagnostics.malformed_block(
            &block.id,
            format!("{} block has no url", block.kind.type_name()),
        );
        return None;
    }
    Some(url)
}

fn colored(text: String, color: Color, ctx: &RenderContext) -> String {
    if ctx.options.colors && ctx.is_mdx() && color != Color::Default {
        format!("<Span color=\"{color}\">{text}</Span>")
    } else {
        text
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

fn quote_lines(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
