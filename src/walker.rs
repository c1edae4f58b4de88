use crate::block::Block;
use crate::render::{ChildLayout, ListGroup, RenderContext, list_group, render_block};

/// Render a sequence of sibling blocks (and their descendants) to Markdown.
///
/// Siblings are separated by one blank line, except consecutive items of the
/// same list kind, which stay tight.
pub fn walk(blocks: &[Block], ctx: &mut RenderContext) -> String {
    walk_lines(blocks, ctx).lines.join("\n")
}

struct Walked {
    lines: Vec<String>,
    /// List kind of the first block that produced output
    leading_group: Option<ListGroup>,
}

fn walk_lines(blocks: &[Block], ctx: &mut RenderContext) -> Walked {
    let mut lines: Vec<String> = Vec::new();
    let mut leading_group = None;
    // List kind of the previous sibling, if it produced output
    let mut run: Option<ListGroup> = None;

    for block in blocks {
        let group = list_group(&block.kind);
        let chunk = render_subtree(block, ctx);
        if chunk.is_empty() {
            run = None;
            continue;
        }

        if lines.is_empty() {
            leading_group = group;
        } else if group.is_none() || run != group {
            lines.push(String::new());
        }
        lines.extend(chunk);
        run = group;
    }

    Walked {
        lines,
        leading_group,
    }
}

fn render_subtree(block: &Block, ctx: &mut RenderContext) -> Vec<String> {
    let output = render_block(block, ctx);
    let mut lines = output.lines;

    let children = if block.has_children && output.children != ChildLayout::Skipped {
        ctx.enter();
        let walked = walk_lines(&block.children, ctx);
        ctx.leave();
        walked
    } else {
        Walked {
            lines: Vec::new(),
            leading_group: None,
        }
    };

    if !children.lines.is_empty() {
        match output.children {
            ChildLayout::Indented(width) => {
                // Nested lists attach tightly; other content opens a paragraph
                if children.leading_group.is_none() && !lines.is_empty() {
                    lines.push(String::new());
                }
                lines.extend(indent(children.lines, width));
            }
            ChildLayout::Quoted => {
                if !lines.is_empty() {
                    lines.push(">".to_string());
                }
                lines.extend(children.lines.into_iter().map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {line}")
                    }
                }));
            }
            ChildLayout::Enclosed(width) => {
                if lines.last().is_some_and(|line| !line.is_empty()) {
                    lines.push(String::new());
                }
                lines.extend(indent(children.lines, width));
                lines.push(String::new());
            }
            ChildLayout::Following => {
                if !lines.is_empty() {
                    lines.push(String::new());
                }
                lines.extend(children.lines);
            }
            ChildLayout::Skipped => {}
        }
    }

    lines.extend(output.closing);
    lines
}

fn indent(lines: Vec<String>, width: usize) -> impl Iterator<Item = String> {
    let pad = " ".repeat(width);
    lines.into_iter().map(move |line| {
        if line.is_empty() {
            line
        } else {
            format!("{pad}{line}")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockKind, Color, TextSpan};
    use crate::config::{Flavor, RenderConfig, ToggleStyle};

    fn text(s: &str) -> Vec<TextSpan> {
        vec![TextSpan::plain(s)]
    }

    fn markdown() -> RenderConfig {
        RenderConfig {
            flavor: Flavor::Markdown,
            ..RenderConfig::default()
        }
    }

    fn render(blocks: &[Block], options: &RenderConfig) -> String {
        let mut ctx = RenderContext::new(options);
        walk(blocks, &mut ctx)
    }

    #[test]
    fn blocks_separated_by_blank_line() {
        let blocks = [
            Block::heading("h", 1, text("Title")),
            Block::paragraph("p1", text("First.")),
            Block::paragraph("p2", text("Second.")),
        ];
        assert_eq!(render(&blocks, &markdown()), "# Title\n\nFirst.\n\nSecond.");
    }

    #[test]
    fn empty_paragraph_adds_no_blank_lines() {
        let blocks = [
            Block::paragraph("p1", text("a")),
            Block::paragraph("p2", vec![]),
            Block::paragraph("p3", text("b")),
        ];
        assert_eq!(render(&blocks, &markdown()), "a\n\nb");
    }

    #[test]
    fn tight_lists() {
        let blocks = [
            Block::bullet("b1", text("one")),
            Block::bullet("b2", text("two")),
            Block::to_do("t", text("three"), false),
        ];
        assert_eq!(
            render(&blocks, &markdown()),
            "- one\n- two\n- [ ] three"
        );
    }

    #[test]
    fn numbering_resets_after_interruption() {
        let blocks = [
            Block::numbered("n1", text("a")),
            Block::numbered("n2", text("b")),
            Block::bullet("b", text("c")),
            Block::numbered("n3", text("d")),
        ];
        assert_eq!(
            render(&blocks, &markdown()),
            "1. a\n2. b\n\n- c\n\n1. d"
        );
    }

    #[test]
    fn nested_numbering_is_isolated() {
        let blocks = [
            Block::bullet("b1", text("first")),
            Block::bullet("b2", text("second")).with_children(vec![
                Block::numbered("n1", text("x")),
                Block::numbered("n2", text("y")),
            ]),
        ];
        assert_eq!(
            render(&blocks, &markdown()),
            "- first\n- second\n  1. x\n  2. y"
        );
    }

    #[test]
    fn parent_numbering_survives_nested_list() {
        let blocks = [
            Block::numbered("n1", text("a")).with_children(vec![
                Block::numbered("n1a", text("inner")),
            ]),
            Block::numbered("n2", text("b")),
        ];
        assert_eq!(
            render(&blocks, &markdown()),
            "1. a\n   1. inner\n2. b"
        );
    }

    #[test]
    fn bullet_nesting_uses_two_spaces_per_level() {
        let blocks = [Block::bullet("a", text("a")).with_children(vec![
            Block::bullet("b", text("b")).with_children(vec![Block::bullet("c", text("c"))]),
        ])];
        assert_eq!(render(&blocks, &markdown()), "- a\n  - b\n    - c");
    }

    #[test]
    fn paragraph_under_list_item_is_loose() {
        let blocks = [Block::bullet("b", text("item"))
            .with_children(vec![Block::paragraph("p", text("detail"))])];
        assert_eq!(render(&blocks, &markdown()), "- item\n\n  detail");
    }

    #[test]
    fn toggle_encloses_children() {
        let blocks = [Block::toggle("t", text("More")).with_children(vec![
            Block::paragraph("p1", text("one")),
            Block::paragraph("p2", text("two")),
        ])];
        assert_eq!(
            render(&blocks, &RenderConfig::default()),
            "<details>\n<summary>**More**</summary>\n\n  one\n\n  two\n\n</details>"
        );
    }

    #[test]
    fn nested_markdown_toggles_do_not_become_code() {
        use pulldown_cmark::{Event, Parser, Tag};

        let blocks = [Block::toggle("outer", text("Outer")).with_children(vec![
            Block::toggle("inner", text("Inner"))
                .with_children(vec![Block::paragraph("p", text("hello"))]),
        ])];
        let out = render(&blocks, &markdown());
        assert_eq!(
            out,
            "<details>\n<summary><strong>Outer</strong></summary>\n\n\
             <details>\n<summary><strong>Inner</strong></summary>\n\n\
             hello\n\n</details>\n\n</details>"
        );
        assert!(
            !Parser::new(&out).any(|event| matches!(event, Event::Start(Tag::CodeBlock(_))))
        );
    }

    #[test]
    fn empty_toggle() {
        let blocks = [Block::toggle("t", text("Nothing"))];
        assert_eq!(
            render(&blocks, &RenderConfig::default()),
            "<details>\n<summary>**Nothing**</summary>\n\n</details>"
        );
    }

    #[test]
    fn flattened_toggle() {
        let options = RenderConfig {
            toggle: ToggleStyle::Flatten,
            ..markdown()
        };
        let blocks = [Block::toggle("t", text("FAQ"))
            .with_children(vec![Block::paragraph("p", text("Answer"))])];
        assert_eq!(render(&blocks, &options), "**FAQ**\n\nAnswer");
    }

    #[test]
    fn quote_children_stay_quoted() {
        let blocks = [Block::quote("q", text("said"))
            .with_children(vec![Block::bullet("b", text("point"))])];
        assert_eq!(render(&blocks, &markdown()), "> said\n>\n> - point");
    }

    #[test]
    fn mdx_callout_with_children() {
        let callout = Block::new(
            "c",
            BlockKind::Callout {
                icon: Some("⚠️".into()),
                text: text("Careful"),
                color: Color::Default,
            },
        )
        .with_children(vec![Block::bullet("b", text("detail"))]);
        assert_eq!(
            render(&[callout], &RenderConfig::default()),
            "<Callout icon=\"⚠️\">\nCareful\n\n- detail\n\n</Callout>"
        );
    }

    #[test]
    fn columns_render_in_place() {
        let blocks = [Block::new("cl", BlockKind::ColumnList).with_children(vec![
            Block::new("c1", BlockKind::Column)
                .with_children(vec![Block::paragraph("p1", text("left"))]),
            Block::new("c2", BlockKind::Column)
                .with_children(vec![Block::paragraph("p2", text("right"))]),
        ])];
        assert_eq!(render(&blocks, &markdown()), "left\n\nright");
    }

    #[test]
    fn code_inside_list_item_is_indented() {
        let code = Block::new(
            "code",
            BlockKind::CodeBlock {
                language: "sh".into(),
                text: "ls\npwd".into(),
            },
        );
        let blocks = [Block::bullet("b", text("run")).with_children(vec![code])];
        assert_eq!(
            render(&blocks, &markdown()),
            "- run\n\n  ```sh\n  ls\n  pwd\n  ```"
        );
    }

    #[test]
    fn unsupported_block_between_siblings() {
        let options = markdown();
        let mut ctx = RenderContext::new(&options);
        let blocks = [
            Block::paragraph("p1", text("before")),
            Block::new(
                "x",
                BlockKind::Unsupported {
                    raw_kind: "meeting_notes".into(),
                },
            )
            .with_children(vec![Block::paragraph("hidden", text("hidden"))]),
            Block::paragraph("p2", text("after")),
        ];
        assert_eq!(walk(&blocks, &mut ctx), "before\n\nafter");
        assert_eq!(ctx.diagnostics.len(), 1);
    }

    #[test]
    fn unsupported_block_breaks_numbering() {
        let blocks = [
            Block::numbered("n1", text("a")),
            Block::new(
                "x",
                BlockKind::Unsupported {
                    raw_kind: "form".into(),
                },
            ),
            Block::numbered("n2", text("b")),
        ];
        assert_eq!(render(&blocks, &markdown()), "1. a\n\n1. b");
    }

    #[test]
    fn unfetched_children_are_ignored() {
        let mut block = Block::bullet("b", text("lazy"));
        block.has_children = true;
        assert_eq!(render(&[block], &markdown()), "- lazy");
    }

    #[test]
    fn context_depth_is_restored() {
        let options = markdown();
        let mut ctx = RenderContext::new(&options);
        let blocks = [Block::bullet("a", text("a"))
            .with_children(vec![Block::bullet("b", text("b"))])];
        walk(&blocks, &mut ctx);
        assert_eq!(ctx.depth, 0);
    }

    #[test]
    fn rendering_is_idempotent() {
        let blocks = [
            Block::numbered("n1", text("a"))
                .with_children(vec![Block::bullet("b", text("b"))]),
            Block::toggle("t", text("t")).with_children(vec![Block::paragraph("p", text("p"))]),
        ];
        let options = RenderConfig::default();
        assert_eq!(render(&blocks, &options), render(&blocks, &options));
    }

    #[test]
    fn output_parses_as_nested_tight_list() {
        use pulldown_cmark::{Event, Parser, Tag};

        let blocks = [
            Block::numbered("n1", text("a")).with_children(vec![
                Block::bullet("b1", text("x")),
                Block::bullet("b2", text("y")),
            ]),
            Block::numbered("n2", text("b")),
        ];
        let out = render(&blocks, &markdown());

        let mut depth = 0;
        let mut max_depth = 0;
        let mut paragraphs = 0;
        for event in Parser::new(&out) {
            match event {
                Event::Start(Tag::List(_)) => {
                    depth += 1;
                    max_depth = max_depth.max(depth);
                }
                Event::End(pulldown_cmark::TagEnd::List(_)) => depth -= 1,
                Event::Start(Tag::Paragraph) => paragraphs += 1,
                _ => {}
            }
        }
        assert_eq!(max_depth, 2);
        assert_eq!(paragraphs, 0, "tight lists have no paragraph wrappers");
    }
}
