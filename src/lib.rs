pub mod block;
pub mod config;
pub mod diagnostic;
pub mod error;
mod escape;
pub mod frontmatter;
pub mod output;
pub mod parser;
pub mod render;
pub mod rich_text;
pub mod walker;

pub use block::{Block, BlockKind, Page, PageProperties, PropertyValue, TextSpan};
pub use config::{Config, Flavor, RenderConfig};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use parser::{parse_blocks, parse_page};

use frontmatter::build_frontmatter;
use render::RenderContext;
use walker::walk;

/// Final artifact text plus everything that went wrong producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub text: String,
    pub diagnostics: Diagnostics,
}

/// Render a page to frontmatter plus Markdown/MDX body.
pub fn render_page(page: &Page, config: &Config) -> Rendered {
    let mut diagnostics = Diagnostics::new();
    let frontmatter = build_frontmatter(&page.properties, &config.frontmatter, &mut diagnostics);

    let body = render_blocks(&page.blocks, &config.render);
    diagnostics.extend(body.diagnostics);

    tracing::debug!(
        page = %page.id,
        blocks = page.blocks.len(),
        diagnostics = diagnostics.len(),
        "rendered page"
    );

    Rendered {
        text: assemble(&frontmatter, &body.text),
        diagnostics,
    }
}

/// Render a block sequence to a body, without frontmatter.
pub fn render_blocks(blocks: &[Block], options: &RenderConfig) -> Rendered {
    let mut ctx = RenderContext::new(options);
    let text = walk(blocks, &mut ctx);
    Rendered {
        text,
        diagnostics: ctx.diagnostics,
    }
}

/// Join frontmatter and body with one blank line and a single trailing newline.
pub fn assemble(frontmatter: &str, body: &str) -> String {
    let frontmatter = frontmatter.trim_end_matches('\n');
    let body = body.trim_end_matches('\n');
    if body.is_empty() {
        format!("{frontmatter}\n")
    } else {
        format!("{frontmatter}\n\n{body}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::DateRange;

    fn text(s: &str) -> Vec<TextSpan> {
        vec![TextSpan::plain(s)]
    }

    #[test]
    fn assemble_joins_with_blank_line() {
        assert_eq!(assemble("---\na: b\n---", "Body"), "---\na: b\n---\n\nBody\n");
    }

    #[test]
    fn assemble_single_trailing_newline() {
        assert_eq!(assemble("---\n---", "Body\n\n"), "---\n---\n\nBody\n");
    }

    #[test]
    fn assemble_empty_body() {
        assert_eq!(assemble("---\n---", ""), "---\n---\n");
    }

    #[test]
    fn empty_page() {
        let rendered = render_page(&Page::default(), &Config::default());
        assert_eq!(rendered.text, "---\n---\n");
        assert!(rendered.diagnostics.is_empty());
    }

    #[test]
    fn full_page() {
        let page = Page {
            id: "page".into(),
            properties: [
                ("title", PropertyValue::Text("Hello".into())),
                (
                    "date",
                    PropertyValue::Date(Some(DateRange {
                        start: "2024-05-01".into(),
                        end: None,
                    })),
                ),
            ]
            .into_iter()
            .collect(),
            blocks: vec![
                Block::heading("h", 1, text("Intro")),
                Block::paragraph("p", text("Some text.")),
                Block::numbered("n1", text("one")),
                Block::numbered("n2", text("two")),
            ],
        };
        let config = Config {
            render: RenderConfig {
                flavor: Flavor::Markdown,
                ..RenderConfig::default()
            },
            ..Config::default()
        };

        let rendered = render_page(&page, &config);
        assert_eq!(
            rendered.text,
            "---\ntitle: Hello\ndate: 2024-05-01\n---\n\n# Intro\n\nSome text.\n\n1. one\n2. two\n"
        );
        assert!(rendered.diagnostics.is_empty());
    }

    #[test]
    fn diagnostics_from_properties_and_blocks_are_combined() {
        let page = Page {
            id: "page".into(),
            properties: [(
                "owner",
                PropertyValue::Unsupported {
                    raw_type: "people".into(),
                },
            )]
            .into_iter()
            .collect(),
            blocks: vec![
                Block::paragraph("p", text("kept")),
                Block::new(
                    "x",
                    BlockKind::Unsupported {
                        raw_kind: "ai_block".into(),
                    },
                ),
            ],
        };
        let rendered = render_page(&page, &Config::default());
        assert_eq!(rendered.text, "---\n---\n\nkept\n");
        assert_eq!(rendered.diagnostics.len(), 2);
    }

    #[test]
    fn block_markers_in_text_stay_text() {
        use pulldown_cmark::{Event, Parser, Tag, TagEnd};

        let contents = [
            "1. Introduction",
            "- not a bullet",
            "+ plus",
            "1) paren",
            "---",
            "Title\n===",
        ];
        let blocks: Vec<Block> = contents
            .iter()
            .enumerate()
            .map(|(i, content)| Block::paragraph(format!("p{i}"), text(content)))
            .chain([Block::bullet("b", text("1. nested?"))])
            .collect();
        let options = RenderConfig {
            flavor: Flavor::Markdown,
            ..RenderConfig::default()
        };
        let body = render_blocks(&blocks, &options).text;

        let mut paragraphs = Vec::new();
        let mut current = String::new();
        let mut lists = 0;
        for event in Parser::new(&body) {
            match event {
                Event::Start(Tag::List(_)) => lists += 1,
                Event::Start(Tag::Heading { .. }) | Event::Rule => {
                    panic!("block structure leaked from text: {body}")
                }
                Event::Text(text) => current.push_str(&text),
                Event::SoftBreak => current.push('\n'),
                Event::End(TagEnd::Paragraph) => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            }
        }
        assert_eq!(lists, 1, "only the bullet item is a list: {body}");
        assert_eq!(paragraphs, contents);
    }

    #[test]
    fn pages_render_independently() {
        let page = Page {
            blocks: vec![
                Block::numbered("a", text("a")),
                Block::numbered("b", text("b")),
            ],
            ..Page::default()
        };
        let config = Config::default();
        let first = render_page(&page, &config);
        let second = render_page(&page, &config);
        assert_eq!(first, second);
        assert!(first.text.ends_with("1. a\n2. b\n"));
    }
}
