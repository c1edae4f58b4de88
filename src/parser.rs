use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::block::{
    Block, BlockKind, Color, DateRange, Page, PropertyValue, Styles, TextSpan, plain_text,
};
use crate::error::Result;

/// Parse a page object: `{ "id", "properties": {..}, "children": [..] }`.
///
/// Only invalid JSON or a non-object page fails. Each block is read on its
/// own: unknown types become [`BlockKind::Unsupported`], and blocks that
/// cannot be read become [`BlockKind::Malformed`].
pub fn parse_page(json: &str) -> Result<Page> {
    let raw: RawPage = serde_json::from_str(json)?;
    tracing::debug!(
        page = %raw.id,
        properties = raw.properties.len(),
        blocks = raw.children.len(),
        "parsed page"
    );

    let properties = raw
        .properties
        .into_iter()
        .map(|(name, value)| (name, property_value(value)))
        .collect();

    Ok(Page {
        id: raw.id,
        properties,
        blocks: raw.children.into_iter().map(convert_value).collect(),
    })
}

/// Parse a block array, or a list object with a `results` array.
pub fn parse_blocks(json: &str) -> Result<Vec<Block>> {
    let raw: RawBlockList = serde_json::from_str(json)?;
    let blocks = match raw {
        RawBlockList::Array(blocks) | RawBlockList::List { results: blocks } => blocks,
    };
    Ok(blocks.into_iter().map(convert_value).collect())
}

#[derive(Deserialize)]
struct RawPage {
    #[serde(default)]
    id: String,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default, alias = "blocks")]
    children: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBlockList {
    Array(Vec<Value>),
    List { results: Vec<Value> },
}

#[derive(Deserialize)]
struct RawBlock {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    has_children: bool,
    #[serde(default)]
    children: Option<Vec<Value>>,
    /// Type-keyed payload plus metadata we do not read
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Deserialize, Default)]
struct RawRichText {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    plain_text: String,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    annotations: RawAnnotations,
    #[serde(default)]
    text: Option<RawTextContent>,
    #[serde(default)]
    equation: Option<RawExpression>,
}

#[derive(Deserialize, Default)]
struct RawAnnotations {
    #[serde(default)]
    bold: bool,
    #[serde(default)]
    italic: bool,
    #[serde(default)]
    strikethrough: bool,
    #[serde(default)]
    underline: bool,
    #[serde(default)]
    code: bool,
}

#[derive(Deserialize)]
struct RawTextContent {
    content: String,
    #[serde(default)]
    link: Option<RawLink>,
}

#[derive(Deserialize)]
struct RawLink {
    url: String,
}

#[derive(Deserialize)]
struct RawExpression {
    expression: String,
}

/// Payload shared by the plain text-bearing block types
#[derive(Deserialize)]
struct TextPayload {
    #[serde(default)]
    rich_text: Vec<RawRichText>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    checked: bool,
}

#[derive(Deserialize)]
struct CalloutPayload {
    #[serde(default)]
    rich_text: Vec<RawRichText>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    icon: Option<RawIcon>,
}

#[derive(Deserialize)]
struct RawIcon {
    #[serde(default)]
    emoji: Option<String>,
    #[serde(default)]
    external: Option<RawLink>,
    #[serde(default)]
    file: Option<RawLink>,
}

#[derive(Deserialize)]
struct CodePayload {
    #[serde(default)]
    rich_text: Vec<RawRichText>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Deserialize)]
struct FilePayload {
    #[serde(default)]
    external: Option<RawLink>,
    #[serde(default)]
    file: Option<RawLink>,
    #[serde(default)]
    caption: Vec<RawRichText>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct UrlPayload {
    url: String,
    #[serde(default)]
    caption: Vec<RawRichText>,
}

#[derive(Deserialize)]
struct TitlePayload {
    title: String,
}

#[derive(Deserialize)]
struct TablePayload {
    #[serde(default)]
    has_column_header: bool,
}

#[derive(Deserialize)]
struct TableRowPayload {
    #[serde(default)]
    cells: Vec<Vec<RawRichText>>,
}

fn convert_value(value: Value) -> Block {
    let raw = match serde_json::from_value::<RawBlock>(value.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            let id = value.get("id").and_then(Value::as_str).unwrap_or_default();
            let raw_kind = value.get("type").and_then(Value::as_str).unwrap_or("block");
            return Block::new(
                id,
                BlockKind::Malformed {
                    raw_kind: raw_kind.to_string(),
                    reason: e.to_string(),
                },
            );
        }
    };
    convert_block(raw)
}

fn convert_block(raw: RawBlock) -> Block {
    let RawBlock {
        id,
        kind,
        has_children,
        children,
        mut rest,
    } = raw;
    let mut children = children.unwrap_or_default();

    let Some(kind) = kind else {
        return Block::new(
            id,
            BlockKind::Malformed {
                raw_kind: "block".to_string(),
                reason: "block has no type".to_string(),
            },
        );
    };

    let mut payload = rest
        .remove(&kind)
        .unwrap_or_else(|| Value::Object(Map::new()));

    // Children may also be nested inside the payload
    if let Value::Object(map) = &mut payload
        && let Some(nested) = map.remove("children")
    {
        match serde_json::from_value::<Vec<Value>>(nested) {
            Ok(nested) => children.extend(nested),
            Err(e) => tracing::debug!(block = %id, "ignoring unreadable nested children: {e}"),
        }
    }

    if kind == "table" {
        return convert_table(id, payload, children);
    }

    let block_kind = match block_kind(&kind, payload) {
        Ok(block_kind) => block_kind,
        Err(e) => BlockKind::Malformed {
            raw_kind: kind,
            reason: e.to_string(),
        },
    };

    let children: Vec<Block> = children.into_iter().map(convert_value).collect();
    Block {
        id,
        kind: block_kind,
        has_children: has_children || !children.is_empty(),
        children,
    }
}

fn block_kind(kind: &str, payload: Value) -> serde_json::Result<BlockKind> {
    let block_kind = match kind {
        "paragraph" => {
            let p: TextPayload = read(payload)?;
            BlockKind::Paragraph {
                text: spans(p.rich_text),
                color: color(p.color),
            }
        }
        "heading_1" | "heading_2" | "heading_3" => {
            let p: TextPayload = read(payload)?;
            BlockKind::Heading {
                level: kind.as_bytes()[kind.len() - 1] - b'0',
                text: spans(p.rich_text),
                color: color(p.color),
            }
        }
        "bulleted_list_item" => {
            let p: TextPayload = read(payload)?;
            BlockKind::BulletListItem {
                text: spans(p.rich_text),
                color: color(p.color),
            }
        }
        "numbered_list_item" => {
            let p: TextPayload = read(payload)?;
            BlockKind::NumberedListItem {
                text: spans(p.rich_text),
                color: color(p.color),
            }
        }
        "to_do" => {
            let p: TextPayload = read(payload)?;
            BlockKind::ToDo {
                text: spans(p.rich_text),
                checked: p.checked,
                color: color(p.color),
            }
        }
        "toggle" => {
            let p: TextPayload = read(payload)?;
            BlockKind::Toggle {
                summary: spans(p.rich_text),
                color: color(p.color),
            }
        }
        "quote" => {
            let p: TextPayload = read(payload)?;
            BlockKind::Quote {
                text: spans(p.rich_text),
                color: color(p.color),
            }
        }
        "callout" => {
            let p: CalloutPayload = read(payload)?;
            BlockKind::Callout {
                icon: p.icon.and_then(|icon| {
                    icon.emoji
                        .or(icon.external.map(|link| link.url))
                        .or(icon.file.map(|link| link.url))
                }),
                text: spans(p.rich_text),
                color: color(p.color),
            }
        }
        "code" => {
            let p: CodePayload = read(payload)?;
            BlockKind::CodeBlock {
                language: p.language.unwrap_or_default(),
                text: plain_text(&spans(p.rich_text)),
            }
        }
        "image" => {
            let p: FilePayload = read(payload)?;
            let caption = spans(p.caption);
            BlockKind::Image {
                url: file_url(p.external, p.file),
                caption: (!caption.is_empty()).then_some(caption),
            }
        }
        "video" => {
            let p: FilePayload = read(payload)?;
            BlockKind::Video {
                url: file_url(p.external, p.file),
            }
        }
        "audio" => {
            let p: FilePayload = read(payload)?;
            BlockKind::Audio {
                url: file_url(p.external, p.file),
            }
        }
        "pdf" => {
            let p: FilePayload = read(payload)?;
            BlockKind::Pdf {
                url: file_url(p.external, p.file),
            }
        }
        "file" => {
            let p: FilePayload = read(payload)?;
            let caption = plain_text(&spans(p.caption));
            let url = file_url(p.external, p.file);
            let name = p
                .name
                .filter(|name| !name.is_empty())
                .or((!caption.is_empty()).then_some(caption))
                .unwrap_or_else(|| file_name_from_url(&url));
            BlockKind::File { url, name }
        }
        "bookmark" => {
            let p: UrlPayload = read(payload)?;
            let caption = spans(p.caption);
            BlockKind::Bookmark {
                url: p.url,
                caption: (!caption.is_empty()).then_some(caption),
            }
        }
        "embed" => BlockKind::Embed {
            url: read::<UrlPayload>(payload)?.url,
        },
        "link_preview" => BlockKind::LinkPreview {
            url: read::<UrlPayload>(payload)?.url,
        },
        "child_page" => BlockKind::ChildPage {
            title: read::<TitlePayload>(payload)?.title,
        },
        "child_database" => BlockKind::ChildDatabase {
            title: read::<TitlePayload>(payload)?.title,
        },
        "equation" => BlockKind::Equation {
            expression: read::<RawExpression>(payload)?.expression,
        },
        "divider" => BlockKind::Divider,
        "table_of_contents" => BlockKind::TableOfContents,
        "breadcrumb" => BlockKind::Breadcrumb,
        "column_list" => BlockKind::ColumnList,
        "column" => BlockKind::Column,
        other => BlockKind::Unsupported {
            raw_kind: other.to_string(),
        },
    };
    Ok(block_kind)
}

fn convert_table(id: String, payload: Value, children: Vec<Value>) -> Block {
    let header = match read::<TablePayload>(payload) {
        Ok(p) => p.has_column_header,
        Err(e) => {
            return Block::new(
                id,
                BlockKind::Malformed {
                    raw_kind: "table".to_string(),
                    reason: e.to_string(),
                },
            );
        }
    };

    let mut rows = Vec::new();
    for row in children {
        if row.get("type").and_then(Value::as_str) != Some("table_row") {
            continue;
        }
        let row_id = row.get("id").and_then(Value::as_str).unwrap_or_default();
        let payload = row.get("table_row").cloned().unwrap_or(Value::Null);
        match read::<TableRowPayload>(payload) {
            Ok(p) => rows.push(p.cells.into_iter().map(spans).collect()),
            Err(e) => {
                return Block::new(
                    id,
                    BlockKind::Malformed {
                        raw_kind: "table".to_string(),
                        reason: format!("row {row_id}: {e}"),
                    },
                );
            }
        }
    }

    Block::new(
        id,
        BlockKind::Table {
            rows,
            has_header_row: header,
        },
    )
}

fn read<T: DeserializeOwned>(payload: Value) -> serde_json::Result<T> {
    serde_json::from_value(payload)
}

fn color(name: Option<String>) -> Color {
    name.as_deref().and_then(Color::parse).unwrap_or_default()
}

fn file_url(external: Option<RawLink>, file: Option<RawLink>) -> String {
    external
        .or(file)
        .map(|link| link.url)
        .unwrap_or_default()
}

fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "Download".to_string(),
    }
}

fn spans(raw: Vec<RawRichText>) -> Vec<TextSpan> {
    raw.into_iter().map(span).collect()
}

fn span(raw: RawRichText) -> TextSpan {
    let styles = Styles {
        bold: raw.annotations.bold,
        italic: raw.annotations.italic,
        strikethrough: raw.annotations.strikethrough,
        underline: raw.annotations.underline,
        code: raw.annotations.code,
    };

    match raw.kind.as_str() {
        "equation" => TextSpan::equation(
            raw.equation
                .map(|e| e.expression)
                .unwrap_or(raw.plain_text),
        ),
        "text" => {
            let (content, link) = match raw.text {
                Some(text) => (text.content, text.link.map(|link| link.url).or(raw.href)),
                None => (raw.plain_text, raw.href),
            };
            TextSpan {
                link,
                ..TextSpan::styled(content, styles)
            }
        }
        // Mentions and anything newer carry their display text in plain_text
        _ => TextSpan {
            link: raw.href,
            ..TextSpan::styled(raw.plain_text, styles)
        },
    }
}

#[derive(Deserialize)]
struct RawSelectOption {
    name: String,
}

#[derive(Deserialize)]
struct RawDate {
    start: String,
    #[serde(default)]
    end: Option<String>,
}

#[derive(Deserialize)]
struct RawRelation {
    id: String,
}

fn property_value(raw: Value) -> PropertyValue {
    let Value::Object(mut map) = raw else {
        return PropertyValue::Unsupported {
            raw_type: "non-object".to_string(),
        };
    };
    let kind = match map.remove("type") {
        Some(Value::String(kind)) => kind,
        _ => {
            return PropertyValue::Unsupported {
                raw_type: "untyped".to_string(),
            };
        }
    };
    let payload = map.remove(&kind).unwrap_or(Value::Null);

    match typed_property(&kind, payload) {
        Ok(Some(value)) => value,
        Ok(None) => PropertyValue::Unsupported { raw_type: kind },
        Err(e) => {
            tracing::debug!(property_type = %kind, "unreadable property payload: {e}");
            PropertyValue::Unsupported { raw_type: kind }
        }
    }
}

fn typed_property(kind: &str, payload: Value) -> serde_json::Result<Option<PropertyValue>> {
    let value = match kind {
        "title" | "rich_text" => {
            let text: Vec<RawRichText> = read(payload)?;
            PropertyValue::Text(plain_text(&spans(text)))
        }
        "select" | "status" => {
            let option: Option<RawSelectOption> = read(payload)?;
            PropertyValue::Select(option.map(|o| o.name))
        }
        "multi_select" => {
            let options: Vec<RawSelectOption> = read(payload)?;
            PropertyValue::MultiSelect(options.into_iter().map(|o| o.name).collect())
        }
        "date" => {
            let date: Option<RawDate> = read(payload)?;
            PropertyValue::Date(date.map(|d| DateRange {
                start: d.start,
                end: d.end,
            }))
        }
        "checkbox" => PropertyValue::Checkbox(read(payload)?),
        "number" => PropertyValue::Number(read(payload)?),
        "relation" => {
            let relations: Vec<RawRelation> = read(payload)?;
            PropertyValue::Relation(relations.into_iter().map(|r| r.id).collect())
        }
        "url" | "email" | "phone_number" | "created_time" | "last_edited_time" => {
            let text: Option<String> = read(payload)?;
            PropertyValue::Text(text.unwrap_or_default())
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}
