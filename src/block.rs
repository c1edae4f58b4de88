use std::fmt;

/// Inline styles that can apply to a text span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Styles {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

impl Styles {
    pub const PLAIN: Styles = Styles {
        bold: false,
        italic: false,
        strikethrough: false,
        underline: false,
        code: false,
    };

    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::PLAIN
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Self::PLAIN
        }
    }

    pub fn code() -> Self {
        Self {
            code: true,
            ..Self::PLAIN
        }
    }
}

/// An inline run of text with formatting
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextSpan {
    /// Literal text, or raw LaTeX when `equation` is set
    pub content: String,
    pub styles: Styles,
    pub link: Option<String>,
    pub equation: bool,
}

impl TextSpan {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn styled(content: impl Into<String>, styles: Styles) -> Self {
        Self {
            content: content.into(),
            styles,
            ..Self::default()
        }
    }

    pub fn linked(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn equation(expression: impl Into<String>) -> Self {
        Self {
            content: expression.into(),
            equation: true,
            ..Self::default()
        }
    }
}

/// Concatenate the unformatted text of a span sequence.
pub fn plain_text(spans: &[TextSpan]) -> String {
    spans.iter().map(|s| s.content.as_str()).collect()
}

/// Notion's text and background palette
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Color {
    #[default]
    Default,
    Gray,
    Brown,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Red,
    GrayBackground,
    BrownBackground,
    OrangeBackground,
    YellowBackground,
    GreenBackground,
    BlueBackground,
    PurpleBackground,
    PinkBackground,
    RedBackground,
}

impl Color {
    pub fn parse(name: &str) -> Option<Self> {
        let color = match name {
            "default" => Self::Default,
            "gray" => Self::Gray,
            "brown" => Self::Brown,
            "orange" => Self::Orange,
            "yellow" => Self::Yellow,
            "green" => Self::Green,
            "blue" => Self::Blue,
            "purple" => Self::Purple,
            "pink" => Self::Pink,
            "red" => Self::Red,
            "gray_background" => Self::GrayBackground,
            "brown_background" => Self::BrownBackground,
            "orange_background" => Self::OrangeBackground,
            "yellow_background" => Self::YellowBackground,
            "green_background" => Self::GreenBackground,
            "blue_background" => Self::BlueBackground,
            "purple_background" => Self::PurpleBackground,
            "pink_background" => Self::PinkBackground,
            "red_background" => Self::RedBackground,
            _ => return None,
        };
        Some(color)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Gray => "gray",
            Self::Brown => "brown",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Pink => "pink",
            Self::Red => "red",
            Self::GrayBackground => "gray_background",
            Self::BrownBackground => "brown_background",
            Self::OrangeBackground => "orange_background",
            Self::YellowBackground => "yellow_background",
            Self::GreenBackground => "green_background",
            Self::BlueBackground => "blue_background",
            Self::PurpleBackground => "purple_background",
            Self::PinkBackground => "pink_background",
            Self::RedBackground => "red_background",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The content of a block, one variant per supported block type
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Heading {
        level: u8,
        text: Vec<TextSpan>,
        color: Color,
    },
    Paragraph {
        text: Vec<TextSpan>,
        color: Color,
    },
    BulletListItem {
        text: Vec<TextSpan>,
        color: Color,
    },
    NumberedListItem {
        text: Vec<TextSpan>,
        color: Color,
    },
    ToDo {
        text: Vec<TextSpan>,
        checked: bool,
        color: Color,
    },
    Toggle {
        summary: Vec<TextSpan>,
        color: Color,
    },
    Quote {
        text: Vec<TextSpan>,
        color: Color,
    },
    Callout {
        icon: Option<String>,
        text: Vec<TextSpan>,
        color: Color,
    },
    CodeBlock {
        language: String,
        /// Raw source, emitted verbatim
        text: String,
    },
    Image {
        url: String,
        caption: Option<Vec<TextSpan>>,
    },
    Video {
        url: String,
    },
    Audio {
        url: String,
    },
    Pdf {
        url: String,
    },
    File {
        url: String,
        name: String,
    },
    Bookmark {
        url: String,
        caption: Option<Vec<TextSpan>>,
    },
    Embed {
        url: String,
    },
    LinkPreview {
        url: String,
    },
    ChildPage {
        title: String,
    },
    ChildDatabase {
        title: String,
    },
    Table {
        rows: Vec<Vec<Vec<TextSpan>>>,
        has_header_row: bool,
    },
    Divider,
    Equation {
        expression: String,
    },
    TableOfContents,
    Breadcrumb,
    ColumnList,
    Column,
    /// A known block type whose payload could not be read
    Malformed {
        raw_kind: String,
        reason: String,
    },
    Unsupported {
        raw_kind: String,
    },
}

impl BlockKind {
    /// Name of the block type as it appears in the Notion API.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Heading { level: 1, .. } => "heading_1",
            Self::Heading { level: 2, .. } => "heading_2",
            Self::Heading { level: 3, .. } => "heading_3",
            Self::Heading { .. } => "heading",
            Self::Paragraph { .. } => "paragraph",
            Self::BulletListItem { .. } => "bulleted_list_item",
            Self::NumberedListItem { .. } => "numbered_list_item",
            Self::ToDo { .. } => "to_do",
            Self::Toggle { .. } => "toggle",
            Self::Quote { .. } => "quote",
            Self::Callout { .. } => "callout",
            Self::CodeBlock { .. } => "code",
            Self::Image { .. } => "image",
            Self::Video { .. } => "video",
            Self::Audio { .. } => "audio",
            Self::Pdf { .. } => "pdf",
            Self::File { .. } => "file",
            Self::Bookmark { .. } => "bookmark",
            Self::Embed { .. } => "embed",
            Self::LinkPreview { .. } => "link_preview",
            Self::ChildPage { .. } => "child_page",
            Self::ChildDatabase { .. } => "child_database",
            Self::Table { .. } => "table",
            Self::Divider => "divider",
            Self::Equation { .. } => "equation",
            Self::TableOfContents => "table_of_contents",
            Self::Breadcrumb => "breadcrumb",
            Self::ColumnList => "column_list",
            Self::Column => "column",
            Self::Malformed { raw_kind, .. } | Self::Unsupported { raw_kind } => raw_kind,
        }
    }
}

/// One node of the page content tree
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Opaque identifier, used for diagnostics only
    pub id: String,
    pub kind: BlockKind,
    pub has_children: bool,
    /// Child blocks in document order
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            has_children: false,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.has_children = !children.is_empty();
        self.children = children;
        self
    }

    pub fn paragraph(id: impl Into<String>, text: Vec<TextSpan>) -> Self {
        Self::new(
            id,
            BlockKind::Paragraph {
                text,
                color: Color::Default,
            },
        )
    }

    pub fn heading(id: impl Into<String>, level: u8, text: Vec<TextSpan>) -> Self {
        Self::new(
            id,
            BlockKind::Heading {
                level,
                text,
                color: Color::Default,
            },
        )
    }

    pub fn bullet(id: impl Into<String>, text: Vec<TextSpan>) -> Self {
        Self::new(
            id,
            BlockKind::BulletListItem {
                text,
                color: Color::Default,
            },
        )
    }

    pub fn numbered(id: impl Into<String>, text: Vec<TextSpan>) -> Self {
        Self::new(
            id,
            BlockKind::NumberedListItem {
                text,
                color: Color::Default,
            },
        )
    }

    pub fn to_do(id: impl Into<String>, text: Vec<TextSpan>, checked: bool) -> Self {
        Self::new(
            id,
            BlockKind::ToDo {
                text,
                checked,
                color: Color::Default,
            },
        )
    }

    pub fn toggle(id: impl Into<String>, summary: Vec<TextSpan>) -> Self {
        Self::new(
            id,
            BlockKind::Toggle {
                summary,
                color: Color::Default,
            },
        )
    }

    pub fn quote(id: impl Into<String>, text: Vec<TextSpan>) -> Self {
        Self::new(
            id,
            BlockKind::Quote {
                text,
                color: Color::Default,
            },
        )
    }
}

/// A date or date range property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: String,
    pub end: Option<String>,
}

/// A typed page property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Select(Option<String>),
    MultiSelect(Vec<String>),
    Date(Option<DateRange>),
    Checkbox(bool),
    Number(Option<f64>),
    Relation(Vec<String>),
    /// A property type this converter does not map
    Unsupported { raw_type: String },
}

/// Page properties in source insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageProperties {
    entries: Vec<(String, PropertyValue)>,
}

impl PageProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a property, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Plain text of a text-like property (`Text` or `Select`).
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::Text(text) => Some(text),
            PropertyValue::Select(Some(option)) => Some(option),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, PropertyValue)> for PageProperties {
    fn from_iter<I: IntoIterator<Item = (K, PropertyValue)>>(iter: I) -> Self {
        let mut properties = Self::new();
        for (name, value) in iter {
            properties.insert(name, value);
        }
        properties
    }
}

/// A fully materialized page: properties plus content tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub id: String,
    pub properties: PageProperties,
    pub blocks: Vec<Block>,
}
