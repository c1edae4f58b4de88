use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub frontmatter: FrontmatterConfig,
    pub output: OutputConfig,
}

/// Output dialect of the rendered body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Plain Markdown; containers fall back to blockquotes and links
    Markdown,
    /// MDX with JSX components for media, callouts and embeds
    #[default]
    Mdx,
}

/// How toggle blocks are emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleStyle {
    /// `<details>` / `<summary>` disclosure markup
    #[default]
    Details,
    /// A bold summary line followed by the content, unwrapped
    Flatten,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub flavor: Flavor,
    pub indent_width: usize,
    pub toggle: ToggleStyle,
    /// Wrap colored text in `<Span color>` (MDX only)
    pub colors: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            flavor: Flavor::default(),
            indent_width: 2,
            toggle: ToggleStyle::default(),
            colors: false,
        }
    }
}

/// What to do with properties that have no value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyPolicy {
    #[default]
    Omit,
    Explicit,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FrontmatterConfig {
    /// Properties to emit, in order. Empty means all, in source order.
    pub fields: Vec<String>,
    pub empty: EmptyPolicy,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub extension: String,
    pub slug_property: String,
    pub title_property: String,
    pub status_property: String,
    /// Only pages whose status equals this are written
    pub publish_status: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: "mdx".to_string(),
            slug_property: "Slug".to_string(),
            title_property: "Name".to_string(),
            status_property: "Status".to_string(),
            publish_status: None,
        }
    }
}

impl Config {
    /// The bundled `default_config.toml`.
    ///
    /// The file is validated by the build script, so a parse failure here can
    /// only mean a schema mismatch; fall back to the struct defaults.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            tracing::error!("bundled default config does not match schema: {e}");
            Self::default()
        })
    }

    /// Load config from a TOML file, or return the compiled default if not found.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::compiled_default());
            }
            Err(e) => return Err(Error::io(path, e)),
        };
        toml::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
