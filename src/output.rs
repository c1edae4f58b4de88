use std::fs;
use std::path::{Path, PathBuf};

use crate::block::PageProperties;
use crate::config::OutputConfig;
use crate::error::{Error, Result};

/// Reduce a title to a file-name stem: lowercase, dash-separated, only
/// alphanumerics, `-` and `_`.
pub fn sanitize_filename(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    for c in title.trim().chars().flat_map(char::to_lowercase) {
        let c = if c.is_whitespace() { '-' } else { c };
        if c == '-' {
            if !stem.is_empty() && !stem.ends_with('-') {
                stem.push('-');
            }
        } else if c.is_alphanumeric() || c == '_' {
            stem.push(c);
        }
    }

    let stem = stem.trim_end_matches('-');
    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem.to_string()
    }
}

/// File name for a page: its slug if set, else its sanitized title.
pub fn output_file_name(properties: &PageProperties, config: &OutputConfig) -> String {
    let stem = properties
        .text(&config.slug_property)
        .filter(|slug| !slug.trim().is_empty())
        .or_else(|| properties.text(&config.title_property))
        .map(sanitize_filename)
        .unwrap_or_else(|| "untitled".to_string());

    if config.extension.is_empty() {
        stem
    } else {
        format!("{stem}.{}", config.extension)
    }
}

/// Whether a page passes the configured publish-status filter.
pub fn is_published(properties: &PageProperties, config: &OutputConfig) -> bool {
    match &config.publish_status {
        Some(wanted) => properties.text(&config.status_property) == Some(wanted.as_str()),
        None => true,
    }
}

/// Write rendered text into `dir`, creating it if needed.
pub fn write_page(dir: &Path, file_name: &str, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let path = dir.join(file_name);
    fs::write(&path, text).map_err(|e| Error::io(&path, e))?;
    tracing::debug!("wrote {}", path.display());
    Ok(path)
}
