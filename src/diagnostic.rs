use thiserror::Error;

/// How serious a diagnostic is for the caller's publishing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A recoverable problem. The offending block or property is dropped and
/// rendering continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("block {block_id}: unsupported block type `{kind}`")]
    UnsupportedBlockKind { block_id: String, kind: String },

    #[error("block {block_id}: malformed block: {reason}")]
    MalformedBlock { block_id: String, reason: String },

    #[error("property `{name}`: {reason}")]
    MalformedProperty { name: String, reason: String },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnsupportedBlockKind { .. } => Severity::Warning,
            Self::MalformedBlock { .. } | Self::MalformedProperty { .. } => Severity::Error,
        }
    }
}

/// Ordered collection of diagnostics for one render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(severity = ?diagnostic.severity(), "{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn unsupported(&mut self, block_id: &str, kind: &str) {
        self.push(Diagnostic::UnsupportedBlockKind {
            block_id: block_id.to_string(),
            kind: kind.to_string(),
        });
    }

    pub fn malformed_block(&mut self, block_id: &str, reason: impl Into<String>) {
        self.push(Diagnostic::MalformedBlock {
            block_id: block_id.to_string(),
            reason: reason.into(),
        });
    }

    pub fn malformed_property(&mut self, name: &str, reason: impl Into<String>) {
        self.push(Diagnostic::MalformedProperty {
            name: name.to_string(),
            reason: reason.into(),
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// Whether any entry is at least `Severity::Error`.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity() >= Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
