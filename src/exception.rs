// exception.rs -- Error types for package provenance reporting

use thiserror::Error;

/// Structural failures surfaced to the caller. Data-quality problems
/// (empty herd elements, maintainers without an email) are not errors;
/// they are carried as markers inside the parsed descriptor so a report
/// can still be produced.
#[derive(Debug, Error)]
pub enum ProvenanceError {
    /// An expected input document is absent (ChangeLog, metadata.xml,
    /// herds.xml, or the package itself in the tree).
    #[error("not found: {0}")]
    NotFound(String),

    /// An input document exists but cannot be parsed as well-formed
    /// structured data.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvenanceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ProvenanceError::NotFound(what.into())
    }

    pub fn malformed(what: impl Into<String>) -> Self {
        ProvenanceError::MalformedDocument(what.into())
    }
}
