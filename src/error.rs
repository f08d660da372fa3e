//! Error types for aggregation and document assembly.

use thiserror::Error;

/// Errors raised by the aggregation engine and the document assembler.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Two taxonomy leaves normalized to the same category name under the
    /// `reject` collision policy.
    #[error("Duplicate category '{name}' (filters {first} and {second})")]
    DuplicateCategory {
        name: String,
        first: String,
        second: String,
    },

    /// A template anchor named a content key with no generator.
    #[error("Unknown template content key: {0}")]
    UnknownContent(String),

    /// A template anchor had no `content` attribute at all.
    #[error("Template anchor has no content attribute: {0}")]
    MissingContent(String),

    /// The scanning service could not be reached or returned garbage.
    #[error("Code Dx error: {0}")]
    Source(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A template could not be read as XML.
    #[error("Template error: {0}")]
    Template(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
