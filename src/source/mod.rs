//! The scanning-service collaborator.
//!
//! The aggregation engine talks to Code Dx only through [`FindingSource`].
//! [`CodeDxClient`] is the HTTP implementation used by the binary.

pub mod codedx;
pub mod query;

#[cfg(test)]
pub mod fake;

pub use codedx::CodeDxClient;
pub use query::{FindingQuery, GroupedCountFilter};

use crate::error::Result;
use crate::models::{LanguageMetrics, TaxonomyNode, ToolMetadata};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A standard (filter view) available on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Standard {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "countBy")]
    pub count_by: String,
}

/// A finding as returned by the finding table endpoint.
///
/// Every sub-object is optional; normalization fills in defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFinding {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub descriptor: Option<RawDescriptor>,
    #[serde(default)]
    pub location: Option<RawLocation>,
    #[serde(default)]
    pub results: Vec<RawResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDescriptor {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLocation {
    #[serde(default)]
    pub path: Option<RawPath>,
    #[serde(default)]
    pub lines: Option<RawLines>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPath {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub short_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLines {
    #[serde(default)]
    pub start: Option<u64>,
}

/// One tool result attached to a finding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawResult {
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub metadata: Option<ToolMetadata>,
}

/// Queries the aggregation engine needs from the scanning service.
///
/// Calls are awaited one at a time; implementations need no internal
/// synchronization beyond what `&self` caching requires.
#[async_trait]
pub trait FindingSource: Send + Sync {
    /// Standards (filter views) available on the server.
    async fn standards(&self) -> Result<Vec<Standard>>;

    /// Grouped taxonomy of open findings.
    async fn grouped_counts(
        &self,
        project_id: u64,
        filter: &GroupedCountFilter,
    ) -> Result<Vec<TaxonomyNode>>;

    /// One page of findings matching a filter.
    async fn finding_table(&self, project_id: u64, query: &FindingQuery)
        -> Result<Vec<RawFinding>>;

    /// Up to `count` lines either side of `line` in a source file.
    async fn file_lines(
        &self,
        project_id: u64,
        file_id: u64,
        line: u64,
        count: usize,
    ) -> Result<Option<String>>;

    /// Per-language code metrics for the latest analysis.
    async fn code_metrics(&self, project_id: u64) -> Result<BTreeMap<String, LanguageMetrics>>;
}
