//! In-memory [`FindingSource`] for tests.

use super::{FindingQuery, FindingSource, GroupedCountFilter, RawFinding, Standard};
use crate::error::{ReportError, Result};
use crate::models::{LanguageMetrics, TaxonomyNode};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeSource {
    pub standards: Vec<Standard>,
    pub taxonomy: Vec<TaxonomyNode>,
    /// Findings keyed by filter id.
    pub findings: HashMap<String, Vec<RawFinding>>,
    /// File contents keyed by file id.
    pub files: HashMap<u64, String>,
    pub metrics: BTreeMap<String, LanguageMetrics>,
    /// Filter ids whose queries fail with a transport error.
    pub failing_filters: Vec<String>,
    pub queries: Mutex<Vec<FindingQuery>>,
    pub grouped_requests: Mutex<Vec<GroupedCountFilter>>,
}

impl FakeSource {
    pub fn with_findings(mut self, filter_id: &str, findings: Vec<RawFinding>) -> Self {
        self.findings.insert(filter_id.to_string(), findings);
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl FindingSource for FakeSource {
    async fn standards(&self) -> Result<Vec<Standard>> {
        Ok(self.standards.clone())
    }

    async fn grouped_counts(
        &self,
        _project_id: u64,
        filter: &GroupedCountFilter,
    ) -> Result<Vec<TaxonomyNode>> {
        self.grouped_requests.lock().unwrap().push(filter.clone());
        Ok(self.taxonomy.clone())
    }

    async fn finding_table(
        &self,
        _project_id: u64,
        query: &FindingQuery,
    ) -> Result<Vec<RawFinding>> {
        self.queries.lock().unwrap().push(query.clone());
        let filter_id = query.filter_id().unwrap_or_default();
        if self.failing_filters.iter().any(|f| f == filter_id) {
            return Err(ReportError::Source(format!("connection reset ({})", filter_id)));
        }
        Ok(self.findings.get(filter_id).cloned().unwrap_or_default())
    }

    async fn file_lines(
        &self,
        _project_id: u64,
        file_id: u64,
        line: u64,
        count: usize,
    ) -> Result<Option<String>> {
        Ok(self
            .files
            .get(&file_id)
            .map(|content| super::codedx::slice_lines(content, line, count)))
    }

    async fn code_metrics(&self, _project_id: u64) -> Result<BTreeMap<String, LanguageMetrics>> {
        Ok(self.metrics.clone())
    }
}
