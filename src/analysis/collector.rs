//! Finding collection per STIG filter.
//!
//! For every descriptor in a category this queries the open findings that
//! match its filter, normalizes them and attaches them to the descriptor.

use crate::error::Result;
use crate::models::{Category, Finding, Location, ToolReference};
use crate::source::query::DEFAULT_PAGE_SIZE;
use crate::source::{FindingQuery, FindingSource, RawFinding};
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

/// Knobs for the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorOptions {
    /// Findings requested per filter (single page).
    pub page_size: usize,
    /// Source lines fetched either side of each finding; 0 disables.
    pub context_lines: usize,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            context_lines: 0,
        }
    }
}

/// Normalize a raw finding, defaulting every missing sub-object.
pub fn normalize_finding(raw: &RawFinding) -> Finding {
    let path = raw.location.as_ref().and_then(|l| l.path.as_ref());
    let start_line = raw
        .location
        .as_ref()
        .and_then(|l| l.lines.as_ref())
        .and_then(|lines| lines.start);

    let location = Location {
        path: path.map(|p| p.path.clone()).unwrap_or_default(),
        file: path.map(|p| p.short_name.clone()).unwrap_or_default(),
        line: start_line.map(|l| l.to_string()).unwrap_or_default(),
    };

    let tools = raw
        .results
        .iter()
        .map(|result| ToolReference {
            name: result.tool.clone(),
            metadata: result.metadata.clone().unwrap_or_default(),
        })
        .collect();

    Finding {
        id: raw.id,
        location,
        file_id: path.and_then(|p| p.id),
        error: raw
            .descriptor
            .as_ref()
            .map(|d| d.name.clone())
            .unwrap_or_default(),
        tools,
        code: None,
    }
}

/// Collects findings for every descriptor of a category.
pub struct FindingsCollector<'a, S: FindingSource + ?Sized> {
    source: &'a S,
    project_id: u64,
    options: CollectorOptions,
    progress: ProgressBar,
}

impl<'a, S: FindingSource + ?Sized> FindingsCollector<'a, S> {
    pub fn new(source: &'a S, project_id: u64, options: CollectorOptions) -> Self {
        Self {
            source,
            project_id,
            options,
            progress: ProgressBar::hidden(),
        }
    }

    /// Advance `progress` by one for every collected descriptor.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Attach findings to every descriptor and return the category total.
    ///
    /// The total is the sum of the attached finding lists; a finding that
    /// matches several filters is counted once per filter.
    pub async fn collect(&self, category: &mut Category) -> Result<usize> {
        let mut total = 0;

        for descriptor in category.values_mut() {
            let query = FindingQuery::for_filter(&descriptor.filter_id, self.options.page_size);
            let raw = self.source.finding_table(self.project_id, &query).await?;

            if raw.len() >= self.options.page_size {
                warn!(
                    "{} returned a full page ({} findings); later pages are not collected",
                    descriptor.name,
                    raw.len()
                );
            }

            let mut findings: Vec<Finding> = raw.iter().map(normalize_finding).collect();
            if self.options.context_lines > 0 {
                self.attach_code(&mut findings).await?;
            }

            info!(
                "{} - records = {} and fcount = {}",
                descriptor.name,
                findings.len(),
                descriptor.origin_count
            );

            total += findings.len();
            descriptor.findings = findings;
            self.progress.inc(1);
        }

        Ok(total)
    }

    async fn attach_code(&self, findings: &mut [Finding]) -> Result<()> {
        for finding in findings.iter_mut() {
            let (Some(file_id), Ok(line)) = (finding.file_id, finding.location.line.parse::<u64>())
            else {
                continue;
            };

            finding.code = self
                .source
                .file_lines(self.project_id, file_id, line, self.options.context_lines)
                .await?;
            if finding.code.is_none() {
                debug!("No source context for finding {}", finding.id);
            }
        }
        Ok(())
    }
}
