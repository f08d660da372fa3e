//! Builds the complete [`Aggregation`] for one project.
//!
//! Standard selection, taxonomy retrieval, per-tier flattening and
//! collection, then one tool tally over all tiers.

use super::aggregator::{count_mismatches, tally};
use super::collector::{CollectorOptions, FindingsCollector};
use crate::error::Result;
use crate::models::{Aggregation, StandardSelection, TaxonomyNode, Tier, TierFindings, TierSource};
use crate::source::{FindingSource, GroupedCountFilter, Standard};
use crate::taxonomy::{flatten, tier_subtrees, CollisionPolicy};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Standard family selected when none is configured.
pub const DEFAULT_STANDARD_FAMILY: &str = "DISA STIG";

/// How standard versions are compared when picking the newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrdering {
    /// Plain string comparison (`"9.1"` sorts above `"10.1"`).
    #[default]
    Lexicographic,
    /// Dotted components compared as integers.
    Numeric,
}

impl VersionOrdering {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            VersionOrdering::Lexicographic => a.cmp(b),
            VersionOrdering::Numeric => numeric_components(a).cmp(&numeric_components(b)),
        }
    }
}

fn numeric_components(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

static VERSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+\.[0-9]+").expect("Invalid version regex"));

/// First `major.minor` version found in a standard name.
pub fn extract_version(name: &str) -> Option<&str> {
    VERSION_REGEX.find(name).map(|m| m.as_str())
}

/// Pick the newest standard whose name contains `family`.
///
/// Returns an empty selection when nothing matches.
pub fn select_standard(
    standards: &[Standard],
    family: &str,
    ordering: VersionOrdering,
) -> StandardSelection {
    let mut selection = StandardSelection::default();

    for standard in standards.iter().filter(|s| s.name.contains(family)) {
        let Some(version) = extract_version(&standard.name) else {
            warn!("Skipping standard without a version: {}", standard.name);
            continue;
        };

        if !selection.is_selected()
            || ordering.compare(version, &selection.version) == Ordering::Greater
        {
            selection = StandardSelection {
                name: standard.name.clone(),
                version: version.to_string(),
                count_by: standard.count_by.clone(),
            };
        }
    }

    if selection.is_selected() {
        info!("Selected standard {} (version {})", selection.name, selection.version);
    } else {
        warn!("No {} standard available on the server", family);
    }

    selection
}

/// Options for [`AggregationBuilder`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub standard_family: String,
    pub version_ordering: VersionOrdering,
    pub collision_policy: CollisionPolicy,
    pub collector: CollectorOptions,
    /// Draw a progress bar over category collection.
    pub show_progress: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            standard_family: DEFAULT_STANDARD_FAMILY.to_string(),
            version_ordering: VersionOrdering::default(),
            collision_policy: CollisionPolicy::default(),
            collector: CollectorOptions::default(),
            show_progress: false,
        }
    }
}

/// Orchestrates selection, flattening, collection and tallying.
pub struct AggregationBuilder<'a, S: FindingSource + ?Sized> {
    source: &'a S,
    project_id: u64,
    options: BuildOptions,
}

impl<'a, S: FindingSource + ?Sized> AggregationBuilder<'a, S> {
    pub fn new(source: &'a S, project_id: u64, options: BuildOptions) -> Self {
        Self {
            source,
            project_id,
            options,
        }
    }

    /// Run every query and produce the aggregation.
    pub async fn build(&self) -> Result<Aggregation> {
        let standards = self.source.standards().await?;
        debug!("Server offers {} standards", standards.len());

        let standard = select_standard(
            &standards,
            &self.options.standard_family,
            self.options.version_ordering,
        );

        let filter = GroupedCountFilter::for_standard(&standard.count_by);
        let taxonomy = self.source.grouped_counts(self.project_id, &filter).await?;
        let [cat1_tree, cat2_tree, cat3_tree] = tier_subtrees(&taxonomy);

        let mut cat1 = self.flatten_tier(Tier::CatI, cat1_tree)?;
        let mut cat2 = self.flatten_tier(Tier::CatII, cat2_tree)?;
        let mut cat3 = self.flatten_tier(Tier::CatIII, cat3_tree)?;

        let descriptor_count = cat1.category.len() + cat2.category.len() + cat3.category.len();
        let progress = self.progress_bar(descriptor_count as u64);
        let collector = FindingsCollector::new(self.source, self.project_id, self.options.collector)
            .with_progress(progress.clone());

        for (tier, findings) in [
            (Tier::CatI, &mut cat1),
            (Tier::CatII, &mut cat2),
            (Tier::CatIII, &mut cat3),
        ] {
            findings.total = collector.collect(&mut findings.category).await?;
            info!("{} total findings: {}", tier, findings.total);

            for (name, reported, collected) in count_mismatches(&findings.category) {
                debug!(
                    "{} {}: taxonomy reports {}, collected {}",
                    tier, name, reported, collected
                );
            }
        }
        progress.finish_and_clear();

        let tools = tally([&cat1.category, &cat2.category, &cat3.category]);
        debug!("Tallied {} tools", tools.len());

        Ok(Aggregation {
            standard,
            cat1,
            cat2,
            cat3,
            tools,
        })
    }

    fn flatten_tier(&self, tier: Tier, subtree: Option<&[TaxonomyNode]>) -> Result<TierFindings> {
        let Some(children) = subtree else {
            warn!("No {} data returned; reporting an empty category", tier);
            return Ok(TierFindings::absent());
        };

        let category = flatten(children, self.options.collision_policy)?;
        debug!("{}: {} STIG filters", tier, category.len());

        Ok(TierFindings {
            category,
            total: 0,
            source: TierSource::Reported,
        })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} STIGs ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let progress = ProgressBar::new(len);
        progress.set_style(style);
        progress
    }
}
