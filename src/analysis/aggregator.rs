//! Tool tallies and per-category statistics.
//!
//! This module provides utilities for counting findings per detecting tool
//! across categories and for summarising collected categories.

use crate::models::{Category, FilterDescriptor, ToolTally, ToolTallyEntry};
use std::collections::BTreeMap;

/// Text used for tools missing from the description table.
pub const UNKNOWN_TOOL_DESCRIPTION: &str = "No tool description available";

const DEFAULT_TOOL_DESCRIPTIONS: [(&str, &str); 13] = [
    ("Fortify", "Commercial static analysis tool"),
    ("SpotBugs", "Open Source static analysis tool"),
    ("AppScan Source", "Commercial static analysis tool"),
    ("Veracode", "Commercial static analysis tool"),
    ("Checkmarx", "Commercial static analysis tool"),
    ("PMD", "Open Source static analysis tool"),
    ("Nessus", "Commercial network analysis tool"),
    ("Burp Suite", "Commercial dynamic analysis tool"),
    ("ZAP", "Open Source dynamic analysis tool"),
    ("PHP_CodeSniffer", "Open Source static analysis tool"),
    ("Retireljs", "Open Source static analysis tool"),
    ("ESLint", "Open Source static analysis tool"),
    ("Arachni", "Commercial dynamic analysis tool"),
];

/// Read-only table of tool descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptions {
    table: BTreeMap<String, String>,
}

impl Default for ToolDescriptions {
    fn default() -> Self {
        Self {
            table: DEFAULT_TOOL_DESCRIPTIONS
                .iter()
                .map(|(tool, text)| (tool.to_string(), text.to_string()))
                .collect(),
        }
    }
}

impl ToolDescriptions {
    /// Built-in table with `overrides` layered on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut descriptions = Self::default();
        for (tool, text) in overrides {
            descriptions.table.insert(tool.clone(), text.clone());
        }
        descriptions
    }

    /// Description for `tool`, or the fallback text.
    pub fn describe(&self, tool: &str) -> &str {
        self.table
            .get(tool)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_TOOL_DESCRIPTION)
    }
}

/// Count findings per detecting tool across `categories`.
///
/// A finding reported by several tools counts once for each of them.
pub fn tally<'a, I>(categories: I) -> ToolTally
where
    I: IntoIterator<Item = &'a Category>,
{
    let mut tools = ToolTally::new();

    for category in categories {
        for descriptor in category.values() {
            for finding in &descriptor.findings {
                for tool in &finding.tools {
                    tools
                        .entry(tool.name.clone())
                        .or_insert(ToolTallyEntry { count: 0 })
                        .count += 1;
                }
            }
        }
    }

    tools
}

/// Tally entries sorted by tool name.
pub fn tools_by_name(tools: &ToolTally) -> Vec<(&str, usize)> {
    let mut sorted: Vec<_> = tools
        .iter()
        .map(|(name, entry)| (name.as_str(), entry.count))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
}

/// Identify the top N tools by finding count.
pub fn top_tools(tools: &ToolTally, n: usize) -> Vec<(&str, usize)> {
    let mut sorted = tools_by_name(tools);
    sorted.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    sorted.truncate(n);
    sorted
}

/// Descriptors that have at least one finding, most findings first.
pub fn failing_filters(category: &Category) -> Vec<&FilterDescriptor> {
    let mut failing: Vec<_> = category.values().filter(|d| !d.passed()).collect();
    failing.sort_by_key(|d| std::cmp::Reverse(d.findings.len()));
    failing
}

/// Descriptors whose collected count differs from the taxonomy count.
pub fn count_mismatches(category: &Category) -> Vec<(&str, u64, usize)> {
    category
        .values()
        .filter(|d| d.origin_count != d.findings.len() as u64)
        .map(|d| (d.name.as_str(), d.origin_count, d.findings.len()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Finding, Location, ToolReference};

    fn finding(id: u64, tools: &[&str]) -> Finding {
        Finding {
            id,
            location: Location::default(),
            file_id: None,
            error: "Test error".to_string(),
            tools: tools
                .iter()
                .map(|t| ToolReference {
                    name: t.to_string(),
                    metadata: crate::models::ToolMetadata::new(),
                })
                .collect(),
            code: None,
        }
    }

    fn descriptor(name: &str, origin_count: u64, findings: Vec<Finding>) -> FilterDescriptor {
        FilterDescriptor {
            name: name.to_string(),
            description: "Test requirement".to_string(),
            filter_id: format!("standard-node:{}", name),
            origin_count,
            findings,
        }
    }

    fn category(descriptors: Vec<FilterDescriptor>) -> Category {
        descriptors
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect()
    }

    #[test]
    fn test_tally_is_additive() {
        let cat = category(vec![descriptor(
            "S-1",
            2,
            vec![finding(1, &["A", "B"]), finding(2, &["A"])],
        )]);

        let tools = tally([&cat]);

        assert_eq!(tools.len(), 2);
        assert_eq!(tools["A"].count, 2);
        assert_eq!(tools["B"].count, 1);
    }

    #[test]
    fn test_tally_across_tiers() {
        let cat1 = category(vec![descriptor("S-1", 1, vec![finding(1, &["Fortify"])])]);
        let cat2 = Category::new();
        let cat3 = category(vec![descriptor("S-9", 1, vec![finding(2, &["Fortify"])])]);

        let tools = tally([&cat1, &cat2, &cat3]);

        assert_eq!(tools.len(), 1);
        assert_eq!(tools["Fortify"].count, 2);
    }

    #[test]
    fn test_tally_empty() {
        let cat = category(vec![descriptor("S-1", 0, Vec::new())]);
        assert!(tally([&cat]).is_empty());
    }

    #[test]
    fn test_tool_descriptions() {
        let descriptions = ToolDescriptions::default();
        assert_eq!(descriptions.describe("ZAP"), "Open Source dynamic analysis tool");
        assert_eq!(descriptions.describe("Semgrep"), UNKNOWN_TOOL_DESCRIPTION);

        let mut overrides = BTreeMap::new();
        overrides.insert("Semgrep".to_string(), "Open Source static analysis tool".to_string());
        overrides.insert("ZAP".to_string(), "OWASP dynamic scanner".to_string());
        let descriptions = ToolDescriptions::with_overrides(&overrides);

        assert_eq!(descriptions.describe("Semgrep"), "Open Source static analysis tool");
        assert_eq!(descriptions.describe("ZAP"), "OWASP dynamic scanner");
        assert_eq!(descriptions.describe("Fortify"), "Commercial static analysis tool");
    }

    #[test]
    fn test_tools_sorting() {
        let mut tools = ToolTally::new();
        tools.insert("PMD".to_string(), ToolTallyEntry { count: 1 });
        tools.insert("Fortify".to_string(), ToolTallyEntry { count: 7 });
        tools.insert("ESLint".to_string(), ToolTallyEntry { count: 3 });

        assert_eq!(
            tools_by_name(&tools),
            vec![("ESLint", 3), ("Fortify", 7), ("PMD", 1)]
        );
        assert_eq!(top_tools(&tools, 2), vec![("Fortify", 7), ("ESLint", 3)]);
    }

    #[test]
    fn test_failing_filters_and_mismatches() {
        let cat = category(vec![
            descriptor("S-1", 0, Vec::new()),
            descriptor("S-2", 1, vec![finding(1, &["PMD"])]),
            descriptor("S-3", 5, vec![finding(2, &["PMD"]), finding(3, &["PMD"])]),
        ]);

        let failing = failing_filters(&cat);
        assert_eq!(failing.len(), 2);
        assert_eq!(failing[0].name, "S-3");

        assert_eq!(count_mismatches(&cat), vec![("S-3", 5, 2)]);
    }
}
