//! Data models for the STIG report generator.
//!
//! This module contains the core data structures shared by the aggregation
//! engine and the document assembler: the taxonomy tree, flattened filter
//! descriptors, normalized findings, tool tallies and the final aggregation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// DISA STIG severity category. Declaration order runs from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// CAT I - most severe
    CatI,
    /// CAT II
    CatII,
    /// CAT III - least severe
    CatIII,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::CatI, Tier::CatII, Tier::CatIII];

    /// Label used by the taxonomy and in rendered headings.
    pub fn label(&self) -> &'static str {
        match self {
            Tier::CatI => "CAT I",
            Tier::CatII => "CAT II",
            Tier::CatIII => "CAT III",
        }
    }

    /// Position of the tier's subtree under the taxonomy root.
    pub fn index(&self) -> usize {
        match self {
            Tier::CatI => 0,
            Tier::CatII => 1,
            Tier::CatIII => 2,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One node of the grouped taxonomy returned by the scanning service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomyNode {
    /// Full node name, `"<FILTER-ID> <description>"` for leaves.
    #[serde(default)]
    pub name: String,
    /// Server-side filter identifier (e.g. `standard-node:3287`).
    #[serde(default)]
    pub id: String,
    /// Finding count reported by the server.
    #[serde(default)]
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TaxonomyNode>>,
}

impl TaxonomyNode {
    /// A node is a leaf when the server sent no `children` at all. An empty
    /// `children` list marks an empty group, not a filter.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Split `"<id> <rest>"` into the id and the description.
pub fn split_filter_name(full_name: &str) -> (&str, &str) {
    let trimmed = full_name.trim_start();
    match trimmed.find(char::is_whitespace) {
        Some(i) => (&trimmed[..i], trimmed[i..].trim_start()),
        None => (trimmed, ""),
    }
}

/// The flattened, queryable representation of one taxonomy leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    /// STIG identifier, e.g. `APSC-DV-000460`.
    pub name: String,
    /// Remainder of the node name.
    pub description: String,
    /// Server-side filter id used to query findings.
    pub filter_id: String,
    /// Count reported by the taxonomy; cross-check only.
    pub origin_count: u64,
    /// Findings attached by the collector.
    #[serde(default)]
    pub findings: Vec<Finding>,
}

impl FilterDescriptor {
    /// Derive a descriptor from a taxonomy leaf.
    pub fn from_leaf(node: &TaxonomyNode) -> Self {
        let (name, description) = split_filter_name(&node.name);
        Self {
            name: name.to_string(),
            description: description.to_string(),
            filter_id: node.id.clone(),
            origin_count: node.count,
            findings: Vec::new(),
        }
    }

    /// True when no findings were collected for this filter.
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Mapping from STIG name to its descriptor. Iteration is key-sorted.
pub type Category = BTreeMap<String, FilterDescriptor>;

/// Source location of a finding. Every field defaults to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub file: String,
    pub line: String,
}

impl Location {
    /// `path:line`, as rendered in finding detail tables.
    pub fn display(&self) -> String {
        format!("{}:{}", self.path, self.line)
    }
}

/// Tool metadata in the order the server sent it.
pub type ToolMetadata = serde_json::Map<String, serde_json::Value>;

/// A tool that reported a finding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolReference {
    pub name: String,
    #[serde(default)]
    pub metadata: ToolMetadata,
}

impl ToolReference {
    /// Vendor identifier rendered as `key : value` from the last metadata entry.
    pub fn vendor_id(&self) -> String {
        match self.metadata.iter().next_back() {
            Some((key, serde_json::Value::String(value))) => format!("{} : {}", key, value),
            Some((key, value)) => format!("{} : {}", key, value),
            None => " : ".to_string(),
        }
    }
}

/// One normalized finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Code Dx finding id.
    pub id: u64,
    pub location: Location,
    /// Server file id, used to fetch source context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<u64>,
    /// Name of the violated rule.
    pub error: String,
    pub tools: Vec<ToolReference>,
    /// Source lines around the finding, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Per-tool finding count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolTallyEntry {
    pub count: usize,
}

pub type ToolTally = HashMap<String, ToolTallyEntry>;

/// Whether the server returned a subtree for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierSource {
    /// The taxonomy contained the tier (possibly with zero findings).
    Reported,
    /// The taxonomy had no subtree for the tier.
    Absent,
}

/// Collected data for one severity tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierFindings {
    pub category: Category,
    /// Sum of findings across all descriptors. May double count findings
    /// that match several filters.
    pub total: usize,
    pub source: TierSource,
}

impl TierFindings {
    pub fn absent() -> Self {
        Self {
            category: Category::new(),
            total: 0,
            source: TierSource::Absent,
        }
    }
}

/// The standard selected for grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardSelection {
    pub name: String,
    pub version: String,
    pub count_by: String,
}

impl StandardSelection {
    pub fn is_selected(&self) -> bool {
        !self.name.is_empty()
    }
}

/// The complete aggregation consumed by the document layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub standard: StandardSelection,
    pub cat1: TierFindings,
    pub cat2: TierFindings,
    pub cat3: TierFindings,
    pub tools: ToolTally,
}

impl Aggregation {
    pub fn tier(&self, tier: Tier) -> &TierFindings {
        match tier {
            Tier::CatI => &self.cat1,
            Tier::CatII => &self.cat2,
            Tier::CatIII => &self.cat3,
        }
    }

    /// Sum of the three tier totals.
    pub fn total_findings(&self) -> usize {
        Tier::ALL.iter().map(|t| self.tier(*t).total).sum()
    }

    /// Sum of all tool tally counts.
    pub fn tool_findings_total(&self) -> usize {
        self.tools.values().map(|e| e.count).sum()
    }

    /// True when the given tier or any more severe tier has findings.
    pub fn has_findings_at_or_above(&self, threshold: Tier) -> bool {
        Tier::ALL
            .iter()
            .filter(|t| **t <= threshold)
            .any(|t| self.tier(*t).total > 0)
    }
}

/// Code metrics for one language, as reported by the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageMetrics {
    pub total_lines: u64,
    pub source_files: u64,
    pub findings: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier_with(total: usize) -> TierFindings {
        TierFindings {
            category: Category::new(),
            total,
            source: TierSource::Reported,
        }
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::CatI < Tier::CatII);
        assert!(Tier::CatII < Tier::CatIII);
        assert_eq!(Tier::CatIII.to_string(), "CAT III");
    }

    #[test]
    fn test_split_filter_name() {
        assert_eq!(
            split_filter_name("APSC-DV-000460 Foo bar"),
            ("APSC-DV-000460", "Foo bar")
        );
        assert_eq!(split_filter_name("APSC-DV-000460"), ("APSC-DV-000460", ""));
        assert_eq!(split_filter_name(""), ("", ""));
    }

    #[test]
    fn test_descriptor_from_leaf() {
        let node = TaxonomyNode {
            name: "APSC-DV-000460 Foo".to_string(),
            id: "standard-node:1".to_string(),
            count: 3,
            children: None,
        };
        let descriptor = FilterDescriptor::from_leaf(&node);
        assert_eq!(descriptor.name, "APSC-DV-000460");
        assert_eq!(descriptor.description, "Foo");
        assert_eq!(descriptor.filter_id, "standard-node:1");
        assert_eq!(descriptor.origin_count, 3);
        assert!(descriptor.passed());
    }

    #[test]
    fn test_taxonomy_node_defaults() {
        let node: TaxonomyNode = serde_json::from_str(r#"{"name": "CAT I"}"#).unwrap();
        assert_eq!(node.id, "");
        assert_eq!(node.count, 0);
        assert!(node.is_leaf());

        let node: TaxonomyNode =
            serde_json::from_str(r#"{"name": "CAT I", "children": []}"#).unwrap();
        assert!(!node.is_leaf());
    }

    #[test]
    fn test_vendor_id_uses_last_metadata_entry() {
        let mut tool = ToolReference {
            name: "Fortify".to_string(),
            metadata: ToolMetadata::new(),
        };
        assert_eq!(tool.vendor_id(), " : ");

        tool.metadata
            .insert("z-rule".to_string(), serde_json::json!(42));
        assert_eq!(tool.vendor_id(), "z-rule : 42");

        tool.metadata
            .insert("a-rule".to_string(), serde_json::json!("last"));
        assert_eq!(tool.vendor_id(), "a-rule : last");
    }

    #[test]
    fn test_aggregation_totals() {
        let mut tools = ToolTally::new();
        tools.insert("Fortify".to_string(), ToolTallyEntry { count: 2 });
        tools.insert("PMD".to_string(), ToolTallyEntry { count: 5 });

        let aggregation = Aggregation {
            standard: StandardSelection::default(),
            cat1: tier_with(0),
            cat2: tier_with(4),
            cat3: tier_with(1),
            tools,
        };

        assert_eq!(aggregation.total_findings(), 5);
        assert_eq!(aggregation.tool_findings_total(), 7);
        assert!(!aggregation.has_findings_at_or_above(Tier::CatI));
        assert!(aggregation.has_findings_at_or_above(Tier::CatII));
        assert!(aggregation.has_findings_at_or_above(Tier::CatIII));
    }
}
