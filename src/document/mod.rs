//! XSL-FO document assembly.
//!
//! Templates are XSL-FO documents (or JSON-encoded [`Element`] trees)
//! containing anchor elements;
//! the [`DocumentAssembler`] replaces each anchor with generated content and
//! the result is written out as XML for an FO processor.

pub mod assembler;
pub mod content;
pub mod element;
pub mod generators;

pub use assembler::DocumentAssembler;
pub use element::Element;
pub use generators::RunContext;

use crate::error::Result;
use std::path::Path;

/// Load a template. Files ending in `.json` hold a serialized [`Element`]
/// tree; anything else is read as XML.
pub fn load_template(path: &Path) -> Result<Element> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(serde_json::from_str(&content)?),
        _ => Element::from_xml(&content),
    }
}

/// Write an assembled document as XML.
pub fn write_document(root: &Element, path: &Path) -> Result<()> {
    std::fs::write(path, root.to_xml())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::ToolDescriptions;
    use crate::document::content::ContentKind;
    use crate::models::{
        Aggregation, FilterDescriptor, Finding, Location, StandardSelection, TierFindings,
        TierSource, ToolMetadata, ToolReference, ToolTally, ToolTallyEntry,
    };
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const TEMPLATE: &str = r#"{
        "name": "fo:root",
        "attributes": { "xmlns:fo": "http://www.w3.org/1999/XSL/Format" },
        "children": [
            { "name": "fo:page-sequence", "children": [
                { "name": "fo:flow", "children": [
                    { "name": "CodeDx", "attributes": { "content": "ProjectName" } },
                    { "name": "CodeDx", "attributes": { "content": "TotalFindings" } }
                ] }
            ] }
        ]
    }"#;

    #[test]
    fn test_load_assemble_write() {
        let dir = TempDir::new().unwrap();
        let template_path = dir.path().join("template.json");
        let output_path = dir.path().join("report.fo");
        std::fs::write(&template_path, TEMPLATE).unwrap();

        let mut root = load_template(&template_path).unwrap();
        let aggregation = Aggregation {
            standard: StandardSelection::default(),
            cat1: TierFindings::absent(),
            cat2: TierFindings::absent(),
            cat3: TierFindings::absent(),
            tools: ToolTally::new(),
        };
        let run = RunContext {
            project_name: "Bench & Co".to_string(),
            report_date: "01-Jan-2024".to_string(),
            tool_descriptions: ToolDescriptions::default(),
            language_metrics: BTreeMap::new(),
        };

        DocumentAssembler::default()
            .assemble(&mut root, &aggregation, &run)
            .unwrap();
        write_document(&root, &output_path).unwrap();

        let xml = std::fs::read_to_string(&output_path).unwrap();
        assert!(xml.starts_with("<?xml version='1.0' encoding='utf-8'?>"));
        assert!(xml.contains("xmlns:fo=\"http://www.w3.org/1999/XSL/Format\""));
        assert!(xml.contains("<fo:block>Project Name: Bench &amp; Co</fo:block><fo:block>0</fo:block>"));
        assert!(!xml.contains("CodeDx"));
    }

    #[test]
    fn test_load_xml_template() {
        let dir = TempDir::new().unwrap();
        let sample: Element =
            serde_json::from_str(include_str!("../../fixtures/template.json")).unwrap();

        let xml_path = dir.path().join("template.fo");
        std::fs::write(&xml_path, sample.to_xml()).unwrap();

        let loaded = load_template(&xml_path).unwrap();
        assert_eq!(loaded, sample);
        assert_eq!(
            loaded.descendants_named("CodeDx").len(),
            ContentKind::ALL.len()
        );
    }

    #[test]
    fn test_load_template_errors() {
        let dir = TempDir::new().unwrap();
        assert!(load_template(&dir.path().join("missing.json")).is_err());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "<fo:root/>").unwrap();
        assert!(load_template(&bad).is_err());

        let bad = dir.path().join("bad.xml");
        std::fs::write(&bad, "<fo:root><fo:flow></fo:root>").unwrap();
        assert!(load_template(&bad).is_err());
    }

    #[test]
    fn test_sample_template_fills_every_anchor() {
        let mut root: Element =
            serde_json::from_str(include_str!("../../fixtures/template.json")).unwrap();
        assert_eq!(root.descendants_named("CodeDx").len(), ContentKind::ALL.len());

        let finding = Finding {
            id: 17,
            location: Location {
                path: "src/Login.java".to_string(),
                file: "Login.java".to_string(),
                line: "42".to_string(),
            },
            file_id: Some(3),
            error: "SQL Injection".to_string(),
            tools: vec![ToolReference {
                name: "Semgrep".to_string(),
                metadata: ToolMetadata::new(),
            }],
            code: None,
        };
        let descriptor = FilterDescriptor {
            name: "APSC-DV-002540".to_string(),
            description: "The application must not be vulnerable to SQL Injection.".to_string(),
            filter_id: "standard-node:12".to_string(),
            origin_count: 1,
            findings: vec![finding],
        };
        let mut tools = ToolTally::new();
        tools.insert("Semgrep".to_string(), ToolTallyEntry { count: 1 });
        let aggregation = Aggregation {
            standard: StandardSelection {
                name: "DISA STIG 5.2".to_string(),
                version: "5.2".to_string(),
                count_by: "standard:9".to_string(),
            },
            cat1: TierFindings {
                category: [(descriptor.name.clone(), descriptor)].into_iter().collect(),
                total: 1,
                source: TierSource::Reported,
            },
            cat2: TierFindings::absent(),
            cat3: TierFindings::absent(),
            tools,
        };
        let run = RunContext {
            project_name: "WebGoat".to_string(),
            report_date: "07-Mar-2024".to_string(),
            tool_descriptions: ToolDescriptions::default(),
            language_metrics: BTreeMap::new(),
        };

        let stats = DocumentAssembler::default()
            .assemble(&mut root, &aggregation, &run)
            .unwrap();

        assert_eq!(stats.anchors, ContentKind::ALL.len());
        assert_eq!(stats.by_kind.len(), ContentKind::ALL.len());
        assert!(root.descendants_named("CodeDx").is_empty());

        let xml = root.to_xml();
        assert!(xml.contains("APSC-DV-002540"));
        assert!(xml.contains("src/Login.java:42"));
        assert!(xml.contains("Semgrep"));
    }
}
