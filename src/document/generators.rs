//! Content generators for template anchors.
//!
//! Each generator builds the XSL-FO elements that replace one anchor. The
//! generators are pure: they read the aggregation and run metadata and
//! return new elements; splicing is left to the assembler.

use super::content::ContentKind;
use super::element::Element;
use crate::analysis::aggregator::{tools_by_name, ToolDescriptions};
use crate::models::{Aggregation, Category, FilterDescriptor, Finding, LanguageMetrics, Tier};
use chrono::Local;
use std::collections::BTreeMap;

/// Date format used for the "Project Date" line, e.g. `07-Mar-2024`.
pub const REPORT_DATE_FORMAT: &str = "%d-%b-%Y";

const HEADING_COLOR: &str = "LightSkyBlue";
const BORDERED: [(&str, &str); 2] = [("border-width", "thin"), ("border-style", "solid")];

/// Metadata about the current run, independent of the findings.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub project_name: String,
    pub report_date: String,
    pub tool_descriptions: ToolDescriptions,
    pub language_metrics: BTreeMap<String, LanguageMetrics>,
}

impl RunContext {
    /// Context dated today (local time).
    pub fn new(
        project_name: impl Into<String>,
        tool_descriptions: ToolDescriptions,
        language_metrics: BTreeMap<String, LanguageMetrics>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            report_date: Local::now().format(REPORT_DATE_FORMAT).to_string(),
            tool_descriptions,
            language_metrics,
        }
    }
}

/// Everything a generator may read.
pub struct GenerationContext<'a> {
    /// Element that contained the anchor.
    pub parent: &'a Element,
    pub aggregation: &'a Aggregation,
    pub run: &'a RunContext,
}

/// Produces the elements that replace one anchor.
pub trait Generator {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element>;
}

/// The generator registered for a content key.
pub fn generator_for(kind: ContentKind) -> &'static dyn Generator {
    match kind {
        ContentKind::TocStigVersion => &TocStigVersion,
        ContentKind::ReportDate => &ReportDate,
        ContentKind::ProjectName => &ProjectName,
        ContentKind::DisaStigVersion => &DisaStigVersion,
        ContentKind::CatCells => &CatCells,
        ContentKind::FindingCountsByStig => &FindingCountsByStig,
        ContentKind::CatIStigCounts => &StigCounts(Tier::CatI),
        ContentKind::CatIIStigCounts => &StigCounts(Tier::CatII),
        ContentKind::CatIIIStigCounts => &StigCounts(Tier::CatIII),
        ContentKind::ToolFindings => &ToolFindings,
        ContentKind::ToolTotalFindings => &ToolTotalFindings,
        ContentKind::TocDetails => &TocDetails,
        ContentKind::FormatFindingDetail => &FindingDetail,
        ContentKind::Languages => &Languages,
        ContentKind::TotalFindings => &TotalFindings,
    }
}

fn block(text: impl Into<String>) -> Element {
    Element::new("fo:block").with_text(text)
}

fn cell(attrs: &[(&str, &str)], text: impl Into<String>) -> Element {
    Element::new("fo:table-cell")
        .with_attrs(attrs)
        .with_child(block(text))
}

fn bordered_cell(text: impl Into<String>) -> Element {
    cell(&BORDERED, text)
}

fn row(cells: impl IntoIterator<Item = Element>) -> Element {
    Element::new("fo:table-row").with_children(cells)
}

fn dot_leader() -> Element {
    Element::new("fo:leader").with_attrs(&[
        ("leader-pattern", "dots"),
        ("leader-alignment", "reference-area"),
    ])
}

fn tiers<'a>(aggregation: &'a Aggregation) -> impl Iterator<Item = (Tier, &'a Category)> {
    Tier::ALL
        .into_iter()
        .map(move |tier| (tier, &aggregation.tier(tier).category))
}

/// Table of contents entry for the finding counts section.
pub struct TocStigVersion;

impl Generator for TocStigVersion {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        let entry = block(format!(
            "Finding Counts by ASD STIG Version {}",
            ctx.aggregation.standard.version
        ))
        .with_attrs(&[
            ("text-align", "start"),
            ("text-align-last", "justify"),
            ("font-size", "11pt"),
        ])
        .with_child(dot_leader());
        vec![entry]
    }
}

pub struct ReportDate;

impl Generator for ReportDate {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        vec![block(format!("Project Date: {}", ctx.run.report_date))]
    }
}

pub struct ProjectName;

impl Generator for ProjectName {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        vec![block(format!("Project Name: {}", ctx.run.project_name))]
    }
}

pub struct DisaStigVersion;

impl Generator for DisaStigVersion {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        vec![block(format!(
            "DISA ASD STIG Version {}",
            ctx.aggregation.standard.version
        ))]
    }
}

/// One executive summary cell per tier total.
pub struct CatCells;

impl Generator for CatCells {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        Tier::ALL
            .iter()
            .map(|tier| bordered_cell(ctx.aggregation.tier(*tier).total.to_string()))
            .collect()
    }
}

/// Section heading that starts the finding counts pages.
pub struct FindingCountsByStig;

impl Generator for FindingCountsByStig {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        let heading = block(format!(
            "Finding Counts by ASD STIG Version {}",
            ctx.aggregation.standard.version
        ))
        .with_attrs(&[
            ("id", "finding-counts-by-stig"),
            ("space-before", "15pt"),
            ("font-size", "24pt"),
            ("font-family", "sans-serif"),
            ("space-after.optimum", "15pt"),
            ("color", "white"),
            ("background-color", HEADING_COLOR),
            ("text-align", "left"),
            ("padding-top", "3pt"),
            ("break-before", "page"),
        ]);
        vec![heading]
    }
}

/// Rows of name, description, count and PASS/FAIL for one tier.
pub struct StigCounts(pub Tier);

impl StigCounts {
    fn status_cell(descriptor: &FilterDescriptor) -> Element {
        let (text, color) = if descriptor.passed() {
            ("PASS", "green")
        } else {
            ("FAIL", "red")
        };
        cell(
            &[
                ("border-width", "thin"),
                ("border-style", "solid"),
                ("font-family", "Courier"),
                ("color", color),
            ],
            text,
        )
    }
}

impl Generator for StigCounts {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        ctx.aggregation
            .tier(self.0)
            .category
            .values()
            .map(|descriptor| {
                row([
                    bordered_cell(descriptor.name.as_str()),
                    cell(
                        &[
                            ("border-width", "thin"),
                            ("border-style", "solid"),
                            ("text-align", "left"),
                            ("padding-left", "5pt"),
                        ],
                        descriptor.description.as_str(),
                    ),
                    bordered_cell(descriptor.findings.len().to_string()),
                    Self::status_cell(descriptor),
                ])
            })
            .collect()
    }
}

/// Count, tool name and description per detecting tool.
pub struct ToolFindings;

impl Generator for ToolFindings {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        let centered = [("border-style", "solid"), ("text-align", "center")];

        tools_by_name(&ctx.aggregation.tools)
            .into_iter()
            .map(|(tool, count)| {
                row([
                    cell(&centered, count.to_string()),
                    cell(&centered, tool),
                    cell(
                        &[
                            ("border-style", "solid"),
                            ("text-align", "left"),
                            ("padding-left", "5pt"),
                        ],
                        ctx.run.tool_descriptions.describe(tool),
                    ),
                ])
            })
            .collect()
    }
}

pub struct ToolTotalFindings;

impl Generator for ToolTotalFindings {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        vec![block(ctx.aggregation.tool_findings_total().to_string())]
    }
}

/// Table of contents rows linking to every STIG detail heading.
pub struct TocDetails;

impl Generator for TocDetails {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        tiers(ctx.aggregation)
            .flat_map(|(_, category)| category.keys())
            .map(|name| {
                let label = block(name.as_str())
                    .with_attrs(&[
                        ("text-align", "start"),
                        ("font-size", "9pt"),
                        ("text-align-last", "justify"),
                        ("margin-left", "05%"),
                    ])
                    .with_child(dot_leader());
                let link = Element::new("fo:basic-link")
                    .with_attr("internal-destination", name.as_str())
                    .with_child(
                        Element::new("fo:page-number-citation").with_attr("ref-id", name.as_str()),
                    );
                let page = Element::new("fo:block")
                    .with_attr("text-align", "end")
                    .with_child(link);

                row([
                    Element::new("fo:table-cell").with_child(label),
                    Element::new("fo:table-cell").with_child(page),
                ])
            })
            .collect()
    }
}

/// Per STIG heading followed by detail tables for each of its findings.
pub struct FindingDetail;

impl FindingDetail {
    fn heading(tier: Tier, descriptor: &FilterDescriptor) -> Element {
        block(format!(
            "STIG {} - {} {}",
            descriptor.name,
            tier.label(),
            descriptor.description
        ))
        .with_attrs(&[
            ("id", descriptor.name.as_str()),
            ("space-before", "15pt"),
            ("font-size", "12pt"),
            ("font-family", "sans-serif"),
            ("space-after", "15pt"),
            ("color", "white"),
            ("background-color", HEADING_COLOR),
            ("text-align", "justify"),
            ("padding-top", "3pt"),
        ])
    }

    fn table(widths: &[&str], rows: Vec<Element>) -> Element {
        let columns = widths
            .iter()
            .map(|w| Element::new("fo:table-column").with_attr("column-width", *w));

        Element::new("fo:table")
            .with_attrs(&[
                ("font-size", "8"),
                ("border-width", "thin"),
                ("text-align", "center"),
                ("table-layout", "fixed"),
                ("border-collapse", "collapse"),
            ])
            .with_children(columns)
            .with_child(Element::new("fo:table-body").with_children(rows))
    }

    fn header_row(titles: &[&str]) -> Element {
        row(titles.iter().map(|t| bordered_cell(*t))).with_attr("background-color", HEADING_COLOR)
    }

    fn finding_tables(finding: &Finding) -> [Element; 3] {
        let summary = Self::table(
            &["10%", "45%", "45%"],
            vec![
                Self::header_row(&["ID", "Location", "Error Type"]),
                row([
                    bordered_cell(finding.id.to_string()),
                    bordered_cell(finding.location.display()),
                    bordered_cell(finding.error.as_str()),
                ]),
            ],
        );

        let mut tool_rows = vec![Self::header_row(&["Detected by", "Vendor ID (when available)"])];
        tool_rows.extend(
            finding
                .tools
                .iter()
                .map(|tool| row([bordered_cell(tool.name.as_str()), bordered_cell(tool.vendor_id())])),
        );
        let tools = Self::table(&["25%", "75%"], tool_rows);

        let mut code_block = Element::new("fo:block").with_attrs(&[
            ("linefeed-treatment", "preserve"),
            ("width", "95%"),
            ("wrap-option", "wrap"),
            ("white-space", "pre"),
            ("white-space-collapse", "false"),
            ("font-family", "monospace"),
            ("font-size", "8"),
            ("text-align", "left"),
            ("space-after", "15pt"),
        ]);
        code_block.text = finding.code.clone();
        let code = Self::table(
            &["100%"],
            vec![
                Self::header_row(&["Example Code"]),
                row([Element::new("fo:table-cell")
                    .with_attrs(&BORDERED)
                    .with_child(code_block)]),
            ],
        )
        .with_attr("space-after", "15pt");

        [summary, tools, code]
    }
}

impl Generator for FindingDetail {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        let mut elements = Vec::new();

        for (tier, category) in tiers(ctx.aggregation) {
            for descriptor in category.values() {
                elements.push(Self::heading(tier, descriptor));
                for finding in &descriptor.findings {
                    elements.extend(Self::finding_tables(finding));
                }
            }
        }

        elements
    }
}

/// Lines, files and findings per language.
pub struct Languages;

impl Generator for Languages {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        ctx.run
            .language_metrics
            .iter()
            .map(|(language, metrics)| {
                row([
                    bordered_cell(language.as_str()),
                    bordered_cell(metrics.total_lines.to_string()),
                    bordered_cell(metrics.source_files.to_string()),
                    bordered_cell(metrics.findings.to_string()),
                ])
            })
            .collect()
    }
}

pub struct TotalFindings;

impl Generator for TotalFindings {
    fn generate(&self, ctx: &GenerationContext<'_>) -> Vec<Element> {
        vec![block(ctx.aggregation.total_findings().to_string())]
    }
}
