//! Content keys carried by template anchors.

use crate::error::ReportError;
use std::fmt;
use std::str::FromStr;

/// The closed set of content keys a template anchor may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentKind {
    TocStigVersion,
    ReportDate,
    ProjectName,
    DisaStigVersion,
    CatCells,
    FindingCountsByStig,
    CatIStigCounts,
    CatIIStigCounts,
    CatIIIStigCounts,
    ToolFindings,
    ToolTotalFindings,
    TocDetails,
    FormatFindingDetail,
    Languages,
    TotalFindings,
}

impl ContentKind {
    pub const ALL: [ContentKind; 15] = [
        ContentKind::TocStigVersion,
        ContentKind::ReportDate,
        ContentKind::ProjectName,
        ContentKind::DisaStigVersion,
        ContentKind::CatCells,
        ContentKind::FindingCountsByStig,
        ContentKind::CatIStigCounts,
        ContentKind::CatIIStigCounts,
        ContentKind::CatIIIStigCounts,
        ContentKind::ToolFindings,
        ContentKind::ToolTotalFindings,
        ContentKind::TocDetails,
        ContentKind::FormatFindingDetail,
        ContentKind::Languages,
        ContentKind::TotalFindings,
    ];

    /// The `content` attribute value as written in templates.
    pub fn key(&self) -> &'static str {
        match self {
            ContentKind::TocStigVersion => "TOCstigVersion",
            ContentKind::ReportDate => "ReportDate",
            ContentKind::ProjectName => "ProjectName",
            ContentKind::DisaStigVersion => "DisaStigVersion",
            ContentKind::CatCells => "CatCells",
            ContentKind::FindingCountsByStig => "FindingCountsByStig",
            ContentKind::CatIStigCounts => "CatIStigCounts",
            ContentKind::CatIIStigCounts => "CatIIStigCounts",
            ContentKind::CatIIIStigCounts => "CatIIIStigCounts",
            ContentKind::ToolFindings => "ToolFindings",
            ContentKind::ToolTotalFindings => "ToolTotalFindings",
            ContentKind::TocDetails => "ToCDetails",
            ContentKind::FormatFindingDetail => "FormatFindingDetail",
            ContentKind::Languages => "languages",
            ContentKind::TotalFindings => "TotalFindings",
        }
    }
}

impl FromStr for ContentKind {
    type Err = ReportError;

    /// Keys are matched exactly; they are case sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| ReportError::UnknownContent(s.to_string()))
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
