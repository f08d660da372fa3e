//! Request bodies sent to the Code Dx findings API.

use serde::Serialize;

/// Statuses excluded when querying findings for one STIG filter.
pub const EXCLUDED_FINDING_STATUSES: [&str; 5] =
    ["ignored", "false-positive", "mitigated", "gone", "fixed"];

/// Statuses excluded when requesting the grouped taxonomy.
pub const EXCLUDED_TAXONOMY_STATUSES: [&str; 4] =
    ["fixed", "mitigated", "ignored", "false-positive"];

/// Findings per page. A single STIG's findings are assumed to fit one page.
pub const DEFAULT_PAGE_SIZE: usize = 2500;

/// Sub-objects expanded in finding table responses.
pub const FINDING_EXPAND: &str = "results.descriptor,results.metadata";

/// The `filter` object shared by grouped-count and table requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusFilter {
    #[serde(rename = "~status")]
    pub excluded_statuses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard: Option<String>,
}

impl StatusFilter {
    fn excluding(statuses: &[&str]) -> Self {
        Self {
            excluded_statuses: statuses.iter().map(|s| s.to_string()).collect(),
            standard: None,
        }
    }
}

/// Body of `POST /projects/{id}/findings/grouped-counts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupedCountFilter {
    pub filter: StatusFilter,
    #[serde(rename = "countBy")]
    pub count_by: String,
}

impl GroupedCountFilter {
    /// Taxonomy request grouped by the selected standard's key.
    pub fn for_standard(count_by: &str) -> Self {
        Self {
            filter: StatusFilter::excluding(&EXCLUDED_TAXONOMY_STATUSES),
            count_by: count_by.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub by: String,
    pub direction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

/// Body of `POST /projects/{id}/findings/table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindingQuery {
    pub filter: StatusFilter,
    pub sort: Sort,
    pub pagination: Pagination,
    /// Sent as the `expand` query parameter, not in the body.
    #[serde(skip)]
    pub expand: String,
}

impl FindingQuery {
    /// Open findings for one STIG filter, ascending by id, first page only.
    pub fn for_filter(filter_id: &str, per_page: usize) -> Self {
        let mut filter = StatusFilter::excluding(&EXCLUDED_FINDING_STATUSES);
        filter.standard = Some(filter_id.to_string());

        Self {
            filter,
            sort: Sort {
                by: "id".to_string(),
                direction: "ascending".to_string(),
            },
            pagination: Pagination { page: 1, per_page },
            expand: FINDING_EXPAND.to_string(),
        }
    }

    pub fn filter_id(&self) -> Option<&str> {
        self.filter.standard.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finding_query_body() {
        let query = FindingQuery::for_filter("standard-node:3287", DEFAULT_PAGE_SIZE);
        let body = serde_json::to_value(&query).unwrap();

        assert_eq!(
            body,
            json!({
                "filter": {
                    "~status": ["ignored", "false-positive", "mitigated", "gone", "fixed"],
                    "standard": "standard-node:3287"
                },
                "sort": { "by": "id", "direction": "ascending" },
                "pagination": { "page": 1, "perPage": 2500 }
            })
        );
        assert_eq!(query.expand, "results.descriptor,results.metadata");
        assert_eq!(query.filter_id(), Some("standard-node:3287"));
    }

    #[test]
    fn test_grouped_count_body() {
        let filter = GroupedCountFilter::for_standard("standard:12");
        let body = serde_json::to_value(&filter).unwrap();

        assert_eq!(
            body,
            json!({
                "filter": { "~status": ["fixed", "mitigated", "ignored", "false-positive"] },
                "countBy": "standard:12"
            })
        );
    }
}
