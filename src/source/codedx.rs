//! HTTP client for the Code Dx REST API.
//!
//! Non-success HTTP statuses are logged and treated as empty results, so a
//! failed query for one STIG reads the same as a STIG with no findings.
//! Transport failures (connection refused, timeouts) are returned as errors.

use super::query::{FindingQuery, GroupedCountFilter};
use super::{FindingSource, RawFinding, Standard};
use crate::error::{ReportError, Result};
use crate::models::{LanguageMetrics, TaxonomyNode};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection settings for [`CodeDxClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Server root including the `/codedx` context path.
    pub root_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
    /// Skip TLS certificate verification (self-signed servers).
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Deserialize)]
struct ProjectList {
    #[serde(default)]
    projects: Vec<ProjectEntry>,
}

#[derive(Debug, Deserialize)]
struct ProjectEntry {
    name: String,
    id: u64,
}

/// Code Dx API client.
pub struct CodeDxClient {
    http_client: reqwest::Client,
    api_url: String,
    experimental_url: String,
    timeout_seconds: u64,
    /// Last fetched source file, split into lines.
    file_cache: Mutex<Option<(u64, Vec<String>)>>,
}

impl CodeDxClient {
    /// Create a client for the given server.
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let api_key = HeaderValue::from_str(&settings.api_key)
            .map_err(|_| ReportError::Source("API key contains invalid characters".to_string()))?;
        headers.insert("api-key", api_key);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;

        let root = settings.root_url.trim_end_matches('/');
        info!("Using Code Dx API at {}/api", root);

        Ok(Self {
            http_client,
            api_url: format!("{}/api", root),
            experimental_url: format!("{}/x", root),
            timeout_seconds: settings.timeout_seconds,
            file_cache: Mutex::new(None),
        })
    }

    /// Map of project name to project id.
    pub async fn project_ids(&self) -> Result<HashMap<String, u64>> {
        let url = format!("{}/projects", self.api_url);
        let response = self.send(self.http_client.get(&url)).await?;

        if !response.status().is_success() {
            warn!("GET /projects responded [{}]", response.status());
            return Ok(HashMap::new());
        }

        let list: ProjectList = response.json().await?;
        Ok(list
            .projects
            .into_iter()
            .map(|p| (p.name, p.id))
            .collect())
    }

    /// Resolve a project name to its id.
    pub async fn resolve_project(&self, name: &str) -> Result<u64> {
        let projects = self.project_ids().await?;
        projects
            .get(name)
            .copied()
            .ok_or_else(|| ReportError::Source(format!("Project not found on server: {}", name)))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                ReportError::Source(format!("Request timed out after {}s", self.timeout_seconds))
            } else if e.is_connect() {
                ReportError::Source(format!("Cannot connect to Code Dx at {}", self.api_url))
            } else {
                ReportError::Http(e)
            }
        })
    }
}

#[async_trait]
impl FindingSource for CodeDxClient {
    async fn standards(&self) -> Result<Vec<Standard>> {
        let url = format!("{}/standards/filter-views", self.api_url);
        let response = self.send(self.http_client.get(&url)).await?;

        if !response.status().is_success() {
            warn!("GET /standards/filter-views responded [{}]", response.status());
            return Ok(Vec::new());
        }

        debug!("Collected standards list");
        Ok(response.json().await?)
    }

    async fn grouped_counts(
        &self,
        project_id: u64,
        filter: &GroupedCountFilter,
    ) -> Result<Vec<TaxonomyNode>> {
        let url = format!(
            "{}/projects/{}/findings/grouped-counts",
            self.api_url, project_id
        );
        let response = self.send(self.http_client.post(&url).json(filter)).await?;

        if !response.status().is_success() {
            warn!("POST grouped-counts responded [{}]", response.status());
            return Ok(Vec::new());
        }

        debug!("Collected grouped counts");
        Ok(response.json().await?)
    }

    async fn finding_table(
        &self,
        project_id: u64,
        query: &FindingQuery,
    ) -> Result<Vec<RawFinding>> {
        let url = format!("{}/projects/{}/findings/table", self.api_url, project_id);
        let request = self
            .http_client
            .post(&url)
            .query(&[("expand", query.expand.as_str())])
            .json(query);
        let response = self.send(request).await?;

        if !response.status().is_success() {
            warn!(
                "POST findings/table for {} responded [{}]",
                query.filter_id().unwrap_or("?"),
                response.status()
            );
            return Ok(Vec::new());
        }

        Ok(response.json().await?)
    }

    async fn file_lines(
        &self,
        project_id: u64,
        file_id: u64,
        line: u64,
        count: usize,
    ) -> Result<Option<String>> {
        {
            let cache = self
                .file_cache
                .lock()
                .map_err(|_| ReportError::Source("file cache poisoned".to_string()))?;
            if let Some((cached_id, lines)) = cache.as_ref() {
                if *cached_id == file_id {
                    return Ok(Some(slice_cached(lines, line, count)));
                }
            }
        }

        let url = format!("{}/projects/{}/files/{}", self.api_url, project_id, file_id);
        let response = self.send(self.http_client.get(&url)).await?;

        if !response.status().is_success() {
            debug!("GET file {} responded [{}]", file_id, response.status());
            return Ok(None);
        }

        let content = response.text().await?;
        let snippet = slice_lines(&content, line, count);
        let lines: Vec<String> = content.lines().map(String::from).collect();

        let mut cache = self
            .file_cache
            .lock()
            .map_err(|_| ReportError::Source("file cache poisoned".to_string()))?;
        *cache = Some((file_id, lines));

        Ok(Some(snippet))
    }

    async fn code_metrics(&self, project_id: u64) -> Result<BTreeMap<String, LanguageMetrics>> {
        let url = format!("{}/dashboard/{}", self.experimental_url, project_id);
        let request = self
            .http_client
            .post(&url)
            .query(&[("includeChildProjects", "true")])
            .json(&json!({ "codeMetrics": { "latest": "1" } }));
        let response = self.send(request).await?;

        if !response.status().is_success() {
            warn!("POST dashboard responded [{}]", response.status());
            return Ok(BTreeMap::new());
        }

        let body: Value = response.json().await?;
        Ok(parse_code_metrics(&body))
    }
}

/// Extract per-language metrics from a dashboard response.
fn parse_code_metrics(body: &Value) -> BTreeMap<String, LanguageMetrics> {
    let Some(data) = body["codeMetrics"][0]["data"].as_object() else {
        return BTreeMap::new();
    };

    data.iter()
        .map(|(language, value)| {
            let metrics = LanguageMetrics {
                total_lines: value["numTotalLines"].as_u64().unwrap_or(0),
                source_files: value["numSourceFiles"].as_u64().unwrap_or(0),
                findings: value["numFindings"].as_u64().unwrap_or(0),
            };
            (language.clone(), metrics)
        })
        .collect()
}

/// Lines `line - count + 1 ..= line + count` (1-indexed) of `content`.
pub(crate) fn slice_lines(content: &str, line: u64, count: usize) -> String {
    let lines: Vec<String> = content.lines().map(String::from).collect();
    slice_cached(&lines, line, count)
}

fn slice_cached(lines: &[String], line: u64, count: usize) -> String {
    let line = usize::try_from(line).unwrap_or(usize::MAX);
    let start = line.saturating_sub(count).min(lines.len());
    let end = line.saturating_add(count).min(lines.len());
    lines[start..end].join("\n")
}
