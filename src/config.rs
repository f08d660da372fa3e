//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.stigreport.toml` files.

use crate::analysis::VersionOrdering;
use crate::cli::{Args, OutputFormat};
use crate::document::assembler::DEFAULT_ANCHOR_TAG;
use crate::source::query::DEFAULT_PAGE_SIZE;
use crate::taxonomy::CollisionPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".stigreport.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Code Dx server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Report generation settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Tool description overrides.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Code Dx server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `http` or `https`.
    #[serde(default = "default_transport")]
    pub transport: String,

    /// Server host name.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port; omitted from the URL when it is the transport's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// API key. Prefer the `CODEDX_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: String,

    /// Name of the Code Dx project to report on.
    #[serde(default)]
    pub project: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            host: default_host(),
            port: None,
            api_key: String::new(),
            project: String::new(),
            timeout_seconds: default_timeout(),
            accept_invalid_certs: false,
        }
    }
}

fn default_transport() -> String {
    "https".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl ServerConfig {
    /// Server root including the `/codedx` context path.
    pub fn root_url(&self) -> String {
        let transport = self.transport.to_lowercase();
        let default_port = match transport.as_str() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        };

        match self.port {
            Some(port) if Some(port) != default_port => {
                format!("{}://{}:{}/codedx", transport, self.host, port)
            }
            _ => format!("{}://{}/codedx", transport, self.host),
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Template file, XSL-FO or `.json`.
    #[serde(default = "default_template")]
    pub template: String,

    /// Output file.
    #[serde(default = "default_output")]
    pub output: String,

    /// Output format (`fo` or `json`).
    #[serde(default)]
    pub format: OutputFormat,

    /// Source lines shown either side of each finding; 0 disables.
    #[serde(default)]
    pub context_lines: usize,

    /// Findings requested per STIG filter.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Element name of template anchors.
    #[serde(default = "default_anchor_tag")]
    pub anchor_tag: String,

    /// Standards whose name contains this are candidates.
    #[serde(default = "default_standard_family")]
    pub standard_family: String,

    /// `lexicographic` or `numeric`.
    #[serde(default)]
    pub version_ordering: VersionOrdering,

    /// `last-wins`, `first-wins` or `reject`.
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            output: default_output(),
            format: OutputFormat::default(),
            context_lines: 0,
            page_size: default_page_size(),
            anchor_tag: default_anchor_tag(),
            standard_family: default_standard_family(),
            version_ordering: VersionOrdering::default(),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

fn default_template() -> String {
    "template.json".to_string()
}

fn default_output() -> String {
    "stig_report.fo".to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_anchor_tag() -> String {
    DEFAULT_ANCHOR_TAG.to_string()
}

fn default_standard_family() -> String {
    crate::analysis::builder::DEFAULT_STANDARD_FAMILY.to_string()
}

/// Tool description settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Extra or replacement descriptions keyed by tool name.
    #[serde(default)]
    pub descriptions: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given on the command line (or via environment) override.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref project) = args.project {
            self.server.project = project.clone();
        }
        if let Some(ref api_key) = args.api_key {
            self.server.api_key = api_key.clone();
        }
        if let Some(timeout) = args.timeout {
            self.server.timeout_seconds = timeout;
        }

        if let Some(ref template) = args.template {
            self.report.template = template.display().to_string();
        }
        if let Some(ref output) = args.output {
            self.report.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(context_lines) = args.context_lines {
            self.report.context_lines = context_lines;
        }
    }

    /// Check settings that cannot be defaulted.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.project.trim().is_empty() {
            return Err("No project given; use --project or [server] project".to_string());
        }

        if self.server.api_key.trim().is_empty() {
            return Err(
                "No API key given; set CODEDX_API_KEY, --api-key or [server] api_key".to_string(),
            );
        }

        let transport = self.server.transport.to_lowercase();
        if transport != "http" && transport != "https" {
            return Err(format!(
                "Transport must be 'http' or 'https', got '{}'",
                self.server.transport
            ));
        }

        if self.report.page_size == 0 {
            return Err("Page size must be at least 1".to_string());
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.server.project = "WebGoat".to_string();
        config.server.api_key = "secret".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.transport, "https");
        assert_eq!(config.report.page_size, 2500);
        assert_eq!(config.report.anchor_tag, "CodeDx");
        assert_eq!(config.report.standard_family, "DISA STIG");
        assert_eq!(config.report.collision_policy, CollisionPolicy::LastWins);
        assert_eq!(config.report.version_ordering, VersionOrdering::Lexicographic);
        assert!(config.tools.descriptions.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
transport = "http"
host = "codedx.internal"
port = 8080
project = "WebGoat"

[report]
template = "templates/stig.json"
format = "json"
context_lines = 3
version_ordering = "numeric"
collision_policy = "reject"

[tools.descriptions]
Semgrep = "Open Source static analysis tool"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.host, "codedx.internal");
        assert_eq!(config.server.port, Some(8080));
        assert_eq!(config.server.timeout_seconds, 120);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.context_lines, 3);
        assert_eq!(config.report.version_ordering, VersionOrdering::Numeric);
        assert_eq!(config.report.collision_policy, CollisionPolicy::Reject);
        assert_eq!(config.report.output, "stig_report.fo");
        assert_eq!(
            config.tools.descriptions["Semgrep"],
            "Open Source static analysis tool"
        );
    }

    #[test]
    fn test_root_url_port_handling() {
        let mut server = ServerConfig {
            host: "codedx.example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(server.root_url(), "https://codedx.example.com/codedx");

        server.port = Some(443);
        assert_eq!(server.root_url(), "https://codedx.example.com/codedx");

        server.port = Some(8443);
        assert_eq!(server.root_url(), "https://codedx.example.com:8443/codedx");

        server.transport = "HTTP".to_string();
        server.port = Some(80);
        assert_eq!(server.root_url(), "http://codedx.example.com/codedx");
    }

    #[test]
    fn test_merge_with_args() {
        let args = Args::parse_from([
            "stigreport",
            "--project",
            "Juice Shop",
            "--format",
            "json",
            "--context-lines",
            "2",
            "--output",
            "out.json",
        ]);

        let mut config = valid_config();
        config.report.template = "keep.json".to_string();
        config.merge_with_args(&args);

        assert_eq!(config.server.project, "Juice Shop");
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.context_lines, 2);
        assert_eq!(config.report.output, "out.json");
        assert_eq!(config.report.template, "keep.json");
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());
        assert!(Config::default().validate().is_err());

        let mut config = valid_config();
        config.server.transport = "ftp".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.report.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[server]\nproject = \"WebGoat\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.project, "WebGoat");

        std::fs::write(&path, "[server\nproject = ").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("collision_policy = \"last-wins\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.report.anchor_tag, "CodeDx");
    }
}
