//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Tier;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// stigreport - DISA STIG compliance reports from Code Dx
///
/// Collects open findings for the newest DISA STIG standard on a Code Dx
/// server, groups them by CAT I/II/III, and fills an XSL-FO report template.
///
/// Examples:
///   stigreport --project WebGoat
///   stigreport --project WebGoat --template stig_template.fo --output webgoat.fo
///   stigreport --project WebGoat --format json --output webgoat.json
///   stigreport --project WebGoat --dry-run
///   stigreport --init-config
#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Code Dx project to report on
    ///
    /// Overrides [server] project in the config file.
    #[arg(short, long, value_name = "NAME", env = "CODEDX_PROJECT")]
    pub project: Option<String>,

    /// Code Dx API key
    #[arg(long, value_name = "KEY", env = "CODEDX_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Report template (XSL-FO with anchors, or a .json element tree)
    #[arg(short, long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .stigreport.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (fo, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Source lines to show either side of each finding (0 disables)
    #[arg(long, value_name = "LINES")]
    pub context_lines: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Fail if findings at or above this category are found
    ///
    /// Useful for CI pipelines. Exit code 2 when threshold is exceeded.
    /// Values: cat1, cat2, cat3
    #[arg(long, value_name = "CAT")]
    pub fail_on: Option<FailOnLevel>,

    /// Dry run: collect findings and print a summary without writing a report
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .stigreport.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

// Written by hand so the API key never reaches the logs.
impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("project", &self.project)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("template", &self.template)
            .field("output", &self.output)
            .field("config", &self.config)
            .field("format", &self.format)
            .field("context_lines", &self.context_lines)
            .field("timeout", &self.timeout)
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .field("fail_on", &self.fail_on)
            .field("dry_run", &self.dry_run)
            .field("init_config", &self.init_config)
            .finish()
    }
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// XSL-FO document filled from the template (default)
    #[default]
    Fo,
    /// The raw aggregation as JSON
    Json,
}

/// Category threshold for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailOnLevel {
    Cat1,
    Cat2,
    Cat3,
}

impl FailOnLevel {
    pub fn tier(&self) -> Tier {
        match self {
            FailOnLevel::Cat1 => Tier::CatI,
            FailOnLevel::Cat2 => Tier::CatII,
            FailOnLevel::Cat3 => Tier::CatIII,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref project) = self.project {
            if project.trim().is_empty() {
                return Err("Project name must not be empty".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref template) = self.template {
            if !template.is_file() {
                return Err(format!("Template file does not exist: {}", template.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
