//! stigreport - DISA STIG compliance reports from Code Dx
//!
//! A CLI tool that collects open findings for the newest DISA STIG standard
//! on a Code Dx server and fills an XSL-FO report template with them.
//!
//! Exit codes:
//!   0 - Success (no findings above threshold, or no --fail-on set)
//!   1 - Runtime error (connection, config, template, etc.)
//!   2 - Findings found at or above the --fail-on category

mod analysis;
mod cli;
mod config;
mod document;
mod error;
mod models;
mod source;
mod taxonomy;

use analysis::{AggregationBuilder, BuildOptions, CollectorOptions, ToolDescriptions};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use document::{DocumentAssembler, RunContext};
use models::{Aggregation, Tier, TierSource};
use source::codedx::ClientSettings;
use source::{CodeDxClient, FindingSource};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("stigreport v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_report(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .stigreport.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the server, project, template and output.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete report workflow. Returns exit code (0 or 2).
async fn run_report(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().map_err(anyhow::Error::msg)?;

    // Step 1: Connect and resolve the project
    let root_url = config.server.root_url();
    println!("🔌 Connecting to Code Dx: {}", root_url);

    let client = CodeDxClient::new(&ClientSettings {
        root_url,
        api_key: config.server.api_key.clone(),
        timeout_seconds: config.server.timeout_seconds,
        accept_invalid_certs: config.server.accept_invalid_certs,
    })
    .context("Failed to create Code Dx client")?;

    let project_id = client
        .resolve_project(&config.server.project)
        .await
        .with_context(|| format!("Failed to resolve project '{}'", config.server.project))?;
    println!("   Project: {} (id {})", config.server.project, project_id);

    // Step 2: Collect findings per STIG
    println!("\n🔬 Collecting STIG findings...");
    let options = BuildOptions {
        standard_family: config.report.standard_family.clone(),
        version_ordering: config.report.version_ordering,
        collision_policy: config.report.collision_policy,
        collector: CollectorOptions {
            page_size: config.report.page_size,
            context_lines: config.report.context_lines,
        },
        show_progress: !args.quiet,
    };

    let aggregation = AggregationBuilder::new(&client, project_id, options)
        .build()
        .await
        .context("Failed to collect findings")?;

    print_summary(&aggregation);

    // Handle --dry-run: summary only
    if args.dry_run {
        println!("\n✅ Dry run complete. No report was written.");
        return Ok(threshold_exit_code(&args, &aggregation));
    }

    // Step 3: Write the report
    let output = Path::new(&config.report.output);
    match config.report.format {
        OutputFormat::Json => {
            println!("\n📝 Writing aggregation as JSON...");
            let json = serde_json::to_string_pretty(&aggregation)
                .context("Failed to serialize aggregation")?;
            std::fs::write(output, json)
                .with_context(|| format!("Failed to write report to {}", output.display()))?;
        }
        OutputFormat::Fo => {
            println!("\n📝 Generating report from template: {}", config.report.template);
            let template_path = Path::new(&config.report.template);
            let mut root = document::load_template(template_path).with_context(|| {
                format!("Failed to load template {}", template_path.display())
            })?;

            let metrics = collect_language_metrics(&client, project_id).await;
            let run = RunContext::new(
                config.server.project.clone(),
                ToolDescriptions::with_overrides(&config.tools.descriptions),
                metrics,
            );

            let stats = DocumentAssembler::new(config.report.anchor_tag.clone())
                .assemble(&mut root, &aggregation, &run)
                .context("Failed to assemble report")?;
            info!(
                "Replaced {} anchors with {} elements",
                stats.anchors, stats.generated
            );
            for (kind, count) in &stats.by_kind {
                debug!("  {} x{}", kind, count);
            }

            document::write_document(&root, output)
                .with_context(|| format!("Failed to write report to {}", output.display()))?;
        }
    }

    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Report complete! Saved to: {}", output.display());

    Ok(threshold_exit_code(&args, &aggregation))
}

/// Language metrics are decorative; failures are logged and yield no rows.
async fn collect_language_metrics(
    source: &dyn FindingSource,
    project_id: u64,
) -> BTreeMap<String, models::LanguageMetrics> {
    match source.code_metrics(project_id).await {
        Ok(metrics) => metrics,
        Err(e) => {
            warn!("Failed to collect code metrics: {}", e);
            BTreeMap::new()
        }
    }
}

/// Print per-tier and per-tool totals.
fn print_summary(aggregation: &Aggregation) {
    println!("\n📊 STIG Summary:");
    if aggregation.standard.is_selected() {
        println!("   Standard: {}", aggregation.standard.name);
    } else {
        println!("   Standard: none found");
    }

    for tier in Tier::ALL {
        let findings = aggregation.tier(tier);
        let failing = analysis::failing_filters(&findings.category);
        let note = match findings.source {
            TierSource::Reported => String::new(),
            TierSource::Absent => " (not reported by server)".to_string(),
        };
        println!(
            "   - {}: {} findings, {} of {} STIGs failing{}",
            tier,
            findings.total,
            failing.len(),
            findings.category.len(),
            note
        );
    }

    println!("   Total findings: {}", aggregation.total_findings());
    for (tool, count) in analysis::top_tools(&aggregation.tools, 5) {
        println!("     🔧 {}: {}", tool, count);
    }
}

/// Exit code 2 when --fail-on is set and its category (or a more severe one) has findings.
fn threshold_exit_code(args: &Args, aggregation: &Aggregation) -> i32 {
    if let Some(fail_level) = args.fail_on {
        let tier = fail_level.tier();
        if aggregation.has_findings_at_or_above(tier) {
            eprintln!(
                "\n⛔ Findings found at or above {}. Failing (exit code 2).",
                tier
            );
            return 2;
        }
    }

    0
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
