//! rankmail - SEO keyword position report by email
//!
//! Fetches keyword ranking data from a SEMSTORM monitoring campaign,
//! averages positions per keyword and day, and emails the result as an
//! HTML table. Meant to be triggered by an external scheduler.
//!
//! Exit codes:
//!   0 - Run finished (including "no data" and failures without --fail-on-error)
//!   1 - Invalid arguments/config, or a failed stage with --fail-on-error

mod analysis;
mod api;
mod cli;
mod config;
mod error;
mod mail;
mod models;
mod report;

use anyhow::{Context, Result};
use api::MonitoringClient;
use cli::{Args, OutputFormat};
use config::{Config, Credentials};
use mail::Mailer;
use report::ComposedReport;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    /// Report emailed.
    Sent,
    /// Report built but not sent (--dry-run).
    Rendered,
    /// Nothing to report.
    NoData,
    /// Fetching or sending failed.
    Failed,
}

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

    init_logging(&args);

    info!("rankmail v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {:#}", e);
        eprintln!("\n❌ Error: Invalid configuration: {:#}", e);
        std::process::exit(1);
    }

    let credentials = Credentials::from_env();

    let outcome = run_report(&args, &config, &credentials).await;
    debug!("Run finished: {:?}", outcome);

    if outcome == RunOutcome::Failed && args.fail_on_error {
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .rankmail.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  .rankmail.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .rankmail.toml")?;

    println!("✅ Created .rankmail.toml with default settings.");
    println!("   Edit it to change the campaign, keywords, days and SMTP relay.");
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

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run fetch -> aggregate -> render -> send. Failures are logged, not returned.
async fn run_report(args: &Args, config: &Config, credentials: &Credentials) -> RunOutcome {
    let start_time = Instant::now();
    let days = config.general.days;

    // Step 1: Fetch campaign data
    println!("📥 Fetching campaign {}...", config.api.campaign_id);
    let payload = match fetch_payload(config, credentials).await {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            println!("ℹ️  No data available from the monitoring API.");
            return RunOutcome::NoData;
        }
        Err(e) => {
            error!("Fetching monitoring data failed: {:#}", e);
            return RunOutcome::Failed;
        }
    };

    // Step 2: Aggregate
    println!("🔬 Aggregating positions for the last {} days...", days);
    let matrix = analysis::aggregate(&payload, &config.keywords.monitored, days);
    drop(payload);

    info!(
        "{} keywords x {} dates",
        matrix.keywords().len(),
        matrix.dates().len()
    );

    // Step 3: Render
    let Some(composed) = report::compose_report(&matrix, &config.report, &config.email, days) else {
        println!("ℹ️  No data.");
        return RunOutcome::NoData;
    };

    if let Some(ref path) = args.output {
        let written = match args.format {
            OutputFormat::Html => Ok(composed.html.clone()),
            OutputFormat::Json => report::generate_json_report(&matrix, days),
        }
        .and_then(|content| {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write report to {}", path.display()))
        });

        match written {
            Ok(()) => println!("📝 Report saved to: {}", path.display()),
            Err(e) => warn!("{:#}", e),
        }
    }

    if args.dry_run {
        println!("\n✅ Dry run complete. No email was sent.");
        return RunOutcome::Rendered;
    }

    // Step 4: Send
    println!("📧 Sending report...");
    if let Err(e) = send_report(config, credentials, &composed).await {
        error!("Sending email failed: {:#}", e);
        return RunOutcome::Failed;
    }

    println!(
        "\n✅ Report sent! {} keywords in {:.1}s",
        matrix.keywords().len(),
        start_time.elapsed().as_secs_f64()
    );
    RunOutcome::Sent
}

async fn fetch_payload(
    config: &Config,
    credentials: &Credentials,
) -> Result<Option<serde_json::Value>> {
    let client = MonitoringClient::new(&config.api)?;
    client
        .fetch_keyword_data(config.api.campaign_id, &credentials.services_token)
        .await
}

async fn send_report(
    config: &Config,
    credentials: &Credentials,
    composed: &ComposedReport,
) -> Result<()> {
    let mailer = Mailer::new(&config.email, credentials)?;
    mailer.send(composed).await
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
            info!("Loaded default config from .rankmail.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
