//! Command-line interface argument parsing.
//!
//! The tool is meant to run from a scheduler with no arguments; every flag
//! here is an optional override of `.rankmail.toml`.

use clap::Parser;
use std::path::PathBuf;

/// rankmail - SEO keyword position report by email
///
/// Fetches keyword positions from a SEMSTORM monitoring campaign, averages
/// them per keyword and day, and emails the table as HTML.
///
/// Secrets are read from SERVICES_TOKEN, EMAIL_SENDER, EMAIL_PASSWORD and
/// EMAIL_RECIPIENT.
///
/// Examples:
///   rankmail
///   rankmail --days 14
///   rankmail --dry-run --output report.html
///   rankmail --init-config
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .rankmail.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of most recent dates to report per keyword
    #[arg(short, long, value_name = "DAYS", env = "RANKMAIL_DAYS")]
    pub days: Option<usize>,

    /// Monitoring campaign id
    #[arg(long, value_name = "ID")]
    pub campaign_id: Option<u64>,

    /// Monitoring API endpoint URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// API request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Keywords to report on (comma-separated)
    ///
    /// Example: --keywords "praca it,praca w it"
    #[arg(long, value_name = "KEYWORDS", value_delimiter = ',')]
    pub keywords: Option<Vec<String>>,

    /// Also write the report to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Format of the --output file (html, json)
    #[arg(long, default_value = "html", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Build the report but do not send the email
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with code 1 when fetching or sending fails
    #[arg(long)]
    pub fail_on_error: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .rankmail.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the --output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// HTML document, same as the email body (default)
    #[default]
    Html,
    /// JSON matrix
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(days) = self.days {
            if days == 0 {
                return Err("Days must be at least 1".to_string());
            }
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref keywords) = self.keywords {
            if keywords.iter().all(|k| k.trim().is_empty()) {
                return Err("At least one keyword is required".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
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
