//! Configuration file handling.
//!
//! This module handles loading `.rankmail.toml`, merging it with CLI
//! arguments, and collecting the secrets that only ever come from the
//! environment.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".rankmail.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Monitoring API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// SMTP settings.
    #[serde(default)]
    pub email: EmailConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Keywords to report on.
    #[serde(default)]
    pub keywords: KeywordsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Number of most recent dates to report per keyword.
    #[serde(default = "default_days")]
    pub days: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
        }
    }
}

fn default_days() -> usize {
    7
}

/// Monitoring API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Campaign data endpoint.
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Monitoring campaign id.
    #[serde(default = "default_campaign_id")]
    pub campaign_id: u64,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            campaign_id: default_campaign_id(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.semstorm.com/api-v3/monitoring/monitoring-campaign/get-data.json".to_string()
}

fn default_campaign_id() -> u64 {
    70156
}

fn default_timeout() -> u64 {
    60
}

/// SMTP submission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host (STARTTLS).
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// SMTP submission port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Subject line; `{days}` is replaced with the day window.
    #[serde(default = "default_subject_template")]
    pub subject_template: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            subject_template: default_subject_template(),
        }
    }
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject_template() -> String {
    "Pozycje theprotocol.it – Pozycje z ostatnich {days} dni".to_string()
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Heading shown above the table.
    #[serde(default = "default_heading")]
    pub heading: String,

    /// Header of the keyword column.
    #[serde(default = "default_keyword_label")]
    pub keyword_label: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            heading: default_heading(),
            keyword_label: default_keyword_label(),
        }
    }
}

fn default_heading() -> String {
    "SEMSTORM Monitoring – Pozycje dla theprotocol.it".to_string()
}

fn default_keyword_label() -> String {
    "Słowo kluczowe".to_string()
}

/// Monitored keyword allow-list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// Keyword titles to keep; everything else in the payload is ignored.
    #[serde(default = "default_monitored")]
    pub monitored: Vec<String>,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            monitored: default_monitored(),
        }
    }
}

fn default_monitored() -> Vec<String> {
    vec![
        "oferty pracy it",
        "praca it",
        "praca w branży it",
        "praca w it",
    ]
    .into_iter()
    .map(String::from)
    .collect()
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
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.rankmail.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(days) = args.days {
            self.general.days = days;
        }
        if let Some(campaign_id) = args.campaign_id {
            self.api.campaign_id = campaign_id;
        }
        if let Some(ref url) = args.api_url {
            self.api.url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(ref keywords) = args.keywords {
            self.keywords.monitored = keywords.clone();
        }
    }

    /// Check the merged settings, whichever source they came from.
    pub fn validate(&self) -> Result<()> {
        if self.general.days == 0 {
            bail!("general.days must be at least 1");
        }
        if !self.api.url.starts_with("http://") && !self.api.url.starts_with("https://") {
            bail!("api.url must start with 'http://' or 'https://'");
        }
        if self.api.timeout_seconds == 0 {
            bail!("api.timeout_seconds must be at least 1");
        }
        if self.keywords.monitored.iter().all(|k| k.trim().is_empty()) {
            bail!("keywords.monitored must name at least one keyword");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Secrets read from the environment.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Monitoring API token (`SERVICES_TOKEN`).
    pub services_token: String,
    /// Sender address, also the SMTP login (`EMAIL_SENDER`).
    pub email_sender: String,
    /// SMTP password (`EMAIL_PASSWORD`).
    pub email_password: String,
    /// Report recipient (`EMAIL_RECIPIENT`).
    pub email_recipient: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("services_token", &"<redacted>")
            .field("email_sender", &self.email_sender)
            .field("email_password", &"<redacted>")
            .field("email_recipient", &self.email_recipient)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from any key lookup.
    ///
    /// Missing values are logged and left empty; they surface later as
    /// request or authentication errors.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| match lookup(key) {
            Some(value) if !value.is_empty() => value,
            _ => {
                warn!("Environment variable {} is not set", key);
                String::new()
            }
        };

        Self {
            services_token: read("SERVICES_TOKEN"),
            email_sender: read("EMAIL_SENDER"),
            email_password: read("EMAIL_PASSWORD"),
            email_recipient: read("EMAIL_RECIPIENT"),
        }
    }
}
