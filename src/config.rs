//! Application configuration management.
//!
//! Settings are layered from `config/default.toml`, `config/{RUN_MODE}.toml`
//! and `DEMO_LEDGER__SECTION__KEY` environment variables, with `.env`
//! loaded first. Every value has a default, so a bare checkout runs.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::money::decimal_from_f64;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DEMO_LEDGER";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Generation volumes and rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_invoices_per_week")]
    pub invoices_per_week: usize,
    #[serde(default = "default_bills_per_week")]
    pub bills_per_week: usize,
    /// INR per USD
    #[serde(default = "default_exchange_rate")]
    pub base_exchange_rate: f64,
    /// Share of matched bank rows turned into unmatched anomalies
    #[serde(default = "default_anomaly_rate")]
    pub anomaly_rate: f64,
}

fn default_invoices_per_week() -> usize {
    2
}

fn default_bills_per_week() -> usize {
    4
}

fn default_exchange_rate() -> f64 {
    85.0
}

fn default_anomaly_rate() -> f64 {
    0.05
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            invoices_per_week: default_invoices_per_week(),
            bills_per_week: default_bills_per_week(),
            base_exchange_rate: default_exchange_rate(),
            anomaly_rate: default_anomaly_rate(),
        }
    }
}

impl PipelineConfig {
    /// Exchange rate as a decimal
    pub fn exchange_rate(&self) -> BigDecimal {
        decimal_from_f64(self.base_exchange_rate, 4)
    }
}

/// Location of the CSV sheet files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

/// Where generated files are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl OutputConfig {
    /// Directory receiving rendered PDFs
    pub fn pdf_dir(&self) -> PathBuf {
        self.dir.join("pdfs")
    }
}

/// PDF rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Path or name of the `typst` executable
    #[serde(default = "default_typst_bin")]
    pub typst_bin: String,
}

fn default_enabled() -> bool {
    true
}

fn default_typst_bin() -> String {
    "typst".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            typst_bin: default_typst_bin(),
        }
    }
}

/// SMTP delivery. Email is skipped unless host, sender and recipient are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
    pub from_email: Option<String>,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Receives invoice, bill and statement emails
    pub recipient: Option<String>,
    /// Receives the run summary; falls back to `recipient`
    pub notification_recipient: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Acme Technologies".to_string()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from_email: None,
            from_name: default_from_name(),
            recipient: None,
            notification_recipient: None,
        }
    }
}

impl EmailConfig {
    /// Whether enough is set to send mail
    pub fn is_configured(&self) -> bool {
        [&self.smtp_host, &self.from_email, &self.recipient]
            .iter()
            .all(|value| value.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// Recipient of the run summary
    pub fn summary_recipient(&self) -> Option<&str> {
        self.notification_recipient
            .as_deref()
            .or(self.recipient.as_deref())
    }
}

/// Weekly scheduler start time (local time, Mondays).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_hour")]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
}

fn default_hour() -> u32 {
    10
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: default_hour(),
            minute: 0,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Loads configuration from `.env`, config files and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Parses configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?;
        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Checks value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pipeline = &self.pipeline;
        if !(pipeline.base_exchange_rate.is_finite() && pipeline.base_exchange_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "base_exchange_rate must be positive, got {}",
                pipeline.base_exchange_rate
            )));
        }
        if !(0.0..=1.0).contains(&pipeline.anomaly_rate) {
            return Err(ConfigError::Invalid(format!(
                "anomaly_rate must be within 0..=1, got {}",
                pipeline.anomaly_rate
            )));
        }
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(ConfigError::Invalid(format!(
                "schedule time {:02}:{:02} is not a valid time of day",
                self.schedule.hour, self.schedule.minute
            )));
        }
        Ok(())
    }
}
