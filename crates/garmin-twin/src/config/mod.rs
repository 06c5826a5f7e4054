//! Layered configuration for the pipeline
//!
//! Built-in defaults, then an optional `twin.toml`, then `TWIN__SECTION__KEY`
//! environment variables. Secrets never live here, see [`Secrets`].

mod credentials;
mod secrets;

pub use credentials::TokenStore;
pub use secrets::Secrets;

use crate::error::{Result, TwinError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name shared with garmin-cli so its token files are picked up
const GARMIN_DIR_NAME: &str = "garmin";

/// Default config file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "twin.toml";

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub staging: StagingConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub insight: InsightConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StagingConfig {
    #[serde(default = "default_staging_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Directory holding `oauth1_token.json` / `oauth2_token.json`
    #[serde(default = "default_token_dir")]
    pub token_dir: PathBuf,

    /// Where the OAuth consumer key/secret pair is published
    #[serde(default = "default_consumer_url")]
    pub consumer_url: String,

    /// Override for the Connect API base URL (defaults to `https://connectapi.{domain}`)
    #[serde(default)]
    pub api_base: Option<String>,

    /// Number of most recent activities mirrored into the Attivita table
    #[serde(default = "default_activity_window")]
    pub activity_window: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    #[serde(default = "default_sheets_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InsightConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,

    /// Language the coach replies in
    #[serde(default = "default_language")]
    pub language: String,

    /// Short description of the athlete, interpolated into every prompt
    #[serde(default = "default_athlete_profile")]
    pub athlete_profile: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Pause between two stage executions
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_staging_dir() -> PathBuf {
    PathBuf::from("dati_grezzi")
}
fn default_domain() -> String {
    "garmin.com".to_string()
}
fn default_token_dir() -> PathBuf {
    data_dir()
        .map(|p| p.join("default"))
        .unwrap_or_else(|_| PathBuf::from(".garmin"))
}
fn default_consumer_url() -> String {
    "https://thegarth.s3.amazonaws.com/oauth_consumer.json".to_string()
}
fn default_activity_window() -> u32 {
    10
}
fn default_credentials_path() -> PathBuf {
    PathBuf::from("credenziali_google.json")
}
fn default_sheets_api_base() -> String {
    "https://sheets.googleapis.com".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_language() -> String {
    "Italian".to_string()
}
fn default_athlete_profile() -> String {
    "an ambitious professional with a demanding desk job whose passion is running".to_string()
}
fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_dashboard_url() -> String {
    "http://localhost:8501/".to_string()
}
fn default_settle_secs() -> u64 {
    2
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: default_staging_dir(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            token_dir: default_token_dir(),
            consumer_url: default_consumer_url(),
            api_base: None,
            activity_window: default_activity_window(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            credentials_path: default_credentials_path(),
            api_base: default_sheets_api_base(),
        }
    }
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_gemini_api_base(),
            language: default_language(),
            athlete_profile: default_athlete_profile(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_api_base(),
            dashboard_url: default_dashboard_url(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settle_secs: default_settle_secs(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from `.env`, an optional TOML file and `TWIN__*` overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let cfg = config::Config::builder()
            .add_source(
                config::File::from(file)
                    .required(path.is_some())
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("TWIN").separator("__"))
            .build()
            .map_err(|e| TwinError::config(format!("Failed to read configuration: {}", e)))?;

        cfg.try_deserialize()
            .map_err(|e| TwinError::config(format!("Invalid configuration: {}", e)))
    }

    /// Spreadsheet id, required by every stage that touches the sink
    pub fn spreadsheet_id(&self) -> Result<&str> {
        self.sink
            .spreadsheet_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                TwinError::config("sink.spreadsheet_id is not set (TWIN__SINK__SPREADSHEET_ID)")
            })
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_secs(self.orchestrator.settle_secs)
    }
}

/// Get the data directory garmin-cli stores its tokens under
/// Returns ~/.local/share/garmin on Unix, ~/Library/Application Support/garmin on macOS
pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(GARMIN_DIR_NAME))
        .ok_or_else(|| TwinError::config("Could not determine data directory"))
}

/// Ensure a directory exists, creating it if necessary.
/// Returns true when the directory had to be created.
pub fn ensure_dir(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    std::fs::create_dir_all(path)?;
    Ok(true)
}
