use std::{path::PathBuf, str::FromStr, time::Duration};

use tracing::debug;

use crate::foundation::error::{FlipbookError, FlipbookResult};

/// Default Gemini model used for image generation.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
/// Default Gemini API base URL.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Runtime configuration resolved from the environment (and an optional `.env` file).
///
/// | variable | default |
/// |---|---|
/// | `FLIPBOOK_API_KEY` / `GEMINI_API_KEY` | unset |
/// | `FLIPBOOK_MODEL` | [`DEFAULT_MODEL`] |
/// | `FLIPBOOK_API_BASE` | [`DEFAULT_API_BASE`] |
/// | `FLIPBOOK_TIMEOUT_SECS` | 120 |
/// | `FLIPBOOK_MAX_RETRIES` | 2 |
/// | `FLIPBOOK_RETRY_BACKOFF_MS` | 1500 |
/// | `FLIPBOOK_OUTPUT_DIR` | `output` |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// API key for the generation backend.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Base URL of the generation API.
    pub api_base: String,
    /// Timeout for a single generation request.
    pub request_timeout: Duration,
    /// Extra attempts per frame after the first one fails.
    pub max_retries: u32,
    /// Pause between attempts of the same frame.
    pub retry_backoff: Duration,
    /// Directory receiving animations and kept frames.
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(120),
            max_retries: 2,
            retry_backoff: Duration::from_millis(1500),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> FlipbookResult<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(FlipbookError::config(format!("failed to load .env: {e}"))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> FlipbookResult<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Self::default();

        cfg.api_key = get("FLIPBOOK_API_KEY").or_else(|| get("GEMINI_API_KEY"));
        if let Some(model) = get("FLIPBOOK_MODEL") {
            cfg.model = model;
        }
        if let Some(base) = get("FLIPBOOK_API_BASE") {
            cfg.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get("FLIPBOOK_TIMEOUT_SECS") {
            cfg.request_timeout = Duration::from_secs(parse_var("FLIPBOOK_TIMEOUT_SECS", &secs)?);
        }
        if let Some(n) = get("FLIPBOOK_MAX_RETRIES") {
            cfg.max_retries = parse_var("FLIPBOOK_MAX_RETRIES", &n)?;
        }
        if let Some(ms) = get("FLIPBOOK_RETRY_BACKOFF_MS") {
            cfg.retry_backoff = Duration::from_millis(parse_var("FLIPBOOK_RETRY_BACKOFF_MS", &ms)?);
        }
        if let Some(dir) = get("FLIPBOOK_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(dir);
        }

        Ok(cfg)
    }
}

fn parse_var<T>(key: &str, raw: &str) -> FlipbookResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| FlipbookError::config(format!("{key}='{raw}' is not valid: {e}")))
}
