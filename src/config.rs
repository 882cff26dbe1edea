//! Runtime configuration for the caption form.
//!
//! Everything the page offers (styles, languages, the remote endpoint) comes
//! from here rather than from the page itself. Values are read from the
//! environment; the binary loads `.env` into it before anything else:
//! - CAPTION_API_URL: base URL of the captioning service (`/generate` is appended)
//! - CAPTION_STYLES: comma list of `value[:Label]`
//! - CAPTION_LANGUAGES: comma list of `value[:Label]`
//! - COPY_ACK_MS: how long "Copied!" stays visible
//! - REQUEST_TIMEOUT_SECS: optional timeout for the remote call
//! - BIND_ADDR, MAX_UPLOAD_BYTES, STATIC_DIR

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_COPY_ACK: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Style value that asks the server to pick a style itself.
pub const RANDOM_STYLE: &str = "random";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must list at least one option")]
    EmptyOptions { key: &'static str },

    #[error("{key} has an option with an empty value")]
    BlankOption { key: &'static str },

    #[error("{key} lists {value} twice")]
    DuplicateOption { key: &'static str, value: String },

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// One entry of a fixed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormConfig {
    pub api_base_url: String,
    pub styles: Vec<ChoiceOption>,
    pub languages: Vec<ChoiceOption>,
    pub copy_ack: Duration,
    pub request_timeout: Option<Duration>,
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
    pub static_dir: PathBuf,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            styles: default_styles(),
            languages: default_languages(),
            copy_ack: DEFAULT_COPY_ACK,
            request_timeout: None,
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000))),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            static_dir: PathBuf::from("static"),
        }
    }
}

pub fn default_styles() -> Vec<ChoiceOption> {
    vec![
        ChoiceOption::new("funny", "Funny"),
        ChoiceOption::new("inspiring", "Inspiring"),
        ChoiceOption::new("emotional", "Emotional"),
        ChoiceOption::new("witty", "Witty"),
        ChoiceOption::new("romantic", "Romantic"),
        ChoiceOption::new(RANDOM_STYLE, "Random"),
    ]
}

pub fn default_languages() -> Vec<ChoiceOption> {
    vec![
        ChoiceOption::new("en-us", "English (US)"),
        ChoiceOption::new("en-gb", "English (UK)"),
        ChoiceOption::new("ms", "Malay"),
        ChoiceOption::new("zh", "Chinese"),
        ChoiceOption::new("ta", "Tamil"),
    ]
}

impl FormConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("CAPTION_API_URL") {
            let url = url.trim().trim_end_matches('/').to_string();
            if url::Url::parse(&url).is_err() {
                return Err(ConfigError::Invalid {
                    key: "CAPTION_API_URL",
                    value: url,
                });
            }
            config.api_base_url = url;
        }
        if let Some(raw) = lookup("CAPTION_STYLES") {
            config.styles = parse_options("CAPTION_STYLES", &raw)?;
        }
        if let Some(raw) = lookup("CAPTION_LANGUAGES") {
            config.languages = parse_options("CAPTION_LANGUAGES", &raw)?;
        }
        if let Some(raw) = lookup("COPY_ACK_MS") {
            config.copy_ack = Duration::from_millis(parse_number("COPY_ACK_MS", &raw)?);
        }
        if let Some(raw) = lookup("REQUEST_TIMEOUT_SECS") {
            let secs = parse_number("REQUEST_TIMEOUT_SECS", &raw)?;
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(raw) = lookup("BIND_ADDR") {
            config.bind_addr = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_number("MAX_UPLOAD_BYTES", &raw)? as usize;
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn generate_url(&self) -> String {
        format!("{}/generate", self.api_base_url.trim_end_matches('/'))
    }
}

/// Parse `funny,witty:Witty!,random` into options. A missing label is the
/// value with its first letter capitalized.
pub fn parse_options(key: &'static str, raw: &str) -> Result<Vec<ChoiceOption>, ConfigError> {
    let mut options: Vec<ChoiceOption> = Vec::new();

    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (value, label) = match item.split_once(':') {
            Some((value, label)) => (value.trim(), label.trim().to_string()),
            None => (item, capitalize(item)),
        };
        if value.is_empty() {
            return Err(ConfigError::BlankOption { key });
        }
        if options.iter().any(|o| o.value == value) {
            return Err(ConfigError::DuplicateOption {
                key,
                value: value.to_string(),
            });
        }
        let label = if label.is_empty() { capitalize(value) } else { label };
        options.push(ChoiceOption::new(value, &label));
    }

    if options.is_empty() {
        return Err(ConfigError::EmptyOptions { key });
    }
    Ok(options)
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
