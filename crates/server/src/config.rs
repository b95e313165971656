use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" | "bunyan" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Hosted advice is skipped entirely without a key.
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// When false, `/analyze` answers 410 Gone.
    pub analysis_enabled: bool,
    pub max_upload_bytes: usize,
    pub rules_path: Option<PathBuf>,
    pub pdftotext_path: Option<PathBuf>,
    /// Fixed delimiter for text uploads; sniffed from the header when unset.
    pub delimiter: Option<char>,
    pub log_format: LogFormat,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub gemini: GeminiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            analysis_enabled: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            rules_path: None,
            pdftotext_path: None,
            delimiter: None,
            log_format: LogFormat::Pretty,
            cors_origins: Vec::new(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Optional TOML file named by `MONEYLEAKS_CONFIG`, then environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("MONEYLEAKS_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        base.with_overrides(|var| std::env::var(var).ok())
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// The configured delimiter as a byte, if one is set.
    pub fn delimiter_byte(&self) -> Result<Option<u8>, ConfigError> {
        self.delimiter
            .map(|c| {
                u8::try_from(c).ok().filter(u8::is_ascii).ok_or_else(|| ConfigError::Invalid {
                    var: "delimiter",
                    value: c.to_string(),
                })
            })
            .transpose()
    }

    /// Apply `MONEYLEAKS_*` / `GEMINI_*` variables read through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MONEYLEAKS_BIND") {
            self.bind = parse_var("MONEYLEAKS_BIND", &v)?;
        }
        if let Some(v) = get("MONEYLEAKS_ANALYSIS_ENABLED") {
            self.analysis_enabled = parse_bool("MONEYLEAKS_ANALYSIS_ENABLED", &v)?;
        }
        if let Some(v) = get("MONEYLEAKS_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = parse_var("MONEYLEAKS_MAX_UPLOAD_BYTES", &v)?;
        }
        if let Some(v) = get("MONEYLEAKS_RULES") {
            self.rules_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("MONEYLEAKS_PDFTOTEXT") {
            self.pdftotext_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("MONEYLEAKS_DELIMITER").filter(|v| !v.is_empty()) {
            self.delimiter = Some(parse_delimiter(&v)?);
        }
        if let Some(v) = get("MONEYLEAKS_LOG_FORMAT") {
            self.log_format = v.parse().map_err(|_| ConfigError::Invalid {
                var: "MONEYLEAKS_LOG_FORMAT",
                value: v.clone(),
            })?;
        }
        if let Some(v) = get("MONEYLEAKS_CORS_ORIGINS") {
            self.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = get("GEMINI_API_KEY") {
            self.gemini.api_key = Some(v);
        }
        if let Some(v) = get("GEMINI_MODEL") {
            self.gemini.model = v;
        }
        Ok(self)
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}

fn parse_delimiter(value: &str) -> Result<char, ConfigError> {
    let invalid = || ConfigError::Invalid { var: "MONEYLEAKS_DELIMITER", value: value.to_string() };
    match value {
        "\\t" | "tab" => Ok('\t'),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(invalid()),
            }
        }
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { var, value: value.to_string() }),
    }
}
