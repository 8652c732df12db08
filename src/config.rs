//! Configuration file support
//!
//! Settings are read from `humanizer.toml` in the working directory, or from
//! an explicit path.
//!
//! ```toml
//! mode = "aggressive"
//! seed = 42
//! emotion = "enthusiasm"
//! personal_touch = true
//!
//! [rate_limit]
//! max_requests = 20
//! window_ms = 60000
//!
//! [[patterns]]
//! matcher = "\\bsynergy\\b"
//! candidates = ["teamwork", "cooperation"]
//! category = "buzzword"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::error::HumanizeError;
use crate::mode::Mode;
use crate::patterns::{Emotion, PatternLibrary, PatternRule};
use crate::pipeline::Humanizer;
use crate::rate_limit::{RateLimitConfig, RateLimiter};

pub const CONFIG_FILE_NAME: &str = "humanizer.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid rate_limit: {0}")]
    RateLimit(String),

    #[error(transparent)]
    Pattern(#[from] HumanizeError),
}

/// A caller-supplied substitution rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomPattern {
    pub matcher: String,
    pub candidates: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "custom".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HumanizerConfig {
    pub mode: Mode,
    pub seed: Option<u64>,
    pub emotion: Option<Emotion>,
    pub personal_touch: bool,
    /// When absent the process-wide limiter is used.
    pub rate_limit: Option<RateLimitConfig>,
    pub patterns: Vec<CustomPattern>,
}

impl HumanizerConfig {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Build a pipeline with this configuration's rules and limiter.
    pub fn build(&self) -> Result<Humanizer, ConfigError> {
        let mut humanizer = Humanizer::new();

        if !self.patterns.is_empty() {
            let extra = self
                .patterns
                .iter()
                .map(|custom| PatternRule::new(&custom.matcher, custom.candidates.clone(), custom.category.as_str()))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(count = extra.len(), "loaded custom patterns");
            humanizer = humanizer.with_library(Arc::new(PatternLibrary::with_extra_rules(extra)));
        }

        if let Some(limits) = self.rate_limit {
            if limits.max_requests == 0 {
                return Err(ConfigError::RateLimit(
                    "max_requests must be at least 1".to_string(),
                ));
            }
            humanizer = humanizer.with_limiter(Arc::new(RateLimiter::new(limits)));
        }

        Ok(humanizer)
    }
}

/// Read configuration from an explicit file.
pub fn load_config_file(path: &Path) -> Result<HumanizerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = HumanizerConfig::from_toml_str(&content, path)?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Read `humanizer.toml` from `dir`, or fall back to defaults when absent.
pub fn load_config(dir: &Path) -> Result<HumanizerConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
        return Ok(HumanizerConfig::default());
    }
    load_config_file(&path)
}
