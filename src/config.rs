//! Configuration file for the command-line front end
//!
//! Location: ~/.vllm-client/config.toml. Every key is optional; command-line
//! flags take precedence over the file.
//!
//! ```toml
//! [server]
//! base_url = "http://127.0.0.1:8000"
//! timeout_secs = 60
//!
//! [sampling]
//! n = 1
//! temperature = 0.7
//! max_tokens = 200
//! ```

use crate::streaming::DEFAULT_VLLM_URL;
use crate::types::SamplingParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

/// Server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_VLLM_URL.to_string(),
            timeout_secs: None,
        }
    }
}

/// Default sampling parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub n: Option<u32>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl Config {
    /// Load from an explicit path, else the default location, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        match Self::config_path() {
            Ok(default_path) if default_path.exists() => Self::load_from_file(&default_path),
            _ => Ok(Config::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".vllm-client").join("config.toml"))
    }

    /// Default request timeout, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.server.timeout_secs.map(Duration::from_secs)
    }

    /// Sampling parameters built from the `[sampling]` table
    pub fn sampling_params(&self) -> SamplingParams {
        let mut params = SamplingParams::new();
        if let Some(n) = self.sampling.n {
            params = params.n(n);
        }
        if let Some(temperature) = self.sampling.temperature {
            params = params.temperature(temperature);
        }
        if let Some(max_tokens) = self.sampling.max_tokens {
            params = params.max_tokens(max_tokens);
        }
        params
    }
}
