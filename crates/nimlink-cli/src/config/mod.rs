//! Configuration loading for nimlink.
//! Reads nimlink.toml from the current directory or the path in NIMLINK_CONFIG.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use nimlink_chem::{ConversionOptions, EmbedOptions, FailurePolicy};
use nimlink_nim::ClientOptions;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const CONFIG_ENV: &str = "NIMLINK_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "nimlink.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub nim: NimConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NimConfig {
    #[serde(default = "default_esmfold_url")]
    pub esmfold_url: String,
    #[serde(default = "default_diffdock_url")]
    pub diffdock_url: String,
    /// Unset means no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_esmfold_url()  -> String { "http://localhost:8000".to_string() }
fn default_diffdock_url() -> String { "http://localhost:8001".to_string() }

impl Default for NimConfig {
    fn default() -> Self {
        Self {
            esmfold_url: default_esmfold_url(),
            diffdock_url: default_diffdock_url(),
            request_timeout_secs: None,
        }
    }
}

impl NimConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default = "default_embed_attempts")]
    pub max_embed_attempts: u32,
    #[serde(default = "default_optimize_iterations")]
    pub max_optimize_iterations: u32,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_output_dir()          -> PathBuf { PathBuf::from("output") }
fn default_embed_attempts()      -> u32 { 10 }
fn default_optimize_iterations() -> u32 { 200 }

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            random_seed: None,
            max_embed_attempts: default_embed_attempts(),
            max_optimize_iterations: default_optimize_iterations(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl ConversionConfig {
    pub fn options(&self) -> ConversionOptions {
        ConversionOptions {
            embed: EmbedOptions {
                random_seed: self.random_seed,
                max_attempts: self.max_embed_attempts,
                max_iterations: self.max_optimize_iterations,
            },
            failure_policy: self.failure_policy,
        }
    }
}

impl Config {
    /// Load from `$NIMLINK_CONFIG`, falling back to `./nimlink.toml`.
    /// A missing file is not an error: defaults are used.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }
}
