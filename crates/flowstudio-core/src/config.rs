//! Studio configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main studio configuration, loaded from .flowstudio/config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Config version
    pub version: Option<String>,

    /// Root of the user's documents (flows live beneath it)
    #[serde(default = "default_documents_root")]
    pub documents_root: PathBuf,

    /// Flows directory (relative to documents root)
    #[serde(default = "default_flows_dir")]
    pub flows_dir: PathBuf,

    /// File name of the per-flow document
    #[serde(default = "default_document_name")]
    pub document_name: String,

    /// File watching configuration
    #[serde(default)]
    pub watch: WatchConfig,

    /// Edge validation when connecting nodes
    #[serde(default)]
    pub edges: EdgePolicy,

    /// Hosted backend configuration
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_documents_root() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|d| d.join("Flowstudio")))
        .unwrap_or_else(|| PathBuf::from("flowstudio"))
}
fn default_flows_dir() -> PathBuf {
    PathBuf::from("flows")
}
fn default_document_name() -> String {
    "flow.toml".to_string()
}

/// File watching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Window in which bursts of change notifications collapse into one
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Poll interval for platforms without native notifications
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_debounce_ms() -> u64 {
    50
}
fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Which connections `connect` accepts.
///
/// Both default to `true`: the editor has never rejected repeated or
/// self-referential edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgePolicy {
    #[serde(default = "default_true")]
    pub allow_duplicates: bool,

    #[serde(default = "default_true")]
    pub allow_self_loops: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EdgePolicy {
    fn default() -> Self {
        Self {
            allow_duplicates: true,
            allow_self_loops: true,
        }
    }
}

/// Hosted backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the REST API (e.g. https://api.example.com/v1)
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Account the CLI operates on
    pub account_id: Option<String>,
}

fn default_api_key_env() -> String {
    "FLOWSTUDIO_API_KEY".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: default_api_key_env(),
            account_id: None,
        }
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            version: None,
            documents_root: default_documents_root(),
            flows_dir: default_flows_dir(),
            document_name: default_document_name(),
            watch: WatchConfig::default(),
            edges: EdgePolicy::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl StudioConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load from project root (looks for .flowstudio/config.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".flowstudio/config.yaml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve a relative documents root against the project root
    pub fn resolve_paths(&mut self, project_root: &Path) {
        self.documents_root = project_root.join(&self.documents_root);
    }

    /// Directory holding one sub-directory per flow
    pub fn flows_root(&self) -> PathBuf {
        self.documents_root.join(&self.flows_dir)
    }
}
