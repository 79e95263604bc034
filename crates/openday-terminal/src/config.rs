//! Terminal configuration
//!
//! A TOML file supplies defaults; command-line flags override it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use openday_client::HttpBackendConfig;
use openday_sync::{ConnectivityConfig, SyncConfig};

/// Configuration for one registration terminal
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Base URL of the registration API
    pub backend_url: String,
    /// Directory for the durable queue
    pub data_dir: PathBuf,
    /// Bearer token attached to submissions, when required
    pub bearer_token: Option<String>,
    /// Seconds between liveness probes
    pub probe_interval_secs: u64,
    /// Seconds before one probe is abandoned
    pub probe_timeout_secs: u64,
    /// Consecutive failed probes before declaring offline
    pub failure_threshold: u32,
    /// Connectivity assumed at startup
    pub assume_online: bool,
    /// Replay leftover records when the terminal starts
    pub drain_on_start: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            data_dir: PathBuf::from("./openday-data"),
            bearer_token: None,
            probe_interval_secs: 15,
            probe_timeout_secs: 5,
            failure_threshold: 3,
            assume_online: true,
            drain_on_start: true,
        }
    }
}

impl TerminalConfig {
    /// Load from a TOML file, or fall back to defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line overrides
    pub fn merged_with(
        mut self,
        backend_url: Option<String>,
        data_dir: Option<PathBuf>,
        bearer_token: Option<String>,
    ) -> Self {
        if let Some(url) = backend_url {
            self.backend_url = url;
        }
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(token) = bearer_token {
            self.bearer_token = Some(token);
        }
        self
    }

    /// Settings for the HTTP backend
    pub fn http_backend(&self) -> HttpBackendConfig {
        let mut config = HttpBackendConfig::new(self.backend_url.clone())
            .with_probe_timeout(Duration::from_secs(self.probe_timeout_secs));
        if let Some(token) = &self.bearer_token {
            config = config.with_bearer_token(token.clone());
        }
        config
    }

    /// Settings for the submission pipeline
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::default()
            .with_connectivity(
                ConnectivityConfig::default()
                    .with_probe_interval(Duration::from_secs(self.probe_interval_secs))
                    .with_probe_timeout(Duration::from_secs(self.probe_timeout_secs))
                    .with_failure_threshold(self.failure_threshold)
                    .with_assume_online(self.assume_online),
            )
            .with_drain_on_start(self.drain_on_start)
    }
}
