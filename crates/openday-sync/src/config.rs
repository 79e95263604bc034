//! Configuration for the submission pipeline

use std::time::Duration;

/// Configuration for the connectivity monitor
#[derive(Debug, Clone)]
pub struct ConnectivityConfig {
    /// How often to probe the liveness endpoint
    pub probe_interval: Duration,
    /// Hard bound on one probe; a timed-out probe counts as unreachable
    pub probe_timeout: Duration,
    /// Consecutive unreachable probes required before declaring offline.
    /// Deliberately asymmetric with recovery: a single healthy probe
    /// restores online state immediately.
    pub failure_threshold: u32,
    /// State assumed at startup, standing in for the platform's
    /// reachability signal
    pub assume_online: bool,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(5),
            failure_threshold: 3,
            assume_online: true,
        }
    }
}

impl ConnectivityConfig {
    /// Set the probe interval
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Set the probe timeout
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the offline threshold
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set the assumed startup state
    pub fn with_assume_online(mut self, assume_online: bool) -> Self {
        self.assume_online = assume_online;
        self
    }
}

/// Configuration for the whole pipeline
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Connectivity monitor settings
    pub connectivity: ConnectivityConfig,
    /// Whether `start()` runs one drain immediately, replaying records
    /// left over from a previous run
    pub drain_on_start: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            connectivity: ConnectivityConfig::default(),
            drain_on_start: true,
        }
    }
}

impl SyncConfig {
    /// Set the connectivity settings
    pub fn with_connectivity(mut self, connectivity: ConnectivityConfig) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Enable or disable the startup drain
    pub fn with_drain_on_start(mut self, drain_on_start: bool) -> Self {
        self.drain_on_start = drain_on_start;
        self
    }

    /// Validate configuration invariants
    ///
    /// Returns warnings for settings that would misbehave. An empty list
    /// means the configuration is sound.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.connectivity.failure_threshold == 0 {
            warnings.push(ConfigWarning::ZeroFailureThreshold);
        }
        if self.connectivity.probe_interval.is_zero() {
            warnings.push(ConfigWarning::ZeroProbeInterval);
        }
        if self.connectivity.probe_timeout >= self.connectivity.probe_interval {
            warnings.push(ConfigWarning::TimeoutExceedsInterval);
        }

        warnings
    }

    /// Check if the configuration is sound
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Configuration warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A threshold of zero would declare offline before any probe ran
    ZeroFailureThreshold,
    /// Probes would spin without pause
    ZeroProbeInterval,
    /// A probe could still be in flight when the next one is due
    TimeoutExceedsInterval,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::ZeroFailureThreshold => {
                write!(f, "failure_threshold must be at least 1")
            }
            ConfigWarning::ZeroProbeInterval => write!(f, "probe_interval must be non-zero"),
            ConfigWarning::TimeoutExceedsInterval => {
                write!(f, "probe_timeout should be shorter than probe_interval")
            }
        }
    }
}
