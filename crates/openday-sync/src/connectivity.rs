//! Connectivity monitoring with hysteresis
//!
//! Produces the single `online` signal the rest of the pipeline trusts.
//! Platform reachability events alone are unreliable: they reflect
//! link-layer presence, not whether the backend actually answers. The
//! monitor therefore combines platform signals with an active liveness
//! probe, and requires several consecutive network-shaped failures before
//! declaring offline. Recovery is immediate: one healthy probe flips the
//! state back. A false offline interrupts registration staff, while a late
//! online only delays queue draining by a few seconds, so the asymmetry
//! leans toward staying online.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use openday_core::{ProbeOutcome, RegistrationBackend};

use crate::config::ConnectivityConfig;
use crate::publisher::{StatusPublisher, SubscriptionToken};

/// Connectivity monitor
///
/// One instance per pipeline; state is instance-local so monitors in
/// different tests cannot contaminate each other.
pub struct ConnectivityMonitor<P> {
    backend: Arc<dyn RegistrationBackend<P>>,
    config: ConnectivityConfig,
    online: AtomicBool,
    consecutive_failures: AtomicU32,
    publisher: Arc<StatusPublisher<bool>>,
}

impl<P: Send + Sync + 'static> ConnectivityMonitor<P> {
    /// Create a monitor; initial state comes from
    /// [`ConnectivityConfig::assume_online`]
    pub fn new(
        backend: Arc<dyn RegistrationBackend<P>>,
        config: ConnectivityConfig,
        publisher: Arc<StatusPublisher<bool>>,
    ) -> Self {
        Self {
            backend,
            online: AtomicBool::new(config.assume_online),
            consecutive_failures: AtomicU32::new(0),
            config,
            publisher,
        }
    }

    /// Current connectivity state
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Register a connectivity subscriber
    ///
    /// The callback receives the current state synchronously before this
    /// returns, then every subsequent transition.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionToken
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        callback(self.is_online());
        self.publisher.subscribe(callback)
    }

    /// Remove a connectivity subscriber; idempotent
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        self.publisher.unsubscribe(token);
    }

    /// Run one probe against the liveness endpoint and apply the outcome
    ///
    /// The probe is bounded by the configured timeout; timing out counts
    /// as unreachable, not as an error to propagate.
    pub async fn probe_once(&self) -> ProbeOutcome {
        let outcome =
            match tokio::time::timeout(self.config.probe_timeout, self.backend.check_health())
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!(
                        timeout_ms = self.config.probe_timeout.as_millis() as u64,
                        "Health probe timed out"
                    );
                    ProbeOutcome::Unreachable
                }
            };

        self.apply_outcome(outcome);
        outcome
    }

    /// Platform reports the link is gone: declare offline immediately
    ///
    /// Also used by the gateway when a live submission fails with a
    /// network-shaped error between scheduled probes.
    pub fn signal_offline(&self) {
        self.consecutive_failures
            .store(self.config.failure_threshold, Ordering::SeqCst);
        self.transition_to(false);
    }

    /// Platform reports the link is back: reset the counter and re-probe
    ///
    /// Does not flip online by itself; the probe's answer decides.
    pub async fn signal_online(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        debug!("Platform reports connectivity, re-probing");
        self.probe_once().await;
    }

    fn apply_outcome(&self, outcome: ProbeOutcome) {
        match outcome {
            ProbeOutcome::Healthy => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
                self.transition_to(true);
            }
            ProbeOutcome::Degraded => {
                // Reachable but not proof of health: the network is not
                // implicated, so neither counter nor state moves
                warn!("Liveness endpoint reachable but response was not recognized");
            }
            ProbeOutcome::Unreachable => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(
                    failures,
                    threshold = self.config.failure_threshold,
                    "Health probe unreachable"
                );
                if failures >= self.config.failure_threshold {
                    self.transition_to(false);
                }
            }
        }
    }

    /// Flip the state if it differs, notifying subscribers exactly once
    /// per transition
    fn transition_to(&self, online: bool) {
        if self
            .online
            .compare_exchange(!online, online, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            if online {
                info!("Connectivity restored");
            } else {
                warn!("Connectivity lost");
            }
            self.publisher.notify(online);
        }
    }

    /// Spawn the periodic probe loop
    ///
    /// Probes immediately, then every `probe_interval` until the shutdown
    /// channel fires.
    pub fn spawn_probe_loop(
        monitor: Arc<Self>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.config.probe_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            info!(
                interval_ms = monitor.config.probe_interval.as_millis() as u64,
                "Connectivity probe loop started"
            );

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Connectivity probe loop stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        monitor.probe_once().await;
                    }
                }
            }
        })
    }
}

impl<P> std::fmt::Debug for ConnectivityMonitor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("online", &self.online.load(Ordering::SeqCst))
            .field(
                "consecutive_failures",
                &self.consecutive_failures.load(Ordering::SeqCst),
            )
            .finish()
    }
}
