//! # Openday Sync
//!
//! The offline-resilient submission pipeline for open-day registration
//! terminals.
//!
//! A terminal keeps accepting visitor records when the backend or the
//! network is gone: records land in a durable queue, connectivity is
//! watched with hysteresis so a single blip never interrupts staff, and
//! the queue is drained exactly once per recovery.
//!
//! ## Components
//!
//! - [`ConnectivityMonitor`]: Combines platform signals with active
//!   liveness probes; slow to declare offline, instant to recover
//! - [`SyncEngine`]: Single-flight queue draining with per-record
//!   success/failure accounting
//! - [`SubmissionGateway`]: The one entry point the UI calls; hides the
//!   online/offline branch and self-corrects mid-call
//! - [`StatusPublisher`]: Callback registry for UI indicators
//! - [`OfflinePipeline`]: Wires everything together and owns the tasks
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use openday_outbox::FileOutbox;
//! use openday_sync::{OfflinePipeline, SyncConfig};
//!
//! let outbox = Arc::new(FileOutbox::new("./terminal-data").await?);
//! let pipeline = OfflinePipeline::new(backend, outbox, SyncConfig::default());
//! pipeline.start().await?;
//!
//! match pipeline.submit(record).await? {
//!     outcome if outcome.is_offline() => println!("saved for later"),
//!     _ => println!("accepted"),
//! }
//! ```

pub mod config;
pub mod connectivity;
pub mod engine;
pub mod gateway;
pub mod pipeline;
pub mod publisher;

// Re-export main types
pub use config::{ConfigWarning, ConnectivityConfig, SyncConfig};
pub use connectivity::ConnectivityMonitor;
pub use engine::{DrainReport, SyncEngine};
pub use gateway::{SubmissionGateway, SubmitOutcome};
pub use pipeline::{OfflinePipeline, PipelineError};
pub use publisher::{StatusPublisher, SubscriptionToken};
