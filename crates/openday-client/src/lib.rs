//! # Openday Client
//!
//! HTTP implementation of the registration backend interface.
//!
//! Speaks to the registration API: `POST /api/students` for submissions
//! and `GET /api/health` for liveness probes. Failure classification
//! lives here, at the transport edge, so the pipeline above never has to
//! inspect HTTP specifics:
//!
//! - timeouts and connect failures are network-shaped (safe to queue);
//! - any answered rejection is application-shaped (never queued);
//! - a reachable server is only proof of health when it returns the
//!   recognized liveness payload.

pub mod http;

pub use http::{HttpBackend, HttpBackendConfig};
