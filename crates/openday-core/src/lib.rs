//! # Openday Core
//!
//! Core types, traits, and errors for the openday registration pipeline.
//!
//! Registration terminals at university open days keep accepting visitor
//! records even when the backend is unreachable. This crate provides the
//! shared vocabulary the rest of the workspace builds on:
//!
//! ## Key Traits
//!
//! - [`RegistrationBackend`]: Abstraction over the remote submission
//!   endpoint (live HTTP in production, scripted mocks in tests)
//! - [`RecordPayload`]: Bound alias for anything the queue can carry
//!
//! ## Key Types
//!
//! - [`RecordId`]: Store-assigned identifier for a queued record
//! - [`PendingRecord`]: A record waiting for submission
//! - [`RegistrationRecord`]: The prospective-student record terminals submit
//! - [`ProbeOutcome`]: Three-valued result of a health probe
//! - [`ServerAck`]: The backend's acknowledgement of an accepted record

pub mod backend;
pub mod error;
pub mod record;
pub mod registration;

// Re-export main types
pub use backend::{ProbeOutcome, RegistrationBackend, ServerAck};
pub use error::{StorageError, SubmitError, ValidationError};
pub use record::{PendingRecord, RecordId, RecordPayload};
pub use registration::{RegistrationRecord, YksType};
