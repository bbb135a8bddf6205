//! Deckmind Backend - external collaborator interfaces
//!
//! Defines the seams between the session core and the outside world:
//! - [`RemoteRecordStore`]: record CRUD + change-notification subscription
//! - [`GenerationBackend`]: image, evaluation, and candidate generation
//! - [`SessionPersistence`]: local durable key-value cache
//!
//! Everything here is trait-shaped so the session crates can be driven by
//! fakes in tests and by real transports in production. The one concrete
//! piece is [`FileStore`], a JSON-file persistence implementation, plus the
//! injected [`ReportCache`] in-memory layer.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod error;
pub mod generation;
pub mod persistence;
pub mod store;

// Re-exports for convenience
pub use cache::ReportCache;
pub use error::{GenerationError, PersistenceError, StoreError};
pub use generation::{CandidateContext, CandidateStream, DefinitionContext, GenerationBackend};
pub use persistence::{
    FileStore, PersistedEntry, SessionPersistence, SessionPersistenceExt, REPORT_FRESHNESS,
};
pub use store::{RecordUpdate, RemoteRecordStore};
