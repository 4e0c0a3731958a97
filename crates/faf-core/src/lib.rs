//! FAF Core
//!
//! The I/O side of the project DNA broker:
//!
//! - **Stores**: read-with-version and conditional write (memory, local
//!   files, Git-hosting contents API)
//! - **Commit coordination**: merge, gate, optimistic write, audit
//! - **Broker facade**: badge, per-agent document and mutation paths
//! - **Ambient stack**: configuration, credentials, audit sinks and the
//!   error taxonomy every caller sees
//!
//! # Example
//!
//! ```rust,ignore
//! use faf_core::{BrokerConfig, FafBroker, MutationRequest};
//!
//! let broker = FafBroker::from_config(BrokerConfig::load(None)?)?;
//! let response = broker.mutate(&MutationRequest {
//!     updates: Some(updates),
//!     ..MutationRequest::default()
//! }).await?;
//! println!("committed {}", response.sha);
//! ```

#![warn(unreachable_pub)]

pub mod audit;
pub mod broker;
pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod store;
pub mod sync;

pub use audit::{AuditError, AuditRecord, AuditSink, JsonlAuditSink, MemoryAuditSink, TracingAuditSink};
pub use broker::{DocumentRequest, DocumentResponse, FafBroker, MutationRequest, MutationResponse};
pub use config::{AuditConfig, BrokerConfig, ConfigError, StoreConfig, TimeoutConfig};
pub use coordinator::{
    Clock, CommitCoordinator, CommitOutcome, FixedClock, MutationCommand, MutationState,
    SystemClock,
};
pub use credentials::{
    CredentialError, CredentialSource, EnvCredentials, FileCredentials, StaticCredentials,
};
pub use error::{redact, BrokerError};
pub use store::{
    CommitRecord, DnaStore, GitHubContentsStore, GitHubTarget, LocalFileStore, MemoryStore,
    StoreError, StoredDna,
};
pub use sync::{sync_file, sync_frontmatter, tier_label, SyncError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
