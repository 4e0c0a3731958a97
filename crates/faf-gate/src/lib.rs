//! FAF Gate
//!
//! The trusted boundary every project DNA mutation crosses before it is
//! committed. Checks are pure and synchronous; they decide accept or reject
//! and name the violated invariant.
//!
//! # Example
//!
//! ```rust,ignore
//! use faf_gate::{MutationProposal, SecurityGate};
//!
//! let proposal = MutationProposal {
//!     prior: &current,
//!     candidate: &candidate,
//!     updates: &updates,
//!     proposed_at: Some(&stamp),
//! };
//! SecurityGate::new().check(&proposal)?;
//! ```

#![warn(unreachable_pub)]

pub mod gate;
pub mod timestamp;

pub use gate::{
    check_scoring_guard, check_temporal_integrity, raises_distinction, GateViolation, Invariant,
    MutationProposal, SecurityGate, DISTINCTION_REQUIRED_SCORE,
};
pub use timestamp::{format_instant, parse_instant};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
