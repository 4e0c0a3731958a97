//! FAF Dialect
//!
//! Everything needed to present one project DNA document to many agents:
//!
//! - **Agent resolution** from an explicit header or a client string
//! - **Dialect projection** into one of six fixed payload shapes
//! - **Tag markup** encoding for agents that read XML
//! - **Score badge** rendering
//!
//! # Example
//!
//! ```rust,ignore
//! use faf_dialect::{resolve_agent, translate, AgentSignals};
//!
//! let agent = resolve_agent(&AgentSignals::new(None, Some("claude-code/2.0")));
//! let translation = translate(&dna, &agent);
//! let body = translation.render()?;
//! ```

#![warn(unreachable_pub)]

pub mod agent;
pub mod badge;
pub mod dialect;
pub mod markup;

pub use agent::{resolve_agent, AgentIdentity, AgentSignals};
pub use badge::{render_badge, Badge, Tier, BADGE_CONTENT_TYPE};
pub use dialect::{translate, Dialect, Translation, JSON_CONTENT_TYPE, MARKUP_CONTENT_TYPE};
pub use markup::to_markup;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
