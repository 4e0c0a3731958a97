//! FAF DNA
//!
//! The project DNA document and the pure functions that read and reshape it.
//!
//! # Core Concepts
//!
//! - [`ProjectDna`]: a parsed `.faf` document (a string-keyed mapping)
//! - [`VersionToken`]: opaque optimistic-concurrency token for a stored document
//! - [`UpdateSet`]: ordered `project.goal`-style path → value mutations
//!   supplied by a caller
//! - [`score`] / [`has_distinction`]: completeness score and the Big Orange flag
//! - [`merge`]: applies an [`UpdateSet`] to a copy of a document
//!
//! # Example
//!
//! ```rust,ignore
//! use faf_dna::{merge, score, ProjectDna, UpdateSet};
//!
//! let dna = ProjectDna::from_yaml("project:\n  name: demo\n")?;
//! let updates = UpdateSet::from_json(r#"{"project.goal": "ship it"}"#)?;
//! let candidate = merge(&dna, &updates);
//! println!("score: {}", score(&candidate));
//! ```

#![warn(unreachable_pub)]

mod document;
mod error;
mod hash;
mod merge;
mod path;
mod score;
mod update;

pub use document::{is_truthy, ProjectDna, GENERATED_KEY, PLACEHOLDER};
pub use error::DnaError;
pub use hash::VersionToken;
pub use merge::merge;
pub use score::{has_distinction, score, DISTINCTION_LABEL, TOTAL_SLOTS};
pub use update::UpdateSet;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_merge_score_lifecycle() {
        let dna = ProjectDna::from_yaml(
            "project:\n  name: demo\n  goal: TBD\nstack:\n  frontend: none\n",
        )
        .unwrap();
        let before = score(&dna);

        let updates = UpdateSet::from_json(r#"{"project.goal": "ship it", "human_context": {"who": "devs"}}"#)
            .unwrap();
        let candidate = merge(&dna, &updates);

        assert_eq!(candidate.get_path("project.goal"), Some(&json!("ship it")));
        assert_eq!(candidate.get_path("project.name"), Some(&json!("demo")));
        assert!(score(&candidate) > before);
        assert!(!has_distinction(&candidate));
    }

    #[test]
    fn version_token_tracks_content() {
        let a = VersionToken::for_content(b"project: a\n");
        let b = VersionToken::for_content(b"project: b\n");
        assert_ne!(a, b);
        assert_eq!(a, VersionToken::for_content(b"project: a\n"));
    }
}
