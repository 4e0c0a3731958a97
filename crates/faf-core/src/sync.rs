//! Front-matter bi-sync
//!
//! Mirrors the document's score into the YAML front matter of a markdown
//! context file (e.g. `GEMINI.md`) so that agents reading only the markdown
//! see the same readiness figure. The markdown body and unrelated front
//! matter keys are preserved.

use faf_dna::{score, DnaError, ProjectDna};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

const FENCE: &str = "---";
const BRONZE_THRESHOLD: u8 = 85;
const UNKNOWN_SYNC: &str = "unknown";

/// Front-matter sync failures
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A file could not be read or written
    #[error("cannot access {path}: {error}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying failure
        error: std::io::Error,
    },

    /// The `.faf` document is malformed
    #[error(transparent)]
    Dna(#[from] DnaError),

    /// Existing front matter is not a YAML mapping
    #[error("front matter is not a mapping: {0}")]
    FrontMatter(String),
}

/// Readiness tier written to `faf_tier`
#[must_use]
pub fn tier_label(score: u8) -> &'static str {
    if score >= BRONZE_THRESHOLD {
        "Bronze"
    } else {
        "Incomplete"
    }
}

/// Split `---`-fenced front matter from the body
fn split_front_matter(markdown: &str) -> Option<(&str, &str)> {
    let rest = markdown
        .strip_prefix(FENCE)
        .and_then(|r| r.strip_prefix("\r\n").or_else(|| r.strip_prefix('\n')))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let header = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((header, body));
        }
        offset += line.len();
    }
    None
}

/// Rewrite the front matter of `markdown` with the document's score
///
/// # Errors
/// Returns error if existing front matter is not a mapping
pub fn sync_frontmatter(dna: &ProjectDna, markdown: &str) -> Result<String, SyncError> {
    let (mut meta, body) = match split_front_matter(markdown) {
        Some((header, body)) if header.trim().is_empty() => (Mapping::new(), body),
        Some((header, body)) => match serde_yaml::from_str::<Value>(header) {
            Ok(Value::Mapping(map)) => (map, body),
            Ok(other) => return Err(SyncError::FrontMatter(format!("{other:?}"))),
            Err(e) => return Err(SyncError::FrontMatter(e.to_string())),
        },
        None => (Mapping::new(), markdown),
    };

    let value = score(dna);
    meta.insert("faf_score".into(), format!("{value}%").into());
    meta.insert("faf_tier".into(), tier_label(value).into());
    meta.insert(
        "last_sync".into(),
        dna.generated().unwrap_or(UNKNOWN_SYNC).into(),
    );

    let header = serde_yaml::to_string(&meta)
        .map_err(|e| SyncError::Dna(DnaError::Serialization(e.to_string())))?;
    Ok(format!("{FENCE}\n{header}{FENCE}\n{body}"))
}

/// Sync the markdown file at `markdown_path` from the `.faf` at `faf_path`
///
/// Returns the score that was written.
///
/// # Errors
/// Returns error if either file cannot be accessed or parsed
pub fn sync_file(faf_path: &Path, markdown_path: &Path) -> Result<u8, SyncError> {
    let read = |path: &Path| {
        std::fs::read_to_string(path).map_err(|error| SyncError::Io {
            path: path.to_path_buf(),
            error,
        })
    };

    let dna = ProjectDna::from_yaml(&read(faf_path)?)?;
    let markdown = match std::fs::read_to_string(markdown_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(error) => {
            return Err(SyncError::Io {
                path: markdown_path.to_path_buf(),
                error,
            })
        }
    };

    let synced = sync_frontmatter(&dna, &markdown)?;
    std::fs::write(markdown_path, synced).map_err(|error| SyncError::Io {
        path: markdown_path.to_path_buf(),
        error,
    })?;

    let value = score(&dna);
    tracing::info!(
        markdown = %markdown_path.display(),
        score = value,
        tier = tier_label(value),
        "front matter synced"
    );
    Ok(value)
}
