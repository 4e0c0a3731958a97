//! Tracing subscriber setup
//!
//! Filtering comes from `RUST_LOG` and defaults to `info`. Audit events
//! are emitted under the `faf::audit` target, so
//! `RUST_LOG=info,faf::audit=off` silences them without touching the rest.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// With `json` set every event is written as one JSON object per line,
/// which is what log collectors in hosted environments expect. Events go
/// to stderr so command output on stdout stays clean.
///
/// # Errors
/// Returns error if a global subscriber is already installed
pub fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))
    }
}
