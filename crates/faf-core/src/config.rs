//! Broker configuration
//!
//! Loaded from an optional TOML file and then overridden by `FAF_*`
//! environment variables. Every field has a default, so an empty file (or
//! no file) yields a working local-store configuration.
//!
//! Credentials are never read from the file; only the name of the variable
//! or the path of the secret file holding them.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Variable overriding [`BrokerConfig::document_path`]
pub const ENV_DOCUMENT_PATH: &str = "FAF_DOCUMENT_PATH";
/// Variable overriding [`BrokerConfig::listen_addr`]
pub const ENV_LISTEN_ADDR: &str = "FAF_LISTEN_ADDR";
/// Variable selecting the store kind (`local` or `github`)
pub const ENV_STORE: &str = "FAF_STORE";
/// Variable overriding the repository owner
pub const ENV_GITHUB_OWNER: &str = "FAF_GITHUB_OWNER";
/// Variable overriding the repository name
pub const ENV_GITHUB_REPO: &str = "FAF_GITHUB_REPO";
/// Variable overriding the branch
pub const ENV_GITHUB_BRANCH: &str = "FAF_GITHUB_BRANCH";
/// Variable overriding the API base URL
pub const ENV_GITHUB_API: &str = "FAF_GITHUB_API";
/// Variable naming the variable that holds the token
pub const ENV_TOKEN_ENV: &str = "FAF_TOKEN_ENV";
/// Variable switching the audit sink to a JSON-lines file
pub const ENV_AUDIT_LOG: &str = "FAF_AUDIT_LOG";

const DEFAULT_DOCUMENT_PATH: &str = "project.faf";
const DEFAULT_COMMIT_MESSAGE: &str = "voice: update project DNA";
const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {error}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying failure
        error: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// An override carried an unusable value
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Setting name
        key: &'static str,
        /// Offending value
        value: String,
    },

    /// A required setting is empty
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Top-level broker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Document served when a request names none
    pub document_path: String,
    /// HTTP listen address
    pub listen_addr: SocketAddr,
    /// Document store
    pub store: StoreConfig,
    /// Bounds on external calls
    pub timeouts: TimeoutConfig,
    /// Audit sink
    pub audit: AuditConfig,
    /// Commit message used when a mutation carries none
    pub default_commit_message: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            document_path: DEFAULT_DOCUMENT_PATH.to_string(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            store: StoreConfig::default(),
            timeouts: TimeoutConfig::default(),
            audit: AuditConfig::default(),
            default_commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }
}

/// Where the document lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Files under a local directory
    Local {
        /// Root directory
        #[serde(default = "default_root")]
        root: PathBuf,
    },
    /// Contents API of a Git hosting service
    Github {
        /// Repository owner
        #[serde(default)]
        owner: String,
        /// Repository name
        #[serde(default)]
        repo: String,
        /// Branch
        #[serde(default = "default_branch")]
        branch: String,
        /// API base URL
        #[serde(default = "default_api_base")]
        api_base: String,
        /// Name of the variable holding the token
        #[serde(default = "default_token_env")]
        token_env: String,
        /// Secret file holding the token; preferred over `token_env`
        #[serde(default)]
        token_file: Option<PathBuf>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Local {
            root: default_root(),
        }
    }
}

impl StoreConfig {
    fn github_defaults() -> Self {
        Self::Github {
            owner: String::new(),
            repo: String::new(),
            branch: default_branch(),
            api_base: default_api_base(),
            token_env: default_token_env(),
            token_file: None,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

/// Bounds on external calls, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Store read and write
    pub store_ms: u64,
    /// Audit emission
    pub audit_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            store_ms: 10_000,
            audit_ms: 2_000,
        }
    }
}

impl TimeoutConfig {
    /// Store bound as a duration
    #[inline]
    #[must_use]
    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }

    /// Audit bound as a duration
    #[inline]
    #[must_use]
    pub fn audit(&self) -> Duration {
        Duration::from_millis(self.audit_ms)
    }
}

/// Where audit records go
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditConfig {
    /// Structured log events
    #[default]
    Tracing,
    /// One JSON object per line, appended to a file
    Jsonl {
        /// Log file
        path: PathBuf,
    },
}

impl BrokerConfig {
    /// Parse TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid for this schema
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load an optional file, then apply process environment overrides
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or an override is
    /// invalid
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
                    path: path.to_path_buf(),
                    error,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FAF_*` overrides from a lookup function
    ///
    /// # Errors
    /// Returns error if an override value is unusable
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_DOCUMENT_PATH) {
            self.document_path = path;
        }
        if let Some(addr) = get(ENV_LISTEN_ADDR) {
            self.listen_addr = addr.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_LISTEN_ADDR,
                value: addr,
            })?;
        }
        if let Some(kind) = get(ENV_STORE) {
            let is_github = matches!(self.store, StoreConfig::Github { .. });
            match kind.as_str() {
                "local" if is_github => self.store = StoreConfig::default(),
                "github" if !is_github => self.store = StoreConfig::github_defaults(),
                "local" | "github" => {}
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_STORE,
                        value: kind.clone(),
                    })
                }
            }
        }
        if let StoreConfig::Github {
            owner,
            repo,
            branch,
            api_base,
            token_env,
            ..
        } = &mut self.store
        {
            for (key, slot) in [
                (ENV_GITHUB_OWNER, owner),
                (ENV_GITHUB_REPO, repo),
                (ENV_GITHUB_BRANCH, branch),
                (ENV_GITHUB_API, api_base),
                (ENV_TOKEN_ENV, token_env),
            ] {
                if let Some(value) = get(key) {
                    *slot = value;
                }
            }
        }
        if let Some(path) = get(ENV_AUDIT_LOG) {
            self.audit = AuditConfig::Jsonl {
                path: PathBuf::from(path),
            };
        }
        Ok(())
    }

    /// Check required settings
    ///
    /// # Errors
    /// Returns error if a required setting is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.document_path.trim().is_empty() {
            return Err(ConfigError::Missing("document_path"));
        }
        if let StoreConfig::Github {
            owner,
            repo,
            token_env,
            token_file,
            ..
        } = &self.store
        {
            if owner.trim().is_empty() {
                return Err(ConfigError::Missing("store.owner"));
            }
            if repo.trim().is_empty() {
                return Err(ConfigError::Missing("store.repo"));
            }
            if token_file.is_none() && token_env.trim().is_empty() {
                return Err(ConfigError::Missing("store.token_env"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = BrokerConfig::from_toml_str("").unwrap();
        assert_eq!(config, BrokerConfig::default());
        assert_eq!(config.document_path, "project.faf");
        assert_eq!(config.timeouts.store_ms, 10_000);
        assert_eq!(config.audit, AuditConfig::Tracing);
    }

    #[test]
    fn parses_github_store() {
        let config = BrokerConfig::from_toml_str(
            r#"
            document_path = "dna/project.faf"

            [store]
            kind = "github"
            owner = "acme"
            repo = "dna"

            [audit]
            kind = "jsonl"
            path = "/var/log/faf-audit.jsonl"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Github {
                owner: "acme".into(),
                repo: "dna".into(),
                branch: "main".into(),
                api_base: "https://api.github.com".into(),
                token_env: "GITHUB_TOKEN".into(),
                token_file: None,
            }
        );
        assert!(matches!(config.audit, AuditConfig::Jsonl { .. }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_switches_store_and_fills_fields() {
        let mut config = BrokerConfig::default();
        config
            .apply_env(env(&[
                ("FAF_STORE", "github"),
                ("FAF_GITHUB_OWNER", "acme"),
                ("FAF_GITHUB_REPO", "dna"),
                ("FAF_GITHUB_BRANCH", "trunk"),
                ("FAF_TOKEN_ENV", "FAF_PAT"),
                ("FAF_LISTEN_ADDR", "127.0.0.1:9000"),
            ]))
            .unwrap();

        let StoreConfig::Github { owner, branch, token_env, .. } = &config.store else {
            panic!("expected github store");
        };
        assert_eq!(owner, "acme");
        assert_eq!(branch, "trunk");
        assert_eq!(token_env, "FAF_PAT");
        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn github_without_repo_fails_validation() {
        let mut config = BrokerConfig::default();
        config
            .apply_env(env(&[("FAF_STORE", "github"), ("FAF_GITHUB_OWNER", "acme")]))
            .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("store.repo"))));
    }

    #[test]
    fn bad_overrides_are_rejected() {
        let mut config = BrokerConfig::default();
        assert!(config.apply_env(env(&[("FAF_STORE", "s3")])).is_err());
        assert!(config
            .apply_env(env(&[("FAF_LISTEN_ADDR", "not-an-addr")]))
            .is_err());
    }

    #[test]
    fn audit_log_override() {
        let mut config = BrokerConfig::default();
        config
            .apply_env(env(&[("FAF_AUDIT_LOG", "/tmp/audit.jsonl")]))
            .unwrap();
        assert_eq!(
            config.audit,
            AuditConfig::Jsonl {
                path: PathBuf::from("/tmp/audit.jsonl")
            }
        );
    }
}
