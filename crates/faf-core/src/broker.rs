//! Broker facade
//!
//! The read path (badge, per-agent document) and the write path (mutation)
//! behind one type. Transport layers only translate requests into
//! [`DocumentRequest`] / [`MutationRequest`] and render the results.

use crate::audit::{AuditSink, JsonlAuditSink, TracingAuditSink};
use crate::config::{AuditConfig, BrokerConfig, StoreConfig};
use crate::coordinator::{Clock, CommitCoordinator, CommitOutcome, MutationCommand};
use crate::credentials::{CredentialSource, EnvCredentials, FileCredentials};
use crate::error::BrokerError;
use crate::store::{DnaStore, GitHubContentsStore, GitHubTarget, LocalFileStore};
use faf_dialect::{resolve_agent, translate, AgentIdentity, AgentSignals, Badge, Dialect};
use faf_dna::{has_distinction, score, UpdateSet};
use serde::Serialize;
use std::sync::Arc;

/// Request for the per-agent document
#[derive(Debug, Clone, Default)]
pub struct DocumentRequest {
    /// Document path; the configured default when absent
    pub path: Option<String>,
    /// Explicit identity header
    pub agent_header: Option<String>,
    /// Client identification string
    pub user_agent: Option<String>,
}

/// Per-agent document, ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentResponse {
    /// Resolved agent
    pub agent: AgentIdentity,
    /// Shape that was applied
    pub dialect: Dialect,
    /// Media type of `body`
    pub content_type: &'static str,
    /// Encoded payload
    pub body: String,
}

/// Request to mutate the document
#[derive(Debug, Clone, Default)]
pub struct MutationRequest {
    /// Updates to apply; absent and empty are both rejected
    pub updates: Option<UpdateSet>,
    /// Commit message; the configured default when absent
    pub message: Option<String>,
    /// Explicit identity header
    pub agent_header: Option<String>,
    /// Client identification string
    pub user_agent: Option<String>,
    /// Document path; the configured default when absent
    pub path: Option<String>,
}

/// Success payload of a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationResponse {
    /// Always `true`
    pub success: bool,
    /// New version token
    pub sha: String,
    /// Canonical reference to the committed state
    pub url: String,
    /// Commit message used
    pub message: String,
    /// Top-level keys applied
    pub updated: Vec<String>,
    /// Score of the committed document
    pub score: u8,
    /// Distinction of the committed document
    pub distinction: bool,
}

impl From<CommitOutcome> for MutationResponse {
    fn from(outcome: CommitOutcome) -> Self {
        Self {
            success: true,
            sha: outcome.commit.version.to_string(),
            url: outcome.commit.url,
            message: outcome.commit.message,
            updated: outcome.updated,
            score: outcome.score,
            distinction: outcome.distinction,
        }
    }
}

/// Read and write paths over one store
#[derive(Debug, Clone)]
pub struct FafBroker {
    config: Arc<BrokerConfig>,
    coordinator: CommitCoordinator,
}

impl FafBroker {
    /// Create a broker over explicit collaborators
    #[must_use]
    pub fn new(config: BrokerConfig, store: Arc<dyn DnaStore>, audit: Arc<dyn AuditSink>) -> Self {
        let coordinator = CommitCoordinator::new(store, audit, config.timeouts);
        Self {
            config: Arc::new(config),
            coordinator,
        }
    }

    /// Build store, credentials and audit sink from configuration
    ///
    /// # Errors
    /// Returns `Config` if the store credential cannot be resolved, or
    /// `Upstream` if the HTTP client cannot be built
    pub fn from_config(config: BrokerConfig) -> Result<Self, BrokerError> {
        let store = build_store(&config)?;
        let audit = build_audit(&config.audit);
        tracing::info!(
            store = store.name(),
            document = %config.document_path,
            "broker configured"
        );
        Ok(Self::new(config, store, audit))
    }

    /// Replace the mutation clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.coordinator = self.coordinator.with_clock(clock);
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    fn target_path<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.config.document_path)
    }

    /// Score badge for the document; the zero badge on any failure
    pub async fn badge(&self, path: Option<&str>) -> Badge {
        let path = self.target_path(path);
        match self.coordinator.load(path).await {
            Ok((dna, _)) => Badge::new(score(&dna), has_distinction(&dna)),
            Err(err) => {
                tracing::warn!(path, error = %err, "badge fell back to zero score");
                Badge::fallback()
            }
        }
    }

    /// The document projected for the calling agent
    ///
    /// # Errors
    /// Returns `NotFound`, `Parse`, `Upstream` or `Timeout` from the read
    pub async fn document(&self, request: &DocumentRequest) -> Result<DocumentResponse, BrokerError> {
        let agent = resolve_agent(&AgentSignals::new(
            request.agent_header.as_deref(),
            request.user_agent.as_deref(),
        ));
        let path = self.target_path(request.path.as_deref());
        let (dna, _) = self.coordinator.load(path).await?;

        let translation = translate(&dna, &agent);
        let body = translation
            .render()
            .map_err(|e| BrokerError::Internal(e.to_string()))?;
        tracing::info!(%agent, dialect = translation.dialect.format_name(), path, "document served");

        Ok(DocumentResponse {
            content_type: translation.content_type(),
            dialect: translation.dialect,
            agent,
            body,
        })
    }

    /// Merge, gate, commit and audit one mutation
    ///
    /// # Errors
    /// Returns `BadRequest` for a missing or empty update set (before any
    /// read), `SecurityRejected` for a gate violation, or the store failure
    pub async fn mutate(&self, request: &MutationRequest) -> Result<MutationResponse, BrokerError> {
        let agent = resolve_agent(&AgentSignals::new(
            request.agent_header.as_deref(),
            request.user_agent.as_deref(),
        ));
        let empty = UpdateSet::new();
        let updates = request.updates.as_ref().unwrap_or(&empty);
        let message = request
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.config.default_commit_message);

        let outcome = self
            .coordinator
            .commit(&MutationCommand {
                path: self.target_path(request.path.as_deref()),
                updates,
                message,
                agent: &agent,
            })
            .await?;
        Ok(outcome.into())
    }
}

fn build_store(config: &BrokerConfig) -> Result<Arc<dyn DnaStore>, BrokerError> {
    match &config.store {
        StoreConfig::Local { root } => Ok(Arc::new(LocalFileStore::new(root))),
        StoreConfig::Github {
            owner,
            repo,
            branch,
            api_base,
            token_env,
            token_file,
        } => {
            let credentials: Arc<dyn CredentialSource> = match token_file {
                Some(path) => Arc::new(FileCredentials::new(path)),
                None => Arc::new(EnvCredentials::new(token_env)),
            };
            credentials.resolve()?;
            let target = GitHubTarget {
                api_base: api_base.clone(),
                owner: owner.clone(),
                repo: repo.clone(),
                branch: branch.clone(),
            };
            let store = GitHubContentsStore::new(target, credentials, config.timeouts.store())?;
            Ok(Arc::new(store))
        }
    }
}

fn build_audit(config: &AuditConfig) -> Arc<dyn AuditSink> {
    match config {
        AuditConfig::Tracing => Arc::new(TracingAuditSink),
        AuditConfig::Jsonl { path } => Arc::new(JsonlAuditSink::new(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::store::MemoryStore;
    use serde_json::{json, Value};

    const DOC: &str = "project:\n  name: X\n  goal: Y\nai_instructions:\n  constraints: [c1]\n";

    fn broker() -> (Arc<MemoryAuditSink>, FafBroker) {
        let store = Arc::new(MemoryStore::new().with_document("project.faf", DOC));
        let audit = Arc::new(MemoryAuditSink::new());
        (audit.clone(), FafBroker::new(BrokerConfig::default(), store, audit))
    }

    #[tokio::test]
    async fn document_for_jules_is_minimal_json() {
        let (_, broker) = broker();
        let response = broker
            .document(&DocumentRequest {
                agent_header: Some("jules".into()),
                ..DocumentRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(response.agent, AgentIdentity::Jules);
        assert_eq!(response.content_type, "application/json");
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["_format"], "minimal");
        assert_eq!(body["project"], "X");
        assert_eq!(body["constraints"], json!(["c1"]));
    }

    #[tokio::test]
    async fn document_for_claude_is_markup() {
        let (_, broker) = broker();
        let response = broker
            .document(&DocumentRequest {
                user_agent: Some("claude-code/2.0".into()),
                ..DocumentRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(response.content_type, "application/xml");
        assert!(response.body.starts_with("<?xml"));
        assert!(response.body.contains("<dna>"));
    }

    #[tokio::test]
    async fn document_missing_path_is_not_found() {
        let (_, broker) = broker();
        let err = broker
            .document(&DocumentRequest {
                path: Some("other.faf".into()),
                ..DocumentRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn badge_degrades_to_zero() {
        let (_, broker) = broker();
        let badge = broker.badge(Some("missing.faf")).await;
        assert_eq!(badge, Badge::fallback());

        let badge = broker.badge(None).await;
        assert!(!badge.distinction);
        assert_eq!(badge.score, score(&faf_dna::ProjectDna::from_yaml(DOC).unwrap()));
    }

    #[tokio::test]
    async fn missing_updates_are_bad_request_and_audited() {
        let (audit, broker) = broker();
        let err = broker.mutate(&MutationRequest::default()).await.unwrap_err();
        assert!(matches!(err, BrokerError::BadRequest(_)));
        assert_eq!(audit.len(), 1);
    }

    #[tokio::test]
    async fn mutation_success_payload() {
        let (_, broker) = broker();
        let response = broker
            .mutate(&MutationRequest {
                updates: Some(UpdateSet::new().with("project.goal", json!("Z"))),
                message: Some("  ".into()),
                agent_header: Some("grok".into()),
                ..MutationRequest::default()
            })
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.message, "voice: update project DNA");
        assert_eq!(response.updated, vec!["project".to_string()]);
        assert!(response.url.starts_with("memory://project.faf@"));
        assert!(!response.sha.is_empty());
    }
}
