//! Agent identity and detection
//!
//! An explicit identity header wins and is passed through verbatim
//! (lower-cased). Without one, the free-text client string is matched against
//! an ordered pattern table; the first match wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt::{self, Display, Formatter};

/// Identity of the calling agent
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgentIdentity {
    /// Anthropic Claude
    Claude,
    /// Google Gemini
    Gemini,
    /// xAI Grok
    Grok,
    /// Google Jules
    Jules,
    /// OpenAI Codex
    Codex,
    /// GitHub Copilot
    Copilot,
    /// Cursor
    Cursor,
    /// No signal matched
    Unknown,
    /// Caller-declared identity outside the known set
    Declared(String),
}

impl AgentIdentity {
    /// Identity from a lower-cased name; unknown names become [`Self::Declared`]
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "claude" => Self::Claude,
            "gemini" => Self::Gemini,
            "grok" => Self::Grok,
            "jules" => Self::Jules,
            "codex" => Self::Codex,
            "copilot" => Self::Copilot,
            "cursor" => Self::Cursor,
            "unknown" => Self::Unknown,
            other => Self::Declared(other.to_string()),
        }
    }

    /// Identity name as echoed to callers
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Grok => "grok",
            Self::Jules => "jules",
            Self::Codex => "codex",
            Self::Copilot => "copilot",
            Self::Cursor => "cursor",
            Self::Unknown => "unknown",
            Self::Declared(name) => name,
        }
    }
}

impl Display for AgentIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AgentIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Request signals used to detect the agent
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentSignals<'a> {
    /// Explicit identity header (`X-FAF-Agent`)
    pub explicit: Option<&'a str>,
    /// Free-text client identification (`User-Agent`)
    pub client: Option<&'a str>,
}

impl<'a> AgentSignals<'a> {
    /// Signals from an explicit header and a client string
    #[inline]
    #[must_use]
    pub fn new(explicit: Option<&'a str>, client: Option<&'a str>) -> Self {
        Self { explicit, client }
    }
}

/// Ordered detection table. Tools that embed other vendors' models come
/// before the model vendors so the host tool wins.
static DETECTION_TABLE: Lazy<Vec<(AgentIdentity, Regex)>> = Lazy::new(|| {
    [
        (AgentIdentity::Jules, r"(?i)jules"),
        (AgentIdentity::Cursor, r"(?i)cursor"),
        (AgentIdentity::Copilot, r"(?i)copilot"),
        (AgentIdentity::Codex, r"(?i)codex|openai|chatgpt"),
        (AgentIdentity::Claude, r"(?i)claude|anthropic"),
        (AgentIdentity::Gemini, r"(?i)gemini|google|bard"),
        (AgentIdentity::Grok, r"(?i)grok|xai"),
    ]
    .into_iter()
    .filter_map(|(agent, pattern)| Regex::new(pattern).ok().map(|re| (agent, re)))
    .collect()
});

/// Resolve the calling agent from request signals
#[must_use]
pub fn resolve_agent(signals: &AgentSignals<'_>) -> AgentIdentity {
    if let Some(explicit) = signals.explicit.map(str::trim).filter(|s| !s.is_empty()) {
        return AgentIdentity::from_name(&explicit.to_lowercase());
    }

    signals
        .client
        .and_then(|client| {
            DETECTION_TABLE
                .iter()
                .find(|(_, pattern)| pattern.is_match(client))
                .map(|(agent, _)| agent.clone())
        })
        .unwrap_or(AgentIdentity::Unknown)
}
