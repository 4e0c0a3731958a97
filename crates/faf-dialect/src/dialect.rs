//! Dialect projection
//!
//! Each agent identity maps to exactly one of six fixed payload shapes.
//! Projection only selects, renames and nests fields that already exist in
//! the document; the source document is never modified.

use crate::agent::AgentIdentity;
use crate::markup::to_markup;
use faf_dna::{score, ProjectDna};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Media type for mapping-encoded payloads
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Media type for tag-markup payloads
pub const MARKUP_CONTENT_TYPE: &str = "application/xml";

/// The fixed set of payload shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Nested identity/instructions projection, rendered as tag markup
    Markup,
    /// Priority-ordered sections
    Structured,
    /// What / why / how
    Direct,
    /// The handful of fields a coding agent needs to start
    Minimal,
    /// Language, stack and coding rules
    CodeFocused,
    /// The whole document
    Full,
}

impl Dialect {
    /// Shape served to an agent
    #[must_use]
    pub fn for_agent(agent: &AgentIdentity) -> Self {
        match agent {
            AgentIdentity::Claude => Self::Markup,
            AgentIdentity::Gemini => Self::Structured,
            AgentIdentity::Grok => Self::Direct,
            AgentIdentity::Jules => Self::Minimal,
            AgentIdentity::Codex | AgentIdentity::Copilot | AgentIdentity::Cursor => {
                Self::CodeFocused
            }
            AgentIdentity::Unknown | AgentIdentity::Declared(_) => Self::Full,
        }
    }

    /// Value of the `_format` marker
    #[must_use]
    pub fn format_name(&self) -> &'static str {
        match self {
            Self::Markup => "xml",
            Self::Structured => "structured",
            Self::Direct => "direct",
            Self::Minimal => "minimal",
            Self::CodeFocused => "code_focused",
            Self::Full => "full",
        }
    }

    /// Media type of the rendered payload
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Markup => MARKUP_CONTENT_TYPE,
            _ => JSON_CONTENT_TYPE,
        }
    }
}

/// A document projected for one agent
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    /// Agent the projection was made for
    pub agent: AgentIdentity,
    /// Shape that was applied
    pub dialect: Dialect,
    /// Projected fields
    pub payload: Value,
}

impl Translation {
    /// Encode the payload as text in the dialect's media type
    ///
    /// # Errors
    /// Returns error if JSON encoding fails
    pub fn render(&self) -> Result<String, serde_json::Error> {
        match self.dialect {
            Dialect::Markup => Ok(to_markup(&self.payload)),
            _ => serde_json::to_string_pretty(&self.payload),
        }
    }

    /// Media type of [`Self::render`]
    #[inline]
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.dialect.content_type()
    }
}

/// Project `dna` into the shape `agent` expects
#[must_use]
pub fn translate(dna: &ProjectDna, agent: &AgentIdentity) -> Translation {
    let dialect = Dialect::for_agent(agent);
    let view = DnaView::new(dna);
    let agent_name = agent.as_str();
    let format = dialect.format_name();

    let payload = match dialect {
        Dialect::Minimal => json!({
            "_agent": agent_name,
            "_format": format,
            "project": view.text("project.name"),
            "goal": view.text("project.goal"),
            "language": view.text("project.main_language"),
            "constraints": view.list("ai_instructions.constraints"),
            "score": view.score,
        }),
        Dialect::Direct => json!({
            "_agent": agent_name,
            "_format": format,
            "what": view.text("project.name"),
            "why": view.text("project.goal"),
            "how": view.text("project.main_language"),
            "avoid": view.list("ai_instructions.avoid"),
            "score": view.score,
        }),
        Dialect::Structured => json!({
            "_agent": agent_name,
            "_format": format,
            "priority_1_identity": {
                "name": view.text("project.name"),
                "goal": view.text("project.goal"),
                "type": view.text("project.type"),
            },
            "priority_2_technical": {
                "language": view.text("project.main_language"),
                "stack": view.mapping("stack"),
            },
            "priority_3_behavior": {
                "constraints": view.list("ai_instructions.constraints"),
                "patterns": view.list("ai_instructions.patterns"),
                "avoid": view.list("ai_instructions.avoid"),
            },
            "priority_4_context": view.mapping("human_context"),
            "score": view.score,
        }),
        Dialect::CodeFocused => json!({
            "_agent": agent_name,
            "_format": format,
            "language": view.text("project.main_language"),
            "project_type": view.text("project.type"),
            "stack": view.mapping("stack"),
            "patterns": view.list("ai_instructions.patterns"),
            "constraints": view.list("ai_instructions.constraints"),
            "avoid": view.list("ai_instructions.avoid"),
            "score": view.score,
        }),
        Dialect::Markup => json!({
            "_agent": agent_name,
            "_format": format,
            "project": {
                "name": view.raw("project.name"),
                "goal": view.raw("project.goal"),
                "language": view.raw("project.main_language"),
                "type": view.raw("project.type"),
            },
            "stack": view.raw("stack"),
            "instructions": {
                "constraints": view.raw("ai_instructions.constraints"),
                "patterns": view.raw("ai_instructions.patterns"),
                "avoid": view.raw("ai_instructions.avoid"),
            },
            "context": view.raw("human_context"),
            "score": view.score,
        }),
        Dialect::Full => {
            let mut full: Map<String, Value> = dna.as_map().clone();
            full.insert("_agent".into(), json!(agent_name));
            full.insert("_format".into(), json!(format));
            full.insert("_score".into(), json!(view.score));
            Value::Object(full)
        }
    };

    Translation {
        agent: agent.clone(),
        dialect,
        payload,
    }
}

/// Read-only accessors with per-kind defaults
struct DnaView<'a> {
    dna: &'a ProjectDna,
    score: u8,
}

impl<'a> DnaView<'a> {
    fn new(dna: &'a ProjectDna) -> Self {
        Self {
            dna,
            score: score(dna),
        }
    }

    /// Value as stored, or null
    fn raw(&self, path: &str) -> Value {
        self.dna.get_path(path).cloned().unwrap_or(Value::Null)
    }

    /// Scalar as stored, `""` when absent
    fn text(&self, path: &str) -> Value {
        match self.dna.get_path(path) {
            None | Some(Value::Null) => Value::String(String::new()),
            Some(value) => value.clone(),
        }
    }

    /// Sequence as stored, `[]` when absent
    fn list(&self, path: &str) -> Value {
        match self.dna.get_path(path) {
            None | Some(Value::Null) => Value::Array(Vec::new()),
            Some(value) => value.clone(),
        }
    }

    /// Mapping as stored, `{}` when absent
    fn mapping(&self, path: &str) -> Value {
        match self.dna.get_path(path) {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value) => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn sample() -> ProjectDna {
        ProjectDna::from_json(
            r#"{
                "project": {"name": "X", "goal": "Y", "main_language": "Rust", "type": "service"},
                "stack": {"runtime": "tokio"},
                "ai_instructions": {"constraints": ["c1"], "patterns": ["p1"], "avoid": ["a1"]},
                "human_context": {"who": "devs"}
            }"#,
        )
        .unwrap()
    }

    fn keys(value: &Value) -> BTreeSet<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn jules_end_to_end() {
        let dna = ProjectDna::from_json(
            r#"{"project":{"name":"X","goal":"Y"},"ai_instructions":{"constraints":["c1"]}}"#,
        )
        .unwrap();
        let t = translate(&dna, &AgentIdentity::Jules);
        assert_eq!(
            t.payload,
            json!({
                "_agent": "jules",
                "_format": "minimal",
                "project": "X",
                "goal": "Y",
                "language": "",
                "constraints": ["c1"],
                "score": score(&dna),
            })
        );
    }

    #[test]
    fn field_sets_per_dialect() {
        let dna = sample();
        let cases: [(AgentIdentity, &[&str]); 5] = [
            (
                AgentIdentity::Jules,
                &["_agent", "_format", "project", "goal", "language", "constraints", "score"],
            ),
            (
                AgentIdentity::Grok,
                &["_agent", "_format", "what", "why", "how", "avoid", "score"],
            ),
            (
                AgentIdentity::Gemini,
                &[
                    "_agent",
                    "_format",
                    "priority_1_identity",
                    "priority_2_technical",
                    "priority_3_behavior",
                    "priority_4_context",
                    "score",
                ],
            ),
            (
                AgentIdentity::Codex,
                &[
                    "_agent",
                    "_format",
                    "language",
                    "project_type",
                    "stack",
                    "patterns",
                    "constraints",
                    "avoid",
                    "score",
                ],
            ),
            (
                AgentIdentity::Claude,
                &["_agent", "_format", "project", "stack", "instructions", "context", "score"],
            ),
        ];
        for (agent, expected) in cases {
            let t = translate(&dna, &agent);
            assert_eq!(keys(&t.payload), set(expected), "dialect for {agent}");
            assert_eq!(t.payload["_agent"], json!(agent.as_str()));
        }
    }

    #[test]
    fn code_focused_is_shared() {
        let dna = sample();
        for agent in [AgentIdentity::Codex, AgentIdentity::Copilot, AgentIdentity::Cursor] {
            let t = translate(&dna, &agent);
            assert_eq!(t.dialect, Dialect::CodeFocused);
            assert_eq!(t.payload["_format"], json!("code_focused"));
            assert_eq!(t.payload["_agent"], json!(agent.as_str()));
        }
    }

    #[test]
    fn unknown_and_declared_get_full_document() {
        let dna = sample();
        for agent in [AgentIdentity::Unknown, AgentIdentity::Declared("windsurf".into())] {
            let t = translate(&dna, &agent);
            assert_eq!(t.dialect, Dialect::Full);
            let mut expected: BTreeSet<String> = dna.as_map().keys().cloned().collect();
            expected.extend(set(&["_agent", "_format", "_score"]));
            assert_eq!(keys(&t.payload), expected);
            assert_eq!(t.payload["project"], dna.get("project").cloned().unwrap());
        }
    }

    #[test]
    fn full_shape_does_not_clobber_document_score_key() {
        let dna = ProjectDna::from_json(r#"{"score": "document-owned"}"#).unwrap();
        let t = translate(&dna, &AgentIdentity::Unknown);
        assert_eq!(t.payload["score"], json!("document-owned"));
        assert_eq!(t.payload["_score"], json!(4));
    }

    #[test]
    fn gemini_nests_priorities() {
        let t = translate(&sample(), &AgentIdentity::Gemini);
        assert_eq!(
            t.payload["priority_1_identity"],
            json!({"name": "X", "goal": "Y", "type": "service"})
        );
        assert_eq!(t.payload["priority_2_technical"]["stack"], json!({"runtime": "tokio"}));
        assert_eq!(t.payload["priority_4_context"], json!({"who": "devs"}));
    }

    #[test]
    fn grok_direct_fields() {
        let t = translate(&sample(), &AgentIdentity::Grok);
        assert_eq!(t.payload["what"], json!("X"));
        assert_eq!(t.payload["why"], json!("Y"));
        assert_eq!(t.payload["how"], json!("Rust"));
        assert_eq!(t.payload["avoid"], json!(["a1"]));
    }

    #[test]
    fn claude_renders_markup_and_omits_absent() {
        let dna = ProjectDna::from_json(r#"{"project": {"name": "X"}}"#).unwrap();
        let t = translate(&dna, &AgentIdentity::Claude);
        assert_eq!(t.content_type(), MARKUP_CONTENT_TYPE);
        let text = t.render().unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<dna>"));
        assert!(text.contains("<name>X</name>"));
        assert!(!text.contains("<goal>"));
        assert!(!text.contains("<context>"));
        assert!(text.contains("<_format>xml</_format>"));
    }

    #[test]
    fn json_dialects_render_as_json() {
        let t = translate(&sample(), &AgentIdentity::Jules);
        assert_eq!(t.content_type(), JSON_CONTENT_TYPE);
        let parsed: Value = serde_json::from_str(&t.render().unwrap()).unwrap();
        assert_eq!(parsed, t.payload);
    }

    #[test]
    fn translation_leaves_source_untouched() {
        let dna = sample();
        let before = dna.clone();
        for agent in [AgentIdentity::Claude, AgentIdentity::Unknown, AgentIdentity::Gemini] {
            let _ = translate(&dna, &agent);
        }
        assert_eq!(dna, before);
    }
}
