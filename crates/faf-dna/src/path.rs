//! Dotted paths for addressing nested DNA fields
//!
//! `project.goal` names the `goal` key of the `project` mapping. Parsing is
//! total: every string is a valid path, including ones with empty segments,
//! because update keys are caller-supplied and the merger never fails.

/// Segment separator for dotted paths
const SEPARATOR: char = '.';

/// Path into a nested mapping
///
/// # Examples
/// - `project` → `["project"]`
/// - `ai_instructions.constraints` → `["ai_instructions", "constraints"]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DottedPath(Vec<String>);

impl DottedPath {
    /// Split a key on the separator
    pub(crate) fn parse(key: &str) -> Self {
        Self(key.split(SEPARATOR).map(str::to_string).collect())
    }

    /// Whether the path descends below the top level
    #[inline]
    pub(crate) fn is_nested(&self) -> bool {
        self.0.len() > 1
    }

    #[inline]
    pub(crate) fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    #[inline]
    pub(crate) fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// All segments but the last
    #[inline]
    pub(crate) fn parents(&self) -> &[String] {
        match self.0.split_last() {
            Some((_, init)) => init,
            None => &[],
        }
    }

    /// Segments from root to leaf
    #[inline]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_top_level_key() {
        let path = DottedPath::parse("project");
        assert_eq!(path.first(), Some("project"));
        assert!(!path.is_nested());
        assert!(path.parents().is_empty());
    }

    #[test]
    fn parse_nested_key() {
        let path = DottedPath::parse("ai_instructions.constraints");
        assert_eq!(path.first(), Some("ai_instructions"));
        assert_eq!(path.last(), Some("constraints"));
        assert_eq!(path.parents(), &["ai_instructions"]);
        assert!(path.is_nested());
    }

    #[test]
    fn parse_keeps_empty_segments() {
        let path = DottedPath::parse("a..b");
        assert_eq!(path.iter().collect::<Vec<_>>(), vec!["a", "", "b"]);
    }
}
