//! Header value filters.

use super::Filter;
use crate::pattern::Pattern;
use crate::proto;
use crate::rule::{split_unescaped, RuleError};
use std::collections::HashMap;

/// Header name to pattern mapping.
///
/// Names are keyed case-insensitively; setting a rule for a name that
/// already has one replaces it.
#[derive(Debug, Clone, Default)]
pub struct HeaderFilters {
    rules: HashMap<String, Pattern>,
}

impl HeaderFilters {
    /// Add a rule from a `<header>:<regex>` spec.
    pub fn set(&mut self, spec: &str) -> Result<(), RuleError> {
        let (name, pattern) = split_unescaped(spec)
            .ok_or_else(|| RuleError::malformed(spec, "expected <header>:<regex>"))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(RuleError::malformed(spec, "empty header name"));
        }

        let pattern = Pattern::new(&pattern)?;
        self.rules.insert(name.to_ascii_lowercase(), pattern);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Pattern configured for a header, if any.
    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.rules.get(&name.to_ascii_lowercase())
    }

    /// Check a rule against the header value; a missing header is matched
    /// as the empty string.
    fn rule_matches(payload: &[u8], name: &str, pattern: &Pattern) -> bool {
        let value = proto::header(payload, name.as_bytes()).unwrap_or_default();
        pattern.is_match(value)
    }
}

/// Passes iff every configured header matches its pattern.
pub struct RequireHeaders(pub HeaderFilters);

impl Filter for RequireHeaders {
    fn passes(&self, payload: &[u8]) -> bool {
        self.0
            .rules
            .iter()
            .all(|(name, pattern)| HeaderFilters::rule_matches(payload, name, pattern))
    }

    fn name(&self) -> &'static str {
        "allow_headers"
    }
}

/// Passes iff no configured header matches its pattern.
pub struct RejectHeaders(pub HeaderFilters);

impl Filter for RejectHeaders {
    fn passes(&self, payload: &[u8]) -> bool {
        !self
            .0
            .rules
            .iter()
            .any(|(name, pattern)| HeaderFilters::rule_matches(payload, name, pattern))
    }

    fn name(&self) -> &'static str {
        "disallow_headers"
    }
}
