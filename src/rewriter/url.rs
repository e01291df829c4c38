//! URL rewriting with regex capture groups.

use super::Rewriter;
use crate::pattern::Pattern;
use crate::proto;
use crate::rule::{split_unescaped, RuleError};

/// Ordered `(pattern, template)` rules; the first rule whose pattern matches
/// the request target rewrites it and the rest are skipped.
#[derive(Debug, Clone, Default)]
pub struct UrlRewrites {
    rules: Vec<Pattern>,
}

impl UrlRewrites {
    /// Add a rule from a `<regex>:<template>` spec.
    ///
    /// The separator is the first colon not preceded by a backslash, so a
    /// literal colon in the regex is written `\:`.
    pub fn set(&mut self, spec: &str) -> Result<(), RuleError> {
        let (pattern, template) = split_unescaped(spec)
            .ok_or_else(|| RuleError::malformed(spec, "expected <regex>:<template>"))?;

        self.rules.push(Pattern::with_template(&pattern, &template)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rewritten target for a path, or `None` if no rule matches.
    pub fn rewrite_path(&self, path: &[u8]) -> Option<Vec<u8>> {
        self.rules
            .iter()
            .find_map(|rule| rule.replace(path))
            .map(|replaced| replaced.into_owned())
    }
}

impl Rewriter for UrlRewrites {
    fn rewrite(&self, payload: &mut Vec<u8>) {
        if let Some(new_path) = self.rewrite_path(proto::path(payload)) {
            proto::set_path(payload, &new_path);
        }
    }

    fn name(&self) -> &'static str {
        "rewrite_urls"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(target: &str) -> Vec<u8> {
        format!(
            "POST {} HTTP/1.1\r\nContent-Length: 7\r\nHost: www.w3.org\r\n\r\na=1&b=2",
            target
        )
        .into_bytes()
    }

    fn rewrites(specs: &[&str]) -> UrlRewrites {
        let mut rewrites = UrlRewrites::default();
        for spec in specs {
            rewrites.set(spec).unwrap();
        }
        rewrites
    }

    #[test]
    fn test_rewrite_with_capture() {
        let rewrites = rewrites(&["/v1/user/([^/]+)/ping:/v2/user/$1/ping"]);

        let mut request = payload("/v1/user/joe/ping");
        rewrites.rewrite(&mut request);
        assert_eq!(proto::path(&request), b"/v2/user/joe/ping");
        assert!(request.ends_with(b"\r\n\r\na=1&b=2"));

        let mut request = payload("/v1/user/ping");
        rewrites.rewrite(&mut request);
        assert_eq!(proto::path(&request), b"/v1/user/ping");
    }

    #[test]
    fn test_first_match_wins() {
        let rewrites = rewrites(&["^/api/(.*)$:/first/$1", "^/api/v1/(.*)$:/second/$1"]);
        assert_eq!(
            rewrites.rewrite_path(b"/api/v1/items").unwrap(),
            b"/first/v1/items"
        );
    }

    #[test]
    fn test_later_rule_used_when_earlier_misses() {
        let rewrites = rewrites(&["^/none/:/x/", "^/api/v1/(.*)$:/second/$1"]);
        assert_eq!(
            rewrites.rewrite_path(b"/api/v1/items").unwrap(),
            b"/second/items"
        );
    }

    #[test]
    fn test_query_string_kept() {
        let rewrites = rewrites(&["^/old/:/new/"]);
        let mut request = payload("/old/items?page=2");
        rewrites.rewrite(&mut request);
        assert_eq!(proto::path(&request), b"/new/items?page=2");
    }

    #[test]
    fn test_escaped_colon() {
        let rewrites = rewrites(&[r"^/host\:(\d+)$:/port/$1"]);
        assert_eq!(rewrites.rewrite_path(b"/host:80").unwrap(), b"/port/80");
        assert!(rewrites.rewrite_path(b"/host/80").is_none());
    }

    #[test]
    fn test_invalid_specs() {
        let mut rewrites = UrlRewrites::default();
        assert!(matches!(
            rewrites.set("/v1/(broken:/v2"),
            Err(RuleError::InvalidPattern { .. })
        ));
        assert!(matches!(
            rewrites.set("/v1/no-template"),
            Err(RuleError::MalformedRule { .. })
        ));
        assert!(rewrites.is_empty());
    }
}
