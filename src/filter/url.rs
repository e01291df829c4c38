//! URL allow and deny lists.

use super::Filter;
use crate::pattern::Pattern;
use crate::proto;
use crate::rule::RuleError;

/// Ordered list of patterns searched against the request target.
#[derive(Debug, Clone, Default)]
pub struct UrlRegexps {
    patterns: Vec<Pattern>,
}

impl UrlRegexps {
    /// Add a bare regex.
    pub fn set(&mut self, spec: &str) -> Result<(), RuleError> {
        self.patterns.push(Pattern::new(spec)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check if any pattern matches the path.
    pub fn any_match(&self, path: &[u8]) -> bool {
        self.patterns.iter().any(|p| p.is_match(path))
    }
}

/// Passes iff the path matches at least one pattern.
pub struct AllowUrls(pub UrlRegexps);

impl Filter for AllowUrls {
    fn passes(&self, payload: &[u8]) -> bool {
        self.0.any_match(proto::path(payload))
    }

    fn name(&self) -> &'static str {
        "allow_urls"
    }
}

/// Passes iff the path matches none of the patterns.
pub struct DenyUrls(pub UrlRegexps);

impl Filter for DenyUrls {
    fn passes(&self, payload: &[u8]) -> bool {
        !self.0.any_match(proto::path(payload))
    }

    fn name(&self) -> &'static str {
        "disallow_urls"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::test_support::request;

    fn regexps(specs: &[&str]) -> UrlRegexps {
        let mut list = UrlRegexps::default();
        for spec in specs {
            list.set(spec).unwrap();
        }
        list
    }

    #[test]
    fn test_allow_urls() {
        let stage = AllowUrls(regexps(&["/v1/app", "/v1/api"]));
        assert!(stage.passes(&request("/v1/app/test", "")));
        assert!(stage.passes(&request("/v1/api/test", "")));
        assert!(!stage.passes(&request("/other", "")));
    }

    #[test]
    fn test_deny_urls() {
        let stage = DenyUrls(regexps(&["/restricted1", "/some/restricted2"]));
        assert!(stage.passes(&request("/v1/app/test", "")));
        assert!(!stage.passes(&request("/restricted1", "")));
        assert!(!stage.passes(&request("/some/restricted2", "")));
    }

    #[test]
    fn test_patterns_see_query_string() {
        let stage = DenyUrls(regexps(&["[?&]debug=1"]));
        assert!(!stage.passes(&request("/search?q=a&debug=1", "")));
        assert!(stage.passes(&request("/search?q=a", "")));
    }

    #[test]
    fn test_invalid_pattern() {
        let mut list = UrlRegexps::default();
        assert!(matches!(
            list.set("/v1/[app"),
            Err(RuleError::InvalidPattern { .. })
        ));
        assert!(list.is_empty());
    }
}
