//! Request method allow list.

use super::Filter;
use crate::proto;
use crate::rule::RuleError;

/// Allowed request methods, compared ASCII case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct MethodFilter {
    methods: Vec<String>,
}

impl MethodFilter {
    /// Add a method token such as `GET`.
    pub fn set(&mut self, spec: &str) -> Result<(), RuleError> {
        let method = spec.trim();
        if method.is_empty() || method.contains(char::is_whitespace) {
            return Err(RuleError::malformed(spec, "expected a single method token"));
        }

        let method = method.to_ascii_uppercase();
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl Filter for MethodFilter {
    fn passes(&self, payload: &[u8]) -> bool {
        let method = proto::method(payload);
        self.methods
            .iter()
            .any(|m| m.as_bytes().eq_ignore_ascii_case(method))
    }

    fn name(&self) -> &'static str {
        "allow_methods"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_methods() {
        let mut filter = MethodFilter::default();
        filter.set("GET").unwrap();
        filter.set("head").unwrap();
        filter.set("get").unwrap();
        assert_eq!(filter.len(), 2);

        assert!(filter.passes(b"GET / HTTP/1.1\r\n\r\n"));
        assert!(filter.passes(b"get / HTTP/1.1\r\n\r\n"));
        assert!(filter.passes(b"HEAD / HTTP/1.1\r\n\r\n"));
        assert!(!filter.passes(b"POST / HTTP/1.1\r\n\r\n"));
        assert!(!filter.passes(b"garbage"));
    }

    #[test]
    fn test_invalid_method() {
        let mut filter = MethodFilter::default();
        assert!(filter.set("").is_err());
        assert!(filter.set("GET POST").is_err());
        assert!(filter.is_empty());
    }
}
