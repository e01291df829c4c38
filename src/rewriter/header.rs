//! Header overrides.

use super::Rewriter;
use crate::proto;
use crate::rule::{split_name_value, RuleError};

/// Ordered `(name, value)` headers set on every replayed request.
///
/// Existing headers are updated in place; missing ones are inserted right
/// after the request line.
#[derive(Debug, Clone, Default)]
pub struct HeaderOverrides {
    headers: Vec<(String, String)>,
}

impl HeaderOverrides {
    /// Add an override from a `<name>:<value>` spec. The value is kept verbatim.
    pub fn set(&mut self, spec: &str) -> Result<(), RuleError> {
        let (name, value) = split_name_value(spec, "expected <name>:<value>")?;
        self.headers.push((name.to_string(), value.to_string()));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl Rewriter for HeaderOverrides {
    fn rewrite(&self, payload: &mut Vec<u8>) {
        for (name, value) in &self.headers {
            proto::set_header(payload, name.as_bytes(), value.as_bytes());
        }
    }

    fn name(&self) -> &'static str {
        "set_headers"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &[u8] =
        b"POST /post HTTP/1.1\r\nContent-Length: 7\r\nHost: www.w3.org\r\n\r\na=1&b=2";

    fn overrides(specs: &[&str]) -> HeaderOverrides {
        let mut overrides = HeaderOverrides::default();
        for spec in specs {
            overrides.set(spec).unwrap();
        }
        overrides
    }

    #[test]
    fn test_insert_and_update() {
        let overrides = overrides(&["Header1:1", "Host:localhost"]);
        let mut payload = REQUEST.to_vec();
        overrides.rewrite(&mut payload);

        assert_eq!(
            payload,
            b"POST /post HTTP/1.1\r\nHeader1: 1\r\nContent-Length: 7\r\nHost: localhost\r\n\r\na=1&b=2"
        );
    }

    #[test]
    fn test_inserts_stack_at_head() {
        let overrides = overrides(&["X-A:1", "X-B:2"]);
        let mut payload = REQUEST.to_vec();
        overrides.rewrite(&mut payload);

        assert!(payload.starts_with(b"POST /post HTTP/1.1\r\nX-B: 2\r\nX-A: 1\r\nContent-Length: 7\r\n"));
    }

    #[test]
    fn test_idempotent() {
        let overrides = overrides(&["Header1:1", "Host:localhost"]);
        let mut once = REQUEST.to_vec();
        overrides.rewrite(&mut once);

        let mut twice = once.clone();
        overrides.rewrite(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_value_kept_verbatim() {
        let overrides = overrides(&["X-Time:12:30"]);
        let mut payload = REQUEST.to_vec();
        overrides.rewrite(&mut payload);
        assert_eq!(proto::header(&payload, b"X-Time"), Some(&b"12:30"[..]));
    }

    #[test]
    fn test_malformed_spec() {
        let mut overrides = HeaderOverrides::default();
        assert!(matches!(
            overrides.set("Header1"),
            Err(RuleError::MalformedRule { .. })
        ));
    }
}
