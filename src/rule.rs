//! Parsing helpers for compact rule specifications.
//!
//! Every rule is supplied as a single string, typically one command-line
//! occurrence per rule (`Host:^www\.example\.com$`, `user_id:1/2`, ...).
//! The helpers here split those strings; the collections in [`crate::filter`]
//! and [`crate::rewriter`] compile the pieces.

/// Errors raised while building rules.
///
/// These are only ever produced at configuration time. Request processing
/// never fails.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(
        "Invalid fraction '{0}': expected <numerator>/<denominator> with 0 < numerator <= denominator"
    )]
    InvalidFraction(String),

    #[error("Malformed rule '{rule}': {reason}")]
    MalformedRule { rule: String, reason: &'static str },
}

impl RuleError {
    pub(crate) fn malformed(rule: &str, reason: &'static str) -> Self {
        Self::MalformedRule {
            rule: rule.to_string(),
            reason,
        }
    }
}

/// Split a rule on its first unescaped colon.
///
/// `\:` stands for a literal colon and is unescaped in both halves. Any other
/// backslash sequence is left untouched so regex escapes survive.
pub fn split_unescaped(spec: &str) -> Option<(String, String)> {
    let bytes = spec.as_bytes();
    let mut pos = None;

    for (i, &b) in bytes.iter().enumerate() {
        if b == b':' && (i == 0 || bytes[i - 1] != b'\\') {
            pos = Some(i);
            break;
        }
    }

    let pos = pos?;
    Some((unescape_colons(&spec[..pos]), unescape_colons(&spec[pos + 1..])))
}

/// Split a `name:value` rule on the first colon, keeping the value verbatim.
pub fn split_name_value<'a>(
    spec: &'a str,
    rule_kind: &'static str,
) -> Result<(&'a str, &'a str), RuleError> {
    let (name, value) = spec
        .split_once(':')
        .ok_or_else(|| RuleError::malformed(spec, rule_kind))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(RuleError::malformed(spec, "empty name"));
    }

    Ok((name, value))
}

fn unescape_colons(s: &str) -> String {
    s.replace("\\:", ":")
}
