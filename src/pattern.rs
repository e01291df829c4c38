//! Compiled patterns shared by every filter and rewrite rule.

use crate::rule::RuleError;
use regex::bytes::Regex;
use regex::{Captures, Regex as TextRegex};
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

/// Matches `$N` group references and `$$` escapes in rewrite templates.
static GROUP_REF_REGEX: LazyLock<TextRegex> =
    LazyLock::new(|| TextRegex::new(r"\$(\$|\d+)").unwrap());

/// A compiled regular expression with an optional replacement template.
///
/// Matching runs over raw bytes, so payloads that are not valid UTF-8 are
/// handled like any other input.
#[derive(Clone)]
pub struct Pattern {
    regex: Regex,
    /// Template with group references normalized to `${N}`
    template: Option<String>,
}

impl Pattern {
    /// Compile a pattern without a template.
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        let regex = Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            regex,
            template: None,
        })
    }

    /// Compile a pattern together with a replacement template.
    ///
    /// `$1`, `$2`, ... always refer to positional groups, even when followed
    /// by other characters (`$1abc` is group 1 then `abc`). `$$` is a literal
    /// dollar sign and `${name}` refers to a named group.
    pub fn with_template(pattern: &str, template: &str) -> Result<Self, RuleError> {
        let mut compiled = Self::new(pattern)?;
        compiled.template = Some(normalize_template(template));
        Ok(compiled)
    }

    /// Unanchored search for the pattern.
    #[inline]
    pub fn is_match(&self, haystack: &[u8]) -> bool {
        self.regex.is_match(haystack)
    }

    /// Substitute the template into every match.
    ///
    /// Returns `None` if the pattern does not match or has no template. Parts
    /// of the haystack outside the matches are kept.
    pub fn replace<'h>(&self, haystack: &'h [u8]) -> Option<Cow<'h, [u8]>> {
        let template = self.template.as_ref()?;
        if !self.regex.is_match(haystack) {
            return None;
        }
        Some(self.regex.replace_all(haystack, template.as_bytes()))
    }

    /// The source pattern.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// The normalized template, if any.
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("regex", &self.regex.as_str())
            .field("template", &self.template)
            .finish()
    }
}

fn normalize_template(template: &str) -> String {
    GROUP_REF_REGEX
        .replace_all(template, |caps: &Captures| {
            let reference = &caps[1];
            if reference == "$" {
                "$$".to_string()
            } else {
                format!("${{{}}}", reference)
            }
        })
        .to_string()
}
