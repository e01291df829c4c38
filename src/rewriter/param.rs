//! Query parameter overrides.

use super::Rewriter;
use crate::proto;
use crate::rule::RuleError;

/// Ordered query parameters set on every replayed request.
///
/// Names and values are percent-encoded once, when the rule is added.
#[derive(Debug, Clone, Default)]
pub struct ParamOverrides {
    params: Vec<(String, String)>,
}

impl ParamOverrides {
    /// Add an override from a `<name>=<value>` (or `<name>:<value>`) spec.
    pub fn set(&mut self, spec: &str) -> Result<(), RuleError> {
        let (name, value) = spec
            .split_once('=')
            .or_else(|| spec.split_once(':'))
            .ok_or_else(|| RuleError::malformed(spec, "expected <name>=<value>"))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(RuleError::malformed(spec, "empty parameter name"));
        }

        self.params.push((
            urlencoding::encode(name).into_owned(),
            urlencoding::encode(value).into_owned(),
        ));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl Rewriter for ParamOverrides {
    fn rewrite(&self, payload: &mut Vec<u8>) {
        for (name, value) in &self.params {
            proto::set_param(payload, name.as_bytes(), value.as_bytes());
        }
    }

    fn name(&self) -> &'static str {
        "set_params"
    }
}
