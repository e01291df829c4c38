//! Configuration types for the replay modifier.
//!
//! Rules are kept in their compact string form (the same strings accepted
//! on the command line) and compiled by [`RuleSpecs::build`].

use crate::modifier::ModifierConfig;
use crate::rule::RuleError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Main configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Configuration version
    pub version: String,
    /// Global settings
    pub settings: Settings,
    /// Modification rules
    pub rules: RuleSpecs,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            settings: Settings::default(),
            rules: RuleSpecs::default(),
        }
    }
}

impl ReplayConfig {
    /// Parse a YAML configuration.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file; `.yaml`/`.yml` files are read as YAML,
    /// anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum number of requests processed concurrently by the CLI
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

/// Rule specifications, one string per rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuleSpecs {
    /// Allowed methods (`GET`)
    pub allow_methods: Vec<String>,
    /// Required headers (`<header>:<regex>`)
    pub allow_headers: Vec<String>,
    /// Rejected headers (`<header>:<regex>`)
    pub disallow_headers: Vec<String>,
    /// Sampling by header (`<header>:<numerator>/<denominator>`)
    pub header_limiters: Vec<String>,
    /// Sampling by query parameter (`<param>:<numerator>/<denominator>`)
    pub param_limiters: Vec<String>,
    /// URL allow list (`<regex>`)
    pub allow_urls: Vec<String>,
    /// URL deny list (`<regex>`)
    pub disallow_urls: Vec<String>,
    /// URL rewrites (`<regex>:<template>`)
    pub rewrite_urls: Vec<String>,
    /// Header overrides (`<name>:<value>`)
    pub set_headers: Vec<String>,
    /// Query parameter overrides (`<name>=<value>`)
    pub set_params: Vec<String>,
}

impl RuleSpecs {
    /// Append the rules of `other` after ours.
    ///
    /// Later rules win for the map-like categories, so merging command-line
    /// rules after file rules lets the command line override the file.
    pub fn merge(&mut self, other: RuleSpecs) {
        self.allow_methods.extend(other.allow_methods);
        self.allow_headers.extend(other.allow_headers);
        self.disallow_headers.extend(other.disallow_headers);
        self.header_limiters.extend(other.header_limiters);
        self.param_limiters.extend(other.param_limiters);
        self.allow_urls.extend(other.allow_urls);
        self.disallow_urls.extend(other.disallow_urls);
        self.rewrite_urls.extend(other.rewrite_urls);
        self.set_headers.extend(other.set_headers);
        self.set_params.extend(other.set_params);
    }

    /// Compile every rule. The first invalid rule aborts the build.
    pub fn build(&self) -> Result<ModifierConfig, ConfigError> {
        let mut config = ModifierConfig::default();

        apply("allow_methods", &self.allow_methods, |s| config.methods.set(s))?;
        apply("allow_headers", &self.allow_headers, |s| {
            config.header_filters.set(s)
        })?;
        apply("disallow_headers", &self.disallow_headers, |s| {
            config.header_negative_filters.set(s)
        })?;
        apply("header_limiters", &self.header_limiters, |s| {
            config.header_hash_filters.set(s)
        })?;
        apply("param_limiters", &self.param_limiters, |s| {
            config.param_hash_filters.set(s)
        })?;
        apply("allow_urls", &self.allow_urls, |s| config.url_regexp.set(s))?;
        apply("disallow_urls", &self.disallow_urls, |s| {
            config.url_negative_regexp.set(s)
        })?;
        apply("rewrite_urls", &self.rewrite_urls, |s| config.url_rewrite.set(s))?;
        apply("set_headers", &self.set_headers, |s| config.headers.set(s))?;
        apply("set_params", &self.set_params, |s| config.params.set(s))?;

        Ok(config)
    }
}

fn apply(
    category: &'static str,
    specs: &[String],
    mut set: impl FnMut(&str) -> Result<(), RuleError>,
) -> Result<(), ConfigError> {
    for spec in specs {
        set(spec).map_err(|source| ConfigError::Rule { category, source })?;
        debug!(category, rule = %spec, "Accepted rule");
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid {category} rule: {source}")]
    Rule {
        category: &'static str,
        #[source]
        source: RuleError,
    },
}
