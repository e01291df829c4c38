//! The modifier: filter pipeline followed by rewrite pipeline.

use crate::filter::{
    AllowUrls, DenyUrls, Filter, HashFilters, HeaderFilters, MethodFilter, RejectHeaders,
    RequireHeaders, SampleFields, UrlRegexps,
};
use crate::rewriter::{HeaderOverrides, ParamOverrides, Rewriter, UrlRewrites};
use std::sync::Arc;
use tracing::{info, trace};

/// All rule collections of a modifier.
///
/// Collections are filled through their `set` methods while the process
/// starts up, then handed to [`Modifier::new`] and never touched again.
#[derive(Debug, Clone)]
pub struct ModifierConfig {
    /// Allowed request methods
    pub methods: MethodFilter,
    /// Headers that must match
    pub header_filters: HeaderFilters,
    /// Headers that must not match
    pub header_negative_filters: HeaderFilters,
    /// Sampling by header value
    pub header_hash_filters: HashFilters,
    /// Sampling by query parameter value
    pub param_hash_filters: HashFilters,
    /// URL allow list
    pub url_regexp: UrlRegexps,
    /// URL deny list
    pub url_negative_regexp: UrlRegexps,
    /// URL rewrite rules
    pub url_rewrite: UrlRewrites,
    /// Header overrides
    pub headers: HeaderOverrides,
    /// Query parameter overrides
    pub params: ParamOverrides,
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            methods: MethodFilter::default(),
            header_filters: HeaderFilters::default(),
            header_negative_filters: HeaderFilters::default(),
            header_hash_filters: HashFilters::for_headers(),
            param_hash_filters: HashFilters::for_params(),
            url_regexp: UrlRegexps::default(),
            url_negative_regexp: UrlRegexps::default(),
            url_rewrite: UrlRewrites::default(),
            headers: HeaderOverrides::default(),
            params: ParamOverrides::default(),
        }
    }
}

impl ModifierConfig {
    /// Total number of rules across all categories.
    pub fn rule_count(&self) -> usize {
        self.methods.len()
            + self.header_filters.len()
            + self.header_negative_filters.len()
            + self.header_hash_filters.len()
            + self.param_hash_filters.len()
            + self.url_regexp.len()
            + self.url_negative_regexp.len()
            + self.url_rewrite.len()
            + self.headers.len()
            + self.params.len()
    }

    /// Check if no rule is configured in any category.
    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }
}

/// Compiled stages; only non-empty collections get a stage.
struct Pipeline {
    filters: Vec<Box<dyn Filter>>,
    rewriters: Vec<Box<dyn Rewriter>>,
}

/// Decides whether a captured request is replayed and rewrites it.
///
/// Cloning is cheap and every clone shares the same immutable pipeline, so
/// a modifier can be handed to any number of concurrent workers.
#[derive(Clone)]
pub struct Modifier {
    pipeline: Arc<Pipeline>,
}

impl Modifier {
    /// Build a modifier.
    ///
    /// Returns `None` when the configuration holds no rules at all; callers
    /// should then forward requests untouched without calling [`Modifier::rewrite`].
    pub fn new(config: ModifierConfig) -> Option<Self> {
        if config.is_empty() {
            info!("No request modification rules configured");
            return None;
        }

        info!(
            methods = config.methods.len(),
            allow_headers = config.header_filters.len(),
            disallow_headers = config.header_negative_filters.len(),
            header_limiters = config.header_hash_filters.len(),
            param_limiters = config.param_hash_filters.len(),
            allow_urls = config.url_regexp.len(),
            disallow_urls = config.url_negative_regexp.len(),
            rewrite_urls = config.url_rewrite.len(),
            set_headers = config.headers.len(),
            set_params = config.params.len(),
            "Request modifier initialized"
        );

        let mut filters: Vec<Box<dyn Filter>> = Vec::new();
        if !config.methods.is_empty() {
            filters.push(Box::new(config.methods));
        }
        if !config.header_filters.is_empty() {
            filters.push(Box::new(RequireHeaders(config.header_filters)));
        }
        if !config.header_negative_filters.is_empty() {
            filters.push(Box::new(RejectHeaders(config.header_negative_filters)));
        }
        if !config.header_hash_filters.is_empty() {
            filters.push(Box::new(SampleFields::new(config.header_hash_filters)));
        }
        if !config.param_hash_filters.is_empty() {
            filters.push(Box::new(SampleFields::new(config.param_hash_filters)));
        }
        if !config.url_regexp.is_empty() {
            filters.push(Box::new(AllowUrls(config.url_regexp)));
        }
        if !config.url_negative_regexp.is_empty() {
            filters.push(Box::new(DenyUrls(config.url_negative_regexp)));
        }

        let mut rewriters: Vec<Box<dyn Rewriter>> = Vec::new();
        if !config.headers.is_empty() {
            rewriters.push(Box::new(config.headers));
        }
        if !config.params.is_empty() {
            rewriters.push(Box::new(config.params));
        }
        if !config.url_rewrite.is_empty() {
            rewriters.push(Box::new(config.url_rewrite));
        }

        Some(Self {
            pipeline: Arc::new(Pipeline { filters, rewriters }),
        })
    }

    /// Run the filter pipeline and, if every stage passes, the rewrite
    /// pipeline.
    ///
    /// Returns the (possibly rewritten) request, or an empty buffer if the
    /// request should be dropped.
    pub fn rewrite(&self, payload: &[u8]) -> Vec<u8> {
        for filter in &self.pipeline.filters {
            if !filter.passes(payload) {
                trace!(filter = filter.name(), "Request dropped by filter");
                return Vec::new();
            }
        }

        let mut out = payload.to_vec();
        for rewriter in &self.pipeline.rewriters {
            rewriter.rewrite(&mut out);
        }
        out
    }

    /// Names of the active filter stages, in evaluation order.
    pub fn filter_stages(&self) -> Vec<&'static str> {
        self.pipeline.filters.iter().map(|f| f.name()).collect()
    }

    /// Names of the active rewrite stages, in application order.
    pub fn rewrite_stages(&self) -> Vec<&'static str> {
        self.pipeline.rewriters.iter().map(|r| r.name()).collect()
    }
}

impl std::fmt::Debug for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modifier")
            .field("filters", &self.filter_stages())
            .field("rewriters", &self.rewrite_stages())
            .finish()
    }
}
