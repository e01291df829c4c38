//! Filter stages deciding whether a captured request is replayed at all.
//!
//! Each rule collection (`HeaderFilters`, `HashFilters`, ...) is built from
//! spec strings and is agnostic of how it is used. The stage types wrap a
//! collection with the semantics of one pipeline slot, e.g. the same
//! [`UrlRegexps`] type backs both [`AllowUrls`] and [`DenyUrls`].

mod header;
mod method;
mod sampling;
mod url;

pub use header::{HeaderFilters, RejectHeaders, RequireHeaders};
pub use method::MethodFilter;
pub use sampling::{
    sampling_hash, sampling_slot, FieldSource, Fraction, HashFilters, SampleFields,
};
pub use url::{AllowUrls, DenyUrls, UrlRegexps};

/// A single pass/fail stage of the filter pipeline.
pub trait Filter: Send + Sync {
    /// Check if the request may continue down the pipeline.
    fn passes(&self, payload: &[u8]) -> bool;

    /// Get the stage name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Build a request with the given target and extra header lines.
    pub fn request(target: &str, headers: &str) -> Vec<u8> {
        format!(
            "POST {} HTTP/1.1\r\n{}Content-Length: 7\r\nHost: www.w3.org\r\n\r\na=1&b=2",
            target, headers
        )
        .into_bytes()
    }
}
