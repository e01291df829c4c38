//! Rewrite stages applied to requests that passed every filter.

mod header;
mod param;
mod url;

pub use header::HeaderOverrides;
pub use param::ParamOverrides;
pub use url::UrlRewrites;

/// A single mutation stage of the rewrite pipeline.
pub trait Rewriter: Send + Sync {
    /// Apply the stage to the payload in place.
    fn rewrite(&self, payload: &mut Vec<u8>);

    /// Get the stage name for logging.
    fn name(&self) -> &'static str;
}
