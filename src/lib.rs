//! Request filter and rewrite engine for Zentinel traffic replay.
//!
//! Captured HTTP requests are handled as raw bytes. The [`Modifier`] decides
//! whether a request is replayed at all and, if so, rewrites it:
//!
//! - Method allow list
//! - Header filters (must match / must not match)
//! - Deterministic sampling by header or query parameter value
//! - URL allow and deny lists
//! - Header and query parameter overrides
//! - URL rewriting with regex capture groups
//!
//! ## Example
//!
//! ```
//! use zentinel_replay_modifier::{Modifier, ModifierConfig};
//!
//! let mut config = ModifierConfig::default();
//! config.url_rewrite.set("^/v1/(.*)$:/v2/$1").unwrap();
//! config.headers.set("X-Replayed:true").unwrap();
//!
//! let modifier = Modifier::new(config).expect("rules configured");
//! let out = modifier.rewrite(b"GET /v1/users HTTP/1.1\r\nHost: a\r\n\r\n");
//! assert_eq!(out, b"GET /v2/users HTTP/1.1\r\nX-Replayed: true\r\nHost: a\r\n\r\n");
//! ```

pub mod config;
pub mod filter;
pub mod modifier;
pub mod pattern;
pub mod proto;
pub mod rewriter;
pub mod rule;

pub use config::{ConfigError, ReplayConfig, RuleSpecs};
pub use modifier::{Modifier, ModifierConfig};
pub use pattern::Pattern;
pub use rule::RuleError;
