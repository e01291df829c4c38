//! Deterministic hash-based sampling by header or query parameter value.
//!
//! A request is kept when the hash of the field value lands inside the
//! configured fraction. The same value is always kept or always dropped, so
//! sampling by a user or session id replays whole sessions.
//!
//! The hash is 32-bit FNV-1a over the raw value bytes. It is reduced to a
//! slot in `[0, 10_000)` and the request is kept iff
//! `slot / 10_000 < numerator / denominator`. For reference,
//! `sampling_slot(b"1") == 4444` and `sampling_slot(b"3") == 9682`.
//!
//! Fractions are resolved to 1/10 000: `1/3` keeps slots `0..=3333`.

use super::Filter;
use crate::proto;
use crate::rule::{split_name_value, RuleError};
use std::collections::HashMap;
use std::str::FromStr;

const FNV_OFFSET: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Number of sampling slots.
pub const SLOTS: u32 = 10_000;

/// 32-bit FNV-1a hash.
pub fn sampling_hash(value: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET;
    for byte in value {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Sampling slot of a value in `[0, SLOTS)`.
pub fn sampling_slot(value: &[u8]) -> u32 {
    sampling_hash(value) % SLOTS
}

/// A keep-fraction with `0 < numerator <= denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl Fraction {
    /// Check if a field value falls inside the fraction.
    pub fn admits(&self, value: &[u8]) -> bool {
        let slot = u64::from(sampling_slot(value));
        let denominator = u64::from(self.denominator);
        let numerator = u64::from(self.numerator);
        slot * denominator < numerator * u64::from(SLOTS)
    }
}

impl FromStr for Fraction {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RuleError::InvalidFraction(s.to_string());

        let (num, den) = s.trim().split_once('/').ok_or_else(invalid)?;
        let numerator: u32 = num.trim().parse().map_err(|_| invalid())?;
        let denominator: u32 = den.trim().parse().map_err(|_| invalid())?;

        if denominator == 0 || numerator == 0 || numerator > denominator {
            return Err(invalid());
        }

        Ok(Self {
            numerator,
            denominator,
        })
    }
}

/// Where a sampled field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Request header (name matched case-insensitively)
    Header,
    /// Query parameter of the request target
    Param,
}

impl FieldSource {
    fn lookup<'a>(&self, payload: &'a [u8], name: &str) -> Option<&'a [u8]> {
        match self {
            Self::Header => proto::header(payload, name.as_bytes()),
            Self::Param => proto::param(payload, name.as_bytes()),
        }
    }
}

/// Field name to keep-fraction mapping; later rules for a field replace
/// earlier ones.
///
/// Header names are keyed case-insensitively, parameter names exactly.
#[derive(Debug, Clone)]
pub struct HashFilters {
    source: FieldSource,
    rules: HashMap<String, Fraction>,
}

impl HashFilters {
    /// Sampling rules keyed by header name.
    pub fn for_headers() -> Self {
        Self {
            source: FieldSource::Header,
            rules: HashMap::new(),
        }
    }

    /// Sampling rules keyed by query parameter name.
    pub fn for_params() -> Self {
        Self {
            source: FieldSource::Param,
            rules: HashMap::new(),
        }
    }

    /// Add a rule from a `<field>:<numerator>/<denominator>` spec.
    pub fn set(&mut self, spec: &str) -> Result<(), RuleError> {
        let (name, fraction) =
            split_name_value(spec, "expected <field>:<numerator>/<denominator>")?;
        let fraction: Fraction = fraction.parse()?;
        self.rules.insert(self.key(name), fraction);
        Ok(())
    }

    fn key(&self, name: &str) -> String {
        match self.source {
            FieldSource::Header => name.to_ascii_lowercase(),
            FieldSource::Param => name.to_string(),
        }
    }

    pub fn source(&self) -> FieldSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fraction configured for a field, if any.
    pub fn get(&self, name: &str) -> Option<Fraction> {
        self.rules.get(&self.key(name)).copied()
    }
}

/// Sampling stage over the field source of its rules.
///
/// Absent or empty fields are not sampled and always pass.
pub struct SampleFields {
    filters: HashFilters,
}

impl SampleFields {
    pub fn new(filters: HashFilters) -> Self {
        Self { filters }
    }
}

impl Filter for SampleFields {
    fn passes(&self, payload: &[u8]) -> bool {
        let source = self.filters.source;
        self.filters.rules.iter().all(|(name, fraction)| {
            match source.lookup(payload, name) {
                Some(value) if !value.is_empty() => fraction.admits(value),
                _ => true,
            }
        })
    }

    fn name(&self) -> &'static str {
        match self.filters.source {
            FieldSource::Header => "header_limiters",
            FieldSource::Param => "param_limiters",
        }
    }
}
