//! Matching scanned ink-grid patterns against issued records.
//!
//! The [`PatternMatcher`] is pure: it takes a pattern, optional per-cell
//! colors and a candidate snapshot, and returns a [`MatchResult`]. Fetching
//! candidates and writing the audit trail go through the [`PatternRegistry`]
//! trait, implemented in memory by [`InMemoryRegistry`].

mod assignment;
mod matcher;
mod records;
mod registry;

pub use assignment::{assign, Assignment};
pub use matcher::{
    agreement, remap_candidate, scanned_palette, MatcherParams, PatternMatcher, Remap,
};
pub use records::{
    MatchKind, MatchRecord, MatchResult, StoredPatternRecord, VerificationLogRecord,
};
pub use registry::{InMemoryRegistry, PatternRegistry, RegistryError, RegistryFile};
