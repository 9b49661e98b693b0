//! typesketch: infer an OpenAPI-like schema from two independent sources,
//! a textual type-expression grammar and repeated, independently observed
//! samples of the same logical value.
//!
//! - [`parser`] turns a grammar string into a canonical [`Schema`] tree,
//!   with a depth cap, a warnings list, and a per-instance cache.
//! - [`unify`] merges N observed schema samples into one generalized schema
//!   with required/optional inference, enum detection, and numeric ranges.
//! - [`occurrence`] reports per-field occurrence counts and enum candidates
//!   over the same samples, as flattened dotted paths.
//!
//! Neither subsystem throws: parse failures degrade to a fallback node plus
//! a warning, malformed merge inputs degrade to an empty object schema.

pub mod cli;
pub mod input;
pub mod jq;
pub mod occurrence;
pub mod parser;
pub mod schema;
pub mod unify;

pub use occurrence::{analyze, OccurrenceReport};
pub use parser::{CacheStats, ParsedType, TypeParser};
pub use schema::{Kind, Schema};
pub use unify::{enrich, merge};
