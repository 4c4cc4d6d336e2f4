//! Response normalization
//!
//! Backends parse their wire responses into a [`RawSearchResult`]; the
//! [`ResponseNormalizer`] maps its hits through a caller-supplied hit mapper,
//! resolves aggregations back to parameters and pages their buckets, and
//! builds spell-check suggestions.

pub mod highlight;
mod hit;
mod normalizer;
pub mod spelling;
mod types;

pub use hit::RawHit;
pub use normalizer::{map_hits, ResponseNormalizer};
pub use types::{
    BucketKey, Facet, FacetCount, NamedAggregation, RawAggregation, RawBucket, RawCollation,
    RawSearchResult, RawSpellCheck, RawTermSuggestion, SpellCheckResponse, SpellCheckSuggestion,
    UniformSearchResponse,
};
