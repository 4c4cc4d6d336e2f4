//! Backend-agnostic faceted search.
//!
//! A search request (free text, typed parameter filters, facets, paging)
//! is compiled once into a backend-neutral [`CompiledSearch`]: a predicate
//! tree, a facet aggregation plan, paging, sort and highlighting. Backend
//! serializers turn it into a JSON query-DSL body or legacy request
//! parameters, and the [`ResponseNormalizer`] turns the engine's answer back
//! into a [`UniformSearchResponse`].
//!
//! ```text
//! SearchRequest ──► QueryCompiler ──┐
//!                   FacetPlanner ───┴─► CompiledSearch ──► backend ──► RawSearchResult
//!                                                                         │
//!                   UniformSearchResponse ◄── ResponseNormalizer ◄────────┘
//! ```

pub mod backend;
pub mod catalog;
pub mod compiled;
pub mod config;
pub mod error;
pub mod facet;
pub mod parameter;
pub mod query;
pub mod request;
pub mod response;
pub mod service;

pub use backend::{ElasticsearchSerializer, SearchBackend, SolrSerializer};
pub use catalog::{FieldCatalog, FieldCatalogBuilder, SortDirection, SortField, StaticFieldCatalog};
pub use compiled::{CompiledAutocomplete, CompiledSearch, CompiledSuggest, SearchCompiler, SortKey};
pub use config::{HighlightConfig, SearchConfig, SearchConfigBuilder};
pub use error::{SearchError, SearchResult};
pub use facet::{AggregationPlan, FacetPlan, FacetPlanner};
pub use parameter::{SearchParameter, ValueType, Vocabulary};
pub use query::{BoolQuery, FilterPredicate, QueryCompiler, QueryNode, TypedValue};
pub use request::{FacetedSearchRequest, SearchRequest};
pub use response::{
    Facet, FacetCount, RawHit, RawSearchResult, ResponseNormalizer, SpellCheckResponse,
    UniformSearchResponse,
};
pub use service::SearchService;
