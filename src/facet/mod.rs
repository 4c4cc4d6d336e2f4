//! Facet aggregation planning
//!
//! Under multi-select facets every facet counts against the main query plus
//! the selections made on all *other* facets, so selecting a value never
//! hides the facet's own alternatives:
//!
//! ```text
//! query:       free text + filters on non-facet parameters
//! post_filter: COUNTRY=DK AND YEAR=2000          (hits only)
//! COUNTRY agg: filter(YEAR=2000)    -> terms(country)
//! YEAR agg:    filter(COUNTRY=DK)   -> terms(year)
//! ```

mod planner;

pub use planner::{AggregationPlan, FacetPlan, FacetPlanner, MultiSelectFacet, TermsAggregation};
