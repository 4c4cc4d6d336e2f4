use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::parameter::SearchParameter;
use crate::query::{QueryCompiler, QueryNode};
use crate::request::{FacetedSearchRequest, ParameterValues};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Terms aggregation over one facet field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermsAggregation<P: SearchParameter> {
    pub parameter: P,
    pub field: String,
    /// Buckets requested from the backend
    pub size: usize,
    /// Buckets skipped when normalizing
    pub offset: usize,
    /// Buckets kept after the offset
    pub limit: usize,
    pub min_count: Option<u32>,
}

/// Terms aggregation nested in a filter of every other facet selection
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSelectFacet<P: SearchParameter> {
    pub terms: TermsAggregation<P>,
    /// AND of the post-filter groups of all other facets
    pub exclusion_filter: Vec<QueryNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationPlan<P: SearchParameter> {
    None,
    Simple(Vec<TermsAggregation<P>>),
    MultiSelectSafe(Vec<MultiSelectFacet<P>>),
}

impl<P: SearchParameter> AggregationPlan<P> {
    pub fn is_none(&self) -> bool {
        matches!(self, AggregationPlan::None)
    }

    /// Terms aggregations in request order
    pub fn terms(&self) -> Vec<&TermsAggregation<P>> {
        match self {
            AggregationPlan::None => Vec::new(),
            AggregationPlan::Simple(terms) => terms.iter().collect(),
            AggregationPlan::MultiSelectSafe(facets) => facets.iter().map(|f| &f.terms).collect(),
        }
    }

    pub fn terms_for(&self, parameter: P) -> Option<&TermsAggregation<P>> {
        self.terms().into_iter().find(|t| t.parameter == parameter)
    }
}

/// Aggregations plus the split of active filters between query and post-filter
#[derive(Debug, Clone)]
pub struct FacetPlan<P: SearchParameter> {
    pub aggregations: AggregationPlan<P>,
    /// Filters compiled into the main query
    pub query_params: ParameterValues<P>,
    /// Filters applied to hits only; AND of the groups
    pub post_filter: Vec<QueryNode>,
}

/// Plans facet aggregations for faceted requests
pub struct FacetPlanner<P: SearchParameter> {
    compiler: Arc<QueryCompiler<P>>,
    max_facet_size: usize,
    default_facet_limit: usize,
}

impl<P: SearchParameter> FacetPlanner<P> {
    pub fn new(compiler: Arc<QueryCompiler<P>>, config: &SearchConfig) -> Self {
        Self {
            compiler,
            max_facet_size: config.max_facet_size,
            default_facet_limit: config.default_facet_limit,
        }
    }

    /// Plan the aggregations of a request.
    ///
    /// With multi-select facets, two or more mapped facets and at least one
    /// active filter on a requested facet, filters on requested facets move
    /// to the post-filter and every facet's terms aggregation is wrapped in a
    /// filter of the other facets' selections. Otherwise every facet gets a
    /// plain terms aggregation over the main query.
    pub fn plan(&self, request: &FacetedSearchRequest<P>) -> SearchResult<FacetPlan<P>> {
        let catalog = self.compiler.catalog();
        let facets: Vec<(P, String)> = request
            .facets
            .iter()
            .filter_map(|facet| match catalog.field_for(*facet) {
                Some(field) => Some((*facet, field.to_string())),
                None => {
                    warn!(facet = facet.name(), "Skipping unmapped facet");
                    None
                }
            })
            .collect();

        let active = if self.compiler.is_match_all(request.request.q.as_deref()) {
            ParameterValues::new()
        } else {
            request.parameters().clone()
        };

        if facets.is_empty() {
            return Ok(FacetPlan {
                aggregations: AggregationPlan::None,
                query_params: active,
                post_filter: Vec::new(),
            });
        }

        let mut terms = Vec::with_capacity(facets.len());
        for (facet, field) in &facets {
            terms.push(self.terms_aggregation(request, *facet, field)?);
        }

        let (query_params, post_filter_params) = split_parameters(&active, &request.facets);
        if !request.multi_select_facets || facets.len() < 2 || post_filter_params.is_empty() {
            debug!(facets = terms.len(), "Planned simple facets");
            return Ok(FacetPlan {
                aggregations: AggregationPlan::Simple(terms),
                query_params: active,
                post_filter: Vec::new(),
            });
        }

        let mut compiled: Vec<(P, QueryNode)> = Vec::with_capacity(post_filter_params.len());
        for (parameter, values) in &post_filter_params {
            if let Some(node) = self.compiler.compile_parameter(*parameter, values)? {
                compiled.push((*parameter, node));
            }
        }
        compiled.sort_by_key(|(parameter, _)| parameter.name());

        let multi_select = terms
            .into_iter()
            .map(|terms| MultiSelectFacet {
                exclusion_filter: compiled
                    .iter()
                    .filter(|(parameter, _)| *parameter != terms.parameter)
                    .map(|(_, node)| node.clone())
                    .collect(),
                terms,
            })
            .collect::<Vec<_>>();

        debug!(
            facets = multi_select.len(),
            post_filters = compiled.len(),
            "Planned multi-select facets"
        );

        Ok(FacetPlan {
            aggregations: AggregationPlan::MultiSelectSafe(multi_select),
            query_params,
            post_filter: compiled.into_iter().map(|(_, node)| node).collect(),
        })
    }

    fn terms_aggregation(
        &self,
        request: &FacetedSearchRequest<P>,
        facet: P,
        field: &str,
    ) -> SearchResult<TermsAggregation<P>> {
        let offset = request.facet_offset_for(facet);
        let limit = request.facet_limit_for(facet, self.default_facet_limit);

        Ok(TermsAggregation {
            parameter: facet,
            field: field.to_string(),
            size: self.aggregation_size(field, offset, limit)?,
            offset,
            limit,
            min_count: request.facet_min_count,
        })
    }

    /// `min(offset + limit, cardinality)`, bounded by the facet size ceiling
    pub fn aggregation_size(&self, field: &str, offset: usize, limit: usize) -> SearchResult<usize> {
        let cardinality = self
            .compiler
            .catalog()
            .cardinality_of(field)
            .unwrap_or(usize::MAX);
        let size = offset.saturating_add(limit).min(cardinality);

        if size > self.max_facet_size {
            return Err(SearchError::FacetTooLarge {
                ceiling: self.max_facet_size,
            });
        }
        Ok(size)
    }
}

/// Split filters into those not on a requested facet and those on one
fn split_parameters<P: SearchParameter>(
    parameters: &ParameterValues<P>,
    facets: &[P],
) -> (ParameterValues<P>, ParameterValues<P>) {
    let mut query_params = HashMap::new();
    let mut post_filter_params = HashMap::new();
    for (parameter, values) in parameters {
        if facets.contains(parameter) {
            post_filter_params.insert(*parameter, values.clone());
        } else {
            query_params.insert(*parameter, values.clone());
        }
    }
    (query_params, post_filter_params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticFieldCatalog;
    use crate::parameter::ValueType;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Param {
        Country,
        Year,
        Kingdom,
        Unmapped,
    }

    impl SearchParameter for Param {
        fn name(&self) -> &'static str {
            match self {
                Param::Country => "COUNTRY",
                Param::Year => "YEAR",
                Param::Kingdom => "KINGDOM",
                Param::Unmapped => "UNMAPPED",
            }
        }

        fn value_type(&self) -> ValueType {
            match self {
                Param::Year => ValueType::Integer,
                _ => ValueType::Text,
            }
        }
    }

    fn planner() -> FacetPlanner<Param> {
        let catalog = StaticFieldCatalog::builder()
            .field(Param::Country, "country")
            .field(Param::Year, "year")
            .field(Param::Kingdom, "kingdom")
            .cardinality("kingdom", 8)
            .build();
        let config = SearchConfig::default();
        let compiler = QueryCompiler::new(Arc::new(catalog), &config).unwrap();
        FacetPlanner::new(Arc::new(compiler), &config)
    }

    #[test]
    fn test_no_facets() {
        let plan = planner()
            .plan(&FacetedSearchRequest::new().with_parameter(Param::Country, "DK"))
            .unwrap();
        assert!(plan.aggregations.is_none());
        assert_eq!(plan.query_params.len(), 1);
    }

    #[test]
    fn test_simple_without_multi_select() {
        let request = FacetedSearchRequest::new()
            .with_facets([Param::Country, Param::Year])
            .with_parameter(Param::Country, "DK");
        let plan = planner().plan(&request).unwrap();
        assert!(matches!(plan.aggregations, AggregationPlan::Simple(ref t) if t.len() == 2));
        assert!(plan.post_filter.is_empty());
        assert!(plan.query_params.contains_key(&Param::Country));
    }

    #[test]
    fn test_multi_select_without_overlap_is_simple() {
        let request = FacetedSearchRequest::new()
            .with_facets([Param::Country, Param::Year])
            .with_multi_select(true)
            .with_parameter(Param::Kingdom, "Animalia");
        let plan = planner().plan(&request).unwrap();
        assert!(matches!(plan.aggregations, AggregationPlan::Simple(_)));
    }

    #[test]
    fn test_multi_select_excludes_own_filter() {
        let request = FacetedSearchRequest::new()
            .with_facets([Param::Country, Param::Year])
            .with_multi_select(true)
            .with_parameter(Param::Country, "DK")
            .with_parameter(Param::Year, "2000")
            .with_parameter(Param::Kingdom, "Animalia");
        let plan = planner().plan(&request).unwrap();

        let facets = match plan.aggregations {
            AggregationPlan::MultiSelectSafe(facets) => facets,
            other => panic!("expected multi-select plan, got {:?}", other),
        };
        assert_eq!(facets.len(), 2);

        let country = &facets[0];
        assert_eq!(country.terms.parameter, Param::Country);
        assert_eq!(country.exclusion_filter.len(), 1);
        assert!(country.exclusion_filter[0].touches_field("year"));
        assert!(!country.exclusion_filter[0].touches_field("country"));

        let year = &facets[1];
        assert!(year.exclusion_filter[0].touches_field("country"));

        assert_eq!(plan.post_filter.len(), 2);
        assert_eq!(plan.query_params.len(), 1);
        assert!(plan.query_params.contains_key(&Param::Kingdom));
    }

    #[test]
    fn test_single_facet_multi_select_degrades_to_simple() {
        let base = FacetedSearchRequest::new()
            .with_facet(Param::Country)
            .with_parameter(Param::Country, "DK");
        let simple = planner().plan(&base).unwrap();
        let degenerate = planner().plan(&base.clone().with_multi_select(true)).unwrap();

        assert_eq!(simple.aggregations, degenerate.aggregations);
        assert_eq!(simple.query_params, degenerate.query_params);
        assert!(degenerate.post_filter.is_empty());
    }

    #[test]
    fn test_size_bounded_by_cardinality() {
        let request = FacetedSearchRequest::new()
            .with_facet(Param::Kingdom)
            .with_facet_paging(5, 20);
        let plan = planner().plan(&request).unwrap();
        let terms = plan.aggregations.terms_for(Param::Kingdom).unwrap();
        assert_eq!(terms.size, 8);
        assert_eq!(terms.offset, 5);
        assert_eq!(terms.limit, 20);
    }

    #[test]
    fn test_size_ceiling() {
        let request = FacetedSearchRequest::new()
            .with_facet(Param::Country)
            .with_facet_paging(1_000_000, 300_000);
        let err = planner().plan(&request).unwrap_err();
        assert!(matches!(err, SearchError::FacetTooLarge { ceiling: 1_200_000 }));
        assert!(err.to_string().contains("1200000"));
    }

    #[test]
    fn test_unmapped_facet_skipped() {
        let request = FacetedSearchRequest::new().with_facets([Param::Unmapped, Param::Year]);
        let plan = planner().plan(&request).unwrap();
        assert_eq!(plan.aggregations.terms().len(), 1);
    }

    #[test]
    fn test_match_all_drops_filters() {
        let request = FacetedSearchRequest::new()
            .with_q("*")
            .with_facets([Param::Country, Param::Year])
            .with_multi_select(true)
            .with_parameter(Param::Country, "DK");
        let plan = planner().plan(&request).unwrap();
        assert!(matches!(plan.aggregations, AggregationPlan::Simple(_)));
        assert!(plan.post_filter.is_empty());
        assert!(plan.query_params.is_empty());
    }
}
