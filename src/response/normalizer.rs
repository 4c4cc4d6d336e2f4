use super::hit::RawHit;
use super::spelling::spell_check_response;
use super::types::{
    Facet, FacetCount, NamedAggregation, RawAggregation, RawBucket, RawSearchResult,
    UniformSearchResponse,
};
use crate::catalog::FieldCatalog;
use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::parameter::SearchParameter;
use crate::request::{FacetedSearchRequest, SearchRequest};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns raw backend results into [`UniformSearchResponse`]s
pub struct ResponseNormalizer<P: SearchParameter> {
    catalog: Arc<dyn FieldCatalog<P>>,
    config: SearchConfig,
}

impl<P: SearchParameter> ResponseNormalizer<P> {
    pub fn new(catalog: Arc<dyn FieldCatalog<P>>, config: &SearchConfig) -> Self {
        Self {
            catalog,
            config: config.clone(),
        }
    }

    /// Normalize a plain search; aggregations in the raw result are ignored
    pub fn normalize<T, F>(
        &self,
        raw: RawSearchResult,
        request: &SearchRequest<P>,
        mapper: F,
    ) -> SearchResult<UniformSearchResponse<T, P>>
    where
        F: FnMut(&RawHit) -> T,
    {
        let RawSearchResult {
            total,
            hits,
            spell_check,
            ..
        } = raw;

        Ok(UniformSearchResponse {
            offset: request.offset,
            limit: self.config.page_size(request.limit),
            count: total,
            results: map_hits(hits, request.highlight, mapper),
            facets: Vec::new(),
            spell_check: spell_check.as_ref().map(spell_check_response),
        })
    }

    /// Normalize a faceted search
    pub fn normalize_faceted<T, F>(
        &self,
        mut raw: RawSearchResult,
        request: &FacetedSearchRequest<P>,
        mapper: F,
    ) -> SearchResult<UniformSearchResponse<T, P>>
    where
        F: FnMut(&RawHit) -> T,
    {
        let aggregations = std::mem::take(&mut raw.aggregations);
        let mut response = self.normalize(raw, &request.request, mapper)?;
        if request.facets_only {
            response.limit = 0;
        }
        response.facets = self.facets(aggregations, request)?;
        Ok(response)
    }

    /// Facets in request order; facets not requested follow in backend order
    pub fn facets(
        &self,
        aggregations: Vec<NamedAggregation>,
        request: &FacetedSearchRequest<P>,
    ) -> SearchResult<Vec<Facet<P>>> {
        let prefix = self.config.filtered_aggregation_prefix.as_str();
        let mut facets = Vec::with_capacity(aggregations.len());

        for NamedAggregation { name, aggregation } in aggregations {
            let field = name.strip_prefix(prefix).unwrap_or(&name);
            let Some(parameter) = self.catalog.parameter_for(field) else {
                warn!(aggregation = %name, "Skipping aggregation of unmapped field");
                continue;
            };

            let offset = request.facet_offset_for(parameter);
            let limit = request.facet_limit_for(parameter, self.config.default_facet_limit);
            let counts = self
                .buckets(field, aggregation)?
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(|bucket| FacetCount {
                    name: self
                        .catalog
                        .parse_indexed_value(parameter, &bucket.key.to_string()),
                    count: bucket.doc_count,
                })
                .collect::<Vec<_>>();

            debug!(facet = parameter.name(), counts = counts.len(), "Normalized facet");
            facets.push(Facet {
                field: parameter,
                counts,
            });
        }

        facets.sort_by_key(|facet| {
            request
                .facets
                .iter()
                .position(|requested| *requested == facet.field)
                .unwrap_or(usize::MAX)
        });
        Ok(facets)
    }

    fn buckets(&self, field: &str, aggregation: RawAggregation) -> SearchResult<Vec<RawBucket>> {
        match aggregation {
            RawAggregation::Terms(buckets) => Ok(buckets),
            RawAggregation::Filter { aggregations, .. } => {
                let inner = format!("{}{}", self.config.filtered_aggregation_prefix, field);
                let terms = aggregations
                    .into_iter()
                    .find(|a| a.name == inner)
                    .ok_or_else(|| {
                        SearchError::response(format!(
                            "filter aggregation for '{}' has no '{}' aggregation",
                            field, inner
                        ))
                    })?;
                match terms.aggregation {
                    RawAggregation::Terms(buckets) => Ok(buckets),
                    RawAggregation::Filter { .. } => Err(SearchError::response(format!(
                        "'{}' is not a terms aggregation",
                        inner
                    ))),
                }
            }
        }
    }
}

/// Map hits in backend order, dropping highlights that were not requested
pub fn map_hits<T, F>(hits: Vec<RawHit>, highlight: bool, mut mapper: F) -> Vec<T>
where
    F: FnMut(&RawHit) -> T,
{
    hits.into_iter()
        .map(|mut hit| {
            if !highlight {
                hit.highlight.clear();
            }
            mapper(&hit)
        })
        .collect()
}
