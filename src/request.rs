//! Backend-agnostic search requests

use crate::catalog::SortField;
use crate::config::SearchConfig;
use crate::parameter::SearchParameter;
use std::collections::{BTreeSet, HashMap};

/// Parameter to raw filter values
pub type ParameterValues<P> = HashMap<P, BTreeSet<String>>;

/// Plain search request
#[derive(Debug, Clone)]
pub struct SearchRequest<P: SearchParameter> {
    /// Free-text term
    pub q: Option<String>,

    pub offset: usize,

    /// Requested page size; capped by the configured maximum when compiled
    pub limit: Option<usize>,

    /// Highlight matches of the free-text term
    pub highlight: bool,

    /// Explicit sort hints; override default ordering
    pub sort: Vec<SortField>,

    /// Raw filter values per parameter
    pub parameters: ParameterValues<P>,
}

impl<P: SearchParameter> Default for SearchRequest<P> {
    fn default() -> Self {
        Self {
            q: None,
            offset: 0,
            limit: None,
            highlight: false,
            sort: Vec::new(),
            parameters: HashMap::new(),
        }
    }
}

impl<P: SearchParameter> SearchRequest<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text term
    pub fn with_q(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }

    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    /// Add one raw filter value
    pub fn with_parameter(mut self, parameter: P, value: impl Into<String>) -> Self {
        self.add_parameter(parameter, value);
        self
    }

    /// Add several raw filter values for one parameter
    pub fn with_parameters<I, S>(mut self, parameter: P, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self.add_parameter(parameter, value);
        }
        self
    }

    pub fn add_parameter(&mut self, parameter: P, value: impl Into<String>) {
        self.parameters
            .entry(parameter)
            .or_default()
            .insert(value.into());
    }

    /// Free-text term, ignoring blank input
    pub fn free_text(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// Whether the free-text term is the match-all sentinel
    pub fn is_match_all(&self, config: &SearchConfig) -> bool {
        self.free_text() == Some(config.match_all_sentinel.as_str())
    }
}

/// Paging window of one facet's buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FacetPage {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// Search request with facets
#[derive(Debug, Clone)]
pub struct FacetedSearchRequest<P: SearchParameter> {
    pub request: SearchRequest<P>,

    /// Requested facets, in response order
    pub facets: Vec<P>,

    /// Facet counts ignore a facet's own selection
    pub multi_select_facets: bool,

    pub facet_min_count: Option<u32>,

    /// Suppress hit retrieval
    pub facets_only: bool,

    pub facet_offset: Option<usize>,
    pub facet_limit: Option<usize>,

    /// Per-facet paging overrides
    pub facet_pages: HashMap<P, FacetPage>,
}

impl<P: SearchParameter> Default for FacetedSearchRequest<P> {
    fn default() -> Self {
        Self {
            request: SearchRequest::default(),
            facets: Vec::new(),
            multi_select_facets: false,
            facet_min_count: None,
            facets_only: false,
            facet_offset: None,
            facet_limit: None,
            facet_pages: HashMap::new(),
        }
    }
}

impl<P: SearchParameter> From<SearchRequest<P>> for FacetedSearchRequest<P> {
    fn from(request: SearchRequest<P>) -> Self {
        Self {
            request,
            ..Self::default()
        }
    }
}

impl<P: SearchParameter> FacetedSearchRequest<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_q(mut self, q: impl Into<String>) -> Self {
        self.request = self.request.with_q(q);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.request.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.request.limit = Some(limit);
        self
    }

    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.request.highlight = highlight;
        self
    }

    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.request.sort.push(sort);
        self
    }

    pub fn with_parameter(mut self, parameter: P, value: impl Into<String>) -> Self {
        self.request.add_parameter(parameter, value);
        self
    }

    pub fn with_parameters<I, S>(mut self, parameter: P, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request = self.request.with_parameters(parameter, values);
        self
    }

    /// Request a facet; repeated facets are ignored
    pub fn with_facet(mut self, facet: P) -> Self {
        if !self.facets.contains(&facet) {
            self.facets.push(facet);
        }
        self
    }

    pub fn with_facets<I: IntoIterator<Item = P>>(mut self, facets: I) -> Self {
        for facet in facets {
            self = self.with_facet(facet);
        }
        self
    }

    pub fn with_multi_select(mut self, enabled: bool) -> Self {
        self.multi_select_facets = enabled;
        self
    }

    pub fn with_facet_min_count(mut self, min_count: u32) -> Self {
        self.facet_min_count = Some(min_count);
        self
    }

    pub fn with_facets_only(mut self, facets_only: bool) -> Self {
        self.facets_only = facets_only;
        self
    }

    /// Request-level facet paging
    pub fn with_facet_paging(mut self, offset: usize, limit: usize) -> Self {
        self.facet_offset = Some(offset);
        self.facet_limit = Some(limit);
        self
    }

    /// Paging for a single facet
    pub fn with_facet_page(mut self, facet: P, offset: usize, limit: usize) -> Self {
        self.facet_pages.insert(
            facet,
            FacetPage {
                offset: Some(offset),
                limit: Some(limit),
            },
        );
        self
    }

    /// Effective bucket offset of a facet
    pub fn facet_offset_for(&self, facet: P) -> usize {
        self.facet_pages
            .get(&facet)
            .and_then(|page| page.offset)
            .or(self.facet_offset)
            .unwrap_or(0)
    }

    /// Effective bucket limit of a facet
    pub fn facet_limit_for(&self, facet: P, default_limit: usize) -> usize {
        self.facet_pages
            .get(&facet)
            .and_then(|page| page.limit)
            .or(self.facet_limit)
            .unwrap_or(default_limit)
    }

    pub fn parameters(&self) -> &ParameterValues<P> {
        &self.request.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ValueType;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Param {
        Country,
        Year,
    }

    impl SearchParameter for Param {
        fn name(&self) -> &'static str {
            match self {
                Param::Country => "COUNTRY",
                Param::Year => "YEAR",
            }
        }

        fn value_type(&self) -> ValueType {
            match self {
                Param::Country => ValueType::Text,
                Param::Year => ValueType::Integer,
            }
        }
    }

    #[test]
    fn test_parameter_values_are_sets() {
        let request = SearchRequest::new()
            .with_parameter(Param::Country, "DK")
            .with_parameters(Param::Country, ["SE", "DK"]);
        assert_eq!(request.parameters[&Param::Country].len(), 2);
    }

    #[test]
    fn test_blank_free_text_is_absent() {
        let request: SearchRequest<Param> = SearchRequest::new().with_q("   ");
        assert_eq!(request.free_text(), None);

        let request: SearchRequest<Param> = SearchRequest::new().with_q(" * ");
        assert!(request.is_match_all(&SearchConfig::default()));
    }

    #[test]
    fn test_facets_are_deduplicated_in_order() {
        let request = FacetedSearchRequest::new()
            .with_facet(Param::Year)
            .with_facet(Param::Country)
            .with_facet(Param::Year);
        assert_eq!(request.facets, vec![Param::Year, Param::Country]);
    }

    #[test]
    fn test_facet_paging_resolution() {
        let config = SearchConfig::default();
        let request: FacetedSearchRequest<Param> = FacetedSearchRequest::new();
        assert_eq!(request.facet_offset_for(Param::Year), 0);
        assert_eq!(request.facet_limit_for(Param::Year, config.default_facet_limit), 10);

        let request = request
            .with_facet_paging(5, 20)
            .with_facet_page(Param::Country, 1, 2);
        assert_eq!(request.facet_offset_for(Param::Year), 5);
        assert_eq!(request.facet_limit_for(Param::Year, config.default_facet_limit), 20);
        assert_eq!(request.facet_offset_for(Param::Country), 1);
        assert_eq!(request.facet_limit_for(Param::Country, config.default_facet_limit), 2);
    }
}
