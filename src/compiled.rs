//! Backend-neutral compiled queries
//!
//! [`SearchCompiler`] merges the compiled predicate tree, the facet plan,
//! paging, sort, highlighting and source filtering into one
//! [`CompiledSearch`] that a backend serializer turns into its wire format.

use crate::catalog::{FieldCatalog, SortField};
use crate::config::{HighlightConfig, SearchConfig};
use crate::error::SearchResult;
use crate::facet::{AggregationPlan, FacetPlanner};
use crate::parameter::SearchParameter;
use crate::query::{BoolQuery, QueryCompiler, QueryNode};
use crate::request::{FacetedSearchRequest, SearchRequest};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Minimum free-text length for the span-first prefix boost in autocomplete
const PREFIX_BOOST_MIN_LEN: usize = 3;

/// Boost of the prefix clause in autocomplete requests
pub const PREFIX_BOOST: f32 = 100.0;

/// Positions a prefix may match from the start of the field in autocomplete
pub const PREFIX_SPAN_END: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    /// Relevance score, descending
    Score,
    Field(SortField),
}

/// Highlighting settings attached to a compiled query
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightSpec {
    pub pre_tag: String,
    pub post_tag: String,
    pub fields: Vec<String>,
    /// 0 returns whole field values
    pub number_of_fragments: usize,
    pub snippets: usize,
    pub fragment_size: usize,
    pub encoder: &'static str,
    pub highlighter: &'static str,
    pub require_field_match: bool,
}

impl HighlightSpec {
    fn new(config: &HighlightConfig, fields: Vec<String>) -> Self {
        Self {
            pre_tag: config.pre_tag.clone(),
            post_tag: config.post_tag.clone(),
            fields,
            number_of_fragments: config.number_of_fragments,
            snippets: config.snippets,
            fragment_size: config.fragment_size,
            encoder: "html",
            highlighter: "unified",
            require_field_match: false,
        }
    }
}

/// Fields kept in and removed from returned documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFilter {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

/// A search compiled into backend-neutral form
#[derive(Debug, Clone)]
pub struct CompiledSearch<P: SearchParameter> {
    /// `None` matches every document
    pub query: Option<BoolQuery>,
    /// AND of the groups, applied to hits only
    pub post_filter: Vec<QueryNode>,
    pub aggregations: AggregationPlan<P>,
    pub from: usize,
    pub size: usize,
    pub sort: Vec<SortKey>,
    pub highlight: Option<HighlightSpec>,
    pub source: SourceFilter,
    pub track_total_hits: bool,
}

impl<P: SearchParameter> CompiledSearch<P> {
    pub fn is_match_all(&self) -> bool {
        self.query.is_none()
    }

    pub fn is_multi_select(&self) -> bool {
        matches!(self.aggregations, AggregationPlan::MultiSelectSafe(_))
    }
}

/// Autocomplete over a parameter's autocomplete field
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledAutocomplete {
    pub field: String,
    /// Field matched by the prefix clause
    pub prefix_field: String,
    /// `None` matches every document
    pub text: Option<String>,
    /// Add a boosted span-first prefix clause
    pub prefix_clause: bool,
    pub filter: Option<BoolQuery>,
    pub from: usize,
    pub size: usize,
    pub source: SourceFilter,
}

/// Completion suggestions on a parameter's field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSuggest {
    pub field: String,
    pub prefix: String,
    pub size: usize,
    pub skip_duplicates: bool,
    pub source: SourceFilter,
}

/// Compiles requests against one catalog and configuration
pub struct SearchCompiler<P: SearchParameter> {
    config: SearchConfig,
    compiler: Arc<QueryCompiler<P>>,
    planner: FacetPlanner<P>,
}

impl<P: SearchParameter> SearchCompiler<P> {
    pub fn new(catalog: Arc<dyn FieldCatalog<P>>, config: SearchConfig) -> SearchResult<Self> {
        let config = config.validated()?;
        let compiler = Arc::new(QueryCompiler::new(catalog, &config)?);
        let planner = FacetPlanner::new(Arc::clone(&compiler), &config);
        Ok(Self {
            config,
            compiler,
            planner,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn FieldCatalog<P>> {
        self.compiler.catalog()
    }

    pub fn query_compiler(&self) -> &QueryCompiler<P> {
        &self.compiler
    }

    pub fn planner(&self) -> &FacetPlanner<P> {
        &self.planner
    }

    /// Compile a plain search
    #[instrument(skip(self, request), fields(q = ?request.q))]
    pub fn compile_search(&self, request: &SearchRequest<P>) -> SearchResult<CompiledSearch<P>> {
        let query = self
            .compiler
            .compile(&request.parameters, request.q.as_deref())?;

        Ok(CompiledSearch {
            query,
            post_filter: Vec::new(),
            aggregations: AggregationPlan::None,
            from: request.offset,
            size: self.config.page_size(request.limit),
            sort: self.sort(request),
            highlight: self.highlight(request),
            source: self.source_filter(),
            track_total_hits: self.config.track_total_hits,
        })
    }

    /// Compile a faceted search
    #[instrument(skip(self, request), fields(q = ?request.request.q, facets = request.facets.len()))]
    pub fn compile_faceted(
        &self,
        request: &FacetedSearchRequest<P>,
    ) -> SearchResult<CompiledSearch<P>> {
        let plan = self.planner.plan(request)?;
        let query = self
            .compiler
            .compile(&plan.query_params, request.request.q.as_deref())?;

        let size = if request.facets_only {
            0
        } else {
            self.config.page_size(request.request.limit)
        };

        let compiled = CompiledSearch {
            query,
            post_filter: plan.post_filter,
            aggregations: plan.aggregations,
            from: request.request.offset,
            size,
            sort: self.sort(&request.request),
            highlight: self.highlight(&request.request),
            source: self.source_filter(),
            track_total_hits: self.config.track_total_hits,
        };
        debug!(
            match_all = compiled.is_match_all(),
            multi_select = compiled.is_multi_select(),
            size = compiled.size,
            "Compiled faceted search"
        );
        Ok(compiled)
    }

    /// Compile an autocomplete request; `None` when the parameter is unmapped
    pub fn compile_autocomplete(
        &self,
        request: &SearchRequest<P>,
        parameter: P,
    ) -> SearchResult<Option<CompiledAutocomplete>> {
        let catalog = self.compiler.catalog();
        let (Some(prefix_field), Some(field)) = (
            catalog.field_for(parameter),
            catalog.autocomplete_field_for(parameter, &self.config.autocomplete_suffix),
        ) else {
            return Ok(None);
        };

        let filter = self.compiler.compile(&request.parameters, None)?;
        let text = request.free_text().map(str::to_string);
        let prefix_clause = text
            .as_deref()
            .map(|t| t.chars().count() >= PREFIX_BOOST_MIN_LEN)
            .unwrap_or(false);

        Ok(Some(CompiledAutocomplete {
            field,
            prefix_field: prefix_field.to_string(),
            text,
            prefix_clause,
            filter,
            from: request.offset,
            size: self.config.page_size(request.limit),
            source: SourceFilter {
                includes: catalog.suggest_fields(parameter),
                excludes: catalog.excluded_result_fields(),
            },
        }))
    }

    /// Compile a completion-suggest request; `None` when the parameter is unmapped
    pub fn compile_suggest(
        &self,
        prefix: &str,
        parameter: P,
        limit: Option<usize>,
    ) -> Option<CompiledSuggest> {
        let catalog = self.compiler.catalog();
        let field = catalog.field_for(parameter)?;
        Some(CompiledSuggest {
            field: field.to_string(),
            prefix: prefix.to_string(),
            size: limit.unwrap_or(self.config.default_suggest_limit),
            skip_duplicates: true,
            source: SourceFilter {
                includes: catalog.suggest_fields(parameter),
                excludes: catalog.excluded_result_fields(),
            },
        })
    }

    fn sort(&self, request: &SearchRequest<P>) -> Vec<SortKey> {
        if !request.sort.is_empty() {
            return request.sort.iter().cloned().map(SortKey::Field).collect();
        }
        if request.free_text().is_some() {
            return vec![SortKey::Score];
        }
        self.compiler
            .catalog()
            .default_sort_order()
            .into_iter()
            .map(SortKey::Field)
            .collect()
    }

    fn highlight(&self, request: &SearchRequest<P>) -> Option<HighlightSpec> {
        if !request.highlight
            || request.free_text().is_none()
            || request.is_match_all(&self.config)
        {
            return None;
        }
        Some(HighlightSpec::new(
            &self.config.highlight,
            self.compiler.catalog().highlight_fields(),
        ))
    }

    fn source_filter(&self) -> SourceFilter {
        let catalog = self.compiler.catalog();
        SourceFilter {
            includes: catalog.included_result_fields(),
            excludes: catalog.excluded_result_fields(),
        }
    }
}
