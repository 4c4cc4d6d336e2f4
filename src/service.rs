//! End-to-end search pipeline: compile, execute on a backend, normalize

use crate::backend::SearchBackend;
use crate::catalog::FieldCatalog;
use crate::compiled::SearchCompiler;
use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::parameter::SearchParameter;
use crate::request::{FacetedSearchRequest, SearchRequest};
use crate::response::{map_hits, RawHit, ResponseNormalizer, UniformSearchResponse};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument, warn};

/// Search service over a pluggable backend
pub struct SearchService<P: SearchParameter> {
    compiler: SearchCompiler<P>,
    normalizer: ResponseNormalizer<P>,
    backend: Arc<dyn SearchBackend<P>>,
    timeout: Duration,
}

impl<P: SearchParameter> SearchService<P> {
    pub fn new(
        catalog: Arc<dyn FieldCatalog<P>>,
        config: SearchConfig,
        backend: Arc<dyn SearchBackend<P>>,
    ) -> SearchResult<Self> {
        let compiler = SearchCompiler::new(Arc::clone(&catalog), config)?;
        let normalizer = ResponseNormalizer::new(catalog, compiler.config());
        let timeout = compiler.config().execution_timeout();
        Ok(Self {
            compiler,
            normalizer,
            backend,
            timeout,
        })
    }

    pub fn compiler(&self) -> &SearchCompiler<P> {
        &self.compiler
    }

    /// Run a plain search
    #[instrument(skip(self, request, mapper), fields(q = ?request.q))]
    pub async fn search<T, F>(
        &self,
        request: &SearchRequest<P>,
        mapper: F,
    ) -> SearchResult<UniformSearchResponse<T, P>>
    where
        F: FnMut(&RawHit) -> T,
    {
        let compiled = self.compiler.compile_search(request)?;
        let raw = self.execute(self.backend.search(&compiled)).await?;
        self.normalizer.normalize(raw, request, mapper)
    }

    /// Run a faceted search
    #[instrument(skip(self, request, mapper), fields(q = ?request.request.q, facets = request.facets.len()))]
    pub async fn faceted_search<T, F>(
        &self,
        request: &FacetedSearchRequest<P>,
        mapper: F,
    ) -> SearchResult<UniformSearchResponse<T, P>>
    where
        F: FnMut(&RawHit) -> T,
    {
        let compiled = self.compiler.compile_faceted(request)?;
        let raw = self.execute(self.backend.search(&compiled)).await?;
        self.normalizer.normalize_faceted(raw, request, mapper)
    }

    /// Autocomplete on a parameter; empty when the parameter is unmapped
    #[instrument(skip(self, request, parameter, mapper), fields(q = ?request.q, parameter = parameter.name()))]
    pub async fn autocomplete<T, F>(
        &self,
        request: &SearchRequest<P>,
        parameter: P,
        mapper: F,
    ) -> SearchResult<Vec<T>>
    where
        F: FnMut(&RawHit) -> T,
    {
        let Some(compiled) = self.compiler.compile_autocomplete(request, parameter)? else {
            warn!("Autocomplete on unmapped parameter");
            return Ok(Vec::new());
        };
        let raw = self.execute(self.backend.autocomplete(&compiled)).await?;
        Ok(map_hits(raw.hits, false, mapper))
    }

    /// Completion suggestions on a parameter; empty when the parameter is unmapped
    #[instrument(skip(self, parameter, mapper), fields(parameter = parameter.name()))]
    pub async fn suggest<T, F>(
        &self,
        prefix: &str,
        parameter: P,
        limit: Option<usize>,
        mapper: F,
    ) -> SearchResult<Vec<T>>
    where
        F: FnMut(&RawHit) -> T,
    {
        let Some(compiled) = self.compiler.compile_suggest(prefix, parameter, limit) else {
            warn!("Suggest on unmapped parameter");
            return Ok(Vec::new());
        };
        let hits = self.execute(self.backend.suggest(&compiled)).await?;
        Ok(map_hits(hits, false, mapper))
    }

    async fn execute<R, Fut>(&self, call: Fut) -> SearchResult<R>
    where
        Fut: Future<Output = anyhow::Result<R>>,
    {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(result)) => {
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Backend call completed");
                Ok(result)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Backend call failed");
                Err(SearchError::Execution(format!("{:#}", e)))
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Backend call timed out");
                Err(SearchError::Timeout(self.timeout))
            }
        }
    }
}
