//! Search backends
//!
//! A backend executes compiled requests against a search engine and returns
//! the engine-neutral raw result. The serializers in [`elasticsearch`] and
//! [`solr`] translate compiled requests and responses for the two supported
//! engines; transport is left to the [`SearchBackend`] implementation.

pub mod elasticsearch;
pub mod solr;

pub use elasticsearch::ElasticsearchSerializer;
pub use solr::{SolrParams, SolrSerializer};

use crate::compiled::{CompiledAutocomplete, CompiledSearch, CompiledSuggest};
use crate::parameter::SearchParameter;
use crate::response::{RawHit, RawSearchResult};
use anyhow::bail;
use async_trait::async_trait;

/// Executes compiled requests against a search engine
#[async_trait]
pub trait SearchBackend<P: SearchParameter>: Send + Sync {
    /// Execute a plain or faceted search
    async fn search(&self, compiled: &CompiledSearch<P>) -> anyhow::Result<RawSearchResult>;

    /// Execute an autocomplete request
    async fn autocomplete(
        &self,
        _compiled: &CompiledAutocomplete,
    ) -> anyhow::Result<RawSearchResult> {
        bail!("autocomplete is not supported by this backend")
    }

    /// Execute a completion-suggest request
    async fn suggest(&self, _compiled: &CompiledSuggest) -> anyhow::Result<Vec<RawHit>> {
        bail!("completion suggest is not supported by this backend")
    }
}
