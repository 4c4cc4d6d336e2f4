//! Integration tests for the search service over a mock backend

mod common;

use async_trait::async_trait;
use common::{init_tracing, shared_catalog, OccurrenceParameter as P};
use search_bridge::response::{NamedAggregation, RawAggregation, RawBucket};
use search_bridge::{
    CompiledAutocomplete, CompiledSearch, CompiledSuggest, ElasticsearchSerializer,
    FacetedSearchRequest, RawHit, RawSearchResult, SearchBackend, SearchConfig,
    SearchConfigBuilder, SearchError, SearchRequest, SearchService,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Serializes every request and answers with a canned result
#[derive(Default)]
struct MockBackend {
    bodies: Mutex<Vec<Value>>,
    delay: Option<Duration>,
    fail: bool,
}

impl MockBackend {
    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn last_body(&self) -> Value {
        self.bodies.lock().unwrap().last().cloned().unwrap_or(Value::Null)
    }

    async fn answer(&self, body: Value) -> anyhow::Result<()> {
        self.bodies.lock().unwrap().push(body);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl SearchBackend<P> for MockBackend {
    async fn search(&self, compiled: &CompiledSearch<P>) -> anyhow::Result<RawSearchResult> {
        let serializer = ElasticsearchSerializer::new(&SearchConfig::default());
        self.answer(serializer.search_body(compiled)).await?;
        Ok(RawSearchResult {
            total: 2,
            hits: vec![
                RawHit::new("1", json!({ "scientificName": "Puma concolor" })),
                RawHit::new("2", json!({ "scientificName": "Puma yagouaroundi" })),
            ],
            aggregations: vec![NamedAggregation::new(
                "country",
                RawAggregation::Terms(vec![RawBucket::new("DK", 2)]),
            )],
            spell_check: None,
        })
    }

    async fn autocomplete(
        &self,
        compiled: &CompiledAutocomplete,
    ) -> anyhow::Result<RawSearchResult> {
        let serializer = ElasticsearchSerializer::new(&SearchConfig::default());
        self.answer(serializer.autocomplete_body(compiled)).await?;
        Ok(RawSearchResult {
            total: 1,
            hits: vec![RawHit::new("1", json!({ "scientificName": "Puma concolor" }))],
            ..RawSearchResult::default()
        })
    }

    async fn suggest(&self, compiled: &CompiledSuggest) -> anyhow::Result<Vec<RawHit>> {
        let serializer = ElasticsearchSerializer::new(&SearchConfig::default());
        self.answer(serializer.suggest_body(compiled)).await?;
        Ok(vec![RawHit::new("1", json!({ "scientificName": "Puma" }))])
    }
}

fn service(backend: Arc<MockBackend>, config: SearchConfig) -> SearchService<P> {
    init_tracing();
    SearchService::new(shared_catalog(), config, backend).unwrap()
}

fn name(hit: &RawHit) -> String {
    hit.get_str("scientificName").unwrap_or_default()
}

#[tokio::test]
async fn test_search_round_trip() {
    let backend = Arc::new(MockBackend::default());
    let service = service(Arc::clone(&backend), SearchConfig::default());

    let response = service
        .search(
            &SearchRequest::new().with_q("puma").with_limit(2),
            name,
        )
        .await
        .unwrap();

    assert_eq!(response.count, 2);
    assert_eq!(response.limit, 2);
    assert_eq!(response.results, vec!["Puma concolor", "Puma yagouaroundi"]);
    assert!(response.facets.is_empty());
    assert_eq!(backend.last_body()["size"], json!(2));
}

#[tokio::test]
async fn test_faceted_search_round_trip() {
    let backend = Arc::new(MockBackend::default());
    let service = service(Arc::clone(&backend), SearchConfig::default());

    let response = service
        .faceted_search(
            &FacetedSearchRequest::new()
                .with_parameter(P::Country, "DK")
                .with_facet(P::Country),
            name,
        )
        .await
        .unwrap();

    assert_eq!(response.facet(P::Country).unwrap().counts[0].name, "DK");
    assert!(backend.last_body()["aggs"]["country"].is_object());
}

#[tokio::test]
async fn test_invalid_request_never_reaches_backend() {
    let backend = Arc::new(MockBackend::default());
    let service = service(Arc::clone(&backend), SearchConfig::default());

    let err = service
        .search(&SearchRequest::new().with_parameter(P::Year, "nineteen"), name)
        .await
        .unwrap_err();
    assert!(err.is_client_error());
    assert!(backend.bodies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_failure_is_execution_error() {
    let service = service(Arc::new(MockBackend::failing()), SearchConfig::default());

    let result = service.search(&SearchRequest::new(), name).await;
    let err = assert_err!(result);
    assert!(matches!(err, SearchError::Execution(ref msg) if msg.contains("connection refused")));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let config = SearchConfigBuilder::new().execution_timeout_ms(20).build();
    let service = service(Arc::new(MockBackend::slow(Duration::from_secs(5))), config);

    let err = service.search(&SearchRequest::new(), name).await.unwrap_err();
    assert!(matches!(err, SearchError::Timeout(d) if d == Duration::from_millis(20)));
}

#[tokio::test]
async fn test_autocomplete_and_suggest() {
    let backend = Arc::new(MockBackend::default());
    let service = service(Arc::clone(&backend), SearchConfig::default());

    let names = assert_ok!(
        service
            .autocomplete(&SearchRequest::new().with_q("pum"), P::ScientificName, name)
            .await
    );
    assert_eq!(names, vec!["Puma concolor"]);
    assert!(backend.last_body()["query"]["bool"]["should"].is_array());

    let names = assert_ok!(service.suggest("pu", P::ScientificName, None, name).await);
    assert_eq!(names, vec!["Puma"]);
    assert_eq!(
        backend.last_body()["suggest"]["scientificName"]["completion"]["size"],
        json!(10)
    );
}

#[tokio::test]
async fn test_unmapped_parameters_return_nothing() {
    let backend = Arc::new(MockBackend::default());
    let service = service(Arc::clone(&backend), SearchConfig::default());

    let names = service
        .autocomplete(&SearchRequest::new().with_q("pum"), P::Unmapped, name)
        .await
        .unwrap();
    assert!(names.is_empty());

    let names = service.suggest("pu", P::Unmapped, Some(5), name).await.unwrap();
    assert!(names.is_empty());
    assert!(backend.bodies.lock().unwrap().is_empty());
}
