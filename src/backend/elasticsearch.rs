//! JSON query-DSL serializer and response parser

use crate::compiled::{
    CompiledAutocomplete, CompiledSearch, CompiledSuggest, HighlightSpec, SortKey, SourceFilter,
    PREFIX_BOOST, PREFIX_SPAN_END,
};
use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::facet::{AggregationPlan, TermsAggregation};
use crate::parameter::SearchParameter;
use crate::query::{BoolQuery, FilterPredicate, FullTextClause, QueryNode};
use crate::response::{
    BucketKey, NamedAggregation, RawAggregation, RawBucket, RawHit, RawSearchResult,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Serializes compiled searches into request bodies and parses responses
#[derive(Debug, Clone)]
pub struct ElasticsearchSerializer {
    filtered_prefix: String,
}

impl ElasticsearchSerializer {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            filtered_prefix: config.filtered_aggregation_prefix.clone(),
        }
    }

    /// Search request body
    pub fn search_body<P: SearchParameter>(&self, compiled: &CompiledSearch<P>) -> Value {
        let mut body = Map::new();
        body.insert("from".into(), json!(compiled.from));
        body.insert("size".into(), json!(compiled.size));
        body.insert("track_total_hits".into(), json!(compiled.track_total_hits));
        body.insert("_source".into(), source_filter(&compiled.source));

        let query = match &compiled.query {
            Some(query) => bool_query(query),
            None => json!({ "match_all": {} }),
        };
        body.insert("query".into(), query);

        if !compiled.sort.is_empty() {
            body.insert(
                "sort".into(),
                Value::Array(compiled.sort.iter().map(sort_key).collect()),
            );
        }

        if !compiled.post_filter.is_empty() {
            body.insert("post_filter".into(), filter_query(&compiled.post_filter));
        }

        if let Some(aggs) = self.aggregations(&compiled.aggregations) {
            body.insert("aggs".into(), aggs);
        }

        if let Some(highlight) = &compiled.highlight {
            body.insert("highlight".into(), highlight_spec(highlight));
        }

        let body = Value::Object(body);
        debug!(body = %body, "Serialized search request");
        body
    }

    /// Autocomplete request body
    pub fn autocomplete_body(&self, compiled: &CompiledAutocomplete) -> Value {
        let mut should = Vec::new();
        let mut must = Vec::new();

        match &compiled.text {
            Some(text) => {
                should.push(json!({
                    "match": {
                        compiled.field.as_str(): { "query": text, "operator": "and" }
                    }
                }));
                if compiled.prefix_clause {
                    should.push(json!({
                        "span_first": {
                            "match": {
                                "span_multi": {
                                    "match": {
                                        "prefix": {
                                            compiled.prefix_field.as_str(): { "value": text.to_lowercase() }
                                        }
                                    }
                                }
                            },
                            "end": PREFIX_SPAN_END,
                            "boost": PREFIX_BOOST
                        }
                    }));
                }
            }
            None => must.push(json!({ "match_all": {} })),
        }

        if let Some(filter) = &compiled.filter {
            must.push(bool_query(filter));
        }

        let mut bool_body = Map::new();
        if !must.is_empty() {
            bool_body.insert("must".into(), Value::Array(must));
        }
        if !should.is_empty() {
            bool_body.insert("should".into(), Value::Array(should));
        }

        json!({
            "from": compiled.from,
            "size": compiled.size,
            "query": { "bool": bool_body },
            "_source": source_filter(&compiled.source),
        })
    }

    /// Completion-suggest request body
    pub fn suggest_body(&self, compiled: &CompiledSuggest) -> Value {
        json!({
            "suggest": {
                compiled.field.as_str(): {
                    "prefix": compiled.prefix,
                    "completion": {
                        "field": compiled.field,
                        "size": compiled.size,
                        "skip_duplicates": compiled.skip_duplicates
                    }
                }
            },
            "_source": source_filter(&compiled.source),
        })
    }

    fn aggregations<P: SearchParameter>(&self, plan: &AggregationPlan<P>) -> Option<Value> {
        let mut aggs = Map::new();
        match plan {
            AggregationPlan::None => return None,
            AggregationPlan::Simple(terms) => {
                for terms in terms {
                    aggs.insert(terms.field.clone(), terms_aggregation(terms));
                }
            }
            AggregationPlan::MultiSelectSafe(facets) => {
                for facet in facets {
                    let inner = format!("{}{}", self.filtered_prefix, facet.terms.field);
                    aggs.insert(
                        facet.terms.field.clone(),
                        json!({
                            "filter": filter_query(&facet.exclusion_filter),
                            "aggs": { inner: terms_aggregation(&facet.terms) }
                        }),
                    );
                }
            }
        }
        Some(Value::Object(aggs))
    }

    /// Parse a search response body
    pub fn parse_search_response(&self, body: &str) -> SearchResult<RawSearchResult> {
        let response: EsSearchResponse = serde_json::from_str(body)?;

        let total = match response.hits.total {
            Some(EsTotal::Object { value }) => value,
            Some(EsTotal::Count(value)) => value,
            None => response.hits.hits.len() as u64,
        };

        let hits = response.hits.hits.into_iter().map(RawHit::from).collect();

        let mut aggregations = Vec::with_capacity(response.aggregations.len());
        for (name, value) in response.aggregations {
            let aggregation = parse_aggregation(&name, &value)?;
            aggregations.push(NamedAggregation { name, aggregation });
        }

        Ok(RawSearchResult {
            total,
            hits,
            aggregations,
            spell_check: None,
        })
    }

    /// Parse the options of a completion-suggest response
    pub fn parse_suggest_response(&self, body: &str, field: &str) -> SearchResult<Vec<RawHit>> {
        let response: EsSuggestResponse = serde_json::from_str(body)?;
        Ok(response
            .suggest
            .get(field)
            .map(|entries| {
                entries
                    .iter()
                    .flat_map(|entry| entry.options.iter().cloned())
                    .map(RawHit::from)
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Query for a compiled boolean query
pub fn bool_query(query: &BoolQuery) -> Value {
    let mut bool_body = Map::new();
    if !query.must.is_empty() {
        bool_body.insert(
            "must".into(),
            Value::Array(query.must.iter().map(full_text_clause).collect()),
        );
    }
    if !query.filter.is_empty() {
        bool_body.insert(
            "filter".into(),
            Value::Array(query.filter.iter().map(query_node).collect()),
        );
    }
    json!({ "bool": bool_body })
}

/// Query for a predicate tree
pub fn query_node(node: &QueryNode) -> Value {
    match node {
        QueryNode::Predicate(predicate) => filter_predicate(predicate),
        QueryNode::Not(inner) => json!({ "bool": { "must_not": [query_node(inner)] } }),
        QueryNode::Or(nodes) => json!({
            "bool": {
                "should": nodes.iter().map(query_node).collect::<Vec<_>>(),
                "minimum_should_match": 1
            }
        }),
        QueryNode::And(nodes) => json!({
            "bool": { "filter": nodes.iter().map(query_node).collect::<Vec<_>>() }
        }),
    }
}

fn filter_predicate(predicate: &FilterPredicate) -> Value {
    match predicate {
        FilterPredicate::Equality { field, value } => json!({ "term": { field.as_str(): value } }),
        FilterPredicate::MultiEquality { field, values } => {
            json!({ "terms": { field.as_str(): values } })
        }
        FilterPredicate::Range {
            field,
            lower,
            upper,
        } => {
            let mut bounds = Map::new();
            if let Some(lower) = lower {
                bounds.insert("gte".into(), json!(lower));
            }
            if let Some(upper) = upper {
                bounds.insert("lte".into(), json!(upper));
            }
            json!({ "range": { field.as_str(): bounds } })
        }
        FilterPredicate::Spatial { field, shape } => json!({
            "geo_shape": {
                field.as_str(): { "shape": shape, "relation": "within" }
            }
        }),
    }
}

fn full_text_clause(clause: &FullTextClause) -> Value {
    match clause {
        FullTextClause::Match { field, text } => {
            json!({ "match": { field.as_str(): { "query": text } } })
        }
        FullTextClause::QueryString { query } => json!({ "query_string": { "query": query } }),
    }
}

fn filter_query(nodes: &[QueryNode]) -> Value {
    json!({ "bool": { "filter": nodes.iter().map(query_node).collect::<Vec<_>>() } })
}

fn terms_aggregation<P: SearchParameter>(terms: &TermsAggregation<P>) -> Value {
    let mut body = Map::new();
    body.insert("field".into(), json!(terms.field));
    body.insert("size".into(), json!(terms.size));
    if let Some(min_count) = terms.min_count {
        body.insert("min_doc_count".into(), json!(min_count));
    }
    json!({ "terms": body })
}

fn sort_key(key: &SortKey) -> Value {
    match key {
        SortKey::Score => json!({ "_score": { "order": "desc" } }),
        SortKey::Field(sort) => {
            json!({ sort.field.as_str(): { "order": sort.direction.to_string() } })
        }
    }
}

fn source_filter(source: &SourceFilter) -> Value {
    json!({ "includes": source.includes, "excludes": source.excludes })
}

fn highlight_spec(spec: &HighlightSpec) -> Value {
    let fields: Map<String, Value> = spec
        .fields
        .iter()
        .map(|field| (field.clone(), json!({})))
        .collect();
    json!({
        "pre_tags": [spec.pre_tag],
        "post_tags": [spec.post_tag],
        "encoder": spec.encoder,
        "type": spec.highlighter,
        "require_field_match": spec.require_field_match,
        "number_of_fragments": spec.number_of_fragments,
        "fields": fields,
    })
}

fn parse_aggregation(name: &str, value: &Value) -> SearchResult<RawAggregation> {
    if let Some(buckets) = value.get("buckets") {
        let buckets = buckets.as_array().ok_or_else(|| {
            SearchError::response(format!("buckets of aggregation '{}' are not a list", name))
        })?;
        return buckets
            .iter()
            .map(|bucket| parse_bucket(name, bucket))
            .collect::<SearchResult<Vec<_>>>()
            .map(RawAggregation::Terms);
    }

    let object = value
        .as_object()
        .ok_or_else(|| SearchError::response(format!("aggregation '{}' is not an object", name)))?;
    let doc_count = object
        .get("doc_count")
        .and_then(Value::as_u64)
        .ok_or_else(|| SearchError::response(format!("{} aggregation not supported", name)))?;

    let mut aggregations = Vec::new();
    for (inner_name, inner) in object {
        if inner.is_object() {
            aggregations.push(NamedAggregation {
                name: inner_name.clone(),
                aggregation: parse_aggregation(inner_name, inner)?,
            });
        }
    }
    Ok(RawAggregation::Filter {
        doc_count,
        aggregations,
    })
}

fn parse_bucket(name: &str, bucket: &Value) -> SearchResult<RawBucket> {
    let key = match bucket.get("key") {
        Some(Value::String(key)) => BucketKey::Text(key.clone()),
        Some(Value::Number(key)) => match key.as_i64() {
            Some(key) => BucketKey::Integer(key),
            None => BucketKey::Number(key.as_f64().unwrap_or_default()),
        },
        Some(Value::Bool(key)) => BucketKey::Text(key.to_string()),
        _ => {
            return Err(SearchError::response(format!(
                "bucket of aggregation '{}' has no key",
                name
            )))
        }
    };
    let doc_count = bucket
        .get("doc_count")
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            SearchError::response(format!("bucket of aggregation '{}' has no doc_count", name))
        })?;
    Ok(RawBucket { key, doc_count })
}

#[derive(Debug, Deserialize)]
struct EsSearchResponse {
    hits: EsHits,
    #[serde(default)]
    aggregations: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct EsHits {
    #[serde(default)]
    total: Option<EsTotal>,
    #[serde(default)]
    hits: Vec<EsHit>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EsTotal {
    Object { value: u64 },
    Count(u64),
}

#[derive(Debug, Clone, Deserialize)]
struct EsHit {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
    #[serde(default)]
    highlight: HashMap<String, Vec<String>>,
}

impl From<EsHit> for RawHit {
    fn from(hit: EsHit) -> Self {
        RawHit {
            id: hit.id,
            score: hit.score,
            source: hit.source,
            highlight: hit.highlight,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EsSuggestResponse {
    #[serde(default)]
    suggest: HashMap<String, Vec<EsSuggestEntry>>,
}

#[derive(Debug, Deserialize)]
struct EsSuggestEntry {
    #[serde(default)]
    options: Vec<EsHit>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::TypedValue;

    fn eq(field: &str, value: &str) -> QueryNode {
        FilterPredicate::Equality {
            field: field.to_string(),
            value: TypedValue::Text(value.to_string()),
        }
        .into()
    }

    #[test]
    fn test_predicate_tree() {
        let node = QueryNode::And(vec![
            QueryNode::Or(vec![eq("country", "DK"), eq("country", "SE")]),
            QueryNode::not(eq("country", "NO")),
        ]);
        assert_eq!(
            query_node(&node),
            json!({
                "bool": { "filter": [
                    { "bool": {
                        "should": [
                            { "term": { "country": "DK" } },
                            { "term": { "country": "SE" } }
                        ],
                        "minimum_should_match": 1
                    }},
                    { "bool": { "must_not": [ { "term": { "country": "NO" } } ] } }
                ]}
            })
        );
    }

    #[test]
    fn test_open_range_omits_bound() {
        let node: QueryNode = FilterPredicate::Range {
            field: "year".to_string(),
            lower: Some(TypedValue::Integer(1990)),
            upper: None,
        }
        .into();
        assert_eq!(
            query_node(&node),
            json!({ "range": { "year": { "gte": 1990 } } })
        );
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "hits": {
                "total": { "value": 2, "relation": "eq" },
                "hits": [
                    { "_id": "a", "_score": 1.5, "_source": { "title": "Puma" },
                      "highlight": { "title": ["<em>Puma</em>"] } },
                    { "_id": "b", "_score": 1.0, "_source": { "title": "Lynx" } }
                ]
            },
            "aggregations": {
                "country": { "buckets": [ { "key": "DK", "doc_count": 2 } ] },
                "year": {
                    "doc_count": 2,
                    "filtered_year": { "buckets": [ { "key": 2010, "doc_count": 2 } ] }
                }
            }
        }"#;

        let raw = ElasticsearchSerializer::new(&SearchConfig::default())
            .parse_search_response(body)
            .unwrap();
        assert_eq!(raw.total, 2);
        assert_eq!(raw.hits[0].id, "a");
        assert_eq!(raw.hits[0].highlight["title"], vec!["<em>Puma</em>"]);
        assert_eq!(raw.aggregations.len(), 2);
        let year = raw
            .aggregations
            .iter()
            .find(|a| a.name == "year")
            .unwrap();
        match &year.aggregation {
            RawAggregation::Filter { aggregations, .. } => {
                assert_eq!(aggregations[0].name, "filtered_year");
            }
            other => panic!("expected filter aggregation, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_aggregation_is_invalid() {
        let body = r#"{ "hits": { "hits": [] }, "aggregations": { "avg_year": { "value": 2001.5 } } }"#;
        let result = ElasticsearchSerializer::new(&SearchConfig::default()).parse_search_response(body);
        assert!(matches!(result, Err(SearchError::InvalidResponse(_))));
    }
}
