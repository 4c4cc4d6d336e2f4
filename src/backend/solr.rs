//! Legacy engine request parameters and JSON response parser
//!
//! Filters become `fq` parameters. Under a multi-select plan every post-filter
//! group is tagged `{!tag=ffq<field>}` and its facet field excludes that tag
//! with `{!ex=ffq<field>}`, which gives each facet the counts of all other
//! selections.

use crate::compiled::{CompiledSearch, HighlightSpec, SortKey};
use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::facet::AggregationPlan;
use crate::parameter::SearchParameter;
use crate::query::full_text::{escape_query_chars, MATCH_ALL_QUERY};
use crate::query::{BoolQuery, FilterPredicate, FullTextClause, QueryNode, TypedValue};
use crate::response::{
    NamedAggregation, RawAggregation, RawBucket, RawCollation, RawHit, RawSearchResult,
    RawSpellCheck, RawTermSuggestion,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

const DEFAULT_ID_FIELD: &str = "id";

/// Ordered request parameters
pub type SolrParams = Vec<(String, String)>;

#[derive(Debug, Clone)]
pub struct SolrSerializer {
    id_field: String,
    default_facet_min_count: u32,
}

impl SolrSerializer {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            default_facet_min_count: config.default_facet_min_count,
        }
    }

    /// Field holding the document identifier in responses
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn search_params<P: SearchParameter>(&self, compiled: &CompiledSearch<P>) -> SolrParams {
        let mut params = SolrParams::new();
        params.push(("q".into(), query_string(compiled.query.as_ref())));
        params.push(("q.alt".into(), MATCH_ALL_QUERY.into()));
        params.push(("start".into(), compiled.from.to_string()));
        params.push(("rows".into(), compiled.size.to_string()));

        if let Some(query) = &compiled.query {
            for node in &query.filter {
                params.push(("fq".into(), filter_query(node)));
            }
        }

        let multi_select = compiled.is_multi_select();
        for node in &compiled.post_filter {
            let fq = match node.predicates().first() {
                Some(predicate) if multi_select => {
                    format!("{{!tag=ffq{}}}{}", predicate.field(), filter_query(node))
                }
                _ => filter_query(node),
            };
            params.push(("fq".into(), fq));
        }

        self.facet_params(&compiled.aggregations, &mut params);

        if let Some(highlight) = &compiled.highlight {
            highlight_params(highlight, &mut params);
        }

        if !compiled.sort.is_empty() {
            let sort = compiled
                .sort
                .iter()
                .map(|key| match key {
                    SortKey::Score => "score desc".to_string(),
                    SortKey::Field(sort) => format!("{} {}", sort.field, sort.direction),
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("sort".into(), sort));
        }

        debug!(params = params.len(), "Serialized legacy search request");
        params
    }

    fn facet_params<P: SearchParameter>(&self, plan: &AggregationPlan<P>, params: &mut SolrParams) {
        let terms = plan.terms();
        if terms.is_empty() {
            return;
        }

        let min_count = terms
            .iter()
            .find_map(|t| t.min_count)
            .unwrap_or(self.default_facet_min_count);
        params.push(("facet".into(), "true".into()));
        params.push(("facet.mincount".into(), min_count.to_string()));
        params.push(("facet.missing".into(), "false".into()));
        params.push(("facet.sort".into(), "count".into()));

        let multi_select = matches!(plan, AggregationPlan::MultiSelectSafe(_));
        for terms in terms {
            let field = &terms.field;
            let facet_field = if multi_select {
                format!("{{!ex=ffq{}}}{}", field, field)
            } else {
                field.clone()
            };
            params.push(("facet.field".into(), facet_field));
            // Buckets are paged when normalizing
            params.push((format!("f.{}.facet.offset", field), "0".into()));
            params.push((format!("f.{}.facet.limit", field), terms.size.to_string()));
        }
    }

    /// Parse a JSON response body
    pub fn parse_search_response(&self, body: &str) -> SearchResult<RawSearchResult> {
        let response: SolrResponse = serde_json::from_str(body)?;

        let hits = response
            .response
            .docs
            .into_iter()
            .map(|doc| {
                let id = doc
                    .get(&self.id_field)
                    .map(|id| match id {
                        Value::String(id) => id.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_default();
                let highlight = response.highlighting.get(&id).cloned().unwrap_or_default();
                RawHit {
                    score: doc.get("score").and_then(Value::as_f64),
                    id,
                    source: doc,
                    highlight,
                }
            })
            .collect();

        let mut aggregations = Vec::new();
        if let Some(facet_counts) = response.facet_counts {
            for (name, counts) in facet_counts.facet_fields {
                let counts = counts.as_array().ok_or_else(|| {
                    SearchError::response(format!("facet counts of {} are not a list", name))
                })?;
                aggregations.push(NamedAggregation {
                    name: strip_local_params(&name).to_string(),
                    aggregation: RawAggregation::Terms(parse_flat_counts(&name, counts)?),
                });
            }
        }

        let spell_check = response.spellcheck.map(|s| parse_spellcheck(&s)).transpose()?;

        Ok(RawSearchResult {
            total: response.response.num_found,
            hits,
            aggregations,
            spell_check,
        })
    }
}

/// Main query: the full-text clauses, or match-all
pub fn query_string(query: Option<&BoolQuery>) -> String {
    let clauses: Vec<String> = query
        .map(|q| q.must.iter().map(full_text_clause).collect())
        .unwrap_or_default();
    match clauses.len() {
        0 => MATCH_ALL_QUERY.to_string(),
        1 => clauses.into_iter().collect(),
        _ => clauses
            .iter()
            .map(|c| format!("({})", c))
            .collect::<Vec<_>>()
            .join(" AND "),
    }
}

fn full_text_clause(clause: &FullTextClause) -> String {
    match clause {
        FullTextClause::Match { field, text } => format!("{}:({})", field, escape_query_chars(text)),
        FullTextClause::QueryString { query } => query.clone(),
    }
}

/// Filter query expression of a predicate tree
pub fn filter_query(node: &QueryNode) -> String {
    match node {
        QueryNode::Predicate(predicate) => predicate_query(predicate),
        QueryNode::Not(inner) => format!("-{}", filter_query(inner)),
        QueryNode::Or(nodes) => join(nodes, " OR "),
        QueryNode::And(nodes) => join(nodes, " AND "),
    }
}

fn join(nodes: &[QueryNode], op: &str) -> String {
    let parts: Vec<String> = nodes.iter().map(filter_query).collect();
    format!("({})", parts.join(op))
}

fn predicate_query(predicate: &FilterPredicate) -> String {
    match predicate {
        FilterPredicate::Equality { field, value } => term(field, value),
        FilterPredicate::MultiEquality { field, values } => {
            let terms: Vec<String> = values.iter().map(|v| term(field, v)).collect();
            format!("({})", terms.join(" OR "))
        }
        FilterPredicate::Range {
            field,
            lower,
            upper,
        } => format!(
            "{}:[{} TO {}]",
            field,
            lower.as_ref().map_or_else(|| "*".to_string(), |v| bound(v, false)),
            upper.as_ref().map_or_else(|| "*".to_string(), |v| bound(v, true)),
        ),
        FilterPredicate::Spatial { field, shape } => {
            format!("{}:\"IsWithin({}) distErrPct=0\"", field, shape)
        }
    }
}

fn term(field: &str, value: &TypedValue) -> String {
    match value {
        TypedValue::Date(_) => format!("{}:[{} TO {}]", field, bound(value, false), bound(value, true)),
        TypedValue::Text(_) | TypedValue::Keyword(_) | TypedValue::Uuid(_) => {
            format!("{}:\"{}\"", field, escape_query_chars(&value.to_string()))
        }
        _ => format!("{}:{}", field, escape_query_chars(&value.to_string())),
    }
}

fn bound(value: &TypedValue, upper: bool) -> String {
    match value {
        TypedValue::Date(date) if upper => format!("{}T23:59:59.999Z", date.format("%Y-%m-%d")),
        TypedValue::Date(date) => format!("{}T00:00:00Z", date.format("%Y-%m-%d")),
        other => other.to_string(),
    }
}

fn highlight_params(spec: &HighlightSpec, params: &mut SolrParams) {
    params.push(("hl".into(), "true".into()));
    params.push(("hl.fl".into(), spec.fields.join(",")));
    params.push(("hl.simple.pre".into(), spec.pre_tag.clone()));
    params.push(("hl.simple.post".into(), spec.post_tag.clone()));
    params.push(("hl.snippets".into(), spec.snippets.to_string()));
    params.push(("hl.fragsize".into(), spec.fragment_size.to_string()));
}

/// Facet field name without `{!...}` local parameters
fn strip_local_params(name: &str) -> &str {
    match (name.starts_with("{!"), name.find('}')) {
        (true, Some(end)) => &name[end + 1..],
        _ => name,
    }
}

fn parse_flat_counts(field: &str, counts: &[Value]) -> SearchResult<Vec<RawBucket>> {
    counts
        .chunks(2)
        .map(|pair| match pair {
            [Value::String(key), count] => count
                .as_u64()
                .map(|count| RawBucket::new(key.as_str(), count))
                .ok_or_else(|| SearchError::response(format!("bad count for '{}' in {}", key, field))),
            _ => Err(SearchError::response(format!(
                "facet counts of {} are not name/count pairs",
                field
            ))),
        })
        .collect()
}

fn parse_spellcheck(section: &SolrSpellcheck) -> SearchResult<RawSpellCheck> {
    let mut spell_check = RawSpellCheck {
        correctly_spelled: section.correctly_spelled.unwrap_or(false),
        ..RawSpellCheck::default()
    };

    for (token, value) in named_list(&section.suggestions) {
        let num_found = value.get("numFound").and_then(Value::as_u64).unwrap_or(0);
        let alternatives = value
            .get("suggestion")
            .and_then(Value::as_array)
            .map(|alternatives| {
                alternatives
                    .iter()
                    .filter_map(|a| match a {
                        Value::String(word) => Some(word.clone()),
                        other => other.get("word").and_then(Value::as_str).map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();
        spell_check.suggestions.push(RawTermSuggestion {
            token: token.to_string(),
            num_found,
            alternatives,
        });
    }

    for (_, value) in named_list(&section.collations) {
        let Some(query) = value.get("collationQuery").and_then(Value::as_str) else {
            warn!("Skipping collation without query");
            continue;
        };
        let corrections = value
            .get("misspellingsAndCorrections")
            .and_then(Value::as_array)
            .map(|pairs| {
                pairs
                    .chunks(2)
                    .filter_map(|pair| match pair {
                        [Value::String(original), Value::String(correction)] => {
                            Some((original.clone(), correction.clone()))
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        spell_check.collations.push(RawCollation {
            query: query.to_string(),
            hits: value.get("hits").and_then(Value::as_u64).unwrap_or(0),
            corrections,
        });
    }

    Ok(spell_check)
}

/// Entries of a flat `[name, value, name, value, ...]` list whose value is an object
fn named_list(values: &[Value]) -> Vec<(&str, &Value)> {
    values
        .chunks(2)
        .filter_map(|pair| match pair {
            [Value::String(name), value] if value.is_object() => Some((name.as_str(), value)),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct SolrResponse {
    response: SolrDocs,
    #[serde(default)]
    highlighting: HashMap<String, HashMap<String, Vec<String>>>,
    #[serde(default)]
    facet_counts: Option<SolrFacetCounts>,
    #[serde(default)]
    spellcheck: Option<SolrSpellcheck>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolrDocs {
    num_found: u64,
    #[serde(default)]
    docs: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SolrFacetCounts {
    #[serde(default)]
    facet_fields: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolrSpellcheck {
    #[serde(default)]
    suggestions: Vec<Value>,
    #[serde(default)]
    correctly_spelled: Option<bool>,
    #[serde(default)]
    collations: Vec<Value>,
}
