//! Uniform response and raw backend result types

use crate::parameter::SearchParameter;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use super::hit::RawHit;

/// Document count of one facet value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub name: String,
    pub count: u64,
}

impl FacetCount {
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Counts of one requested facet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(bound(serialize = "P: SearchParameter"))]
pub struct Facet<P: SearchParameter> {
    #[serde(serialize_with = "serialize_parameter")]
    pub field: P,
    pub counts: Vec<FacetCount>,
}

fn serialize_parameter<P: SearchParameter, S: Serializer>(
    parameter: &P,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(parameter.name())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellCheckSuggestion {
    /// Original token, or the space-joined tokens of a collation
    pub original: String,
    pub num_found: u64,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellCheckResponse {
    pub correctly_spelled: bool,
    pub suggestions: Vec<SpellCheckSuggestion>,
}

impl SpellCheckResponse {
    pub fn suggestion(&self, original: &str) -> Option<&SpellCheckSuggestion> {
        self.suggestions.iter().find(|s| s.original == original)
    }
}

/// Backend-independent search response
#[derive(Debug, Clone, Serialize)]
#[serde(
    rename_all = "camelCase",
    bound(serialize = "T: Serialize, P: SearchParameter")
)]
pub struct UniformSearchResponse<T, P: SearchParameter> {
    pub offset: usize,
    pub limit: usize,
    pub count: u64,
    pub results: Vec<T>,
    pub facets: Vec<Facet<P>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spell_check: Option<SpellCheckResponse>,
}

impl<T, P: SearchParameter> UniformSearchResponse<T, P> {
    pub fn facet(&self, parameter: P) -> Option<&Facet<P>> {
        self.facets.iter().find(|f| f.field == parameter)
    }
}

/// Bucket key as reported by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum BucketKey {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Text(key) => f.write_str(key),
            BucketKey::Integer(key) => write!(f, "{}", key),
            BucketKey::Number(key) => write!(f, "{:?}", key),
        }
    }
}

impl From<&str> for BucketKey {
    fn from(key: &str) -> Self {
        BucketKey::Text(key.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBucket {
    pub key: BucketKey,
    pub doc_count: u64,
}

impl RawBucket {
    pub fn new(key: impl Into<BucketKey>, doc_count: u64) -> Self {
        Self {
            key: key.into(),
            doc_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawAggregation {
    /// Buckets ordered as the backend returned them
    Terms(Vec<RawBucket>),
    /// Filter wrapper of a multi-select facet
    Filter {
        doc_count: u64,
        aggregations: Vec<NamedAggregation>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedAggregation {
    pub name: String,
    pub aggregation: RawAggregation,
}

impl NamedAggregation {
    pub fn new(name: impl Into<String>, aggregation: RawAggregation) -> Self {
        Self {
            name: name.into(),
            aggregation,
        }
    }
}

/// A collated query the backend guarantees to return results for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCollation {
    pub query: String,
    pub hits: u64,
    /// `(original, correction)` pairs
    pub corrections: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTermSuggestion {
    pub token: String,
    pub num_found: u64,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSpellCheck {
    pub correctly_spelled: bool,
    pub collations: Vec<RawCollation>,
    pub suggestions: Vec<RawTermSuggestion>,
}

/// What a backend returned, before normalization
#[derive(Debug, Clone, Default)]
pub struct RawSearchResult {
    pub total: u64,
    pub hits: Vec<RawHit>,
    pub aggregations: Vec<NamedAggregation>,
    pub spell_check: Option<RawSpellCheck>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ValueType;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct Country;

    impl SearchParameter for Country {
        fn name(&self) -> &'static str {
            "COUNTRY"
        }

        fn value_type(&self) -> ValueType {
            ValueType::Text
        }
    }

    #[test]
    fn test_bucket_key_display() {
        assert_eq!(BucketKey::from("DK").to_string(), "DK");
        assert_eq!(BucketKey::Integer(2010).to_string(), "2010");
        assert_eq!(BucketKey::Number(1.0).to_string(), "1.0");
    }

    #[test]
    fn test_response_serializes_parameter_names() {
        let response: UniformSearchResponse<String, Country> = UniformSearchResponse {
            offset: 0,
            limit: 20,
            count: 1,
            results: vec!["a".to_string()],
            facets: vec![Facet {
                field: Country,
                counts: vec![FacetCount::new("DK", 5)],
            }],
            spell_check: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["facets"][0]["field"], "COUNTRY");
        assert_eq!(json["facets"][0]["counts"][0]["count"], 5);
        assert!(json.get("spellCheck").is_none());
    }
}
