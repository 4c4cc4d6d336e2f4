//! Parsing of raw filter values into typed query values

use super::dates::{lower_bound, parse_partial_date, upper_bound};
use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::parameter::{lookup_enum, ValueType};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

const NUMBER_BOUND: &str = r"-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?";
const DATE_BOUND: &str =
    r"\d{4}-\d{1,2}(?:-\d{1,2}(?:[T ]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?)?";

/// A typed query value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Text(String),
    /// Canonical member of an enumerated vocabulary
    Keyword(&'static str),
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Double(f64),
    Float(f32),
    Date(NaiveDate),
    Uuid(Uuid),
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Text(v) => write!(f, "{}", v),
            TypedValue::Keyword(v) => write!(f, "{}", v),
            TypedValue::Boolean(v) => write!(f, "{}", v),
            TypedValue::Integer(v) => write!(f, "{}", v),
            TypedValue::Long(v) => write!(f, "{}", v),
            TypedValue::Double(v) => write!(f, "{}", v),
            TypedValue::Float(v) => write!(f, "{}", v),
            TypedValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            TypedValue::Uuid(v) => write!(f, "{}", v),
        }
    }
}

/// Result of parsing one raw value without its negation marker
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Scalar(TypedValue),
    /// Missing bounds are unbounded
    Range {
        lower: Option<TypedValue>,
        upper: Option<TypedValue>,
    },
}

/// A parsed raw filter value
#[derive(Debug, Clone, PartialEq)]
pub struct FilterValue {
    pub negated: bool,
    pub value: ParsedValue,
}

/// Converts raw filter strings into typed values or ranges
#[derive(Debug, Clone)]
pub struct ValueParser {
    wildcard: String,
    negation_prefix: String,
    range_pattern: Regex,
}

impl ValueParser {
    pub fn new(config: &SearchConfig) -> SearchResult<Self> {
        let wildcard = regex::escape(&config.range_wildcard);
        let bound = format!("{}|{}|{}", wildcard, DATE_BOUND, NUMBER_BOUND);
        let pattern = format!(
            r"^\s*({b})\s*{sep}\s*({b})\s*$",
            b = bound,
            sep = regex::escape(&config.range_separator)
        );
        let range_pattern = Regex::new(&pattern)
            .map_err(|e| SearchError::Configuration(format!("invalid range syntax: {}", e)))?;

        Ok(Self {
            wildcard: config.range_wildcard.clone(),
            negation_prefix: config.negation_prefix.clone(),
            range_pattern,
        })
    }

    /// Parse a raw value, stripping and recording a negation prefix
    pub fn parse(&self, raw: &str, value_type: ValueType) -> SearchResult<FilterValue> {
        let (negated, value) = match raw.strip_prefix(self.negation_prefix.as_str()) {
            Some(rest) if rest.trim().is_empty() => {
                return Err(SearchError::value(format!(
                    "negated value '{}' has nothing to negate",
                    raw
                )))
            }
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        Ok(FilterValue {
            negated,
            value: self.parse_value(value, value_type)?,
        })
    }

    /// Parse a raw value that carries no negation marker
    pub fn parse_value(&self, raw: &str, value_type: ValueType) -> SearchResult<ParsedValue> {
        if let Some((lower, upper)) = self.split_range(raw) {
            if !value_type.supports_ranges() {
                return Err(SearchError::value(format!(
                    "range '{}' is not supported for {:?} values",
                    raw, value_type
                )));
            }
            return Ok(ParsedValue::Range {
                lower: self.parse_bound(lower, value_type, Bound::Lower)?,
                upper: self.parse_bound(upper, value_type, Bound::Upper)?,
            });
        }

        if value_type == ValueType::Date {
            let period = parse_partial_date(raw)?;
            if period.is_single_day() {
                return Ok(ParsedValue::Scalar(TypedValue::Date(period.start)));
            }
            return Ok(ParsedValue::Range {
                lower: Some(TypedValue::Date(period.start)),
                upper: Some(TypedValue::Date(period.end)),
            });
        }

        parse_scalar(raw, value_type).map(ParsedValue::Scalar)
    }

    /// Split a range literal into its two bound tokens
    pub fn split_range<'a>(&self, raw: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = self.range_pattern.captures(raw)?;
        let lower = caps.get(1)?.as_str();
        let upper = caps.get(2)?.as_str();
        Some((lower, upper))
    }

    pub fn is_range(&self, raw: &str) -> bool {
        self.range_pattern.is_match(raw)
    }

    fn parse_bound(
        &self,
        token: &str,
        value_type: ValueType,
        bound: Bound,
    ) -> SearchResult<Option<TypedValue>> {
        if token == self.wildcard {
            return Ok(None);
        }
        let value = match (value_type, bound) {
            (ValueType::Date, Bound::Lower) => TypedValue::Date(lower_bound(token)?),
            (ValueType::Date, Bound::Upper) => TypedValue::Date(upper_bound(token)?),
            _ => parse_scalar(token, value_type)?,
        };
        Ok(Some(value))
    }
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Lower,
    Upper,
}

fn malformed(raw: &str, expected: &str) -> SearchError {
    SearchError::value(format!("'{}' is not a valid {}", raw, expected))
}

/// Parse a scalar literal as the given type
pub fn parse_scalar(raw: &str, value_type: ValueType) -> SearchResult<TypedValue> {
    let trimmed = raw.trim();
    match value_type {
        ValueType::Text => Ok(TypedValue::Text(raw.to_string())),
        ValueType::Enum(vocabulary) => lookup_enum(raw, vocabulary)
            .map(TypedValue::Keyword)
            .ok_or_else(|| malformed(raw, "enumeration value")),
        ValueType::Boolean => {
            if trimmed.eq_ignore_ascii_case("true") {
                Ok(TypedValue::Boolean(true))
            } else if trimmed.eq_ignore_ascii_case("false") {
                Ok(TypedValue::Boolean(false))
            } else {
                Err(malformed(raw, "boolean"))
            }
        }
        ValueType::Integer => trimmed
            .parse()
            .map(TypedValue::Integer)
            .map_err(|_| malformed(raw, "integer")),
        ValueType::Long => trimmed
            .parse()
            .map(TypedValue::Long)
            .map_err(|_| malformed(raw, "long")),
        ValueType::Double => trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(TypedValue::Double)
            .ok_or_else(|| malformed(raw, "double")),
        ValueType::Float => trimmed
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .map(TypedValue::Float)
            .ok_or_else(|| malformed(raw, "float")),
        ValueType::Date => parse_partial_date(raw).map(|period| TypedValue::Date(period.start)),
        ValueType::Uuid => Uuid::parse_str(trimmed)
            .map(TypedValue::Uuid)
            .map_err(|_| malformed(raw, "UUID")),
    }
}
