//! Raw hits and typed field accessors for hit mappers

use super::highlight::{first_snippet, highlight_list};
use crate::config::HighlightConfig;
use crate::query::dates::parse_partial_date;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::error;
use uuid::Uuid;

/// One document returned by the backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHit {
    pub id: String,
    pub score: Option<f64>,
    /// Stored document
    pub source: Value,
    /// Highlight snippets per field
    pub highlight: HashMap<String, Vec<String>>,
}

impl RawHit {
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            source,
            ..Self::default()
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_highlight<I, S>(mut self, field: impl Into<String>, snippets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.highlight
            .insert(field.into(), snippets.into_iter().map(Into::into).collect());
        self
    }

    /// Value at a field name or a dotted path into nested objects
    pub fn value(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.source.get(path) {
            return Some(value);
        }
        if !path.contains('.') {
            return None;
        }
        path.split('.')
            .try_fold(&self.source, |current, segment| current.get(segment))
    }

    pub fn get_str(&self, path: &str) -> Option<String> {
        self.value(path).and_then(scalar_text)
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.extract(path, str::parse::<i64>)
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.extract(path, str::parse::<f64>)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.extract(path, str::parse::<bool>)
    }

    pub fn get_uuid(&self, path: &str) -> Option<Uuid> {
        self.extract(path, Uuid::parse_str)
    }

    /// Day of a date or datetime value
    pub fn get_date(&self, path: &str) -> Option<NaiveDate> {
        self.extract(path, |v| parse_partial_date(v).map(|period| period.start))
    }

    /// Non-empty list of scalar values
    pub fn get_list(&self, path: &str) -> Option<Vec<String>> {
        let values: Vec<String> = self
            .value(path)?
            .as_array()?
            .iter()
            .filter_map(scalar_text)
            .collect();
        (!values.is_empty()).then_some(values)
    }

    /// First highlight snippet of a field, or its plain value
    pub fn highlight_or_str(&self, path: &str) -> Option<String> {
        self.highlight
            .get(path)
            .and_then(|snippets| first_snippet(snippets))
            .map(str::to_string)
            .or_else(|| self.get_str(path))
    }

    /// List value with highlighted elements swapped in for their plain text
    pub fn highlighted_list(&self, path: &str, tags: &HighlightConfig) -> Option<Vec<String>> {
        let mut values = self.get_list(path)?;
        if let Some(snippets) = self.highlight.get(path) {
            highlight_list(&mut values, snippets, tags);
        }
        Some(values)
    }

    fn extract<T, E, F>(&self, path: &str, parse: F) -> Option<T>
    where
        F: FnOnce(&str) -> Result<T, E>,
        E: Display,
    {
        let text = self.get_str(path)?;
        match parse(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(field = path, value = %text, error = %e, "Error extracting field");
                None
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
