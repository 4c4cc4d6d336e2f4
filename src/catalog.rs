//! Field catalog: mapping between search parameters and backend fields
//!
//! The catalog is built once at startup and shared read-only between
//! requests, usually as an `Arc<dyn FieldCatalog<P>>`.

use crate::parameter::{canonical_enum_value, SearchParameter, ValueType};
use crate::query::FullTextClause;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use strum::{Display, EnumString};

/// Catch-all field matched by the default full-text clause
pub const DEFAULT_FULL_TEXT_FIELD: &str = "all";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key on a backend field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Resolves search parameters to backend fields and back.
///
/// Implementations must be safe for unsynchronized concurrent reads.
pub trait FieldCatalog<P: SearchParameter>: Send + Sync {
    /// Backend field mapped to a parameter, if any
    fn field_for(&self, parameter: P) -> Option<&str>;

    /// Parameter mapped to a backend field, if any
    fn parameter_for(&self, field: &str) -> Option<P>;

    /// Estimated number of distinct values of a field
    fn cardinality_of(&self, field: &str) -> Option<usize>;

    fn is_date_field(&self, field: &str) -> bool;

    fn is_spatial_parameter(&self, parameter: P) -> bool;

    /// Fields removed from returned documents
    fn excluded_result_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// Fields kept in returned documents; empty keeps everything
    fn included_result_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// Result order used when the request has no free text and no sort hints
    fn default_sort_order(&self) -> Vec<SortField> {
        Vec::new()
    }

    /// Autocomplete field of a parameter; `suffix` is the configured default
    fn autocomplete_field_for(&self, parameter: P, suffix: &str) -> Option<String> {
        self.field_for(parameter)
            .map(|field| format!("{}{}", field, suffix))
    }

    fn highlight_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// Fields returned by autocomplete and completion-suggest requests
    fn suggest_fields(&self, parameter: P) -> Vec<String> {
        self.field_for(parameter)
            .map(|field| vec![field.to_string()])
            .unwrap_or_default()
    }

    /// Converts an indexed facet value into the value returned to callers
    fn parse_indexed_value(&self, parameter: P, value: &str) -> String {
        match parameter.value_type() {
            ValueType::Enum(vocabulary) => canonical_enum_value(value, vocabulary)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
            _ => value.to_string(),
        }
    }

    /// Full-text clause for a free-text term
    fn full_text_clause(&self, text: &str) -> FullTextClause {
        FullTextClause::Match {
            field: DEFAULT_FULL_TEXT_FIELD.to_string(),
            text: text.to_string(),
        }
    }
}

type IndexedValueHook = Arc<dyn Fn(&str) -> String + Send + Sync>;
type FullTextHook = Arc<dyn Fn(&str) -> FullTextClause + Send + Sync>;

/// Immutable catalog built from an explicit table
#[derive(Clone)]
pub struct StaticFieldCatalog<P: SearchParameter> {
    fields: HashMap<P, String>,
    parameters: HashMap<String, P>,
    cardinalities: HashMap<String, usize>,
    date_fields: HashSet<String>,
    spatial_parameters: HashSet<P>,
    excluded: Vec<String>,
    included: Vec<String>,
    sort: Vec<SortField>,
    highlight: Vec<String>,
    /// Overrides the configured suffix
    autocomplete_suffix: Option<String>,
    autocomplete_fields: HashMap<P, String>,
    suggest_fields: HashMap<P, Vec<String>>,
    indexed_value_hooks: HashMap<P, IndexedValueHook>,
    full_text: Option<FullTextHook>,
}

impl<P: SearchParameter> StaticFieldCatalog<P> {
    pub fn builder() -> FieldCatalogBuilder<P> {
        FieldCatalogBuilder::new()
    }

    /// Number of mapped parameters
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<P: SearchParameter> fmt::Debug for StaticFieldCatalog<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticFieldCatalog")
            .field("fields", &self.fields)
            .field("cardinalities", &self.cardinalities)
            .field("date_fields", &self.date_fields)
            .field("spatial_parameters", &self.spatial_parameters)
            .finish_non_exhaustive()
    }
}

impl<P: SearchParameter> FieldCatalog<P> for StaticFieldCatalog<P> {
    fn field_for(&self, parameter: P) -> Option<&str> {
        self.fields.get(&parameter).map(String::as_str)
    }

    fn parameter_for(&self, field: &str) -> Option<P> {
        self.parameters.get(field).copied()
    }

    fn cardinality_of(&self, field: &str) -> Option<usize> {
        self.cardinalities.get(field).copied()
    }

    fn is_date_field(&self, field: &str) -> bool {
        self.date_fields.contains(field)
    }

    fn is_spatial_parameter(&self, parameter: P) -> bool {
        self.spatial_parameters.contains(&parameter)
    }

    fn excluded_result_fields(&self) -> Vec<String> {
        self.excluded.clone()
    }

    fn included_result_fields(&self) -> Vec<String> {
        self.included.clone()
    }

    fn default_sort_order(&self) -> Vec<SortField> {
        self.sort.clone()
    }

    fn autocomplete_field_for(&self, parameter: P, suffix: &str) -> Option<String> {
        if let Some(field) = self.autocomplete_fields.get(&parameter) {
            return Some(field.clone());
        }
        let suffix = self.autocomplete_suffix.as_deref().unwrap_or(suffix);
        self.field_for(parameter)
            .map(|field| format!("{}{}", field, suffix))
    }

    fn highlight_fields(&self) -> Vec<String> {
        self.highlight.clone()
    }

    fn suggest_fields(&self, parameter: P) -> Vec<String> {
        match self.suggest_fields.get(&parameter) {
            Some(fields) => fields.clone(),
            None => self
                .field_for(parameter)
                .map(|field| vec![field.to_string()])
                .unwrap_or_default(),
        }
    }

    fn parse_indexed_value(&self, parameter: P, value: &str) -> String {
        if let Some(hook) = self.indexed_value_hooks.get(&parameter) {
            return hook(value);
        }
        match parameter.value_type() {
            ValueType::Enum(vocabulary) => canonical_enum_value(value, vocabulary)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
            _ => value.to_string(),
        }
    }

    fn full_text_clause(&self, text: &str) -> FullTextClause {
        match &self.full_text {
            Some(hook) => hook(text),
            None => FullTextClause::Match {
                field: DEFAULT_FULL_TEXT_FIELD.to_string(),
                text: text.to_string(),
            },
        }
    }
}

/// Builder for StaticFieldCatalog
pub struct FieldCatalogBuilder<P: SearchParameter> {
    catalog: StaticFieldCatalog<P>,
}

impl<P: SearchParameter> FieldCatalogBuilder<P> {
    pub fn new() -> Self {
        Self {
            catalog: StaticFieldCatalog {
                fields: HashMap::new(),
                parameters: HashMap::new(),
                cardinalities: HashMap::new(),
                date_fields: HashSet::new(),
                spatial_parameters: HashSet::new(),
                excluded: Vec::new(),
                included: Vec::new(),
                sort: Vec::new(),
                highlight: Vec::new(),
                autocomplete_suffix: None,
                autocomplete_fields: HashMap::new(),
                suggest_fields: HashMap::new(),
                indexed_value_hooks: HashMap::new(),
                full_text: None,
            },
        }
    }

    /// Map a parameter to a backend field
    pub fn field(mut self, parameter: P, field: impl Into<String>) -> Self {
        let field = field.into();
        self.catalog.parameters.insert(field.clone(), parameter);
        self.catalog.fields.insert(parameter, field);
        self
    }

    /// Map a parameter to a date-typed backend field
    pub fn date_field(mut self, parameter: P, field: impl Into<String>) -> Self {
        let field = field.into();
        self.catalog.date_fields.insert(field.clone());
        self.field(parameter, field)
    }

    /// Map a spatial parameter to a shape field
    pub fn spatial_field(mut self, parameter: P, field: impl Into<String>) -> Self {
        self.catalog.spatial_parameters.insert(parameter);
        self.field(parameter, field)
    }

    pub fn cardinality(mut self, field: impl Into<String>, cardinality: usize) -> Self {
        self.catalog.cardinalities.insert(field.into(), cardinality);
        self
    }

    pub fn exclude_result_field(mut self, field: impl Into<String>) -> Self {
        self.catalog.excluded.push(field.into());
        self
    }

    pub fn include_result_field(mut self, field: impl Into<String>) -> Self {
        self.catalog.included.push(field.into());
        self
    }

    pub fn sort(mut self, sort: SortField) -> Self {
        self.catalog.sort.push(sort);
        self
    }

    pub fn highlight_field(mut self, field: impl Into<String>) -> Self {
        self.catalog.highlight.push(field.into());
        self
    }

    /// Suffix for this catalog's autocomplete fields, in place of the configured one
    pub fn autocomplete_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.catalog.autocomplete_suffix = Some(suffix.into());
        self
    }

    /// Override the autocomplete field of one parameter
    pub fn autocomplete_field(mut self, parameter: P, field: impl Into<String>) -> Self {
        self.catalog.autocomplete_fields.insert(parameter, field.into());
        self
    }

    pub fn suggest_fields<I, S>(mut self, parameter: P, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog
            .suggest_fields
            .insert(parameter, fields.into_iter().map(Into::into).collect());
        self
    }

    /// Post-processing applied to facet values of one parameter
    pub fn indexed_value<F>(mut self, parameter: P, hook: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.catalog
            .indexed_value_hooks
            .insert(parameter, Arc::new(hook));
        self
    }

    /// Replace the default full-text clause
    pub fn full_text<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) -> FullTextClause + Send + Sync + 'static,
    {
        self.catalog.full_text = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> StaticFieldCatalog<P> {
        self.catalog
    }
}

impl<P: SearchParameter> Default for FieldCatalogBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}
