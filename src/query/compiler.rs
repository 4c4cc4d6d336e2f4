//! Compilation of request filters and free text into a boolean query

use super::geometry;
use super::predicate::{BoolQuery, FilterPredicate, QueryNode};
use super::value::{ParsedValue, TypedValue, ValueParser};
use crate::catalog::FieldCatalog;
use crate::config::SearchConfig;
use crate::error::SearchResult;
use crate::parameter::{SearchParameter, ValueType};
use crate::request::ParameterValues;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns parameter filters and a free-text term into a [`BoolQuery`]
pub struct QueryCompiler<P: SearchParameter> {
    catalog: Arc<dyn FieldCatalog<P>>,
    parser: ValueParser,
    match_all_sentinel: String,
    negation_prefix: String,
}

#[derive(Default)]
struct ValueGroup {
    scalars: Vec<TypedValue>,
    ranges: Vec<(Option<TypedValue>, Option<TypedValue>)>,
    shapes: Vec<String>,
}

impl ValueGroup {
    fn into_node(self, field: &str) -> Option<QueryNode> {
        let mut nodes = Vec::with_capacity(self.ranges.len() + self.shapes.len() + 1);

        let mut scalars = self.scalars;
        match scalars.len() {
            0 => {}
            1 => nodes.push(
                FilterPredicate::Equality {
                    field: field.to_string(),
                    value: scalars.remove(0),
                }
                .into(),
            ),
            _ => nodes.push(
                FilterPredicate::MultiEquality {
                    field: field.to_string(),
                    values: scalars,
                }
                .into(),
            ),
        }

        for (lower, upper) in self.ranges {
            nodes.push(
                FilterPredicate::Range {
                    field: field.to_string(),
                    lower,
                    upper,
                }
                .into(),
            );
        }

        for shape in self.shapes {
            nodes.push(
                FilterPredicate::Spatial {
                    field: field.to_string(),
                    shape,
                }
                .into(),
            );
        }

        QueryNode::any_of(nodes)
    }

    fn push_scalar(&mut self, value: TypedValue) {
        if !self.scalars.contains(&value) {
            self.scalars.push(value);
        }
    }
}

impl<P: SearchParameter> QueryCompiler<P> {
    pub fn new(catalog: Arc<dyn FieldCatalog<P>>, config: &SearchConfig) -> SearchResult<Self> {
        Ok(Self {
            catalog,
            parser: ValueParser::new(config)?,
            match_all_sentinel: config.match_all_sentinel.clone(),
            negation_prefix: config.negation_prefix.clone(),
        })
    }

    pub fn catalog(&self) -> &Arc<dyn FieldCatalog<P>> {
        &self.catalog
    }

    pub fn parser(&self) -> &ValueParser {
        &self.parser
    }

    /// Whether a free-text term is the match-all sentinel
    pub fn is_match_all(&self, free_text: Option<&str>) -> bool {
        free_text.map(str::trim) == Some(self.match_all_sentinel.as_str())
    }

    /// Compile filters and free text.
    ///
    /// Returns `None` for a match-all query: either the free text is the
    /// match-all sentinel, which drops all filters, or there is nothing to
    /// compile.
    pub fn compile(
        &self,
        filters: &ParameterValues<P>,
        free_text: Option<&str>,
    ) -> SearchResult<Option<BoolQuery>> {
        if self.is_match_all(free_text) {
            debug!("Match-all sentinel, filters dropped");
            return Ok(None);
        }

        let mut query = BoolQuery::default();
        if let Some(text) = free_text.map(str::trim).filter(|t| !t.is_empty()) {
            query.must.push(self.catalog.full_text_clause(text));
        }
        query.filter = self.compile_filters(filters)?;

        if query.is_empty() {
            return Ok(None);
        }
        debug!(
            must = query.must.len(),
            filters = query.filter.len(),
            "Compiled boolean query"
        );
        Ok(Some(query))
    }

    /// One node per mapped parameter, ordered by parameter name
    pub fn compile_filters(&self, filters: &ParameterValues<P>) -> SearchResult<Vec<QueryNode>> {
        let mut parameters: Vec<(&P, &BTreeSet<String>)> = filters.iter().collect();
        parameters.sort_by_key(|(parameter, _)| parameter.name());

        let mut nodes = Vec::with_capacity(parameters.len());
        for (parameter, values) in parameters {
            if let Some(node) = self.compile_parameter(*parameter, values)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// Compile the values of one parameter.
    ///
    /// Positive values are OR'd; negated values are OR'd inside a NOT. A
    /// parameter with both compiles to `AND(positive, NOT(negated))`.
    pub fn compile_parameter(
        &self,
        parameter: P,
        values: &BTreeSet<String>,
    ) -> SearchResult<Option<QueryNode>> {
        let Some(field) = self.catalog.field_for(parameter) else {
            warn!(parameter = parameter.name(), "Skipping unmapped search parameter");
            return Ok(None);
        };

        let mut positive = ValueGroup::default();
        let mut negated = ValueGroup::default();

        if self.catalog.is_spatial_parameter(parameter) {
            for raw in values {
                let (group, wkt) = match raw.strip_prefix(self.negation_prefix.as_str()) {
                    Some(rest) => (&mut negated, rest),
                    None => (&mut positive, raw.as_str()),
                };
                group.shapes.push(geometry::normalize(wkt)?);
            }
        } else {
            let value_type = if self.catalog.is_date_field(field) {
                ValueType::Date
            } else {
                parameter.value_type()
            };

            for raw in values {
                let parsed = self.parser.parse(raw, value_type)?;
                let group = if parsed.negated {
                    &mut negated
                } else {
                    &mut positive
                };
                match parsed.value {
                    ParsedValue::Scalar(value) => group.push_scalar(value),
                    ParsedValue::Range { lower, upper } => group.ranges.push((lower, upper)),
                }
            }
        }

        let positive = positive.into_node(field);
        let negated = negated.into_node(field).map(QueryNode::not);

        Ok(match (positive, negated) {
            (Some(p), Some(n)) => Some(QueryNode::And(vec![p, n])),
            (p, n) => p.or(n),
        })
    }
}
