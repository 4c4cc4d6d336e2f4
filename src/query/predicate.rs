//! Backend-neutral predicate tree

use super::value::TypedValue;
use serde::Serialize;

/// A predicate on one backend field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterPredicate {
    Equality {
        field: String,
        value: TypedValue,
    },
    MultiEquality {
        field: String,
        values: Vec<TypedValue>,
    },
    Range {
        field: String,
        lower: Option<TypedValue>,
        upper: Option<TypedValue>,
    },
    /// Shape in normalized WKT, matched with a "within" relation
    Spatial {
        field: String,
        shape: String,
    },
}

impl FilterPredicate {
    pub fn field(&self) -> &str {
        match self {
            FilterPredicate::Equality { field, .. }
            | FilterPredicate::MultiEquality { field, .. }
            | FilterPredicate::Range { field, .. }
            | FilterPredicate::Spatial { field, .. } => field,
        }
    }
}

/// Boolean composition of predicates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum QueryNode {
    Predicate(FilterPredicate),
    Not(Box<QueryNode>),
    Or(Vec<QueryNode>),
    And(Vec<QueryNode>),
}

impl QueryNode {
    pub fn not(node: QueryNode) -> Self {
        QueryNode::Not(Box::new(node))
    }

    /// Collapse a single-element group to the element itself
    pub fn any_of(mut nodes: Vec<QueryNode>) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(QueryNode::Or(nodes)),
        }
    }

    pub fn all_of(mut nodes: Vec<QueryNode>) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(QueryNode::And(nodes)),
        }
    }

    /// Every predicate in the subtree, depth first
    pub fn predicates(&self) -> Vec<&FilterPredicate> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a FilterPredicate>) {
        match self {
            QueryNode::Predicate(p) => out.push(p),
            QueryNode::Not(inner) => inner.collect(out),
            QueryNode::Or(nodes) | QueryNode::And(nodes) => {
                nodes.iter().for_each(|n| n.collect(out))
            }
        }
    }

    /// Whether any predicate in the subtree targets the field
    pub fn touches_field(&self, field: &str) -> bool {
        self.predicates().iter().any(|p| p.field() == field)
    }
}

impl From<FilterPredicate> for QueryNode {
    fn from(predicate: FilterPredicate) -> Self {
        QueryNode::Predicate(predicate)
    }
}

/// Relevance-affecting free-text clause
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FullTextClause {
    /// Analyzed match of the text against one field
    Match { field: String, text: String },
    /// Prebuilt query string for the legacy engine
    QueryString { query: String },
}

/// Full-text MUST clauses plus non-scoring FILTER clauses
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolQuery {
    pub must: Vec<FullTextClause>,
    pub filter: Vec<QueryNode>,
}

impl BoolQuery {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.filter.is_empty()
    }

    /// Filter clause targeting a field, if any
    pub fn filter_for(&self, field: &str) -> Option<&QueryNode> {
        self.filter.iter().find(|node| node.touches_field(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(field: &str, value: &str) -> QueryNode {
        FilterPredicate::Equality {
            field: field.to_string(),
            value: TypedValue::Text(value.to_string()),
        }
        .into()
    }

    #[test]
    fn test_single_element_groups_collapse() {
        assert_eq!(QueryNode::any_of(vec![]), None);
        assert_eq!(QueryNode::any_of(vec![eq("a", "1")]), Some(eq("a", "1")));
        assert!(matches!(
            QueryNode::all_of(vec![eq("a", "1"), eq("b", "2")]),
            Some(QueryNode::And(_))
        ));
    }

    #[test]
    fn test_predicate_walk() {
        let node = QueryNode::And(vec![
            eq("a", "1"),
            QueryNode::not(QueryNode::Or(vec![eq("b", "2"), eq("c", "3")])),
        ]);
        let fields: Vec<&str> = node.predicates().iter().map(|p| p.field()).collect();
        assert_eq!(fields, vec!["a", "b", "c"]);
        assert!(node.touches_field("c"));
        assert!(!node.touches_field("d"));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(QueryNode::not(eq("country", "DK"))).unwrap();
        assert_eq!(json["op"], "not");
        assert_eq!(json["args"]["op"], "predicate");
        assert_eq!(json["args"]["args"]["type"], "equality");
        assert_eq!(json["args"]["args"]["value"], "DK");
    }
}
