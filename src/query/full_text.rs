//! Boosted free-text query strings for the legacy engine
//!
//! A [`QueryStringBuilder`] is compiled once from a table of
//! [`FullTextField`]s. Single terms search every exact field plus the
//! wildcard-padded partial fields; phrases search the exact fields and the
//! partial fields without padding.

use super::predicate::FullTextClause;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

/// Query matching every document
pub const MATCH_ALL_QUERY: &str = "*:*";

const WILDCARD: &str = "*";
const OR: &str = " OR ";

static MULTIPLE_BLANKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}").expect("blank pattern is valid"));

/// Wildcard padding applied to partial matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum WildcardPadding {
    Both,
    Left,
    Right,
    #[default]
    None,
}

impl WildcardPadding {
    fn pad(&self, term: &str) -> String {
        match self {
            WildcardPadding::Both => format!("{WILDCARD}{term}{WILDCARD}"),
            WildcardPadding::Left => format!("{WILDCARD}{term}"),
            WildcardPadding::Right => format!("{term}{WILDCARD}"),
            WildcardPadding::None => term.to_string(),
        }
    }
}

/// One row of the full-text table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullTextField {
    pub field: String,
    /// Field used for exact matches; defaults to `field`
    pub exact_match_field: Option<String>,
    pub exact_boost: f32,
    pub partial: WildcardPadding,
    pub partial_boost: f32,
    /// Field highlighted in results; defaults to `field`
    pub highlight_field: Option<String>,
}

impl FullTextField {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            exact_match_field: None,
            exact_boost: 1.0,
            partial: WildcardPadding::None,
            partial_boost: 0.5,
            highlight_field: None,
        }
    }

    pub fn exact_match_field(mut self, field: impl Into<String>) -> Self {
        self.exact_match_field = Some(field.into());
        self
    }

    pub fn exact_boost(mut self, boost: f32) -> Self {
        self.exact_boost = boost;
        self
    }

    pub fn partial(mut self, padding: WildcardPadding, boost: f32) -> Self {
        self.partial = padding;
        self.partial_boost = boost;
        self
    }

    pub fn highlight_field(mut self, field: impl Into<String>) -> Self {
        self.highlight_field = Some(field.into());
        self
    }

    fn exact_field(&self) -> &str {
        self.exact_match_field.as_deref().unwrap_or(&self.field)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Component {
    Exact { field: String, boost: f32 },
    Partial {
        field: String,
        padding: WildcardPadding,
        boost: f32,
    },
}

impl Component {
    fn render(&self, term: &str) -> String {
        match self {
            Component::Exact { field, boost } => format!("{}:{}^{:?}", field, term, boost),
            Component::Partial {
                field,
                padding,
                boost,
            } => format!("{}:{}^{:?}", field, padding.pad(term), boost),
        }
    }
}

/// Builds boosted query strings from a full-text table
#[derive(Debug, Clone, Default)]
pub struct QueryStringBuilder {
    term_components: Vec<Component>,
    phrase_components: Vec<Component>,
    highlight_fields: Vec<String>,
}

impl QueryStringBuilder {
    pub fn new<I: IntoIterator<Item = FullTextField>>(fields: I) -> Self {
        let mut fields: Vec<FullTextField> = fields.into_iter().collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        let mut builder = Self::default();
        for field in &fields {
            let exact = Component::Exact {
                field: field.exact_field().to_string(),
                boost: field.exact_boost,
            };
            builder.term_components.push(exact.clone());
            builder.phrase_components.push(exact);

            if field.partial != WildcardPadding::None {
                builder.term_components.push(Component::Partial {
                    field: field.field.clone(),
                    padding: field.partial,
                    boost: field.partial_boost,
                });
                if field.exact_field() != field.field {
                    builder.phrase_components.push(Component::Exact {
                        field: field.field.clone(),
                        boost: field.partial_boost,
                    });
                }
            }

            builder.highlight_fields.push(
                field
                    .highlight_field
                    .clone()
                    .unwrap_or_else(|| field.field.clone()),
            );
        }
        builder
    }

    /// Fields to highlight for full-text matches
    pub fn highlight_fields(&self) -> &[String] {
        &self.highlight_fields
    }

    /// Query string for a free-text term
    pub fn build(&self, q: &str) -> String {
        let term = parse_query_value(q);
        let query = if term == WILDCARD {
            MATCH_ALL_QUERY.to_string()
        } else {
            let components = if term.contains(' ') {
                &self.phrase_components
            } else {
                &self.term_components
            };
            if components.is_empty() {
                term
            } else {
                let parts: Vec<String> = components.iter().map(|c| c.render(&term)).collect();
                format!("({})", parts.join(OR))
            }
        };
        debug!(query = %query, "Built full-text query string");
        query
    }

    pub fn clause(&self, q: &str) -> FullTextClause {
        FullTextClause::QueryString {
            query: self.build(q),
        }
    }
}

const PHRASE_BOOST: u32 = 1000;
const PARTIAL_BOOST: u32 = 300;
const PARTIAL_BOOST_DECREMENT: u32 = 100;

/// Builds boosted prefix/phrase query strings for suggestions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestQueryBuilder {
    phrase_field: String,
    field: String,
}

impl SuggestQueryBuilder {
    pub fn new(phrase_field: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            phrase_field: phrase_field.into(),
            field: field.into(),
        }
    }

    /// `(phrase^1000 OR first-token^1000) OR (token^300 OR token^200 ...)`
    pub fn build(&self, q: &str) -> String {
        let trimmed = q.trim();
        let q = if trimmed.is_empty() {
            WILDCARD.to_string()
        } else {
            clear_consecutive_blanks(trimmed)
        };
        let tokens: Vec<&str> = q.split(' ').collect();

        let mut phrase = Vec::with_capacity(2);
        let mut partial = Vec::with_capacity(tokens.len());

        if tokens.len() > 1 {
            phrase.push(format!(
                "{}:{}^{}",
                self.phrase_field,
                to_phrase_query(&q),
                PHRASE_BOOST
            ));
            phrase.push(format!("{}:{}^{}", self.phrase_field, tokens[0], PHRASE_BOOST));

            let mut boost = PARTIAL_BOOST;
            for token in &tokens {
                partial.push(format!("{}:{}^{}", self.field, token, boost));
                if boost > PARTIAL_BOOST_DECREMENT {
                    boost -= PARTIAL_BOOST_DECREMENT;
                }
            }
        } else {
            phrase.push(format!("{}:{}^{}", self.phrase_field, q, PHRASE_BOOST));
            partial.push(format!("{}:{}^{}", self.field, q, PARTIAL_BOOST));
        }

        format!("({}){}({})", phrase.join(OR), OR, partial.join(OR))
    }
}

/// Collapse runs of whitespace to a single blank
pub fn clear_consecutive_blanks(value: &str) -> String {
    MULTIPLE_BLANKS.replace_all(value, " ").into_owned()
}

/// Escape characters with a meaning in the legacy query syntax
pub fn escape_query_chars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(
            c,
            '\\' | '+'
                | '-'
                | '!'
                | '('
                | ')'
                | ':'
                | '^'
                | '['
                | ']'
                | '"'
                | '{'
                | '}'
                | '~'
                | '*'
                | '?'
                | '|'
                | '&'
                | ';'
                | '/'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn to_phrase_query(value: &str) -> String {
    format!("\"{}\"", value)
}

/// Escape a free-text term and quote it when it holds several words
pub fn parse_query_value(q: &str) -> String {
    let trimmed = q.trim();
    if trimmed.is_empty() || trimmed == WILDCARD {
        return WILDCARD.to_string();
    }
    let escaped = escape_query_chars(&clear_consecutive_blanks(trimmed));
    if escaped.contains(' ') {
        to_phrase_query(&escaped)
    } else {
        escaped
    }
}
