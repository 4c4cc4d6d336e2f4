//! Search parameters and their declared value types

use std::fmt::Debug;
use std::hash::Hash;

/// Ordered list of the canonical names of an enumerated value type
pub type Vocabulary = &'static [&'static str];

/// Value type driving how raw filter values of a parameter are parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Integer,
    Long,
    Double,
    Float,
    Boolean,
    Date,
    Uuid,
    Enum(Vocabulary),
}

impl ValueType {
    /// Whether range syntax is meaningful for this type
    pub fn supports_ranges(&self) -> bool {
        matches!(
            self,
            ValueType::Text
                | ValueType::Integer
                | ValueType::Long
                | ValueType::Double
                | ValueType::Float
                | ValueType::Date
        )
    }
}

/// A logical, typed search dimension.
///
/// Implemented by an application-defined enumeration, fixed at startup:
///
/// ```
/// use search_bridge::{SearchParameter, ValueType};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum Param {
///     Country,
///     Year,
/// }
///
/// impl SearchParameter for Param {
///     fn name(&self) -> &'static str {
///         match self {
///             Param::Country => "COUNTRY",
///             Param::Year => "YEAR",
///         }
///     }
///
///     fn value_type(&self) -> ValueType {
///         match self {
///             Param::Country => ValueType::Text,
///             Param::Year => ValueType::Integer,
///         }
///     }
/// }
/// ```
pub trait SearchParameter: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Stable name of the parameter
    fn name(&self) -> &'static str;

    /// Declared value type
    fn value_type(&self) -> ValueType;
}

fn normalize_literal(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | '.') && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Look up a literal in a vocabulary, ignoring case, whitespace, `_`, `-` and `.`
pub fn lookup_enum(value: &str, vocabulary: Vocabulary) -> Option<&'static str> {
    let wanted = normalize_literal(value);
    if wanted.is_empty() {
        return None;
    }
    vocabulary
        .iter()
        .copied()
        .find(|name| normalize_literal(name) == wanted)
}

/// Resolve an indexed enum value, either an ordinal or a name, to its canonical name
pub fn canonical_enum_value(indexed: &str, vocabulary: Vocabulary) -> Option<&'static str> {
    match indexed.trim().parse::<usize>() {
        Ok(ordinal) => vocabulary.get(ordinal).copied(),
        Err(_) => lookup_enum(indexed, vocabulary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIS: Vocabulary = &["HUMAN_OBSERVATION", "PRESERVED_SPECIMEN", "FOSSIL_SPECIMEN"];

    #[test]
    fn test_lookup_ignores_case_and_separators() {
        assert_eq!(
            lookup_enum("human observation", BASIS),
            Some("HUMAN_OBSERVATION")
        );
        assert_eq!(
            lookup_enum("Preserved-Specimen", BASIS),
            Some("PRESERVED_SPECIMEN")
        );
        assert_eq!(lookup_enum("fossilspecimen", BASIS), Some("FOSSIL_SPECIMEN"));
        assert_eq!(lookup_enum("LIVING", BASIS), None);
        assert_eq!(lookup_enum("  ", BASIS), None);
    }

    #[test]
    fn test_canonical_from_ordinal_or_name() {
        assert_eq!(canonical_enum_value("1", BASIS), Some("PRESERVED_SPECIMEN"));
        assert_eq!(canonical_enum_value("9", BASIS), None);
        assert_eq!(
            canonical_enum_value("fossil_specimen", BASIS),
            Some("FOSSIL_SPECIMEN")
        );
    }

    #[test]
    fn test_range_support() {
        assert!(ValueType::Date.supports_ranges());
        assert!(ValueType::Double.supports_ranges());
        assert!(!ValueType::Boolean.supports_ranges());
        assert!(!ValueType::Enum(BASIS).supports_ranges());
    }
}
