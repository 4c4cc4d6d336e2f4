//! Did-you-mean suggestions from the legacy engine's spell-check section

use super::types::{RawSpellCheck, SpellCheckResponse, SpellCheckSuggestion};

/// Build the spell-check response.
///
/// Collations win over per-term suggestions when both are present. Entries
/// for the same original text are merged: alternatives accumulate without
/// duplicates and the hit count is the maximum seen.
pub fn spell_check_response(raw: &RawSpellCheck) -> SpellCheckResponse {
    let mut suggestions: Vec<SpellCheckSuggestion> = Vec::new();

    if !raw.collations.is_empty() {
        for collation in &raw.collations {
            let original = collation
                .corrections
                .iter()
                .map(|(original, _)| original.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            merge(
                &mut suggestions,
                original,
                collation.hits,
                std::slice::from_ref(&collation.query),
            );
        }
    } else {
        for suggestion in &raw.suggestions {
            merge(
                &mut suggestions,
                suggestion.token.clone(),
                suggestion.num_found,
                &suggestion.alternatives,
            );
        }
    }

    SpellCheckResponse {
        correctly_spelled: raw.correctly_spelled,
        suggestions,
    }
}

fn merge(
    suggestions: &mut Vec<SpellCheckSuggestion>,
    original: String,
    num_found: u64,
    alternatives: &[String],
) {
    let index = match suggestions.iter().position(|s| s.original == original) {
        Some(index) => index,
        None => {
            suggestions.push(SpellCheckSuggestion {
                original,
                num_found: 0,
                alternatives: Vec::new(),
            });
            suggestions.len() - 1
        }
    };

    let entry = &mut suggestions[index];
    entry.num_found = entry.num_found.max(num_found);
    for alternative in alternatives {
        if !entry.alternatives.contains(alternative) {
            entry.alternatives.push(alternative.clone());
        }
    }
}
