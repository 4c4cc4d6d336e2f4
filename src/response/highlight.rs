use crate::config::HighlightConfig;

/// First non-empty snippet
pub fn first_snippet(snippets: &[String]) -> Option<&str> {
    snippets
        .iter()
        .map(String::as_str)
        .find(|snippet| !snippet.is_empty())
}

/// Remove every complete `pre ... post` mark pair, keeping the marked text
pub fn clean_highlight_marks(text: &str, pre_tag: &str, post_tag: &str) -> String {
    if pre_tag.is_empty() || post_tag.is_empty() {
        return text.to_string();
    }

    let mut cleaned = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(pre_tag) {
        let inner = &rest[start + pre_tag.len()..];
        let Some(end) = inner.find(post_tag) else {
            break;
        };
        cleaned.push_str(&rest[..start]);
        cleaned.push_str(&inner[..end]);
        rest = &inner[end + post_tag.len()..];
    }
    cleaned.push_str(rest);
    cleaned
}

/// Replace list elements by the snippets that highlight them.
///
/// A snippet replaces the element equal to its cleaned text; snippets with
/// no matching element are ignored.
pub fn highlight_list(values: &mut [String], snippets: &[String], tags: &HighlightConfig) {
    for snippet in snippets {
        let plain = clean_highlight_marks(snippet, &tags.pre_tag, &tags.post_tag);
        if let Some(value) = values.iter_mut().find(|value| **value == plain) {
            *value = snippet.clone();
        }
    }
}
