//! Pulling the search terms out of a request

const QUERY_PREFIXES: [&str; 6] = [
    "search for:",
    "search for",
    "find:",
    "find",
    "look up:",
    "look up",
];

/// Strip a leading "search for"/"find"/"look up" instruction from `text`
///
/// Prefixes match case-insensitively and only on a word boundary, so
/// "findings about X" is kept whole.
pub fn extract_search_query(text: &str) -> String {
    let text = text.trim();
    for prefix in QUERY_PREFIXES {
        let Some(head) = text.get(..prefix.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(prefix) {
            continue;
        }
        let rest = &text[prefix.len()..];
        let at_boundary = rest
            .chars()
            .next()
            .map_or(true, |c| c.is_whitespace() || c.is_ascii_punctuation());
        if at_boundary {
            return rest.trim().to_string();
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_instruction_prefixes() {
        assert_eq!(extract_search_query("  Search for: rust async  "), "rust async");
        assert_eq!(extract_search_query("search for rust"), "rust");
        assert_eq!(extract_search_query("FIND the best pizza"), "the best pizza");
        assert_eq!(extract_search_query("look up: tokio"), "tokio");
        assert_eq!(extract_search_query("Look up axum routers"), "axum routers");
    }

    #[test]
    fn prefixes_need_a_word_boundary() {
        assert_eq!(extract_search_query("findings on climate"), "findings on climate");
        assert_eq!(extract_search_query("lookup tables"), "lookup tables");
        assert_eq!(extract_search_query("what is rust?"), "what is rust?");
    }

    #[test]
    fn bare_prefix_leaves_empty_query() {
        assert_eq!(extract_search_query("search for"), "");
        assert_eq!(extract_search_query("find:"), "");
        assert_eq!(extract_search_query("   "), "");
    }

    #[test]
    fn non_ascii_input_is_safe() {
        assert_eq!(extract_search_query("fïnd cafés"), "fïnd cafés");
        assert_eq!(extract_search_query("find cafés à Paris"), "cafés à Paris");
    }
}
