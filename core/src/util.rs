//! Small text and time helpers shared by the agents

use crate::error::{Error, Result};
use chrono::{DateTime, Local, Utc};
use handlebars::Handlebars;
use serde::Serialize;

/// Trim surrounding whitespace from user input
pub fn sanitize_input(text: &str) -> String {
    text.trim().to_string()
}

/// Cut `text` to at most `max_chars` characters, appending `suffix` when cut
pub fn truncate_text(text: &str, max_chars: usize, suffix: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], suffix),
        None => text.to_string(),
    }
}

/// Rough token estimate at four characters per token
pub fn estimate_token_count(text: &str) -> usize {
    text.len() / 4
}

/// Base model name from a routed model string such as `ollama_chat/llama3.1:8b`
pub fn extract_model_name(full_model_name: &str) -> &str {
    full_model_name
        .rsplit_once('/')
        .map(|(_, name)| name)
        .unwrap_or(full_model_name)
}

/// Format a timestamp in local time for display
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Render a prompt template without HTML escaping
pub fn render_template<T: Serialize>(template: &str, data: &T) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);
    handlebars
        .render_template(template, data)
        .map_err(|e| Error::Generic(format!("Failed to render prompt: {}", e)))
}

/// Fresh session identifier
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_text("héllo wörld", 7, "..."), "héllo w...");
        assert_eq!(truncate_text("short", 10, "..."), "short");
        assert_eq!(truncate_text("exact", 5, "..."), "exact");
        assert_eq!(truncate_text("🔍🔍🔍", 1, ""), "🔍");
    }

    #[test]
    fn model_name_drops_routing_prefix() {
        assert_eq!(extract_model_name("ollama_chat/mistral-small:7b"), "mistral-small:7b");
        assert_eq!(extract_model_name("gemma2:7b"), "gemma2:7b");
    }

    #[test]
    fn templates_render_without_escaping() {
        let rendered = render_template(
            "Query: {{query}}{{#each urls}}\n- {{this}}{{/each}}",
            &serde_json::json!({"query": "a < b & c", "urls": ["https://x.dev/?a=1&b=2"]}),
        )
        .unwrap();
        assert_eq!(rendered, "Query: a < b & c\n- https://x.dev/?a=1&b=2");

        assert!(render_template("{{missing}}", &serde_json::json!({})).is_err());
    }

    #[test]
    fn helpers_behave_like_their_names() {
        assert_eq!(sanitize_input("  hi there \n"), "hi there");
        assert_eq!(estimate_token_count("12345678"), 2);
        assert_eq!(format_timestamp(Utc::now()).len(), 19);
        assert_ne!(generate_session_id(), generate_session_id());
    }
}
