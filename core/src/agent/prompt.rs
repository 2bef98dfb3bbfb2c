//! System prompt for the conversational agent

use crate::error::Result;
use crate::util::render_template;
use serde_json::json;

/// Default instruction, steering when to use the delegation tools
pub const BASE_INSTRUCTION: &str = "You are a helpful AI assistant running locally with Ollama.

You can:
1. Answer questions and have conversations using your knowledge - for greetings, general questions, coding help, explanations, etc.
2. When users explicitly ask for current information, recent news, web searches, or real-time data, use the search_and_scrape function for comprehensive results
3. Use search_google for simple search results without content scraping
4. When memory tools are available: remember_information when asked to remember something, search_my_memory and get_user_profile to recall past conversations, clear_my_memory only when asked to forget, and get_agent_status when asked about your own status

Important guidelines:
- For simple greetings like \"hello\", \"hi\", \"how are you\" - respond directly without using any tools
- For general knowledge questions - use your existing knowledge
- For coding questions, explanations, creative tasks - respond directly
- For current information that needs web content: use search_and_scrape
- For simple searches: use search_google
- ONLY use search functions when users specifically ask to \"search for\", \"find current info about\", \"what's the latest news on\", or similar search requests

Be friendly, helpful, and informative in your responses.";

const SYSTEM_TEMPLATE: &str = "{{instruction}}{{#if context}}

CONVERSATION CONTEXT:
{{context}}

Please use the above context to provide more personalized and informed responses.
Reference previous conversations when relevant, and maintain consistency with past interactions.{{/if}}{{#if profile}}

What you know about the user:
{{profile}}{{/if}}";

/// Compose the system prompt from the instruction, remembered context and user details
///
/// Empty `context` or `profile` leave their sections out.
pub fn build_system_prompt(instruction: &str, context: &str, profile: &str) -> Result<String> {
    render_template(
        SYSTEM_TEMPLATE,
        &json!({
            "instruction": instruction,
            "context": context,
            "profile": profile,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_instruction_without_memory() {
        assert_eq!(build_system_prompt(BASE_INSTRUCTION, "", "").unwrap(), BASE_INSTRUCTION);
    }

    #[test]
    fn context_and_profile_sections_are_appended() {
        let prompt = build_system_prompt(
            "Be brief.",
            "Recent conversation:\nUser: I like \"rust\" & go",
            "- Name: Ada",
        )
        .unwrap();
        assert!(prompt.starts_with(
            "Be brief.\n\nCONVERSATION CONTEXT:\nRecent conversation:\nUser: I like \"rust\" & go\n\n"
        ));
        assert!(prompt.ends_with("What you know about the user:\n- Name: Ada"));

        let profile_only = build_system_prompt("Be brief.", "", "- Name: Ada").unwrap();
        assert!(!profile_only.contains("CONVERSATION CONTEXT"));
    }
}
