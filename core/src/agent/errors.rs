//! User-facing wording for agent failures

use crate::error::{A2aError, AgentError, Error, LlmError};

pub const OLLAMA_CONNECTION: &str =
    "I'm having trouble connecting to my language model. Please make sure Ollama is running.";
pub const MEMORY_ERROR: &str =
    "I encountered an issue with my memory system, but I can still help you.";
pub const SEARCH_AGENT_ERROR: &str =
    "I couldn't reach my Google Search Agent right now, but I'll try to help with my existing knowledge.";
pub const RATE_LIMIT: &str =
    "You're sending messages too quickly. Please wait a moment before trying again.";
pub const INPUT_TOO_LONG: &str =
    "Your message is too long. Please try breaking it into smaller parts.";
pub const GENERAL_ERROR: &str =
    "I encountered an unexpected error. Please try again or rephrase your request.";

/// Message to show the user instead of a raw error
pub fn friendly_error(error: &Error) -> String {
    match error {
        Error::Agent(AgentError::InputTooLong { .. }) => INPUT_TOO_LONG.to_string(),
        Error::Agent(AgentError::InvalidInput { message }) => message.clone(),
        Error::Llm(LlmError::ApiError { .. })
        | Error::Http(_)
        | Error::Timeout(_) => OLLAMA_CONNECTION.to_string(),
        Error::A2a(A2aError::CardUnavailable { .. }) => SEARCH_AGENT_ERROR.to_string(),
        Error::Memory(_) => MEMORY_ERROR.to_string(),
        _ => GENERAL_ERROR.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_friendly_messages() {
        let too_long: Error = AgentError::InputTooLong {
            length: 2000,
            max: 1000,
        }
        .into();
        assert_eq!(friendly_error(&too_long), INPUT_TOO_LONG);

        let llm_down: Error = LlmError::ApiError {
            status: 503,
            message: "Connection refused".to_string(),
        }
        .into();
        assert_eq!(friendly_error(&llm_down), OLLAMA_CONNECTION);

        let no_card: Error = A2aError::CardUnavailable {
            url: "http://localhost:8001/.well-known/agent.json".to_string(),
            message: "connection refused".to_string(),
        }
        .into();
        assert_eq!(friendly_error(&no_card), SEARCH_AGENT_ERROR);

        assert_eq!(friendly_error(&Error::Generic("boom".to_string())), GENERAL_ERROR);
    }
}
