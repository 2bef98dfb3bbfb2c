//! Client for talking to another agent over A2A

use crate::error::{A2aError, Result};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::types::{
    AgentCard, JsonRpcRequest, JsonRpcResponse, Message, MessageSendParams, SendMessageResult,
    Task, TaskIdParams,
};

/// JSON-RPC client bound to one remote agent
#[derive(Debug, Clone)]
pub struct A2aClient {
    http: reqwest::Client,
    card: AgentCard,
}

impl A2aClient {
    /// Fetch the agent card at `base_url + card_path` and target its RPC url
    pub async fn from_agent_card_url(
        http: reqwest::Client,
        base_url: &str,
        card_path: &str,
    ) -> Result<Self> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), card_path);
        let unavailable = |message: String| A2aError::CardUnavailable {
            url: url.clone(),
            message,
        };

        let response = http
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(unavailable(format!("HTTP {}", response.status())).into());
        }
        let card: AgentCard = response
            .json()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        tracing::debug!("Resolved agent '{}' at {}", card.name, card.url);
        Ok(Self { http, card })
    }

    pub fn with_card(http: reqwest::Client, card: AgentCard) -> Self {
        Self { http, card }
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    /// Send a user message and return the agent's reply
    pub async fn send_message(&self, text: &str) -> Result<Message> {
        let params = MessageSendParams {
            message: Message::user_text(text),
            metadata: None,
        };
        let result: SendMessageResult = self.call("message/send", json!(params)).await?;
        result.into_reply().ok_or_else(|| {
            A2aError::UnexpectedResponse {
                message: "Task finished without an agent message".to_string(),
            }
            .into()
        })
    }

    pub async fn get_task(&self, id: &str) -> Result<Task> {
        self.call("tasks/get", json!(TaskIdParams { id: id.to_string() }))
            .await
    }

    pub async fn cancel_task(&self, id: &str) -> Result<Task> {
        self.call("tasks/cancel", json!(TaskIdParams { id: id.to_string() }))
            .await
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let request = JsonRpcRequest::new(method, params);
        let response: JsonRpcResponse = self
            .http
            .post(&self.card.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(A2aError::Rpc {
                code: error.code,
                message: error.message,
            }
            .into());
        }
        let result = response.result.ok_or_else(|| A2aError::UnexpectedResponse {
            message: format!("{} returned neither result nor error", method),
        })?;
        serde_json::from_value(result).map_err(|e| {
            A2aError::UnexpectedResponse {
                message: format!("{} returned an unexpected result: {}", method, e),
            }
            .into()
        })
    }
}
