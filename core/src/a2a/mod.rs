//! Agent-to-Agent (A2A) JSON-RPC: wire types, a server around an executor, and a client

pub mod client;
pub mod server;
pub mod types;

pub use client::A2aClient;
pub use server::{a2a_router, AgentExecutor, EventQueue, RequestContext, TaskStore};
pub use types::{
    AgentCapabilities, AgentCard, AgentSkill, Message, Part, Role, Task, TaskState, AGENT_CARD_PATH,
};

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Arc;

    /// Serve `executor` on an ephemeral port and return a client for it
    ///
    /// `card_for_port` receives the bound port so the card url is reachable.
    pub async fn serve_agent(
        executor: Arc<dyn AgentExecutor>,
        card_for_port: impl FnOnce(u16) -> AgentCard,
    ) -> A2aClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let card = card_for_port(port);
        let app = a2a_router(card.clone(), executor);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        A2aClient::with_card(reqwest::Client::new(), card)
    }
}
