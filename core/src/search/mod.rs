//! Search helper agent: Google Custom Search behind an A2A endpoint

pub mod executor;
pub mod google;
pub mod query;

pub use executor::{search_agent_card, SearchAgentExecutor};
pub use google::{GoogleSearchClient, SearchResponse, SearchResult};
pub use query::extract_search_query;
