//! Built-in tools: delegation to the helper agents, status and memory

pub mod delegate;
pub mod memory;
pub mod search_and_scrape;
pub mod search_google;

pub use delegate::HelperAgents;
pub use memory::{
    AgentStatusTool, AgentStatusToolFactory, ClearMyMemoryTool, ClearMyMemoryToolFactory,
    RememberInformationTool, RememberInformationToolFactory, SearchMyMemoryTool,
    SearchMyMemoryToolFactory, StatusSource, UserProfileTool, UserProfileToolFactory,
};
pub use search_and_scrape::{urls_from_search_result, SearchAndScrapeTool, SearchAndScrapeToolFactory};
pub use search_google::{SearchGoogleTool, SearchGoogleToolFactory};
