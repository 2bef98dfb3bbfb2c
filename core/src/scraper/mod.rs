//! Scraper helper agent: fetch pages, extract readable text, summarize

pub mod executor;
pub mod extract;
pub mod fetch;

pub use executor::{scraper_agent_card, ScraperAgentExecutor};
pub use extract::{extract_content, extract_urls, PageContent};
pub use fetch::{PageFetcher, ScrapeOutcome};
