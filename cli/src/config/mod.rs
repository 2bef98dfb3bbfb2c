//! Configuration loading for the CLI

pub mod loader;

pub use loader::{load_dotenv, CliConfigLoader};
