pub mod config;
pub mod error;

// API clients
pub mod github;
pub mod gitlab;

// Local repositories
pub mod git;

// Google Play metadata
pub mod play;
pub mod search;

// Graph import
pub mod neo4j;

pub mod cli;

// Utilities
pub mod utils;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
