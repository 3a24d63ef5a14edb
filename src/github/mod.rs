pub mod client;
pub mod config;
pub mod dedup;
pub mod models;
pub mod parser;
pub mod rate_limiter;

pub use client::GitHubClient;
pub use config::GitHubConfig;
pub use dedup::{deduplicate, pick_most_popular, RepoLookup, RepoStats};
pub use models::Repository;
pub use parser::FullName;
pub use rate_limiter::{RateLimiter, Resource};
