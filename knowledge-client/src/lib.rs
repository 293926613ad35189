mod client;
mod github;
mod models;
mod search_url;
mod stack_exchange;
mod text;

pub(crate) use search_url::*;

pub use client::*;
pub use github::GithubIssueSearch;
pub use models::*;
pub use stack_exchange::StackExchangeSearch;
