//! Slack Hub - one facade over every authenticated Slack team
//!
//! This library routes entity-scoped operations to the team that owns them,
//! merges list-style results across teams and coordinates cache refreshes.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod types;

pub use api::client::{SlackClient, SlackConnector};
pub use config::Config;
pub use service::TeamHub;
