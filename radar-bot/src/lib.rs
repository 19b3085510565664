//! Interactive bot
//!
//! Long-polls the messaging platform and serves subscription toggles,
//! subscription listings and "latest release" queries.

pub mod commands;
pub mod handlers;
pub mod poller;
pub mod subscriptions;

pub use commands::Command;
pub use subscriptions::{toggle, ToggleOutcome};
