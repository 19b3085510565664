//! Database models and queries

pub mod artists;
pub mod init;
pub mod models;
pub mod subscriptions;

pub use init::*;
pub use models::*;
