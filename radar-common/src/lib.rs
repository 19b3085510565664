//! # Release Radar Common Library
//!
//! Shared code for the sweep and bot processes including:
//! - Database initialization and state store queries
//! - Release models and date normalization
//! - Catalog (Spotify Web API) client
//! - Messaging (Telegram Bot API) transport
//! - Configuration loading
//! - Message rendering and artist link parsing

pub mod catalog;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod link;
pub mod messaging;
pub mod release;
pub mod render;
pub mod seed;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use context::{RadarContext, RadarSettings};
pub use error::{Error, Result};
pub use release::{ReleaseCandidate, ReleaseCategory};
