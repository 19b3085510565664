//! Common error types for Release Radar

use crate::catalog::CatalogError;
use crate::messaging::TransportError;
use thiserror::Error;

/// Common result type for Release Radar operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the sweep and bot processes
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog API rejected a request
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Messaging transport failed permanently
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
