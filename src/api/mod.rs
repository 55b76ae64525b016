//! REST collaborators
//!
//! Thin wrappers over the backend's login and wallet endpoints. These run
//! outside the connection core; the console only feeds the resulting bearer
//! token into the WebSocket layer.

mod auth;
mod wallet;

pub use auth::*;
pub use wallet::*;

use thiserror::Error;

/// Errors that can occur during REST operations
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Login failed. Please check credentials and API endpoint.")]
    LoginFailed,

    #[error("{endpoint} returned {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },
}

/// Result type for REST operations
pub type ApiResult<T> = Result<T, ApiError>;
