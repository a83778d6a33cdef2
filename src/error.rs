// SPDX-License-Identifier: MIT

//! Typed error handling for flowsync-rs
//!
//! Three families of failure show up when persisting a flow:
//! configuration errors (no usable store endpoint), transport errors
//! (network failure or a non-success status) and identity errors on
//! explicit saves. Validation of the document itself is left to the
//! remote store.

use thiserror::Error;

/// Top-level error type for flowsync-rs
#[derive(Debug, Error)]
pub enum FlowError {
    /// Configuration errors (missing or invalid settings)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Non-success response from the remote flow store
    #[error("Flow store returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The store answered with something we cannot use
    #[error("Invalid response from flow store: {0}")]
    InvalidResponse(String),

    /// Explicit save attempted without an owning user
    #[error("No user identity established for this editing session")]
    MissingIdentity,

    /// HTTP transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors (drafts, settings files)
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No base URL configured for the remote flow store
    #[error("FLOW_API_BASE_URL is not set")]
    MissingBaseUrl,

    /// Base URL present but not a usable http(s) URL
    #[error("Invalid flow store base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// A setting could not be parsed
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

impl FlowError {
    /// Create an API error from a status code and response body
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// True for errors caused by missing or bad configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// True for errors raised while talking to the remote store
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Api { .. } | Self::Http(_) | Self::InvalidResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
