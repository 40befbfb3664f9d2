//! Error types for a single check cycle

use thiserror::Error;

/// Failure of the connectivity probe
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("device status check failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected captive portal domain: {host}")]
    UnexpectedDomain { host: String },

    #[error("unreadable captive portal URL: {0}")]
    InvalidPortalUrl(#[from] url::ParseError),
}

/// Failure of a registration API call
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response ({source}): {body}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("credential is not a valid header value")]
    InvalidCredential,
}

/// Anything that ends a cycle early without a decision
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("portal registration check failed: {0}")]
    StatusCheck(#[source] ApiError),

    #[error("failed to check if PIN is required: {0}")]
    PinCheck(#[source] ApiError),

    #[error("user registration failed: {0}")]
    Registration(#[source] ApiError),

    #[error("status response did not include {0}")]
    MissingIdentifier(&'static str),
}
