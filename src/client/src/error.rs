//! Client construction and health-check errors
//!
//! Dispatch failures never surface here; they arrive inside `McpResponse`
//! envelopes like they do on the gateway side.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gateway returned status {status}")]
    GatewayStatus { status: u16 },
}
