//! MCP Mesh client
//!
//! Embedded agent-side face of the dispatch engine. The client runs the same
//! circuit-breaker, rate-limiter, and retry pipeline as the gateway, with a
//! transport that forwards request envelopes to a remote gateway instead of
//! calling backend services directly. A misbehaving downstream trips the local
//! breaker even when the gateway's own breaker has not caught up yet.

pub mod backend;
pub mod client;
pub mod config;
pub mod error;

pub use backend::GatewayBackend;
pub use client::{GatewayHealth, McpClient, ServiceHealth};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
