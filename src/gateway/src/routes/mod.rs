//! Route definitions

pub mod mcp;
pub mod public;
