//! Event bus for the monitoring collaborator
//!
//! Breaker transitions and request completions are published over a broadcast
//! channel. Emission is fire-and-forget: a slow or absent subscriber never
//! blocks the dispatch path, and lagged subscribers lose events rather than
//! applying backpressure.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::circuit_breaker::CircuitState;

/// Observable state changes emitted by the core
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum McpEvent {
    #[serde(rename_all = "camelCase")]
    CircuitTransition {
        service: String,
        from: CircuitState,
        to: CircuitState,
    },
    #[serde(rename_all = "camelCase")]
    RequestCompleted {
        service: String,
        operation: String,
        success: bool,
        retries: u32,
        elapsed_ms: u64,
    },
}

/// Cloneable handle over the broadcast channel
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<McpEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event; a send error only means nobody is listening.
    pub fn emit(&self, event: McpEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<McpEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
