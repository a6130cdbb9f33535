//! Prometheus metrics for the gateway
//!
//! Fed by the event bus rather than inline from the dispatch path, so metric
//! collection can never slow a request down.

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use mcp_core::CircuitState;

/// Gateway-level metrics registry
#[derive(Debug)]
pub struct MetricsService {
    registry: Registry,
    requests_total: IntCounterVec,
    circuit_state: IntGaugeVec,
}

impl MetricsService {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("mcp_requests_total", "Dispatched MCP requests by outcome"),
            &["service", "outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let circuit_state = IntGaugeVec::new(
            Opts::new(
                "mcp_circuit_state",
                "Circuit breaker state per service (0=closed, 1=half_open, 2=open)",
            ),
            &["service"],
        )?;
        registry.register(Box::new(circuit_state.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            circuit_state,
        })
    }

    pub fn record_request(&self, service: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.requests_total
            .with_label_values(&[service, outcome])
            .inc();
    }

    pub fn set_circuit_state(&self, service: &str, state: CircuitState) {
        let value = match state {
            CircuitState::Closed => 0,
            CircuitState::HalfOpen => 1,
            CircuitState::Open => 2,
        };
        self.circuit_state.with_label_values(&[service]).set(value);
    }

    /// Text-encoded metrics for the `/metrics` route.
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        match encoder.encode_to_string(&self.registry.gather()) {
            Ok(output) => output,
            Err(_) => "# failed to encode metrics\n".to_string(),
        }
    }
}
