//! Application state wiring for the gateway
//!
//! Every collaborator is explicitly constructed here and injected where it is
//! needed; there are no process-wide singletons. The rate-limit drain task and
//! the event worker (logging + metrics) are spawned once alongside the state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use mcp_core::{
    AuthManager, Dispatcher, EventBus, McpEvent, ServiceRegistry,
};

use crate::backend::{create_http_client, HttpBackend};
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::metrics::MetricsService;

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ServiceRegistry>,
    pub dispatcher: Arc<Dispatcher<HttpBackend>>,
    pub backend: HttpBackend,
    pub metrics: Arc<MetricsService>,
    pub events: EventBus,
}

impl AppState {
    /// Initialize state from validated configuration. Configuration problems
    /// are aggregated and fatal; nothing is served with a broken registry.
    pub fn new(config: Config) -> Result<Self> {
        let events = EventBus::default();

        let registry = ServiceRegistry::from_configs(config.services.clone(), &events)
            .map(Arc::new)
            .map_err(|problems| GatewayError::Configuration(problems.join("; ")))?;

        let auth = Arc::new(AuthManager::new());
        let client = create_http_client(Duration::from_secs(30))?;
        let backend = HttpBackend::new(client, auth);

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            backend.clone(),
            config.default_retry.clone(),
            events.clone(),
        ));

        let metrics = Arc::new(MetricsService::new()?);

        registry.spawn_drain();
        spawn_event_worker(events.clone(), Arc::clone(&metrics));

        info!(services = registry.len(), "gateway state initialized");

        Ok(Self {
            config: Arc::new(config),
            registry,
            dispatcher,
            backend,
            metrics,
            events,
        })
    }
}

/// Subscribe the observability side to the event bus: structured logs for
/// every breaker transition plus metric updates for completions.
fn spawn_event_worker(events: EventBus, metrics: Arc<MetricsService>) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(McpEvent::CircuitTransition { service, from, to }) => {
                    info!(%service, ?from, ?to, "circuit transition");
                    metrics.set_circuit_state(&service, to);
                }
                Ok(McpEvent::RequestCompleted {
                    service, success, ..
                }) => {
                    metrics.record_request(&service, success);
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event worker lagged, dropping events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
