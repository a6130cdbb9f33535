//! Service registry: static configuration plus live resilience state
//!
//! Built once at startup from validated configuration. Each entry pairs the
//! immutable `ServiceConfig` with that service's circuit breaker and rate
//! limiter; the registry itself has no mutation API. The once-per-second
//! rate-limit drain step is the only background activity in the core and is
//! spawned from here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::circuit_breaker::CircuitBreaker;
use crate::config::ServiceConfig;
use crate::events::EventBus;
use crate::rate_limiter::{RateLimiter, DRAIN_INTERVAL};

/// One configured service together with its live state
#[derive(Debug)]
pub struct ServiceState {
    pub config: ServiceConfig,
    pub breaker: CircuitBreaker,
    pub limiter: RateLimiter,
}

impl ServiceState {
    fn new(config: ServiceConfig, events: &EventBus) -> Self {
        let breaker = CircuitBreaker::new(
            config.name.clone(),
            config.circuit_breaker.clone(),
            events.clone(),
        );
        let limiter = RateLimiter::new(config.name.clone(), config.rate_limit.clone());
        Self {
            config,
            breaker,
            limiter,
        }
    }
}

/// Registry of all configured downstream services
#[derive(Debug)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<ServiceState>>,
}

impl ServiceRegistry {
    /// Build the registry from configuration, rejecting it wholesale when any
    /// entry is invalid. All problems are collected so a broken deployment is
    /// reported in one pass; these are fatal at startup, never runtime errors.
    pub fn from_configs(
        configs: impl IntoIterator<Item = ServiceConfig>,
        events: &EventBus,
    ) -> Result<Self, Vec<String>> {
        let mut problems = Vec::new();
        let mut services = HashMap::new();

        for config in configs {
            problems.extend(config.validate());
            if services.contains_key(&config.name) {
                problems.push(format!("duplicate service name '{}'", config.name));
                continue;
            }
            services.insert(
                config.name.clone(),
                Arc::new(ServiceState::new(config, events)),
            );
        }

        if !problems.is_empty() {
            return Err(problems);
        }

        info!(services = services.len(), "service registry built");
        Ok(Self { services })
    }

    /// Look up one service's config and live state.
    pub fn resolve(&self, name: &str) -> Option<Arc<ServiceState>> {
        self.services.get(name).cloned()
    }

    pub fn services(&self) -> impl Iterator<Item = &Arc<ServiceState>> {
        self.services.values()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Force a service's circuit breaker back to closed. Returns false when
    /// the service is not configured. Operator escape hatch; normal recovery
    /// goes through the half-open probe path.
    pub fn reset_breaker(&self, name: &str) -> bool {
        match self.services.get(name) {
            Some(state) => {
                state.breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Spawn the once-per-second drain step over all services' rate-limit
    /// queues. The handle may be dropped; the task runs for the life of the
    /// registry reference it holds.
    pub fn spawn_drain(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(DRAIN_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                for service in registry.services.values() {
                    service.limiter.drain();
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, RateLimitConfig};

    fn config(name: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            endpoint: format!("http://localhost:9000/{}", name),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_known_service() {
        let registry =
            ServiceRegistry::from_configs([config("billing"), config("catalog")], &EventBus::default())
                .unwrap();
        assert_eq!(registry.len(), 2);

        let state = registry.resolve("billing").unwrap();
        assert_eq!(state.config.name, "billing");
        assert!(registry.resolve("unknown").is_none());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let registry =
            ServiceRegistry::from_configs([config("billing")], &EventBus::default()).unwrap();

        let first = registry.resolve("billing").unwrap();
        let second = registry.resolve("billing").unwrap();
        assert_eq!(first.config, second.config);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.breaker.state(), second.breaker.state());
    }

    #[test]
    fn test_invalid_configs_collected_wholesale() {
        let bad_endpoint = ServiceConfig {
            endpoint: "".to_string(),
            ..config("billing")
        };
        let bad_auth = ServiceConfig {
            auth: AuthConfig {
                auth_type: crate::config::AuthType::Bearer,
                credentials: Default::default(),
            },
            ..config("catalog")
        };
        let problems =
            ServiceRegistry::from_configs([bad_endpoint, bad_auth], &EventBus::default())
                .unwrap_err();
        assert!(problems.iter().any(|p| p.contains("endpoint")));
        assert!(problems.iter().any(|p| p.contains("token")));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let problems =
            ServiceRegistry::from_configs([config("billing"), config("billing")], &EventBus::default())
                .unwrap_err();
        assert!(problems.iter().any(|p| p.contains("duplicate")));
    }

    #[test]
    fn test_reset_breaker() {
        let registry =
            ServiceRegistry::from_configs([config("billing")], &EventBus::default()).unwrap();
        let state = registry.resolve("billing").unwrap();
        for _ in 0..state.config.circuit_breaker.failure_threshold {
            state.breaker.record_failure();
        }
        assert_eq!(state.breaker.state(), crate::CircuitState::Open);

        assert!(registry.reset_breaker("billing"));
        assert_eq!(state.breaker.state(), crate::CircuitState::Closed);
        assert!(!registry.reset_breaker("unknown"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_task_grants_queued_waiters() {
        let mut cfg = config("billing");
        cfg.rate_limit = RateLimitConfig {
            requests_per_minute: 60,
            burst_limit: 1,
        };
        let registry =
            Arc::new(ServiceRegistry::from_configs([cfg], &EventBus::default()).unwrap());
        let drain = registry.spawn_drain();

        let state = registry.resolve("billing").unwrap();
        state.limiter.acquire().await.unwrap();

        let waiter = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.limiter.acquire().await })
        };

        // Auto-advance walks through drain ticks until a refilled token is
        // granted to the queued waiter.
        waiter.await.unwrap().unwrap();
        drain.abort();
    }
}
