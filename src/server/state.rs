use crate::config::ProxyConfig;
use crate::metrics::Metrics;
use crate::status::StatusPublisher;
use crate::upstream::{build_chain, CircuitBreakerRegistry, FallbackEngine};
use std::sync::Arc;
use std::time::Duration;

/// Shared proxy state, cheaply cloneable.
///
/// The breaker registry is the only mutable piece; it is shared between the
/// fallback engine (reads and transitions) and the admin surface (snapshot
/// reads). Everything else is immutable after startup.
#[derive(Clone)]
pub struct ProxyState {
    pub config: Arc<ProxyConfig>,
    pub engine: Arc<FallbackEngine>,
    pub breakers: Arc<CircuitBreakerRegistry>,
    pub metrics: Metrics,
}

impl ProxyState {
    pub fn new(config: ProxyConfig, metrics: Metrics, publisher: StatusPublisher) -> Self {
        let chain = build_chain(&config.upstream.providers, &config.upstream.breaker);
        let breakers = Arc::new(CircuitBreakerRegistry::new(
            chain
                .iter()
                .map(|provider| (provider.name.as_str(), provider.breaker.clone())),
        ));
        let engine = Arc::new(FallbackEngine::new(
            chain,
            breakers.clone(),
            publisher,
            Duration::from_secs(config.upstream.request_timeout_secs),
        ));

        Self {
            config: Arc::new(config),
            engine,
            breakers,
            metrics,
        }
    }
}
