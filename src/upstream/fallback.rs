use crate::error::ProxyError;
use crate::status::StatusPublisher;
use crate::upstream::circuit_breaker::CircuitBreakerRegistry;
use crate::upstream::provider::Provider;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Orchestrates one logical fetch across the provider chain.
///
/// Providers are tried in priority order, one attempt each, first success
/// wins. Outcomes are recorded into the breaker registry and emitted as
/// status events after each transition; the events are fire-and-forget and
/// never delay the response.
pub struct FallbackEngine {
    providers: Vec<Provider>,
    breakers: Arc<CircuitBreakerRegistry>,
    client: reqwest::Client,
    publisher: StatusPublisher,
    request_timeout: Duration,
}

impl FallbackEngine {
    pub fn new(
        providers: Vec<Provider>,
        breakers: Arc<CircuitBreakerRegistry>,
        publisher: StatusPublisher,
        request_timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("failed to build provider client");
        Self {
            providers,
            breakers,
            client,
            publisher,
            request_timeout,
        }
    }

    /// Fetch weather data for `city` from the first provider that answers.
    ///
    /// Returns `AllProvidersFailed` when every enabled provider is skipped
    /// or fails; the request boundary degrades that to the stub payload.
    pub async fn fetch(&self, city: &str) -> Result<serde_json::Value, ProxyError> {
        for provider in &self.providers {
            // Administratively disabled: skipped entirely, no breaker
            // interaction, nothing recorded.
            if !provider.enabled {
                continue;
            }

            if !self.breakers.is_eligible(&provider.name, Instant::now()) {
                info!(
                    "fallback: circuit open, skipping provider, provider={}",
                    provider.name
                );
                metrics::counter!(
                    "vane_provider_skipped_total",
                    "provider" => provider.name.clone(),
                )
                .increment(1);
                continue;
            }

            match self.try_provider(provider, city).await {
                Ok(payload) => {
                    self.breakers.record_success(&provider.name);
                    metrics::counter!(
                        "vane_provider_requests_total",
                        "provider" => provider.name.clone(),
                        "result" => "success",
                    )
                    .increment(1);
                    metrics::counter!(
                        "vane_circuit_transitions_total",
                        "provider" => provider.name.clone(),
                        "to" => "closed",
                    )
                    .increment(1);
                    metrics::counter!("vane_fetch_total", "result" => "success").increment(1);

                    self.publisher
                        .publish(format!("circuit closed for {} after success", provider.name));
                    self.publisher
                        .publish(format!("success from {}", provider.name));

                    info!(
                        "fallback: provider succeeded, provider={}, city={}",
                        provider.name, city
                    );
                    return Ok(payload);
                }
                Err(e) => {
                    let outcome = self.breakers.record_failure(&provider.name, Instant::now());
                    warn!(
                        "fallback: provider failed, provider={}, failures={}, error={}",
                        provider.name, outcome.failures, e
                    );
                    metrics::counter!(
                        "vane_provider_requests_total",
                        "provider" => provider.name.clone(),
                        "result" => "error",
                    )
                    .increment(1);

                    if outcome.opened {
                        metrics::counter!(
                            "vane_circuit_transitions_total",
                            "provider" => provider.name.clone(),
                            "to" => "open",
                        )
                        .increment(1);
                        self.publisher.publish(format!(
                            "circuit opened for {} after {} failures",
                            provider.name, outcome.failures
                        ));
                    } else {
                        self.publisher.publish(format!(
                            "failure {} for {}",
                            outcome.failures, provider.name
                        ));
                    }
                }
            }
        }

        warn!("fallback: all providers failed, city={}", city);
        metrics::counter!("vane_fetch_total", "result" => "stub").increment(1);
        self.publisher
            .publish("FALLBACK: stub response due to total failure");
        Err(ProxyError::AllProvidersFailed)
    }

    /// One bounded-time attempt against a single provider.
    async fn try_provider(
        &self,
        provider: &Provider,
        city: &str,
    ) -> Result<serde_json::Value, ProxyError> {
        let url = provider.endpoint(city);
        let start = Instant::now();

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ProxyError::ProviderUnreachable(e.to_string()))?;

        metrics::histogram!(
            "vane_provider_request_duration_seconds",
            "provider" => provider.name.clone(),
        )
        .record(start.elapsed().as_secs_f64());

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::ProviderUnhealthy(status.as_u16()));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ProxyError::InvalidPayload(e.to_string()))
    }
}
