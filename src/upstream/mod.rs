pub mod circuit_breaker;
pub mod fallback;
pub mod provider;

pub use circuit_breaker::{CircuitBreakerRegistry, CircuitState, FailureOutcome};
pub use fallback::FallbackEngine;
pub use provider::{build_chain, Provider};
