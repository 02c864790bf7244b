use crate::config::BreakerConfig;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Circuit breaker state machine: Closed → Open → HalfOpen → Closed/Open.
///
/// Per-provider granularity — each configured provider gets its own breaker,
/// so one failing upstream is isolated without blocking the rest of the
/// fallback chain. Transitions are pure state changes with no side channel
/// calls; the fallback engine publishes and logs on top of the returned
/// outcomes.
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<ProviderBreaker>>,
}

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

/// Per-provider breaker state.
struct ProviderBreaker {
    /// 0 = Closed, 1 = Open, 2 = HalfOpen.
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    /// Set on every recorded failure; the cooldown is measured from here.
    last_failure: Mutex<Option<Instant>>,
    config: BreakerConfig,
}

const STATE_CLOSED: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_HALF_OPEN: u8 = 2;

fn state_from_tag(tag: u8) -> CircuitState {
    match tag {
        STATE_OPEN => CircuitState::Open,
        STATE_HALF_OPEN => CircuitState::HalfOpen,
        _ => CircuitState::Closed,
    }
}

/// What a recorded failure did to the breaker, for the caller to publish on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    /// Consecutive failure count after this failure.
    pub failures: u32,
    /// True when this failure tripped the circuit Open.
    pub opened: bool,
}

impl CircuitBreakerRegistry {
    /// Build a registry with one breaker per provider, created Closed with a
    /// zero failure count. Providers are fixed for the process lifetime so
    /// the set of breakers never changes after construction.
    pub fn new<'a>(providers: impl IntoIterator<Item = (&'a str, BreakerConfig)>) -> Self {
        let breakers = DashMap::new();
        for (name, config) in providers {
            breakers.insert(name.to_string(), Arc::new(ProviderBreaker::new(config)));
        }
        Self { breakers }
    }

    /// Whether `provider` may be attempted at `now`.
    ///
    /// An Open breaker whose cooldown has elapsed is promoted to HalfOpen
    /// here, atomically, before the attempt; within cooldown it answers
    /// false without mutation. Unknown providers are never eligible.
    pub fn is_eligible(&self, provider: &str, now: Instant) -> bool {
        match self.get(provider) {
            Some(breaker) => breaker.is_eligible(now),
            None => false,
        }
    }

    /// Record a successful attempt: Closed, failure count reset to zero,
    /// regardless of prior state.
    pub fn record_success(&self, provider: &str) {
        if let Some(breaker) = self.get(provider) {
            breaker.record_success();
        }
    }

    /// Record a failed attempt at `now`.
    pub fn record_failure(&self, provider: &str, now: Instant) -> FailureOutcome {
        match self.get(provider) {
            Some(breaker) => breaker.record_failure(now),
            None => FailureOutcome {
                failures: 0,
                opened: false,
            },
        }
    }

    pub fn state(&self, provider: &str) -> Option<CircuitState> {
        self.get(provider)
            .map(|b| state_from_tag(b.state.load(Ordering::Acquire)))
    }

    /// Per-provider `(name, state, consecutive_failures)` snapshot for the
    /// admin surface, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, CircuitState, u32)> {
        let mut entries: Vec<(String, CircuitState, u32)> = self
            .breakers
            .iter()
            .map(|entry| {
                let breaker = entry.value();
                (
                    entry.key().clone(),
                    state_from_tag(breaker.state.load(Ordering::Acquire)),
                    breaker.consecutive_failures.load(Ordering::Relaxed),
                )
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn get(&self, provider: &str) -> Option<Arc<ProviderBreaker>> {
        self.breakers.get(provider).map(|entry| entry.value().clone())
    }
}

impl ProviderBreaker {
    fn new(config: BreakerConfig) -> Self {
        Self {
            state: AtomicU8::new(STATE_CLOSED),
            consecutive_failures: AtomicU32::new(0),
            last_failure: Mutex::new(None),
            config,
        }
    }

    fn is_eligible(&self, now: Instant) -> bool {
        match self.state.load(Ordering::Acquire) {
            STATE_OPEN => {
                let since_failure = {
                    let last = self.last_failure.lock().unwrap();
                    last.map(|at| now.saturating_duration_since(at))
                };
                match since_failure {
                    Some(elapsed)
                        if elapsed >= Duration::from_secs(self.config.cooldown_secs) =>
                    {
                        // CAS so the promotion happens exactly once; losers
                        // observe HalfOpen and are eligible as well.
                        let _ = self.state.compare_exchange(
                            STATE_OPEN,
                            STATE_HALF_OPEN,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        );
                        true
                    }
                    _ => false,
                }
            }
            _ => true,
        }
    }

    fn record_success(&self) {
        self.state.store(STATE_CLOSED, Ordering::Release);
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self, now: Instant) -> FailureOutcome {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_failure.lock().unwrap() = Some(now);

        let prior = self.state.load(Ordering::Acquire);
        // A half-open trial gets exactly one attempt; any failure re-opens
        // immediately regardless of count.
        let opens = prior == STATE_HALF_OPEN || failures >= self.config.failure_threshold;
        if !opens {
            return FailureOutcome {
                failures,
                opened: false,
            };
        }

        let was_open = self.state.swap(STATE_OPEN, Ordering::AcqRel) == STATE_OPEN;
        FailureOutcome {
            failures,
            opened: !was_open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            cooldown_secs: 30,
        }
    }

    fn registry_with(config: BreakerConfig) -> CircuitBreakerRegistry {
        CircuitBreakerRegistry::new([("owm", config)])
    }

    #[test]
    fn test_starts_closed() {
        let reg = registry_with(default_config());
        assert_eq!(reg.state("owm"), Some(CircuitState::Closed));
        assert!(reg.is_eligible("owm", Instant::now()));
    }

    #[test]
    fn test_unknown_provider_never_eligible() {
        let reg = registry_with(default_config());
        assert!(!reg.is_eligible("nope", Instant::now()));
        assert_eq!(reg.state("nope"), None);
        let outcome = reg.record_failure("nope", Instant::now());
        assert!(!outcome.opened);
    }

    #[test]
    fn test_opens_after_threshold_failures() {
        let reg = registry_with(default_config());
        let now = Instant::now();

        let first = reg.record_failure("owm", now);
        assert_eq!(first.failures, 1);
        assert!(!first.opened);
        assert_eq!(reg.state("owm"), Some(CircuitState::Closed));

        reg.record_failure("owm", now);
        assert_eq!(reg.state("owm"), Some(CircuitState::Closed));

        let third = reg.record_failure("owm", now);
        assert_eq!(third.failures, 3);
        assert!(third.opened);
        assert_eq!(reg.state("owm"), Some(CircuitState::Open));
    }

    #[test]
    fn test_open_blocks_within_cooldown() {
        let reg = registry_with(default_config());
        let failed_at = Instant::now();
        for _ in 0..3 {
            reg.record_failure("owm", failed_at);
        }

        assert!(!reg.is_eligible("owm", failed_at));
        assert!(!reg.is_eligible("owm", failed_at + Duration::from_secs(29)));
        // No mutation from rejected checks.
        assert_eq!(reg.state("owm"), Some(CircuitState::Open));
    }

    #[test]
    fn test_half_open_at_cooldown() {
        let reg = registry_with(default_config());
        let failed_at = Instant::now();
        for _ in 0..3 {
            reg.record_failure("owm", failed_at);
        }

        assert!(reg.is_eligible("owm", failed_at + Duration::from_secs(30)));
        assert_eq!(reg.state("owm"), Some(CircuitState::HalfOpen));
    }

    #[test]
    fn test_half_open_success_closes_and_resets() {
        let reg = registry_with(default_config());
        let failed_at = Instant::now();
        for _ in 0..3 {
            reg.record_failure("owm", failed_at);
        }
        assert!(reg.is_eligible("owm", failed_at + Duration::from_secs(31)));

        reg.record_success("owm");
        assert_eq!(reg.state("owm"), Some(CircuitState::Closed));
        assert_eq!(reg.snapshot()[0].2, 0);
    }

    #[test]
    fn test_half_open_failure_reopens_immediately() {
        let reg = registry_with(BreakerConfig {
            failure_threshold: 1,
            cooldown_secs: 30,
        });
        let failed_at = Instant::now();
        reg.record_failure("owm", failed_at);
        assert_eq!(reg.state("owm"), Some(CircuitState::Open));

        assert!(reg.is_eligible("owm", failed_at + Duration::from_secs(30)));
        assert_eq!(reg.state("owm"), Some(CircuitState::HalfOpen));

        let retry_at = failed_at + Duration::from_secs(31);
        let outcome = reg.record_failure("owm", retry_at);
        assert!(outcome.opened);
        assert_eq!(reg.state("owm"), Some(CircuitState::Open));
        // Cooldown restarts from the half-open failure.
        assert!(!reg.is_eligible("owm", retry_at + Duration::from_secs(29)));
        assert!(reg.is_eligible("owm", retry_at + Duration::from_secs(30)));
    }

    #[test]
    fn test_success_resets_count_while_closed() {
        let reg = registry_with(default_config());
        let now = Instant::now();

        reg.record_failure("owm", now);
        reg.record_failure("owm", now);
        reg.record_success("owm");
        reg.record_failure("owm", now);
        reg.record_failure("owm", now);

        // Still closed — the success reset the counter.
        assert_eq!(reg.state("owm"), Some(CircuitState::Closed));
        assert!(reg.is_eligible("owm", now));
    }

    #[test]
    fn test_open_is_reported_once() {
        let reg = registry_with(default_config());
        let now = Instant::now();
        for _ in 0..2 {
            reg.record_failure("owm", now);
        }
        assert!(reg.record_failure("owm", now).opened);
        // Further failures on an already-open circuit do not re-report.
        assert!(!reg.record_failure("owm", now).opened);
    }

    #[test]
    fn test_concurrent_failures_lose_no_increments() {
        const THREADS: usize = 8;
        const FAILURES_PER_THREAD: usize = 250;

        let reg = Arc::new(registry_with(BreakerConfig {
            failure_threshold: u32::MAX,
            cooldown_secs: 30,
        }));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let reg = reg.clone();
                std::thread::spawn(move || {
                    let now = Instant::now();
                    for _ in 0..FAILURES_PER_THREAD {
                        reg.record_failure("owm", now);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let (_, state, failures) = reg.snapshot().remove(0);
        assert_eq!(failures, (THREADS * FAILURES_PER_THREAD) as u32);
        assert_eq!(state, CircuitState::Closed);
    }

    #[test]
    fn test_snapshot_sorted_by_name() {
        let reg = CircuitBreakerRegistry::new([
            ("wttr", default_config()),
            ("owm", default_config()),
        ]);
        let names: Vec<String> = reg.snapshot().into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(names, vec!["owm".to_string(), "wttr".to_string()]);
    }
}
