use serde::{Deserialize, Serialize};

/// Top-level proxy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub redis: RedisConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

/// Coordinates of the status bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Pub/sub channel carrying freeform status events.
    #[serde(default = "default_status_channel")]
    pub status_channel: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            status_channel: default_status_channel(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_status_channel() -> String {
    "status_channel".to_string()
}

/// Upstream provider set and the policies applied to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Per-call timeout for outbound provider requests (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Breaker settings applied to providers without their own override.
    #[serde(default)]
    pub breaker: BreakerConfig,

    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            breaker: BreakerConfig::default(),
            providers: default_providers(),
        }
    }
}

fn default_request_timeout() -> u64 {
    5
}

/// Circuit breaker tuning. Per-provider overrides are allowed so one flaky
/// upstream can get a longer cooldown without touching the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// How long an open circuit blocks calls before a half-open trial (seconds).
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_secs() -> u64 {
    30
}

/// One upstream weather provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,

    /// Lower values are tried first.
    #[serde(default)]
    pub priority: u32,

    /// Administratively disabled providers are skipped entirely and never
    /// participate in circuit transitions.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Request URL template with a `{city}` placeholder and, for keyed
    /// providers, an `{api_key}` placeholder.
    pub url_template: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Overrides the global breaker settings for this provider.
    #[serde(default)]
    pub breaker: Option<BreakerConfig>,
}

fn default_true() -> bool {
    true
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: "openweathermap".to_string(),
            priority: 0,
            enabled: true,
            url_template:
                "https://api.openweathermap.org/data/2.5/weather?q={city}&appid={api_key}"
                    .to_string(),
            api_key: None,
            breaker: None,
        },
        ProviderConfig {
            name: "wttr".to_string(),
            priority: 1,
            enabled: true,
            url_template: "https://wttr.in/{city}?format=j1".to_string(),
            api_key: None,
            breaker: None,
        },
    ]
}
