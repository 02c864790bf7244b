pub mod types;


pub use types::*;

use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;

impl ProxyConfig {
    /// Load configuration from a file (if it exists) and apply environment
    /// variable overrides for deployment settings. When the file does not
    /// exist, built-in defaults are used — allowing the proxy to start with
    /// zero configuration for local development.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: ProxyConfig = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => toml::from_str(&content)?,
                Some("json") => serde_json::from_str(&content)?,
                Some(ext) => anyhow::bail!("unsupported config format: .{ext}, use .toml or .json"),
                None => anyhow::bail!("config file has no extension, use .toml or .json"),
            }
        } else {
            tracing::info!("config file not found at {}, using defaults", path.display());
            ProxyConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        for provider in &config.upstream.providers {
            if provider.url_template.contains("{api_key}") && provider.api_key.is_none() {
                tracing::warn!(
                    "config: provider has no api key, its calls will fail until one is supplied, provider={}",
                    provider.name
                );
            }
        }

        tracing::info!(
            providers = config.upstream.providers.len(),
            enabled = config.enabled_provider_count(),
            "loaded proxy configuration"
        );
        Ok(config)
    }

    /// Apply environment variable overrides for connection settings and
    /// credentials. The provider list itself is managed via config files —
    /// not environment variables.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VANE_REDIS_URL") {
            self.redis.url = v;
        }
        if let Ok(v) = std::env::var("VANE_STATUS_CHANNEL") {
            self.redis.status_channel = v;
        }
        // The openweathermap credential is injected at deployment time.
        if let Ok(v) = std::env::var("OPENWEATHER_API_KEY") {
            if let Some(p) = self
                .upstream
                .providers
                .iter_mut()
                .find(|p| p.name == "openweathermap")
            {
                p.api_key = Some(v);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.upstream.providers.is_empty() {
            anyhow::bail!("no providers configured");
        }
        if self.upstream.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be at least 1");
        }
        if self.upstream.breaker.failure_threshold == 0 {
            anyhow::bail!("breaker failure_threshold must be at least 1");
        }

        let mut names: HashSet<&str> = HashSet::new();
        for provider in &self.upstream.providers {
            if provider.name.is_empty() {
                anyhow::bail!("provider with empty name");
            }
            if !names.insert(provider.name.as_str()) {
                anyhow::bail!("duplicate provider name '{}'", provider.name);
            }
            if !provider.url_template.contains("{city}") {
                anyhow::bail!(
                    "provider '{}' url_template has no {{city}} placeholder",
                    provider.name
                );
            }
            if let Some(ref breaker) = provider.breaker {
                if breaker.failure_threshold == 0 {
                    anyhow::bail!(
                        "provider '{}' breaker failure_threshold must be at least 1",
                        provider.name
                    );
                }
            }
        }
        Ok(())
    }

    pub fn enabled_provider_count(&self) -> usize {
        self.upstream.providers.iter().filter(|p| p.enabled).count()
    }
}
