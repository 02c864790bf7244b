use crate::config::{BreakerConfig, ProviderConfig};

/// A configured upstream weather provider.
///
/// Immutable for the process lifetime; the fallback engine iterates the
/// chain in ascending `priority` order.
#[derive(Debug, Clone)]
pub struct Provider {
    pub name: String,
    pub priority: u32,
    pub enabled: bool,
    pub breaker: BreakerConfig,
    url_template: String,
    api_key: Option<String>,
}

impl Provider {
    pub fn from_config(config: &ProviderConfig, default_breaker: &BreakerConfig) -> Self {
        Self {
            name: config.name.clone(),
            priority: config.priority,
            enabled: config.enabled,
            breaker: config
                .breaker
                .clone()
                .unwrap_or_else(|| default_breaker.clone()),
            url_template: config.url_template.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Build the request URL for `city`, a pure function of the request key.
    ///
    /// A missing api key renders the placeholder empty; the provider then
    /// fails its calls and the breaker isolates it.
    pub fn endpoint(&self, city: &str) -> String {
        self.url_template
            .replace("{city}", city)
            .replace("{api_key}", self.api_key.as_deref().unwrap_or(""))
    }
}

/// Providers sorted by priority, ready for fallback iteration.
pub fn build_chain(configs: &[ProviderConfig], default_breaker: &BreakerConfig) -> Vec<Provider> {
    let mut chain: Vec<Provider> = configs
        .iter()
        .map(|config| Provider::from_config(config, default_breaker))
        .collect();
    chain.sort_by_key(|provider| provider.priority);
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_config(name: &str, priority: u32, template: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            priority,
            enabled: true,
            url_template: template.to_string(),
            api_key: None,
            breaker: None,
        }
    }

    #[test]
    fn test_endpoint_substitutes_city() {
        let config = provider_config("wttr", 1, "https://wttr.in/{city}?format=j1");
        let provider = Provider::from_config(&config, &BreakerConfig::default());
        assert_eq!(
            provider.endpoint("London"),
            "https://wttr.in/London?format=j1"
        );
    }

    #[test]
    fn test_endpoint_substitutes_api_key() {
        let mut config = provider_config("owm", 0, "https://api.example.com/?q={city}&appid={api_key}");
        config.api_key = Some("secret".to_string());
        let provider = Provider::from_config(&config, &BreakerConfig::default());
        assert_eq!(
            provider.endpoint("Paris"),
            "https://api.example.com/?q=Paris&appid=secret"
        );
    }

    #[test]
    fn test_endpoint_missing_key_renders_empty() {
        let config = provider_config("owm", 0, "https://api.example.com/?q={city}&appid={api_key}");
        let provider = Provider::from_config(&config, &BreakerConfig::default());
        assert_eq!(
            provider.endpoint("Paris"),
            "https://api.example.com/?q=Paris&appid="
        );
    }

    #[test]
    fn test_chain_sorted_by_priority() {
        let configs = vec![
            provider_config("b", 5, "http://b/{city}"),
            provider_config("a", 1, "http://a/{city}"),
            provider_config("c", 9, "http://c/{city}"),
        ];
        let chain = build_chain(&configs, &BreakerConfig::default());
        let names: Vec<&str> = chain.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_breaker_override_applies() {
        let mut config = provider_config("a", 0, "http://a/{city}");
        config.breaker = Some(BreakerConfig {
            failure_threshold: 7,
            cooldown_secs: 120,
        });
        let default_breaker = BreakerConfig::default();
        let provider = Provider::from_config(&config, &default_breaker);
        assert_eq!(provider.breaker.failure_threshold, 7);
        assert_eq!(provider.breaker.cooldown_secs, 120);

        let plain = Provider::from_config(
            &provider_config("b", 1, "http://b/{city}"),
            &default_breaker,
        );
        assert_eq!(plain.breaker.failure_threshold, 3);
    }
}
