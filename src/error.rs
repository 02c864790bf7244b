use std::fmt;

#[derive(Debug)]
#[allow(dead_code)]
pub enum ProxyError {
    MissingCity,
    ProviderUnreachable(String),
    ProviderUnhealthy(u16),
    CircuitOpen(String),
    AllProvidersFailed,
    InvalidPayload(String),
    Config(String),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::MissingCity => write!(f, "missing ?city= parameter"),
            ProxyError::ProviderUnreachable(msg) => write!(f, "provider unreachable: {}", msg),
            ProxyError::ProviderUnhealthy(status) => {
                write!(f, "provider returned status {}", status)
            }
            ProxyError::CircuitOpen(name) => write!(f, "circuit open for {}", name),
            ProxyError::AllProvidersFailed => write!(f, "all providers failed"),
            ProxyError::InvalidPayload(msg) => write!(f, "invalid provider payload: {}", msg),
            ProxyError::Config(msg) => write!(f, "config error: {}", msg),
        }
    }
}

impl std::error::Error for ProxyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_city() {
        assert_eq!(
            ProxyError::MissingCity.to_string(),
            "missing ?city= parameter"
        );
    }

    #[test]
    fn display_provider_unreachable() {
        assert_eq!(
            ProxyError::ProviderUnreachable("conn refused".to_string()).to_string(),
            "provider unreachable: conn refused"
        );
    }

    #[test]
    fn display_provider_unhealthy() {
        assert_eq!(
            ProxyError::ProviderUnhealthy(503).to_string(),
            "provider returned status 503"
        );
    }

    #[test]
    fn display_circuit_open() {
        assert_eq!(
            ProxyError::CircuitOpen("wttr".to_string()).to_string(),
            "circuit open for wttr"
        );
    }

    #[test]
    fn display_all_providers_failed() {
        assert_eq!(
            ProxyError::AllProvidersFailed.to_string(),
            "all providers failed"
        );
    }

    #[test]
    fn display_invalid_payload() {
        assert_eq!(
            ProxyError::InvalidPayload("not json".to_string()).to_string(),
            "invalid provider payload: not json"
        );
    }

    #[test]
    fn display_config() {
        assert_eq!(
            ProxyError::Config("bad toml".to_string()).to_string(),
            "config error: bad toml"
        );
    }
}
