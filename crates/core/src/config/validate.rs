use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Store url/token are non-empty when a store is configured
/// - Source timeout is not 0
/// - Compat server entries carry a name and url
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if let Some(store) = &config.store {
        if store.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "store.url cannot be empty".to_string(),
            ));
        }
        if store.token.is_empty() {
            return Err(ConfigError::ValidationError(
                "store.token cannot be empty".to_string(),
            ));
        }
    }

    if config.sources.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "sources.timeout_ms cannot be 0".to_string(),
        ));
    }

    for server in &config.sources.compat_servers {
        if server.name.is_empty() || server.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "sources.compat_servers entries need a name and url".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompatServerConfig, StoreConfig};

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_store_requires_token() {
        let mut config = Config::default();
        config.store = Some(StoreConfig {
            url: "https://kv.example.com".to_string(),
            token: String::new(),
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_compat_server_needs_url() {
        let mut config = Config::default();
        config.sources.compat_servers.push(CompatServerConfig {
            name: "other".to_string(),
            url: String::new(),
            token: None,
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = Config::default();
        config.sources.timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }
}
