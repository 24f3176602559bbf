use crate::{ConfigError, FromEnv};

/// Redis connection settings for the stream transport
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl FromEnv for RedisConfig {
    /// Reads `REDIS_URL`, falling back to `REDIS_HOST`. One of them is required.
    ///
    /// A bare host (no scheme) is expanded to `redis://<host>:6379`.
    fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("REDIS_URL")
            .or_else(|_| std::env::var("REDIS_HOST"))
            .map_err(|_| ConfigError::MissingEnvVar("REDIS_URL or REDIS_HOST".to_string()))?;

        let url = if raw.contains("://") {
            raw
        } else {
            format!("redis://{}:6379", raw)
        };

        Ok(Self { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_from_url() {
        temp_env::with_vars(
            [
                ("REDIS_URL", Some("redis://cache:6380")),
                ("REDIS_HOST", None),
            ],
            || {
                let config = RedisConfig::from_env().unwrap();
                assert_eq!(config.url, "redis://cache:6380");
            },
        );
    }

    #[test]
    fn test_redis_config_bare_host() {
        temp_env::with_vars(
            [("REDIS_URL", None), ("REDIS_HOST", Some("localhost"))],
            || {
                let config = RedisConfig::from_env().unwrap();
                assert_eq!(config.url, "redis://localhost:6379");
            },
        );
    }

    #[test]
    fn test_redis_config_missing() {
        temp_env::with_vars_unset(["REDIS_URL", "REDIS_HOST"], || {
            let err = RedisConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("REDIS_URL"));
            assert!(err.to_string().contains("required"));
        });
    }
}
