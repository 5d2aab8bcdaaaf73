use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Empty string disables the cache entirely; reads then go straight to Postgres.
    pub redis_url: String,
    /// Empty string disables the event bus; write paths then use their direct fallbacks.
    pub kafka_brokers: String,
    pub kafka_group_prefix: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Run the four consumers inside the API process instead of a separate worker binary.
    pub workers_inline: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let kafka_brokers = env::var("KAFKA_BROKERS").unwrap_or_default();
        let kafka_group_prefix =
            env::var("KAFKA_GROUP_PREFIX").unwrap_or_else(|_| "clipfeed".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let jwt_secret =
            env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-in-env".into());
        let workers_inline = env::var("WORKERS_INLINE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self {
            database_url,
            redis_url,
            kafka_brokers,
            kafka_group_prefix,
            port,
            jwt_secret,
            workers_inline,
        })
    }

    pub fn bus_enabled(&self) -> bool {
        !self.kafka_brokers.trim().is_empty()
    }

    pub fn cache_enabled(&self) -> bool {
        !self.redis_url.trim().is_empty()
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/clipfeed_test".into(),
            redis_url: "redis://127.0.0.1:6379/0".into(),
            kafka_brokers: String::new(),
            kafka_group_prefix: "clipfeed".into(),
            port: 8080,
            jwt_secret: "test-secret".into(),
            workers_inline: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_disabled_on_empty_brokers() {
        let cfg = Config::test_defaults();
        assert!(!cfg.bus_enabled());
        assert!(cfg.cache_enabled());
    }
}
