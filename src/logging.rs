use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            loki_enabled: std::env::var("LOKI_ENABLED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            loki_url: std::env::var("LOKI_URL").ok(),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err("LOKI_ENABLED is true but LOKI_URL is not set".to_string());
        }
        Ok(())
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    #[cfg(feature = "loki")]
    if config.loki_enabled {
        if let Some(loki_url) = config.loki_url.as_deref() {
            return init_with_loki(&config.log_level, loki_url);
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

#[cfg(feature = "loki")]
fn init_with_loki(log_level: &str, loki_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = url::Url::parse(loki_url)?;
    let service = std::env::var("SERVICE_NAME").unwrap_or_else(|_| "finfolio".to_string());
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let (loki_layer, task) = tracing_loki::builder()
        .label("service", service)?
        .label("environment", environment)?
        .build_url(url)?;

    // Background task that ships log batches to Loki
    tokio::spawn(task);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_level))
        .with(tracing_subscriber::fmt::layer())
        .with(loki_layer)
        .init();

    tracing::info!("Loki logging initialized");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(loki_enabled: bool, loki_url: Option<&str>) -> LoggingConfig {
        LoggingConfig {
            loki_enabled,
            loki_url: loki_url.map(String::from),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn loki_disabled_needs_no_url() {
        assert!(config(false, None).validate().is_ok());
    }

    #[test]
    fn loki_enabled_without_url_is_rejected() {
        assert!(config(true, None).validate().is_err());
    }

    #[test]
    fn loki_enabled_with_url_is_accepted() {
        assert!(config(true, Some("http://loki:3100")).validate().is_ok());
    }
}
