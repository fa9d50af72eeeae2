use serde::Deserialize;
use sift_pipeline::KafkaConfig;

/// Main configuration for the text analyzer
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_service_name() -> String {
    "sift-text-analyzer".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9093
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from `CONFIG_PATH`, well-known files and environment
    pub fn load() -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Ok(path) = std::env::var("CONFIG_PATH") {
            builder = builder.add_source(config::File::with_name(&path));
        } else {
            builder = builder
                .add_source(config::File::with_name("config/text-analyzer").required(false))
                .add_source(config::File::with_name("/etc/sift/text-analyzer").required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("TEXT_ANALYZER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.kafka.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let service = ServiceConfig::default();
        assert_eq!(service.name, "sift-text-analyzer");
        assert_eq!(service.log_level, "info");
    }
}
