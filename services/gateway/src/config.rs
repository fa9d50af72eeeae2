use serde::Deserialize;
use sift_pipeline::KafkaConfig;

/// Main configuration for the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Deployment environment (local, production)
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Auth service upstream
    pub auth: UpstreamConfig,
    /// Storage service upstream
    pub storage: UpstreamConfig,
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

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    /// Budget for reading a request, in seconds
    #[serde(default = "default_io_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Budget for producing a response, in seconds; doubles as the overall
    /// per-request timeout
    #[serde(default = "default_io_timeout_secs")]
    pub write_timeout_secs: u64,
    /// Drain window for in-flight requests on shutdown, in seconds
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

/// Address and deadline for an upstream gRPC service
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// e.g. "http://auth:50051"
    pub service_address: String,
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_env() -> String {
    "local".to_string()
}

fn default_service_name() -> String {
    "sift-gateway".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9092
}

fn default_http_port() -> u16 {
    8080
}

fn default_io_timeout_secs() -> u64 {
    10
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

fn default_upstream_timeout_secs() -> u64 {
    5
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

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            read_timeout_secs: default_io_timeout_secs(),
            write_timeout_secs: default_io_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
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
                .add_source(config::File::with_name("config/gateway").required(false))
                .add_source(config::File::with_name("/etc/sift/gateway").required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("GATEWAY")
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
    fn test_http_defaults() {
        let http = HttpConfig::default();
        assert_eq!(http.port, 8080);
        assert_eq!(http.shutdown_timeout_secs, 5);
    }

    #[test]
    fn test_minimal_config_deserializes() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
auth:
  service_address: http://localhost:50051
  timeout_secs: 2
storage:
  service_address: http://localhost:50052
"#,
                config::FileFormat::Yaml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.env, "local");
        assert_eq!(config.auth.timeout_secs, 2);
        assert_eq!(config.storage.timeout_secs, 5);
        assert_eq!(config.kafka.topics.text, "content.text");
    }
}
