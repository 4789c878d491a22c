use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub io_timeout: Duration,
    pub env_name: String,
    pub env_params: serde_json::Value,
    pub seed: Option<u64>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: gymwire::DEFAULT_HOST.to_string(),
            port: gymwire::DEFAULT_PORT,
            io_timeout: Duration::from_millis(gymwire::DEFAULT_TIMEOUT_MS),
            env_name: "CartPole-v1".to_string(),
            env_params: serde_json::Value::Object(Default::default()),
            seed: None,
        }
    }
}
