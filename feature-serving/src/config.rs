use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;
use once_cell::sync::Lazy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexBool(pub bool);

impl FromStr for FlexBool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(FlexBool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(FlexBool(false)),
            _ => Err(format!("Invalid boolean value: {}", s)),
        }
    }
}

impl From<FlexBool> for bool {
    fn from(flex: FlexBool) -> Self {
        flex.0
    }
}

impl Deref for FlexBool {
    type Target = bool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    /// One URL for a single node, or a comma-separated list of cluster nodes.
    #[envconfig(from = "REDIS_URL", default = "redis://localhost:6379/")]
    pub redis_url: String,

    #[envconfig(from = "REDIS_CLUSTER_MODE", default = "false")]
    pub redis_cluster_mode: FlexBool,

    #[envconfig(from = "REDIS_RESPONSE_TIMEOUT_MS", default = "100")]
    pub redis_response_timeout_ms: u64,

    #[envconfig(from = "REDIS_CONNECTION_TIMEOUT_MS", default = "5000")]
    pub redis_connection_timeout_ms: u64,

    /// Deadline for a whole retrieval request; 0 disables it.
    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "1000")]
    pub request_timeout_ms: u64,

    #[envconfig(from = "DEFAULT_PROJECT", default = "default")]
    pub default_project: String,

    #[envconfig(from = "FEATURE_SETS_PATH", default = "feature_sets.json")]
    pub feature_sets_path: String,

    #[envconfig(from = "DEBUG", default = "false")]
    pub debug: FlexBool,
}

impl Config {
    pub fn default_test_config() -> Self {
        Self {
            redis_url: "redis://localhost:6379/".to_string(),
            redis_cluster_mode: FlexBool(false),
            redis_response_timeout_ms: 100,
            redis_connection_timeout_ms: 5000,
            request_timeout_ms: 1000,
            default_project: "default".to_string(),
            feature_sets_path: "feature_sets.json".to_string(),
            debug: FlexBool(false),
        }
    }

    pub fn redis_nodes(&self) -> Vec<String> {
        self.redis_url
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn redis_response_timeout(&self) -> Option<Duration> {
        millis(self.redis_response_timeout_ms)
    }

    pub fn redis_connection_timeout(&self) -> Option<Duration> {
        millis(self.redis_connection_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        millis(self.request_timeout_ms)
    }
}

// 0 means no timeout
fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

pub static DEFAULT_TEST_CONFIG: Lazy<Config> = Lazy::new(Config::default_test_config);
