use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ADDRESS: &str = "0.0.0.0:6999";
pub const DEFAULT_RETRIES: u8 = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn with_defaults() -> Self {
        Self {
            address: Some(DEFAULT_ADDRESS.to_string()),
            payload: Some(PathBuf::from("payload.bin")),
            retries: Some(DEFAULT_RETRIES),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    pub fn merge_cli(
        mut self,
        address: Option<String>,
        payload: Option<PathBuf>,
        retries: Option<u8>,
        timeout: Option<u64>,
    ) -> Self {
        // CLI arguments override config file values
        self.address = address.or(self.address);
        self.payload = payload.or(self.payload);
        self.retries = retries.or(self.retries);
        self.timeout = timeout.map(Duration::from_secs).or(self.timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_cli_overrides_file_values() {
        let config = Config {
            address: Some("127.0.0.1:6999".to_string()),
            payload: Some(PathBuf::from("from_file.bin")),
            retries: Some(5),
            timeout: Some(Duration::from_secs(2)),
        };

        let merged = config.merge_cli(Some("0.0.0.0:7000".to_string()), None, None, Some(1));

        assert_eq!(merged.address.as_deref(), Some("0.0.0.0:7000"));
        assert_eq!(merged.payload, Some(PathBuf::from("from_file.bin")));
        assert_eq!(merged.retries, Some(5));
        assert_eq!(merged.timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_timeout_parses_humantime() {
        let config: Config = toml::from_str("timeout = \"6s\"\n").unwrap();

        assert_eq!(config.timeout, Some(Duration::from_secs(6)));
    }
}
