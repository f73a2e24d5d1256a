//! Configuration and paths

use std::path::PathBuf;

/// All configurable paths and constants
#[derive(Debug, Clone)]
pub struct Config {
    pub home: PathBuf,
    /// Default contacts CSV, used when no path is given at the prompt.
    pub contacts_path: PathBuf,
    /// Default message template file.
    pub template_path: PathBuf,
    /// Credential store of the external protocol client.
    pub data_dir: PathBuf,
    /// External protocol-client executable (connect/check/send bridge).
    pub bridge_cli: PathBuf,
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().expect("Could not find home directory");

        Self {
            contacts_path: PathBuf::from("sample/numbers.csv"),
            template_path: PathBuf::from("sample/message.txt"),
            data_dir: home.join(".local/share/whatsapp-broadcast"),
            bridge_cli: PathBuf::from("wa-bridge"),
            home,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create config for testing with custom paths
    pub fn for_test(temp_dir: &std::path::Path) -> Self {
        Self {
            home: temp_dir.to_path_buf(),
            contacts_path: temp_dir.join("numbers.csv"),
            template_path: temp_dir.join("message.txt"),
            data_dir: temp_dir.join("whatsapp-data"),
            bridge_cli: temp_dir.join("wa-bridge"),
            connect_timeout_secs: 1,
        }
    }
}

/// How long to wait for the connection-established event after connect
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.contacts_path.to_string_lossy().contains("numbers.csv"));
        assert_eq!(config.connect_timeout_secs, CONNECT_TIMEOUT_SECS);
    }

    #[test]
    fn test_test_config() {
        let temp = std::env::temp_dir();
        let config = Config::for_test(&temp);
        assert_eq!(config.home, temp);
        assert!(config.data_dir.starts_with(&temp));
    }

    #[test]
    fn test_connect_timeout() {
        assert_eq!(CONNECT_TIMEOUT_SECS, 10);
    }
}
