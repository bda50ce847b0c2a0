//! Bridge Configuration
//!
//! Loads the YAML file that identifies the intersection and the database to write to.
//!
//! ```yaml
//! mysql:
//!   host: db.example.org
//!   user: teller
//!   pass: secret
//!   db: verkeer
//! kruisingscode: 7
//! ```

mod error;

pub use error::ConfigError;

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::protocol::DEFAULT_BAUD_RATE;

/// Default config file name, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Default MySQL TCP port
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Complete bridge configuration, immutable once loaded
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Database connection parameters
    pub mysql: MysqlConfig,

    /// Code of the intersection this controller is installed at
    pub kruisingscode: i64,

    /// Serial line settings
    #[serde(default)]
    pub serial: SerialConfig,
}

/// MySQL connection parameters
#[derive(Clone, Deserialize)]
pub struct MysqlConfig {
    /// Server hostname
    pub host: String,
    /// Login user
    pub user: String,
    /// Login password
    pub pass: String,
    /// Database (schema) name
    pub db: String,
    /// Server port
    #[serde(default = "default_mysql_port")]
    pub port: u16,
}

// Keeps the password out of log lines.
impl std::fmt::Debug for MysqlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MysqlConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("pass", &"***")
            .field("db", &self.db)
            .field("port", &self.port)
            .finish()
    }
}

/// Serial line settings
#[derive(Debug, Clone, Deserialize)]
pub struct SerialConfig {
    /// Device to open instead of the first enumerated port
    #[serde(default)]
    pub port: Option<String>,

    /// Line speed; the controller runs at 115200 8N1
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

fn default_mysql_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

impl BridgeConfig {
    /// Load and validate a config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate config from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("mysql.host", &self.mysql.host),
            ("mysql.user", &self.mysql.user),
            ("mysql.db", &self.mysql.db),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
            }
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid("serial.baud_rate must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "
mysql:
  host: localhost
  user: teller
  pass: geheim
  db: verkeer
kruisingscode: 7
";

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = BridgeConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.kruisingscode, 7);
        assert_eq!(config.mysql.host, "localhost");
        assert_eq!(config.mysql.port, DEFAULT_MYSQL_PORT);
        assert_eq!(config.serial.baud_rate, DEFAULT_BAUD_RATE);
        assert!(config.serial.port.is_none());
    }

    #[test]
    fn test_serial_section() {
        let yaml = format!("{}serial:\n  port: /dev/ttyACM3\n  baud_rate: 9600\n", MINIMAL);
        let config = BridgeConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyACM3"));
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn test_missing_code_is_parse_error() {
        let yaml = "mysql:\n  host: a\n  user: b\n  pass: c\n  db: d\n";
        let err = BridgeConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_non_integer_code_is_parse_error() {
        let yaml = MINIMAL.replace("kruisingscode: 7", "kruisingscode: zeven");
        assert!(matches!(
            BridgeConfig::from_yaml_str(&yaml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_host_rejected() {
        let yaml = MINIMAL.replace("host: localhost", "host: \"\"");
        let err = BridgeConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("mysql.host"));
    }

    #[test]
    fn test_debug_hides_password() {
        let config = BridgeConfig::from_yaml_str(MINIMAL).unwrap();
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("geheim"));
    }

    #[test]
    fn test_missing_file() {
        let err = BridgeConfig::from_file("/nonexistent/kruisteller/config.yml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
