use crate::core::{DataLinkError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub connection: Option<Settings>,
}

impl Config {
    /// Connection settings from the file, or defaults when the section is
    /// absent.
    pub fn settings(&self) -> Settings {
        self.connection.clone().unwrap_or_default()
    }
}

/// Connection defaults applied when the caller does not specify them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Port used when neither the host string nor the port argument carries
    /// one.
    pub default_port: u16,
    /// Character set for server sessions.
    pub charset: String,
    /// Whether `execute` reconnects on a lost connection when the call does
    /// not say otherwise.
    pub reconnect: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_port: 3306,
            charset: "utf8".to_string(),
            reconnect: true,
        }
    }
}

/// Loads configuration from a TOML file at the given path.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| DataLinkError::Config(e.to_string()))?;
    toml::from_str(&content).map_err(|e| DataLinkError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"
[connection]
default_port = 3307
charset = "utf8mb4"
reconnect = false
"#;

    #[test]
    fn test_load_config_from_str() {
        let config: Config = toml::from_str(SAMPLE_CONFIG).expect("Failed to parse sample config");
        let settings = config.settings();
        assert_eq!(settings.default_port, 3307);
        assert_eq!(settings.charset, "utf8mb4");
        assert!(!settings.reconnect);
    }

    #[test]
    fn test_missing_section_falls_back_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        let settings = config.settings();
        assert_eq!(settings.default_port, 3306);
        assert_eq!(settings.charset, "utf8");
        assert!(settings.reconnect);
    }

    #[test]
    fn test_partial_section_keeps_remaining_defaults() {
        let config: Config = toml::from_str("[connection]\nreconnect = false\n").unwrap();
        let settings = config.settings();
        assert!(!settings.reconnect);
        assert_eq!(settings.default_port, 3306);
    }
}
