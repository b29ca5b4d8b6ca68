// Status domain models - Connectivity, health and environment mode payloads
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub last_check: String,
}

/// Health check reply of an auxiliary service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Test,
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Test => "test",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Mode::Test),
            "production" | "prod" => Ok(Mode::Production),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Server-confirmed environment mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeInfo {
    pub mode: Mode,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("Production".parse::<Mode>(), Ok(Mode::Production));
        assert_eq!("test".parse::<Mode>(), Ok(Mode::Test));
        assert!("staging".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_info_wire_format() {
        let info: ModeInfo =
            serde_json::from_str(r#"{"mode":"production","message":"switched"}"#).unwrap();
        assert_eq!(info.mode, Mode::Production);
        assert_eq!(info.updated_at, None);
    }
}
