use crate::application::controller::ControllerSettings;
use crate::domain::sample::HISTORY_CAPACITY;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub commands: CommandSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub startup: StartupSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_poll_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommandSettings {
    #[serde(default = "default_compute_timeout_ms")]
    pub compute_timeout_ms: u64,
    #[serde(default = "default_generate_timeout_ms")]
    pub generate_timeout_ms: u64,
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistorySettings {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StartupSettings {
    #[serde(default = "default_view")]
    pub view: String,
    #[serde(default = "default_auto_stream")]
    pub auto_stream: bool,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_interval_ms() -> u64 {
    200
}

fn default_poll_timeout_ms() -> u64 {
    2500
}

fn default_compute_timeout_ms() -> u64 {
    2000
}

fn default_generate_timeout_ms() -> u64 {
    3000
}

fn default_action_timeout_ms() -> u64 {
    3000
}

fn default_capacity() -> usize {
    HISTORY_CAPACITY
}

fn default_credentials_path() -> String {
    ".pulse-console/credentials.json".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8090".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_view() -> String {
    "dashboard".to_string()
}

fn default_auto_stream() -> bool {
    true
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            compute_timeout_ms: default_compute_timeout_ms(),
            generate_timeout_ms: default_generate_timeout_ms(),
            action_timeout_ms: default_action_timeout_ms(),
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Default for StartupSettings {
    fn default() -> Self {
        Self {
            view: default_view(),
            auto_stream: default_auto_stream(),
        }
    }
}

impl DashboardConfig {
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            stream_period: Duration::from_millis(self.polling.interval_ms),
            poll_timeout: Duration::from_millis(self.polling.timeout_ms),
            compute_timeout: Duration::from_millis(self.commands.compute_timeout_ms),
            generate_timeout: Duration::from_millis(self.commands.generate_timeout_ms),
            action_timeout: self.action_timeout(),
            history_capacity: self.history.capacity,
            auto_stream: self.startup.auto_stream,
        }
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.commands.action_timeout_ms)
    }
}

pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Join the backend base URL and an absolute API path.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://localhost:5000/", "/api/stats"),
            "http://localhost:5000/api/stats"
        );
        assert_eq!(join_url("http://h", "api/data"), "http://h/api/data");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[polling]\ninterval_ms = 500\n\n[startup]\nauto_stream = false\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: DashboardConfig = settings.try_deserialize().unwrap();

        let controller = config.controller_settings();
        assert_eq!(controller.stream_period, Duration::from_millis(500));
        assert_eq!(controller.poll_timeout, Duration::from_millis(2500));
        assert_eq!(controller.history_capacity, 200);
        assert!(!controller.auto_stream);
        assert_eq!(config.backend.base_url, "http://127.0.0.1:5000");
    }
}
