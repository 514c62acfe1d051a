use core::fmt::{Debug, Display};
use core::time::Duration;
use std::net::SocketAddr;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "campus-events.toml";
pub const ENV_PREFIX: &str = "CAMPUS_EVENTS_";

/// Which implementation sits behind the front end's data-access interface.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    #[default]
    Http,
    Memory,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub mode: ApiMode,
    pub timeout_ms: u64,
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            mode: ApiMode::Http,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct UiConfig {
    /// How long the registration success message stays before going back to the event list.
    pub redirect_delay_ms: u64,
    /// How long success and error messages of a form stay visible.
    pub message_duration_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            redirect_delay_ms: 1200,
            message_duration_ms: 3000,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ListenConfig {
    pub listen: SocketAddr,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FeedbackConfig {
    /// Only students with a check-in for the event may leave feedback.
    pub require_attendance: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            require_attendance: true,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Only the backend needs a database.
    #[serde(default)]
    pub database_url: Option<String>,
    pub backend: ListenConfig,
    pub frontend: ListenConfig,
    pub api: ApiConfig,
    pub ui: UiConfig,
    pub feedback: FeedbackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            backend: ListenConfig {
                listen: SocketAddr::from(([0, 0, 0, 0], 8000)),
            },
            frontend: ListenConfig {
                listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            },
            api: ApiConfig::default(),
            ui: UiConfig::default(),
            feedback: FeedbackConfig::default(),
        }
    }
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] Box<figment::Error>),
    #[error("no database_url configured, set CAMPUS_EVENTS_DATABASE_URL")]
    MissingDatabaseUrl,
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Figment(Box::new(value))
    }
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Config {
    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

#[must_use]
pub fn figment() -> Figment {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(CONFIG_FILE))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn get_config() -> Result<Config, ConfigError> {
    Ok(figment().extract()?)
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_without_any_source() {
        Jail::expect_with(|_jail| {
            let config = get_config().map_err(|error| error.to_string())?;
            assert_eq!(config, Config::default());
            assert_eq!(config.api.timeout(), Duration::from_secs(10));
            assert!(config.database_url().is_err());
            Ok(())
        });
    }

    #[test]
    fn file_and_env_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                database_url = "postgres://postgres@localhost/campus"

                [api]
                mode = "memory"
                timeout_ms = 2500
                "#,
            )?;
            jail.set_env("CAMPUS_EVENTS_UI__REDIRECT_DELAY_MS", "500");
            jail.set_env("CAMPUS_EVENTS_FEEDBACK__REQUIRE_ATTENDANCE", "false");
            let config = get_config().map_err(|error| error.to_string())?;
            assert_eq!(config.api.mode, ApiMode::Memory);
            assert_eq!(config.api.timeout_ms, 2500);
            assert_eq!(config.api.base_url, ApiConfig::default().base_url);
            assert_eq!(config.ui.redirect_delay_ms, 500);
            assert!(!config.feedback.require_attendance);
            assert_eq!(
                config.database_url().map_err(|error| error.to_string())?,
                "postgres://postgres@localhost/campus"
            );
            Ok(())
        });
    }
}
