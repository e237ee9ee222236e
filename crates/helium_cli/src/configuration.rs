//! CLI settings, layered from `configuration/*.yaml` and `HELIUM__*` env vars.

use config::{Config, ConfigError, Environment as EnvSource, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENVIRONMENT_VAR: &str = "HELIUM_ENVIRONMENT";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub stats: StatsSettings,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; relative paths resolve against the working directory.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    /// Falls back to the build-mode default when unset.
    pub level: Option<String>,
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct StatsSettings {
    /// Trailing window of the sent-out series, in days.
    pub window_days: u32,
}

/// Deployment environment selecting the overlay file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "`{other}` is not a supported environment; use `local` or `production`"
            )),
        }
    }
}

/// Loads `base.yaml`, the optional environment overlay, then env overrides
/// such as `HELIUM__DATABASE__PATH`.
pub fn get_configuration(base_dir: &Path) -> Result<Settings, ConfigError> {
    let configuration_dir = base_dir.join("configuration");
    let environment: Environment = std::env::var(ENVIRONMENT_VAR)
        .unwrap_or_else(|_| "local".to_string())
        .try_into()
        .map_err(ConfigError::Message)?;

    let settings = Config::builder()
        .add_source(File::from(configuration_dir.join("base.yaml")))
        .add_source(
            File::from(configuration_dir.join(format!("{}.yaml", environment.as_str())))
                .required(false),
        )
        .add_source(
            EnvSource::with_prefix("HELIUM")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

impl Settings {
    /// Makes database and log paths absolute relative to `base_dir`.
    pub fn resolve_paths(mut self, base_dir: &Path) -> Self {
        if self.database.path.is_relative() {
            self.database.path = base_dir.join(&self.database.path);
        }
        if self.logging.dir.is_relative() {
            self.logging.dir = base_dir.join(&self.logging.dir);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{get_configuration, Environment};
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn environment_parsing_is_case_insensitive() {
        assert_eq!(
            Environment::try_from("Production".to_string()),
            Ok(Environment::Production)
        );
        assert!(Environment::try_from("staging".to_string()).is_err());
    }

    #[test]
    fn layers_apply_base_then_environment_file_then_env_vars() {
        let dir = tempfile::tempdir().unwrap();
        let configuration_dir = dir.path().join("configuration");
        fs::create_dir(&configuration_dir).unwrap();
        fs::write(
            configuration_dir.join("base.yaml"),
            "database:\n  path: var/base.db\nlogging:\n  dir: var/log\nstats:\n  window_days: 7\n",
        )
        .unwrap();
        fs::write(
            configuration_dir.join("local.yaml"),
            "database:\n  path: var/local.db\n",
        )
        .unwrap();

        std::env::remove_var("HELIUM_ENVIRONMENT");
        std::env::set_var("HELIUM__STATS__WINDOW_DAYS", "30");
        let loaded = get_configuration(dir.path());
        std::env::remove_var("HELIUM__STATS__WINDOW_DAYS");
        let settings = loaded.unwrap();

        assert_eq!(settings.database.path, PathBuf::from("var/local.db"));
        assert_eq!(settings.logging.dir, PathBuf::from("var/log"));
        assert_eq!(settings.logging.level, None);
        assert_eq!(settings.stats.window_days, 30);

        let resolved = settings.resolve_paths(dir.path());
        assert_eq!(resolved.database.path, dir.path().join("var/local.db"));
    }
}
