use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DATABASE_FILE: &str = "prodtrack.sqlite";
const DEFAULT_TIMEZONE: &str = "America/Bogota";

/// Runtime configuration, read from a YAML file. Relative paths are resolved
/// against `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_file: PathBuf,
    pub reports_dir: PathBuf,
    pub log_dir: PathBuf,
    pub session_file: PathBuf,
    pub timezone: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database_file: PathBuf::from(DEFAULT_DATABASE_FILE),
            reports_dir: PathBuf::from("reports"),
            log_dir: PathBuf::from("logs"),
            session_file: PathBuf::from("session.json"),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let config = match path {
            Some(path) => {
                info!(target: "app::config", path = %path.display(), "loading configuration");
                let raw = fs::read_to_string(path)?;
                Self::from_yaml(&raw)?
            }
            None => {
                debug!(target: "app::config", "no configuration file given, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> AppResult<Self> {
        serde_yaml::from_str(raw)
            .map_err(|err| AppError::validation(format!("configuración inválida: {err}")))
    }

    /// Anchors every path at `data_dir`, mainly for tests using a temp dir.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        self.tz()?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.database_file)
    }

    pub fn reports_path(&self) -> PathBuf {
        self.resolve(&self.reports_dir)
    }

    pub fn log_path(&self) -> PathBuf {
        self.resolve(&self.log_dir)
    }

    pub fn session_path(&self) -> PathBuf {
        self.resolve(&self.session_file)
    }

    pub fn tz(&self) -> AppResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| AppError::validation(format!("zona horaria desconocida: {}", self.timezone)))
    }

    /// Calendar date at the plant for the given instant.
    pub fn local_date(&self, now: DateTime<Utc>) -> AppResult<NaiveDate> {
        Ok(now.with_timezone(&self.tz()?).date_naive())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}
