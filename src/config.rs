use std::env;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

const DEFAULT_LOG_FILE: &str = "error_log.txt";

/// Store location and account, as read from the environment.
///
/// Each value stays optional here; a missing one only becomes an error when a
/// connection is actually attempted.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    pub server: Option<String>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Connection settings after every required variable has been checked.
#[derive(Debug, Clone)]
pub struct ResolvedConnection {
    pub path: PathBuf,
    pub user: String,
}

impl ConnectionSettings {
    pub fn resolve(&self) -> AppResult<ResolvedConnection> {
        let server = required("DB_SERVER", &self.server)?;
        let name = required("DB_NAME", &self.name)?;
        let user = required("DB_USER", &self.user)?;
        required("DB_PASSWORD", &self.password)?;

        Ok(ResolvedConnection {
            path: Path::new(server).join(format!("{}.db", name)),
            user: user.to_string(),
        })
    }
}

fn required<'a>(var: &str, value: &'a Option<String>) -> AppResult<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Connection(format!(
            "missing environment variable {}",
            var
        ))),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub connection: ConnectionSettings,
    pub sensitive_user: Option<String>,
    pub sensitive_password: Option<String>,
    pub log_file: PathBuf,
    pub log_level: Option<String>,
}

impl Config {
    /// Load `.env` from the working directory, then read the process environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self {
            connection: ConnectionSettings {
                server: env::var("DB_SERVER").ok(),
                name: env::var("DB_NAME").ok(),
                user: env::var("DB_USER").ok(),
                password: env::var("DB_PASSWORD").ok(),
            },
            sensitive_user: env::var("SEN_USER").ok(),
            sensitive_password: env::var("SEN_PASSWORD").ok(),
            log_file: env::var("ROSTER_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE)),
            log_level: env::var("ROSTER_LOG_LEVEL").ok(),
        }
    }

    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        if let Some(p) = path {
            self.log_file = p;
        }
        self
    }
}
