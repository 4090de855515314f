use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use services::StoreDeadline;
use study_core::model::UserId;

pub const ENV_DB_URL: &str = "STUDY_DB_URL";
pub const ENV_USER_ID: &str = "STUDY_USER_ID";
pub const ENV_STORE_TIMEOUT_MS: &str = "STUDY_STORE_TIMEOUT_MS";

const DEFAULT_DB_URL: &str = "sqlite://study.sqlite3";

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingValue { flag: &'static str },
    UnknownFlag(String),
    InvalidUserId { raw: String },
    InvalidTimeout { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ConfigError::UnknownFlag(arg) => write!(f, "unknown flag: {arg}"),
            ConfigError::InvalidUserId { raw } => write!(f, "invalid user id (expected uuid): {raw}"),
            ConfigError::InvalidTimeout { raw } => {
                write!(f, "invalid store timeout (expected milliseconds > 0): {raw}")
            }
            ConfigError::InvalidDbUrl { raw } => write!(f, "invalid database url: {raw}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime settings resolved from the environment, then command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: String,
    pub user_id: Option<UserId>,
    pub store_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_owned(),
            user_id: None,
            store_timeout: StoreDeadline::DEFAULT,
        }
    }
}

impl AppConfig {
    /// Read settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, defaulting anything unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a value is set but unusable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_DB_URL) {
            config.set_db_url(raw)?;
        }
        if let Some(raw) = lookup(ENV_USER_ID) {
            config.set_user_id(&raw)?;
        }
        if let Some(raw) = lookup(ENV_STORE_TIMEOUT_MS) {
            config.set_timeout(&raw)?;
        }
        Ok(config)
    }

    /// Apply `--db`, `--user` and `--timeout-ms` flags, returning the
    /// remaining positional arguments in order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unknown flags, missing or invalid values.
    pub fn apply_args(
        &mut self,
        args: impl IntoIterator<Item = String>,
    ) -> Result<Vec<String>, ConfigError> {
        let mut args = args.into_iter();
        let mut positional = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    self.set_db_url(value)?;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    self.set_user_id(&value)?;
                }
                "--timeout-ms" => {
                    let value = require_value(&mut args, "--timeout-ms")?;
                    self.set_timeout(&value)?;
                }
                flag if flag.starts_with("--") => return Err(ConfigError::UnknownFlag(arg)),
                _ => positional.push(arg),
            }
        }
        Ok(positional)
    }

    #[must_use]
    pub fn deadline(&self) -> StoreDeadline {
        StoreDeadline::new(self.store_timeout)
    }

    fn set_db_url(&mut self, raw: String) -> Result<(), ConfigError> {
        if raw.trim().is_empty() {
            return Err(ConfigError::InvalidDbUrl { raw });
        }
        self.db_url = normalize_sqlite_url(&raw);
        Ok(())
    }

    fn set_user_id(&mut self, raw: &str) -> Result<(), ConfigError> {
        let user = raw.parse::<UserId>().map_err(|_| ConfigError::InvalidUserId {
            raw: raw.to_owned(),
        })?;
        self.user_id = Some(user);
        Ok(())
    }

    fn set_timeout(&mut self, raw: &str) -> Result<(), ConfigError> {
        let millis = raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| ConfigError::InvalidTimeout {
                raw: raw.to_owned(),
            })?;
        self.store_timeout = Duration::from_millis(millis);
        Ok(())
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ConfigError> {
    args.next().ok_or(ConfigError::MissingValue { flag })
}

/// Turn a bare path or `sqlite:` URL into an absolute `sqlite://` URL.
/// In-memory URLs pass through untouched.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("sqlite::memory:")
        || trimmed.starts_with("sqlite://")
        || trimmed.starts_with("sqlite:file:")
    {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the database file and its parent directory exist.
///
/// # Errors
///
/// Returns an error if the URL carries no path or the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        // memory and shared-cache URLs need no file
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ConfigError::InvalidDbUrl {
            raw: db_url.to_owned(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.db_url, DEFAULT_DB_URL);
        assert_eq!(config.user_id, None);
        assert_eq!(config.store_timeout, Duration::from_secs(10));
    }

    #[test]
    fn env_values_are_parsed() {
        let user = UserId::random();
        let config = AppConfig::from_lookup(|key| match key {
            ENV_DB_URL => Some("sqlite::memory:".into()),
            ENV_USER_ID => Some(user.to_string()),
            ENV_STORE_TIMEOUT_MS => Some("2500".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.db_url, "sqlite::memory:");
        assert_eq!(config.user_id, Some(user));
        assert_eq!(config.deadline().limit(), Duration::from_millis(2500));
    }

    #[test]
    fn invalid_env_values_are_reported() {
        let err = AppConfig::from_lookup(|key| (key == ENV_STORE_TIMEOUT_MS).then(|| "0".into()))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout { raw: "0".into() });

        let err = AppConfig::from_lookup(|key| (key == ENV_USER_ID).then(|| "bob".into()))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid user id (expected uuid): bob");
    }

    #[test]
    fn flags_override_env_and_leave_positionals() {
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        let user = UserId::random();
        let user_arg = user.to_string();
        let rest = config
            .apply_args(
                [
                    "7",
                    "--user",
                    user_arg.as_str(),
                    "--timeout-ms",
                    "300",
                    "0=1;1=0,2",
                ]
                .map(String::from),
            )
            .unwrap();

        assert_eq!(rest, vec!["7".to_string(), "0=1;1=0,2".to_string()]);
        assert_eq!(config.user_id, Some(user));
        assert_eq!(config.store_timeout, Duration::from_millis(300));
    }

    #[test]
    fn flag_errors() {
        let mut config = AppConfig::default();
        assert_eq!(
            config.apply_args(["--db".to_string()]).unwrap_err(),
            ConfigError::MissingValue { flag: "--db" }
        );
        assert_eq!(
            config.apply_args(["--deck".to_string()]).unwrap_err(),
            ConfigError::UnknownFlag("--deck".into())
        );
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/study.db"),
            "sqlite:///tmp/study.db"
        );
        assert_eq!(normalize_sqlite_url("/tmp/study.db"), "sqlite:///tmp/study.db");
        assert!(normalize_sqlite_url("study.db").starts_with("sqlite:///"));
    }
}
