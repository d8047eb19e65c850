//! Configuration.
//!
//! Settings are layered: built-in defaults, then `millwatch.toml` (or the
//! file given with `--config`), then `MILLWATCH_*` environment variables
//! (`MILLWATCH_SHEET__ID`, `MILLWATCH_VISITS__DATABASE`, ...). CLI flags
//! are applied on top by the binary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::auth::{UserDirectory, UserEntry};
use crate::data::duration::parse_duration;
use crate::source::RetryPolicy;

const DEFAULT_CONFIG: &str = "millwatch";
const ENV_PREFIX: &str = "MILLWATCH";

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sheet: SheetSettings,
    pub visits: VisitSettings,
    pub display: DisplaySettings,
    pub users: BTreeMap<String, UserEntry>,
}

/// `[sheet]`: where the dataset comes from and how it is cached.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SheetSettings {
    /// Spreadsheet id from the sheet URL.
    pub id: Option<String>,
    pub range: String,
    pub api_key: Option<String>,
    /// Service-account key file.
    pub credentials: Option<PathBuf>,
    pub cache_ttl: String,
    pub retry_attempts: u32,
    pub retry_delay: String,
    pub timeout: String,
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self {
            id: None,
            range: "A:Z".to_string(),
            api_key: None,
            credentials: None,
            cache_ttl: "30m".to_string(),
            retry_attempts: 3,
            retry_delay: "2s".to_string(),
            timeout: "20s".to_string(),
        }
    }
}

impl std::fmt::Debug for SheetSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetSettings")
            .field("id", &self.id)
            .field("range", &self.range)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("credentials", &self.credentials)
            .field("cache_ttl", &self.cache_ttl)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SheetSettings {
    pub fn cache_ttl(&self) -> Result<Duration> {
        parse_duration(&self.cache_ttl).context("Invalid sheet.cache_ttl")
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(&self.timeout).context("Invalid sheet.timeout")
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        Ok(RetryPolicy {
            attempts: self.retry_attempts.max(1),
            delay: parse_duration(&self.retry_delay).context("Invalid sheet.retry_delay")?,
        })
    }
}

/// `[visits]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisitSettings {
    pub database: PathBuf,
    pub active_window: String,
}

impl Default for VisitSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("visits.db"),
            active_window: "15m".to_string(),
        }
    }
}

impl VisitSettings {
    pub fn active_window(&self) -> Result<Duration> {
        parse_duration(&self.active_window).context("Invalid visits.active_window")
    }
}

/// `[display]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Subtracted from batch ids for display.
    pub batch_display_offset: i64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            batch_display_offset: 714,
        }
    }
}

impl DisplaySettings {
    pub fn batch_label(&self, batch_id: i64) -> String {
        (batch_id - self.batch_display_offset).to_string()
    }
}

impl Settings {
    /// Load settings from `path` (required when given) or from an optional
    /// `millwatch.toml` in the working directory, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        let settings: Settings = config
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that every duration parses, so errors surface at startup.
    pub fn validate(&self) -> Result<()> {
        self.sheet.cache_ttl()?;
        self.sheet.timeout()?;
        self.sheet.retry_policy()?;
        self.visits.active_window()?;
        Ok(())
    }

    pub fn user_directory(&self) -> UserDirectory {
        UserDirectory::new(self.users.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.sheet.range, "A:Z");
        assert_eq!(settings.sheet.cache_ttl().unwrap(), Duration::from_secs(1_800));
        assert_eq!(settings.sheet.timeout().unwrap(), Duration::from_secs(20));
        assert_eq!(settings.sheet.retry_policy().unwrap(), RetryPolicy::default());
        assert_eq!(settings.visits.active_window().unwrap(), Duration::from_secs(900));
        assert_eq!(settings.display.batch_label(715), "1");
        assert!(settings.user_directory().is_empty());
    }

    #[test]
    fn test_load_file() {
        let file = write_config(
            r#"
[sheet]
id = "1AbC"
api_key = "key-123"
cache_ttl = "5m"

[visits]
database = "/var/lib/millwatch/visits.db"

[display]
batch_display_offset = 700

[users.admin]
name = "Администратор"
password_sha256 = "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
role = "admin"

[users.master]
name = "Мастер"
password = "spindle"
"#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.sheet.id.as_deref(), Some("1AbC"));
        assert_eq!(settings.sheet.api_key.as_deref(), Some("key-123"));
        assert_eq!(settings.sheet.cache_ttl().unwrap(), Duration::from_secs(300));
        assert_eq!(settings.sheet.retry_attempts, 3);
        assert_eq!(
            settings.visits.database,
            PathBuf::from("/var/lib/millwatch/visits.db")
        );
        assert_eq!(settings.display.batch_label(720), "20");

        assert_eq!(settings.users.len(), 2);
        assert_eq!(settings.users["admin"].role, Role::Admin);
        assert_eq!(settings.users["master"].role, Role::Viewer);

        let directory = settings.user_directory();
        assert!(directory.verify("admin", "secret").is_ok());
        assert!(directory.verify("master", "spindle").is_ok());
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let file = write_config("[sheet]\ncache_ttl = \"soon\"\n");
        let err = Settings::load(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("cache_ttl"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/millwatch.toml"))).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let sheet = SheetSettings {
            api_key: Some("key-123".into()),
            ..Default::default()
        };
        assert!(!format!("{:?}", sheet).contains("key-123"));
    }
}
