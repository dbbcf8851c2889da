use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory where backup artifacts and metadata sidecars are stored
    pub backup_directory: PathBuf,

    /// Path to the live database file that gets backed up
    pub database_path: PathBuf,

    /// Per-tier retention settings
    pub retention: RetentionConfig,

    /// Maximum source database size in bytes accepted for backup
    pub max_database_size: u64,

    /// Compress artifacts (declared, not yet applied to artifacts)
    pub enable_compression: bool,

    /// Encrypt artifacts (declared, not yet applied to artifacts)
    pub enable_encryption: bool,

    /// Name of the sqlite CLI probed for hot backups
    pub sqlite_cli: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// How many days a daily backup is kept
    pub daily_days: u32,

    /// How many weeks a weekly backup is kept
    pub weekly_weeks: u32,

    /// How many months (of 30 days) a monthly backup is kept
    pub monthly_months: u32,

    /// How many years (of 365 days) a yearly backup is kept
    pub yearly_years: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_directory: PathBuf::from("./backups"),
            database_path: PathBuf::from("./data/records.db"),
            retention: RetentionConfig::default(),
            max_database_size: 1024 * 1024 * 1024, // 1 GiB
            enable_compression: false,
            enable_encryption: false,
            sqlite_cli: "sqlite3".to_string(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            daily_days: 7,
            weekly_weeks: 4,
            monthly_months: 12,
            yearly_years: 7,
        }
    }
}

impl BackupConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            backup_directory: env::var("BACKUP_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.backup_directory),
            database_path: env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            retention: RetentionConfig {
                daily_days: parse_env("BACKUP_RETENTION_DAILY_DAYS", 7)?,
                weekly_weeks: parse_env("BACKUP_RETENTION_WEEKLY_WEEKS", 4)?,
                monthly_months: parse_env("BACKUP_RETENTION_MONTHLY_MONTHS", 12)?,
                yearly_years: parse_env("BACKUP_RETENTION_YEARLY_YEARS", 7)?,
            },
            max_database_size: parse_env("BACKUP_MAX_DATABASE_SIZE", defaults.max_database_size)?,
            enable_compression: parse_env("BACKUP_ENABLE_COMPRESSION", false)?,
            enable_encryption: parse_env("BACKUP_ENABLE_ENCRYPTION", false)?,
            sqlite_cli: env::var("SQLITE_CLI").unwrap_or(defaults.sqlite_cli),
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => Ok(raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}"))?),
        Err(_) => Ok(default),
    }
}
