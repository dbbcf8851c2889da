pub mod catalog;
pub mod creator;
pub mod disaster_recovery;
pub mod point_in_time;
pub mod restore;
pub mod retention;
pub mod strategy;
pub mod verification;

pub use catalog::*;
pub use creator::*;
pub use disaster_recovery::*;
pub use point_in_time::*;
pub use restore::*;
pub use retention::*;
pub use strategy::*;
pub use verification::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata sidecar persisted as `<id>.json` next to each backup artifact.
///
/// The sidecar is written only after the artifact file exists and its checksum
/// has been computed, so a sidecar without an artifact is never observable
/// through normal operation. Orphan artifacts (crash between the two writes)
/// are ignored by the catalog, which scans sidecars only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub backup_type: BackupType,
    pub size: u64,
    pub checksum: String,
    pub compressed: bool,
    pub encrypted: bool,
    pub database_path: PathBuf,
    pub retention_policy: RetentionPolicy,
    pub expires_at: DateTime<Utc>,
    pub status: BackupStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    /// Lineage pointer set only on pre-restore safety snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_from: Option<String>,
}

impl BackupMetadata {
    /// Path of the artifact file inside the backup directory
    pub fn artifact_path(&self, backup_directory: &Path) -> PathBuf {
        artifact_path_for(backup_directory, &self.id)
    }

    /// Path of this metadata sidecar inside the backup directory
    pub fn sidecar_path(&self, backup_directory: &Path) -> PathBuf {
        sidecar_path_for(backup_directory, &self.id)
    }
}

pub fn artifact_path_for(backup_directory: &Path, id: &str) -> PathBuf {
    backup_directory.join(format!("{id}.db"))
}

pub fn sidecar_path_for(backup_directory: &Path, id: &str) -> PathBuf {
    backup_directory.join(format!("{id}.json"))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Full,
    Incremental,
    /// Pre-restore safety copy of the live database
    Snapshot,
}

impl std::str::FromStr for BackupType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "full" => Ok(BackupType::Full),
            "incremental" => Ok(BackupType::Incremental),
            "snapshot" => Ok(BackupType::Snapshot),
            other => Err(format!("unknown backup type: {other}")),
        }
    }
}

impl std::fmt::Display for BackupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupType::Full => write!(f, "full"),
            BackupType::Incremental => write!(f, "incremental"),
            BackupType::Snapshot => write!(f, "snapshot"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Pending,
    Completed,
    Verified,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl std::fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetentionPolicy::Daily => write!(f, "daily"),
            RetentionPolicy::Weekly => write!(f, "weekly"),
            RetentionPolicy::Monthly => write!(f, "monthly"),
            RetentionPolicy::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BackupError>;

/// Time-derived identifier with a random suffix, e.g.
/// `backup_20250812_041500_h7k2m9q4`.
pub(crate) fn generate_backup_id(timestamp: DateTime<Utc>) -> String {
    use rand::{distributions::Alphanumeric, Rng};

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!(
        "backup_{}_{}",
        timestamp.format("%Y%m%d_%H%M%S"),
        suffix.to_lowercase()
    )
}

pub(crate) async fn calculate_file_checksum(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};

    let contents = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Ok(hex::encode(hasher.finalize()))
}

pub(crate) async fn read_metadata(sidecar: &Path) -> Result<BackupMetadata> {
    let bytes = tokio::fs::read(sidecar).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) async fn write_metadata(sidecar: &Path, metadata: &BackupMetadata) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(metadata)?;
    tokio::fs::write(sidecar, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> BackupMetadata {
        BackupMetadata {
            id: "backup_20250812_041500_h7k2m9q4".to_string(),
            timestamp: Utc::now(),
            backup_type: BackupType::Snapshot,
            size: 4096,
            checksum: "ab".repeat(32),
            compressed: false,
            encrypted: false,
            database_path: PathBuf::from("/srv/records/records.db"),
            retention_policy: RetentionPolicy::Daily,
            expires_at: Utc::now() + chrono::Duration::days(7),
            status: BackupStatus::Completed,
            verified_at: None,
            restored_from: None,
        }
    }

    #[test]
    fn test_sidecar_uses_camel_case_fields() {
        let json = serde_json::to_string_pretty(&sample_metadata()).unwrap();
        assert!(json.contains("\"databasePath\""));
        assert!(json.contains("\"retentionPolicy\""));
        assert!(json.contains("\"expiresAt\""));
        assert!(json.contains("\"type\": \"snapshot\""));
        assert!(json.contains("\"status\": \"completed\""));
        // Absent optionals are omitted, not serialized as null
        assert!(!json.contains("verifiedAt"));
        assert!(!json.contains("restoredFrom"));
    }

    #[test]
    fn test_sidecar_round_trip() {
        let mut metadata = sample_metadata();
        metadata.status = BackupStatus::Verified;
        metadata.verified_at = Some(Utc::now());
        metadata.restored_from = Some("backup_20250801_120000_aaaaaaaa".to_string());

        let json = serde_json::to_string(&metadata).unwrap();
        let parsed: BackupMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, metadata.id);
        assert_eq!(parsed.status, BackupStatus::Verified);
        assert_eq!(parsed.restored_from, metadata.restored_from);
        assert_eq!(parsed.checksum, metadata.checksum);
    }

    #[test]
    fn test_backup_id_shape() {
        let timestamp = "2025-08-12T04:15:00Z".parse().unwrap();
        let id = generate_backup_id(timestamp);
        assert!(id.starts_with("backup_20250812_041500_"));
        assert_eq!(id.len(), "backup_20250812_041500_".len() + 8);
    }

    #[test]
    fn test_backup_type_parsing() {
        assert_eq!("full".parse::<BackupType>().unwrap(), BackupType::Full);
        assert_eq!(
            "snapshot".parse::<BackupType>().unwrap(),
            BackupType::Snapshot
        );
        assert!("differential".parse::<BackupType>().is_err());
    }

    #[test]
    fn test_artifact_and_sidecar_paths() {
        let metadata = sample_metadata();
        let dir = Path::new("/var/backups");
        assert_eq!(
            metadata.artifact_path(dir),
            PathBuf::from("/var/backups/backup_20250812_041500_h7k2m9q4.db")
        );
        assert_eq!(
            metadata.sidecar_path(dir),
            PathBuf::from("/var/backups/backup_20250812_041500_h7k2m9q4.json")
        );
    }
}
