use super::{
    calculate_file_checksum, generate_backup_id, write_metadata, BackupError, BackupMetadata,
    BackupStatus, BackupType, BackupStrategy, RawCopyStrategy, Result, RetentionPolicyEngine,
    SqliteCliStrategy,
};
use crate::config::BackupConfig;
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{error, info, warn};

/// Outcome of a backup creation attempt. Failures are captured here; `create`
/// never propagates an error past its boundary.
#[derive(Debug)]
pub struct BackupOutcome {
    pub success: bool,
    pub metadata: Option<BackupMetadata>,
    pub error: Option<String>,
    pub duration: Duration,
}

/// Copies the live database into an immutable, checksummed artifact and
/// writes its metadata sidecar.
pub struct BackupCreator {
    config: BackupConfig,
    retention: RetentionPolicyEngine,
}

impl BackupCreator {
    pub fn new(config: BackupConfig) -> Self {
        let retention = RetentionPolicyEngine::new(config.retention.clone());
        Self { config, retention }
    }

    /// Create a new backup of the configured database.
    pub async fn create(&self, backup_type: BackupType) -> BackupOutcome {
        self.create_inner(backup_type, None).await
    }

    /// Pre-restore safety snapshot, tagged with the id of the backup about to
    /// be restored.
    pub(crate) async fn create_snapshot_for_restore(&self, source_id: &str) -> BackupOutcome {
        self.create_inner(BackupType::Snapshot, Some(source_id.to_string()))
            .await
    }

    async fn create_inner(
        &self,
        backup_type: BackupType,
        restored_from: Option<String>,
    ) -> BackupOutcome {
        let started = Instant::now();
        info!("Starting {} backup of {}", backup_type, self.config.database_path.display());

        match self.run_create(backup_type, restored_from).await {
            Ok(metadata) => {
                info!(
                    "Backup completed: {} ({} bytes, {} tier)",
                    metadata.id, metadata.size, metadata.retention_policy
                );
                BackupOutcome {
                    success: true,
                    metadata: Some(metadata),
                    error: None,
                    duration: started.elapsed(),
                }
            }
            Err(e) => {
                error!("Backup failed: {}", e);
                BackupOutcome {
                    success: false,
                    metadata: None,
                    error: Some(e.to_string()),
                    duration: started.elapsed(),
                }
            }
        }
    }

    async fn run_create(
        &self,
        backup_type: BackupType,
        restored_from: Option<String>,
    ) -> Result<BackupMetadata> {
        let source = &self.config.database_path;

        if source.to_string_lossy().contains(":memory:") {
            return Err(BackupError::BadRequest(
                "In-memory databases cannot be backed up".to_string(),
            ));
        }
        if !source.exists() {
            return Err(BackupError::BadRequest(format!(
                "Database not found at {}",
                source.display()
            )));
        }

        let source_size = fs::metadata(source).await?.len();
        if source_size > self.config.max_database_size {
            return Err(BackupError::BadRequest(format!(
                "Database size {source_size} bytes exceeds the configured backup ceiling of {} bytes",
                self.config.max_database_size
            )));
        }

        fs::create_dir_all(&self.config.backup_directory).await?;

        let timestamp = Utc::now();
        let id = generate_backup_id(timestamp);
        let artifact = super::artifact_path_for(&self.config.backup_directory, &id);

        self.copy_with_best_strategy(&artifact).await?;

        let artifact_size = fs::metadata(&artifact).await?.len();
        if artifact_size == 0 {
            // Remove the husk so the catalog never has to reason about it
            let _ = fs::remove_file(&artifact).await;
            return Err(BackupError::Database(format!(
                "Backup artifact for {id} is empty after copy"
            )));
        }

        let checksum = calculate_file_checksum(&artifact).await?;
        let retention_policy = RetentionPolicyEngine::classify(timestamp);
        let expires_at = self.retention.expiration_for(retention_policy, timestamp);

        let metadata = BackupMetadata {
            id,
            timestamp,
            backup_type,
            size: artifact_size,
            checksum,
            // Artifact transforms are not implemented; the flags in config
            // stay inert until they are.
            compressed: false,
            encrypted: false,
            database_path: source.clone(),
            retention_policy,
            expires_at,
            status: BackupStatus::Completed,
            verified_at: None,
            restored_from,
        };

        // Sidecar is written last: metadata without an artifact must never be
        // observable.
        write_metadata(
            &metadata.sidecar_path(&self.config.backup_directory),
            &metadata,
        )
        .await?;

        Ok(metadata)
    }

    /// Prefer the sqlite CLI hot backup; fall back to a raw file copy when the
    /// CLI is missing or errors. The fallback is not crash-consistent under
    /// concurrent writers.
    async fn copy_with_best_strategy(&self, artifact: &std::path::Path) -> Result<()> {
        let source = &self.config.database_path;
        let native = SqliteCliStrategy::new(self.config.sqlite_cli.clone());

        if native.available() {
            match native.copy_database(source, artifact).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "{} strategy failed ({}); falling back to raw copy (not crash-consistent)",
                        native.name(),
                        e
                    );
                }
            }
        } else {
            warn!(
                "{} not available on PATH; using raw copy (not crash-consistent)",
                self.config.sqlite_cli
            );
        }

        RawCopyStrategy.copy_database(source, artifact).await
    }
}
