use super::{
    read_metadata, shm_path, sidecar_path_for, wal_path, BackupCreator, BackupError,
    IntegrityVerifier, JournalCompanions, Result,
};
use crate::config::BackupConfig;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{error, info, warn};

/// Outcome of a restore attempt. Failures are captured here; `restore` never
/// propagates an error past its boundary.
#[derive(Debug)]
pub struct RecoveryOutcome {
    pub success: bool,
    pub backup_id: Option<String>,
    pub restored_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl RecoveryOutcome {
    pub(crate) fn failed(error: String, duration: Duration) -> Self {
        Self {
            success: false,
            backup_id: None,
            restored_at: None,
            error: Some(error),
            duration,
        }
    }
}

/// Re-verifies a chosen backup and then atomically replaces the live database
/// (and its journal companions) with the artifact's state, after taking a
/// safety snapshot of the current live database.
pub struct RestoreEngine {
    config: BackupConfig,
    creator: BackupCreator,
    verifier: IntegrityVerifier,
}

impl RestoreEngine {
    pub fn new(config: BackupConfig) -> Self {
        let creator = BackupCreator::new(config.clone());
        let verifier = IntegrityVerifier::new(config.clone());
        Self {
            config,
            creator,
            verifier,
        }
    }

    pub async fn restore(&self, id: &str) -> RecoveryOutcome {
        let started = Instant::now();
        info!("Starting restore from backup {}", id);

        match self.run_restore(id).await {
            Ok(restored_at) => {
                info!("Restore from {} completed", id);
                RecoveryOutcome {
                    success: true,
                    backup_id: Some(id.to_string()),
                    restored_at: Some(restored_at),
                    error: None,
                    duration: started.elapsed(),
                }
            }
            Err(e) => {
                error!("Restore from {} failed: {}", id, e);
                RecoveryOutcome {
                    success: false,
                    backup_id: Some(id.to_string()),
                    restored_at: None,
                    error: Some(e.to_string()),
                    duration: started.elapsed(),
                }
            }
        }
    }

    async fn run_restore(&self, id: &str) -> Result<DateTime<Utc>> {
        let sidecar = sidecar_path_for(&self.config.backup_directory, id);
        if !sidecar.exists() {
            return Err(BackupError::NotFound(format!("Backup {id} not found")));
        }
        let metadata = read_metadata(&sidecar).await?;
        let artifact = metadata.artifact_path(&self.config.backup_directory);
        if !artifact.exists() {
            return Err(BackupError::NotFound(format!(
                "Backup artifact for {id} not found"
            )));
        }

        // Restoring unverified bytes is never permitted.
        if !self.verifier.verify(id).await {
            return Err(BackupError::Database(format!(
                "Backup {id} failed integrity verification; refusing to restore"
            )));
        }

        // Best-effort undo point. Losing it is a documented risk, not a
        // reason to abort the restore the operator asked for.
        let snapshot = self.creator.create_snapshot_for_restore(id).await;
        match &snapshot.metadata {
            Some(snapshot_metadata) => {
                info!(
                    "Pre-restore safety snapshot created: {}",
                    snapshot_metadata.id
                );
            }
            None => {
                warn!(
                    "Could not create pre-restore safety snapshot ({}); continuing without an undo point",
                    snapshot.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        let live = self.config.database_path.clone();
        if let Some(parent) = live.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&artifact, &live).await?;

        // The live side must end up with exactly the artifact's journal
        // state: copy companions the artifact has, delete ones it lacks.
        let companions = JournalCompanions::probe(&artifact);
        self.restore_companion(companions.wal.as_deref(), &wal_path(&live))
            .await?;
        self.restore_companion(companions.shm.as_deref(), &shm_path(&live))
            .await?;

        Ok(Utc::now())
    }

    async fn restore_companion(&self, source: Option<&Path>, live: &Path) -> Result<()> {
        match source {
            Some(source) => {
                fs::copy(source, live).await?;
            }
            None => {
                if live.exists() {
                    fs::remove_file(live).await?;
                }
            }
        }
        Ok(())
    }
}
