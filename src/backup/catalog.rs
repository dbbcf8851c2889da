use super::{shm_path, wal_path, BackupMetadata, BackupStatus, Result, RetentionPolicy};
use crate::config::BackupConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use tracing::{debug, error, info, warn};

/// Aggregate statistics over all catalogued backups
#[derive(Debug, Clone, Serialize)]
pub struct BackupStats {
    pub total_backups: usize,
    pub total_size: u64,
    pub by_retention_policy: HashMap<RetentionPolicy, usize>,
    pub by_status: HashMap<BackupStatus, usize>,
    pub oldest_backup: Option<DateTime<Utc>>,
    pub newest_backup: Option<DateTime<Utc>>,
    /// Earliest still-future expiration; None when the catalog is empty or
    /// everything has already expired
    pub next_expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    pub errors: Vec<String>,
}

/// Enumerates, aggregates statistics on, and expires backups based on their
/// metadata sidecars. Artifacts without a sidecar are invisible to it.
pub struct BackupCatalog {
    config: BackupConfig,
}

impl BackupCatalog {
    pub fn new(config: BackupConfig) -> Self {
        Self { config }
    }

    /// All parseable sidecars in the backup directory, newest first. A
    /// malformed sidecar is logged and skipped, never fatal to the listing.
    pub async fn list(&self) -> Result<Vec<BackupMetadata>> {
        let mut entries = Vec::new();

        let mut dir = match fs::read_dir(&self.config.backup_directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "Backup directory {} does not exist yet",
                    self.config.backup_directory.display()
                );
                return Ok(entries);
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<BackupMetadata>(&bytes) {
                    Ok(metadata) => entries.push(metadata),
                    Err(e) => {
                        warn!("Skipping malformed sidecar {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Skipping unreadable sidecar {}: {}", path.display(), e);
                }
            }
        }

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    pub async fn stats(&self) -> Result<BackupStats> {
        let entries = self.list().await?;
        let now = Utc::now();

        let mut by_retention_policy = HashMap::new();
        let mut by_status = HashMap::new();
        for entry in &entries {
            *by_retention_policy.entry(entry.retention_policy).or_insert(0) += 1;
            *by_status.entry(entry.status).or_insert(0) += 1;
        }

        Ok(BackupStats {
            total_backups: entries.len(),
            total_size: entries.iter().map(|e| e.size).sum(),
            by_retention_policy,
            by_status,
            oldest_backup: entries.iter().map(|e| e.timestamp).min(),
            newest_backup: entries.iter().map(|e| e.timestamp).max(),
            next_expiration: entries
                .iter()
                .map(|e| e.expires_at)
                .filter(|expires| *expires > now)
                .min(),
        })
    }

    /// Delete every backup whose expiration is strictly in the past, as a
    /// whole (artifact, journal companions, sidecar). A per-entry failure is
    /// collected and the batch continues; an unexpired entry is never touched.
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        let now = Utc::now();
        let mut report = CleanupReport::default();

        for metadata in self.list().await? {
            if metadata.expires_at >= now {
                continue;
            }
            match self.delete_backup(&metadata).await {
                Ok(()) => {
                    info!("Deleted expired backup {}", metadata.id);
                    report.deleted.push(metadata.id);
                }
                Err(e) => {
                    error!("Failed to delete expired backup {}: {}", metadata.id, e);
                    report.errors.push(format!("{}: {e}", metadata.id));
                }
            }
        }

        if !report.deleted.is_empty() || !report.errors.is_empty() {
            info!(
                "Cleanup finished: {} deleted, {} errors",
                report.deleted.len(),
                report.errors.len()
            );
        }
        Ok(report)
    }

    async fn delete_backup(&self, metadata: &BackupMetadata) -> Result<()> {
        let artifact = metadata.artifact_path(&self.config.backup_directory);

        if artifact.exists() {
            fs::remove_file(&artifact).await?;
        }
        for companion in [wal_path(&artifact), shm_path(&artifact)] {
            if companion.exists() {
                fs::remove_file(&companion).await?;
            }
        }
        fs::remove_file(metadata.sidecar_path(&self.config.backup_directory)).await?;

        Ok(())
    }
}
