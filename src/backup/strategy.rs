use super::{BackupError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Command;
use tokio::fs;
use tracing::{debug, warn};

/// Journal companion files that may sit next to an SQLite database file.
///
/// Presence or absence of each companion is part of the database's on-disk
/// state: a restore must reproduce it exactly, not merely overlay files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalCompanions {
    pub wal: Option<PathBuf>,
    pub shm: Option<PathBuf>,
}

impl JournalCompanions {
    /// Probe the filesystem for `-wal` / `-shm` siblings of `primary`.
    pub fn probe(primary: &Path) -> Self {
        let wal = wal_path(primary);
        let shm = shm_path(primary);
        Self {
            wal: wal.exists().then_some(wal),
            shm: shm.exists().then_some(shm),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.wal.is_none() && self.shm.is_none()
    }
}

pub fn wal_path(primary: &Path) -> PathBuf {
    sibling(primary, "-wal")
}

pub fn shm_path(primary: &Path) -> PathBuf {
    sibling(primary, "-shm")
}

fn sibling(primary: &Path, suffix: &str) -> PathBuf {
    let mut name = primary.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// A way of copying the live database into an artifact file.
///
/// Implementations differ in their consistency guarantee under concurrent
/// writers; callers pick one per invocation via a capability probe.
#[async_trait]
pub trait BackupStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the produced artifact is transactionally consistent even with
    /// concurrent writers on the source database.
    fn crash_consistent(&self) -> bool;

    async fn copy_database(&self, source: &Path, dest: &Path) -> Result<()>;
}

/// Hot backup through the sqlite CLI's `.backup` command. The CLI takes its
/// own read transaction, so the artifact is consistent under concurrent
/// writers and never includes journal companions.
pub struct SqliteCliStrategy {
    cli: String,
}

impl SqliteCliStrategy {
    pub fn new(cli: String) -> Self {
        Self { cli }
    }

    /// Capability probe: is the CLI present and runnable on PATH?
    pub fn available(&self) -> bool {
        Command::new(&self.cli)
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl BackupStrategy for SqliteCliStrategy {
    fn name(&self) -> &'static str {
        "sqlite-cli"
    }

    fn crash_consistent(&self) -> bool {
        true
    }

    async fn copy_database(&self, source: &Path, dest: &Path) -> Result<()> {
        debug!(
            "Running {} .backup from {} to {}",
            self.cli,
            source.display(),
            dest.display()
        );

        let output = Command::new(&self.cli)
            .arg(source)
            .arg(format!(".backup '{}'", dest.display()))
            .output()
            .map_err(|e| BackupError::Database(format!("Failed to execute {}: {e}", self.cli)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackupError::Database(format!(
                "{} .backup failed: {stderr}",
                self.cli
            )));
        }

        Ok(())
    }
}

/// Raw file copy of the primary file plus whichever journal companions exist.
///
/// This path is NOT crash-consistent: a writer committing mid-copy can leave
/// the artifact with a torn transaction. It exists as the fallback when the
/// sqlite CLI is unavailable and is logged as degraded when taken.
pub struct RawCopyStrategy;

#[async_trait]
impl BackupStrategy for RawCopyStrategy {
    fn name(&self) -> &'static str {
        "raw-copy"
    }

    fn crash_consistent(&self) -> bool {
        false
    }

    async fn copy_database(&self, source: &Path, dest: &Path) -> Result<()> {
        debug!(
            "Raw-copying {} to {}",
            source.display(),
            dest.display()
        );
        fs::copy(source, dest).await?;

        let companions = JournalCompanions::probe(source);
        if !companions.is_empty() {
            warn!(
                "Source database has live journal files; copying them alongside {}",
                dest.display()
            );
        }
        if let Some(wal) = &companions.wal {
            fs::copy(wal, wal_path(dest)).await?;
        }
        if let Some(shm) = &companions.shm {
            fs::copy(shm, shm_path(dest)).await?;
        }

        Ok(())
    }
}
