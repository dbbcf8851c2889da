use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use records_backup::{
    BackupCatalog, BackupConfig, BackupCreator, BackupType, DisasterRecoveryHarness,
    IntegrityVerifier, PointInTimeRecovery, RestoreEngine,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "records-backup")]
#[command(about = "Backup and disaster recovery engine for the records tracking service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new backup of the live database
    Create {
        /// Backup type: full, incremental, or snapshot
        #[arg(long, default_value = "full")]
        backup_type: String,
    },
    /// Verify a stored backup's integrity
    Verify {
        /// Backup identifier
        id: String,
    },
    /// List catalogued backups, newest first
    List,
    /// Show aggregate backup statistics
    Stats,
    /// Delete expired backups
    Cleanup,
    /// Restore the live database from a backup
    Restore {
        /// Backup identifier
        id: String,
    },
    /// Restore to the most recent backup at or before a target time
    RestoreAsOf {
        /// Target instant, RFC 3339 (e.g. 2025-08-12T04:15:00Z)
        target: DateTime<Utc>,
    },
    /// Run the disaster recovery self-test
    SelfTest,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = BackupConfig::from_env()?;

    match cli.command {
        Commands::Create { backup_type } => {
            let backup_type: BackupType = backup_type
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let outcome = BackupCreator::new(config).create(backup_type).await;
            match outcome.metadata {
                Some(metadata) => {
                    println!(
                        "Created {} ({} bytes, {} tier, expires {}) in {:?}",
                        metadata.id,
                        metadata.size,
                        metadata.retention_policy,
                        metadata.expires_at.to_rfc3339(),
                        outcome.duration
                    );
                }
                None => bail!(
                    "Backup failed: {}",
                    outcome.error.unwrap_or_else(|| "unknown error".to_string())
                ),
            }
        }
        Commands::Verify { id } => {
            if IntegrityVerifier::new(config).verify(&id).await {
                println!("Backup {id} verified");
            } else {
                bail!("Backup {id} failed verification");
            }
        }
        Commands::List => {
            let entries = BackupCatalog::new(config).list().await?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::Stats => {
            let stats = BackupCatalog::new(config).stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Cleanup => {
            let report = BackupCatalog::new(config).cleanup().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.errors.is_empty() {
                bail!("Cleanup finished with {} errors", report.errors.len());
            }
        }
        Commands::Restore { id } => {
            let outcome = RestoreEngine::new(config).restore(&id).await;
            if outcome.success {
                println!("Restored from {id} in {:?}", outcome.duration);
            } else {
                bail!(
                    "Restore failed: {}",
                    outcome.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
        }
        Commands::RestoreAsOf { target } => {
            let outcome = PointInTimeRecovery::new(config).restore_as_of(target).await;
            if outcome.success {
                println!(
                    "Restored from {} in {:?}",
                    outcome.backup_id.as_deref().unwrap_or("?"),
                    outcome.duration
                );
            } else {
                bail!(
                    "Point-in-time recovery failed: {}",
                    outcome.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
        }
        Commands::SelfTest => {
            let report = DisasterRecoveryHarness::new(config).self_test().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.success {
                bail!(
                    "Self-test failed: {}/{} steps passed",
                    report.tests_passed,
                    report.tests_run
                );
            }
        }
    }

    Ok(())
}
