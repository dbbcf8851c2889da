pub mod backup;
pub mod config;

pub use config::{BackupConfig, RetentionConfig};

// Re-export backup types
pub use backup::{
    BackupCatalog, BackupCreator, BackupError, BackupMetadata, BackupOutcome, BackupStats,
    BackupStatus, BackupStrategy, BackupType, CleanupReport, DisasterRecoveryHarness,
    IntegrityVerifier, JournalCompanions, PointInTimeRecovery, RawCopyStrategy, RecoveryOutcome,
    RestoreEngine, RetentionPolicy, RetentionPolicyEngine, SelfTestReport, SelfTestStep,
    SqliteCliStrategy,
};
