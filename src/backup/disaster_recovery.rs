use super::{BackupCatalog, BackupCreator, BackupType, IntegrityVerifier};
use crate::config::BackupConfig;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct SelfTestStep {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelfTestReport {
    pub success: bool,
    pub tests_run: u32,
    pub tests_passed: u32,
    pub details: Vec<SelfTestStep>,
}

/// Runs create → verify → list → stats as an end-to-end self-test of the
/// backup pipeline and reports pass/fail per step.
pub struct DisasterRecoveryHarness {
    creator: BackupCreator,
    verifier: IntegrityVerifier,
    catalog: BackupCatalog,
}

impl DisasterRecoveryHarness {
    pub fn new(config: BackupConfig) -> Self {
        Self {
            creator: BackupCreator::new(config.clone()),
            verifier: IntegrityVerifier::new(config.clone()),
            catalog: BackupCatalog::new(config),
        }
    }

    pub async fn self_test(&self) -> SelfTestReport {
        info!("Running disaster recovery self-test");
        let mut details = Vec::new();

        // Step 1: create a snapshot backup
        let outcome = self.creator.create(BackupType::Snapshot).await;
        details.push(SelfTestStep {
            name: "create snapshot backup".to_string(),
            passed: outcome.success,
            error: outcome.error.clone(),
        });

        let Some(metadata) = outcome.metadata else {
            // Steps 2-4 have no subject to act on
            warn!("Self-test backup creation failed; skipping remaining steps");
            return Self::finish(details);
        };

        // Step 2: verify it
        let verified = self.verifier.verify(&metadata.id).await;
        details.push(SelfTestStep {
            name: "verify backup integrity".to_string(),
            passed: verified,
            error: (!verified).then(|| "verification returned false".to_string()),
        });

        // Step 3: it must appear in the catalog listing
        let (listed, list_error) = match self.catalog.list().await {
            Ok(entries) => (entries.iter().any(|entry| entry.id == metadata.id), None),
            Err(e) => (false, Some(e.to_string())),
        };
        details.push(SelfTestStep {
            name: "backup appears in catalog listing".to_string(),
            passed: listed,
            error: list_error
                .or_else(|| (!listed).then(|| "backup missing from listing".to_string())),
        });

        // Step 4: statistics must reflect a non-empty catalog
        let (counted, stats_error) = match self.catalog.stats().await {
            Ok(stats) => (stats.total_backups > 0, None),
            Err(e) => (false, Some(e.to_string())),
        };
        details.push(SelfTestStep {
            name: "statistics reflect non-empty catalog".to_string(),
            passed: counted,
            error: stats_error
                .or_else(|| (!counted).then(|| "statistics report an empty catalog".to_string())),
        });

        Self::finish(details)
    }

    fn finish(details: Vec<SelfTestStep>) -> SelfTestReport {
        let tests_run = details.len() as u32;
        let tests_passed = details.iter().filter(|step| step.passed).count() as u32;
        let success = tests_passed == tests_run;

        if success {
            info!("Disaster recovery self-test passed ({tests_passed}/{tests_run})");
        } else {
            warn!("Disaster recovery self-test failed ({tests_passed}/{tests_run})");
        }

        SelfTestReport {
            success,
            tests_run,
            tests_passed,
            details,
        }
    }
}
