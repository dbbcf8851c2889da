use super::{
    calculate_file_checksum, read_metadata, sidecar_path_for, write_metadata, BackupStatus, Result,
};
use crate::config::BackupConfig;
use chrono::Utc;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";
const SQLITE_HEADER_LEN: usize = 100;

/// Re-hashes and sanity-opens a stored artifact, promoting its status to
/// verified on success.
pub struct IntegrityVerifier {
    config: BackupConfig,
}

impl IntegrityVerifier {
    pub fn new(config: BackupConfig) -> Self {
        Self { config }
    }

    /// Deliberately non-throwing: any missing file, checksum mismatch,
    /// malformed artifact, or internal error comes back as `false`.
    pub async fn verify(&self, id: &str) -> bool {
        match self.run_verify(id).await {
            Ok(verified) => verified,
            Err(e) => {
                warn!("Verification of {} errored: {}", id, e);
                false
            }
        }
    }

    async fn run_verify(&self, id: &str) -> Result<bool> {
        let sidecar = sidecar_path_for(&self.config.backup_directory, id);
        if !sidecar.exists() {
            warn!("Verification of {} failed: metadata sidecar missing", id);
            return Ok(false);
        }

        let mut metadata = read_metadata(&sidecar).await?;
        let artifact = metadata.artifact_path(&self.config.backup_directory);
        if !artifact.exists() {
            warn!("Verification of {} failed: artifact file missing", id);
            return Ok(false);
        }

        let actual = calculate_file_checksum(&artifact).await?;
        if actual != metadata.checksum {
            warn!(
                "Verification of {} failed: checksum mismatch (expected {}, got {})",
                id, metadata.checksum, actual
            );
            return Ok(false);
        }

        // Checksum-equal bytes can still be garbage if the original copy was
        // bad; smoke-test that the artifact opens as a database file.
        if !self.artifact_opens_as_database(&artifact).await? {
            warn!(
                "Verification of {} failed: artifact is not a valid database file",
                id
            );
            return Ok(false);
        }

        metadata.status = BackupStatus::Verified;
        metadata.verified_at = Some(Utc::now());
        write_metadata(&sidecar, &metadata).await?;

        info!("Backup {} verified", id);
        Ok(true)
    }

    async fn artifact_opens_as_database(&self, artifact: &Path) -> Result<bool> {
        let bytes = fs::read(artifact).await?;
        let valid = valid_sqlite_header(&bytes);
        debug!(
            "Structural check of {}: {}",
            artifact.display(),
            if valid { "ok" } else { "invalid header" }
        );
        Ok(valid)
    }
}

/// Minimal structural check of the standard 100-byte SQLite file header:
/// magic string plus a plausible page size (power of two in 512..=32768, or
/// the literal 1 meaning 65536).
fn valid_sqlite_header(bytes: &[u8]) -> bool {
    if bytes.len() < SQLITE_HEADER_LEN {
        return false;
    }
    if &bytes[..16] != SQLITE_MAGIC {
        return false;
    }
    let page_size = u16::from_be_bytes([bytes[16], bytes[17]]);
    page_size == 1 || (page_size >= 512 && page_size.is_power_of_two())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with_page_size(page_size: u16) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(SQLITE_MAGIC);
        bytes.extend_from_slice(&page_size.to_be_bytes());
        bytes.resize(SQLITE_HEADER_LEN, 0);
        bytes
    }

    #[test]
    fn test_valid_header_accepted() {
        assert!(valid_sqlite_header(&header_with_page_size(4096)));
        assert!(valid_sqlite_header(&header_with_page_size(512)));
        // 1 encodes the maximum page size of 65536
        assert!(valid_sqlite_header(&header_with_page_size(1)));
    }

    #[test]
    fn test_truncated_or_empty_rejected() {
        assert!(!valid_sqlite_header(b""));
        assert!(!valid_sqlite_header(&header_with_page_size(4096)[..50]));
    }

    #[test]
    fn test_wrong_magic_rejected() {
        let mut bytes = header_with_page_size(4096);
        bytes[0] = b'X';
        assert!(!valid_sqlite_header(&bytes));
    }

    #[test]
    fn test_bogus_page_size_rejected() {
        assert!(!valid_sqlite_header(&header_with_page_size(0)));
        assert!(!valid_sqlite_header(&header_with_page_size(100)));
        assert!(!valid_sqlite_header(&header_with_page_size(4097)));
    }
}
