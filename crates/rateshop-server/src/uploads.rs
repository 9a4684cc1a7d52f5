//! Retained copies of imported workbooks.
//!
//! Every web upload is kept on disk under the configured upload directory so
//! an operator can re-check what a batch actually contained. The stored name
//! is `<uuid>_<sanitized original name>`; the batch ledger records it, and
//! deleting a batch removes the file again. Retention is best-effort: a full
//! disk must not fail an import whose rows already landed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Writes the workbook bytes under the upload directory.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] if the file cannot be written.
    pub async fn save(&self, stored_name: &str, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::write(self.dir.join(stored_name), bytes).await
    }

    /// Best-effort removal. A file that is already gone is fine; anything
    /// else is logged and swallowed.
    pub async fn remove(&self, stored_name: &str) {
        let path = self.dir.join(stored_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove stored workbook");
            }
        }
    }
}

/// Flattens a client-supplied filename to something safe to join onto the
/// upload directory: final path component only, with everything outside
/// `[A-Za-z0-9.-_]` replaced by `_`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.xlsx");

    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_filename("junho-2025.xlsx"), "junho-2025.xlsx");
    }

    #[test]
    fn sanitize_replaces_spaces_and_accents() {
        assert_eq!(
            sanitize_filename("tarifas junho ç.xlsx"),
            "tarifas_junho__.xlsx"
        );
    }

    #[test]
    fn sanitize_strips_directory_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\rates\\junho.xlsx"), "C__rates_junho.xlsx");
    }

    #[tokio::test]
    async fn save_and_remove_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path().to_path_buf());

        store.save("abc_rates.xlsx", b"PK fake").await.expect("save");
        let on_disk = tokio::fs::read(dir.path().join("abc_rates.xlsx"))
            .await
            .expect("read back");
        assert_eq!(on_disk, b"PK fake");

        store.remove("abc_rates.xlsx").await;
        assert!(!dir.path().join("abc_rates.xlsx").exists());
    }

    #[tokio::test]
    async fn remove_of_missing_file_is_silent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path().to_path_buf());
        store.remove("never-existed.xlsx").await;
    }
}
