//! Storage manager for the shared PDF directory.
//!
//! Stored PDFs are keyed by bare filename. Suggested names are sanitised
//! down to their final path component before they touch the filesystem, so
//! a crafted name like `../../etc/passwd.pdf` can never escape the
//! directory. Two stores under the same name race to last-write-wins;
//! that overwrite semantic is documented, deliberate, and relied on by
//! re-downloads of the same document.
//!
//! Files here are never auto-expired: only [`Storage::clear_all`] (behind
//! an explicit confirmation in the dialogue) or out-of-band administration
//! removes them.

use crate::error::SnipError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use tracing::{info, warn};

/// One entry of the shared directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPdf {
    pub name: String,
    pub size_bytes: u64,
}

/// Outcome of a best-effort bulk delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearOutcome {
    pub deleted: usize,
    pub failed: usize,
}

/// Handle to the shared PDF directory.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    /// Open (creating if needed) the shared directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SnipError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| SnipError::Io {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    /// Reduce a suggested name to a bare filename, stripping any directory
    /// components.
    ///
    /// # Errors
    /// [`SnipError::InvalidName`] when nothing usable remains.
    pub fn sanitize(suggested: &str) -> Result<String, SnipError> {
        let bare = suggested
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        if bare.is_empty() || bare == "." || bare == ".." {
            return Err(SnipError::InvalidName {
                name: suggested.to_string(),
            });
        }
        Ok(bare)
    }

    /// Absolute path a sanitised name maps to. Does not touch the disk.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Write a stream into the shared directory under the sanitised
    /// `suggested` name, silently overwriting same-named prior content.
    pub async fn store(
        &self,
        mut source: impl AsyncRead + Unpin,
        suggested: &str,
    ) -> Result<PathBuf, SnipError> {
        let name = Self::sanitize(suggested)?;
        let path = self.path_for(&name);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| SnipError::Io {
                path: path.clone(),
                source: e,
            })?;
        tokio::io::copy(&mut source, &mut file)
            .await
            .map_err(|e| SnipError::Io {
                path: path.clone(),
                source: e,
            })?;
        info!("Stored PDF: {}", path.display());
        Ok(path)
    }

    /// List stored PDFs with their sizes, in directory enumeration order
    /// (not guaranteed sorted).
    pub async fn list(&self) -> Result<Vec<StoredPdf>, SnipError> {
        let io_err = |e| SnipError::Io {
            path: self.dir.clone(),
            source: e,
        };
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if !is_pdf(&path) {
                continue;
            }
            let meta = entry.metadata().await.map_err(io_err)?;
            if !meta.is_file() {
                continue;
            }
            files.push(StoredPdf {
                name: entry.file_name().to_string_lossy().into_owned(),
                size_bytes: meta.len(),
            });
        }
        Ok(files)
    }

    /// Size on disk of one stored PDF.
    pub async fn size_of(&self, name: &str) -> Result<u64, SnipError> {
        let path = self.path_for(name);
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|_| SnipError::NotFound {
                name: name.to_string(),
            })?;
        Ok(meta.len())
    }

    /// Delete one stored PDF.
    ///
    /// # Errors
    /// [`SnipError::NotFound`] when no file of that name exists.
    pub async fn delete(&self, name: &str) -> Result<(), SnipError> {
        let path = self.path_for(name);
        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SnipError::NotFound {
                    name: name.to_string(),
                }
            } else {
                SnipError::Io { path, source: e }
            }
        })
    }

    /// Best-effort delete of every stored PDF. Continues past individual
    /// failures and reports both counts; never partially fails.
    pub async fn clear_all(&self) -> Result<ClearOutcome, SnipError> {
        let mut outcome = ClearOutcome::default();
        for entry in self.list().await? {
            match self.delete(&entry.name).await {
                Ok(()) => outcome.deleted += 1,
                Err(e) => {
                    warn!("Could not delete stored PDF '{}': {e}", entry.name);
                    outcome.failed += 1;
                }
            }
        }
        info!(
            "Cleared storage: {} deleted, {} failed",
            outcome.deleted, outcome.failed
        );
        Ok(outcome)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directory_components() {
        assert_eq!(Storage::sanitize("report.pdf").unwrap(), "report.pdf");
        assert_eq!(
            Storage::sanitize("../../etc/passwd.pdf").unwrap(),
            "passwd.pdf"
        );
        assert_eq!(
            Storage::sanitize(r"C:\docs\scan.pdf").unwrap(),
            "scan.pdf"
        );
    }

    #[test]
    fn sanitize_rejects_empty_results() {
        assert!(Storage::sanitize("").is_err());
        assert!(Storage::sanitize("dir/").is_err());
        assert!(Storage::sanitize("..").is_err());
        assert!(Storage::sanitize("   ").is_err());
    }

    #[tokio::test]
    async fn store_list_delete_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path()).unwrap();

        storage
            .store(&b"%PDF-1.5 fake"[..], "subdir/report.pdf")
            .await
            .unwrap();
        storage.store(&b"%PDF-1.5 other"[..], "b.pdf").await.unwrap();

        let mut names: Vec<String> =
            storage.list().await.unwrap().into_iter().map(|f| f.name).collect();
        names.sort();
        assert_eq!(names, vec!["b.pdf", "report.pdf"]);
        assert_eq!(storage.size_of("report.pdf").await.unwrap(), 13);

        storage.delete("report.pdf").await.unwrap();
        let err = storage.delete("report.pdf").await.unwrap_err();
        assert!(matches!(err, SnipError::NotFound { .. }));
    }

    #[tokio::test]
    async fn same_name_overwrites_silently() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path()).unwrap();

        storage.store(&b"first"[..], "a.pdf").await.unwrap();
        storage.store(&b"second!"[..], "a.pdf").await.unwrap();

        assert_eq!(storage.list().await.unwrap().len(), 1);
        assert_eq!(storage.size_of("a.pdf").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn list_ignores_non_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path()).unwrap();

        storage.store(&b"x"[..], "doc.pdf").await.unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), b"y")
            .await
            .unwrap();

        let files = storage.list().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "doc.pdf");
    }

    #[tokio::test]
    async fn clear_all_reports_count() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path()).unwrap();

        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            storage.store(&b"x"[..], name).await.unwrap();
        }

        let outcome = storage.clear_all().await.unwrap();
        assert_eq!(outcome.deleted, 3);
        assert_eq!(outcome.failed, 0);
        assert!(storage.list().await.unwrap().is_empty());
    }
}
