use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

pub const MIB: u64 = 1024 * 1024;
pub const DEFAULT_MAX_BYTES: u64 = 500 * MIB;

#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("File too large. Please upload a file smaller than {limit_mb}MB.")]
    TooLarge { size: u64, limit_mb: u64 },
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A file picked for import. Only metadata is read; contents are never opened.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileSelection {
    pub name: String,
    pub path: Option<PathBuf>,
    pub size: u64,
}

impl FileSelection {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            path: None,
            size,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(UploadError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        if !meta.is_file() {
            return Err(UploadError::NotAFile(path.to_path_buf()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            size: meta.len(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl UploadPolicy {
    /// Any file type is accepted; only size is limited.
    pub fn check(&self, file: &FileSelection) -> Result<(), UploadError> {
        if file.size > self.max_bytes {
            tracing::warn!(
                file = %file.name,
                size = file.size,
                max = self.max_bytes,
                "rejected oversized import"
            );
            return Err(UploadError::TooLarge {
                size: file.size,
                limit_mb: self.max_bytes / MIB,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_inclusive() {
        let policy = UploadPolicy::default();
        assert!(policy
            .check(&FileSelection::new("extraction.ufdr", DEFAULT_MAX_BYTES))
            .is_ok());
        let err = policy
            .check(&FileSelection::new("extraction.ufdr", DEFAULT_MAX_BYTES + 1))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "File too large. Please upload a file smaller than 500MB."
        );
    }

    #[test]
    fn smallest_allowed_limit_reads_one_megabyte() {
        let policy = UploadPolicy { max_bytes: MIB };
        let err = policy
            .check(&FileSelection::new("notes.txt", MIB + 1))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "File too large. Please upload a file smaller than 1MB."
        );
    }

    #[test]
    fn any_extension_is_accepted() {
        let policy = UploadPolicy::default();
        for name in ["case.json", "dump.zip", "notes", "photo.HEIC"] {
            assert!(policy.check(&FileSelection::new(name, 10)).is_ok());
        }
    }

    #[test]
    fn reads_size_from_metadata() {
        let dir = std::env::temp_dir().join(format!("cockpit-upload-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.bin");
        std::fs::write(&path, [0u8; 42]).unwrap();
        let file = FileSelection::from_path(&path).unwrap();
        assert_eq!(file.name, "sample.bin");
        assert_eq!(file.size, 42);
        let _ = std::fs::remove_dir_all(&dir);

        assert!(matches!(
            FileSelection::from_path(&dir.join("missing.bin")),
            Err(UploadError::NotFound(_))
        ));
    }
}
