//! Job-scoped scratch directories.
//!
//! Every job works inside `<scratch_dir>/<job-id>`, so file names never collide
//! between jobs and whatever a failed stage leaves behind can be reclaimed by
//! removing the directory.

use std::path::{Path, PathBuf};

use crate::types::RenditionSpec;

/// Scratch directory owned by one job.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `<root>/<job_id>`.
    pub async fn create(root: &Path, job_id: &str) -> std::io::Result<Self> {
        let path = root.join(job_id);
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Local path for the `index`-th input, keeping the key's file name so the
    /// extension survives.
    pub fn input_path(&self, index: usize, key: &str) -> PathBuf {
        let base = Path::new(key)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("resource");
        self.path.join(format!("{index}-{base}"))
    }

    /// Fresh local path for a rendition output.
    pub fn output_path(&self, spec: &RenditionSpec) -> PathBuf {
        let suffix: String = spec
            .suffix
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.path.join(format!(
            "{suffix}-{}.{}",
            uuid::Uuid::new_v4().simple(),
            spec.format_or_default()
        ))
    }

    /// Remove the directory and anything left in it. Failures are logged.
    pub async fn remove(self) {
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove scratch directory {}: {e}",
                self.path.display()
            ),
        }
    }
}

/// Delete a scratch file, logging instead of failing.
pub async fn remove_file_logged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to delete temporary file {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_remove() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path(), "job-1").await.unwrap();
        let dir = scratch.path().to_path_buf();
        assert!(dir.is_dir());

        std::fs::write(dir.join("leftover"), b"x").unwrap();
        scratch.remove().await;
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_input_path_keeps_file_name() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path(), "job-2").await.unwrap();
        assert_eq!(
            scratch.input_path(3, "/foo/awesome.jpg"),
            scratch.path().join("3-awesome.jpg")
        );
        assert_eq!(scratch.input_path(0, "/"), scratch.path().join("0-resource"));
    }

    #[tokio::test]
    async fn test_output_paths_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path(), "job-3").await.unwrap();
        let spec = RenditionSpec::new("sm/../x", 10, 10);
        let a = scratch.output_path(&spec);
        let b = scratch.output_path(&spec);
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(scratch.path()));
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("jpg"));
    }
}
