use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::process;

/// Packs a remote repository into one text document.
#[async_trait]
pub trait Packer: Send + Sync {
    async fn pack(&self, remote_url: &str, output: &Path) -> Result<()>;
}

/// [`Packer`] backed by `repomix --remote`.
#[derive(Debug, Default, Clone)]
pub struct Repomix;

impl Repomix {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Packer for Repomix {
    async fn pack(&self, remote_url: &str, output: &Path) -> Result<()> {
        tracing::info!("Packing {}", remote_url);
        let args = vec![
            "--remote".to_string(),
            remote_url.to_string(),
            "--output".to_string(),
            output.display().to_string(),
        ];
        let result = process::run("repomix", &args, None).await?;
        if !result.success() {
            tracing::error!(
                "repomix exited with code {}: {}",
                result.exit_code,
                result.combined().trim()
            );
            return Err(Error::Packaging(remote_url.to_string()));
        }
        Ok(())
    }
}

/// Temporary packed file, removed when dropped.
#[derive(Debug)]
pub struct PackedArtifact {
    path: PathBuf,
}

impl PackedArtifact {
    pub fn new(dir: &Path, prefix: &str, label: &str) -> Self {
        let safe: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        let path = dir.join(format!("{}{}-{}.txt", prefix, safe, std::process::id()));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PackedArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Writes a fixed document, or fails for URLs marked as failing.
    #[derive(Default)]
    pub struct MockPacker {
        failing: Mutex<Vec<String>>,
        pub packed: Mutex<Vec<(String, PathBuf)>>,
    }

    impl MockPacker {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_for(&self, remote_url: &str) {
            self.failing.lock().unwrap().push(remote_url.to_string());
        }
    }

    #[async_trait]
    impl Packer for MockPacker {
        async fn pack(&self, remote_url: &str, output: &Path) -> Result<()> {
            self.packed
                .lock()
                .unwrap()
                .push((remote_url.to_string(), output.to_path_buf()));
            if self.failing.lock().unwrap().iter().any(|u| u == remote_url) {
                // a partial artifact, as a crashed packer would leave behind
                std::fs::write(output, "partial")?;
                return Err(Error::Packaging(remote_url.to_string()));
            }
            std::fs::write(output, format!("packed {}", remote_url))?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let artifact = PackedArtifact::new(dir.path(), "pack-", "owner/repo");
            std::fs::write(artifact.path(), "content").unwrap();
            assert!(artifact.path().exists());
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("pack-owner-repo-"));
    }

    #[test]
    fn test_drop_without_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = PackedArtifact::new(dir.path(), "p-", "x");
        drop(artifact);
    }
}
