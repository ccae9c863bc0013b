use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::DatasetKind;

/// Where dataset archives come from.
#[derive(Clone, Debug)]
pub enum ArchiveSource {
    /// Download `<base_url>/<name>.csv.zip` into `work_dir/temp_<name>.zip`.
    Remote {
        client: Client,
        base_url: String,
        work_dir: PathBuf,
    },
    /// Read `<dir>/<name>.csv.zip` in place.
    Local { dir: PathBuf },
}

/// A dataset archive on local disk. Downloaded archives are deleted when this
/// guard drops, whether processing succeeded or not.
#[derive(Debug)]
pub struct AcquiredArchive {
    path: PathBuf,
    temporary: bool,
}

impl AcquiredArchive {
    fn temporary(path: PathBuf) -> Self {
        Self {
            path,
            temporary: true,
        }
    }

    fn borrowed(path: PathBuf) -> Self {
        Self {
            path,
            temporary: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AcquiredArchive {
    fn drop(&mut self) {
        if !self.temporary || !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "cleaned up temporary archive"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove temporary archive"),
        }
    }
}

pub async fn acquire(source: &ArchiveSource, kind: DatasetKind) -> Result<AcquiredArchive> {
    match source {
        ArchiveSource::Local { dir } => {
            let path = dir.join(kind.archive_name());
            if !path.is_file() {
                anyhow::bail!("{kind} archive not found at {}", path.display());
            }
            info!(dataset = %kind, path = %path.display(), "using local archive");
            Ok(AcquiredArchive::borrowed(path))
        }
        ArchiveSource::Remote {
            client,
            base_url,
            work_dir,
        } => {
            let url = kind.url(base_url);
            let dest = work_dir.join(format!("temp_{}.zip", kind.name()));
            // Guard first so a failed download still gets removed.
            let archive = AcquiredArchive::temporary(dest);
            download_to(client, &url, archive.path())
                .await
                .with_context(|| format!("failed to download {kind} from {url}"))?;
            Ok(archive)
        }
    }
}

async fn download_to(client: &Client, url: &str, dest: &Path) -> Result<()> {
    info!(url, dest = %dest.display(), "downloading archive");
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut resp = client.get(url).send().await?.error_for_status()?;
    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("failed to create {}", dest.display()))?;
    let mut written: u64 = 0;
    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    info!(url, bytes = written, "download complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_source_reads_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sets.csv.zip");
        std::fs::write(&path, b"zip").unwrap();
        let source = ArchiveSource::Local {
            dir: dir.path().to_path_buf(),
        };
        {
            let archive = acquire(&source, DatasetKind::Sets).await.unwrap();
            assert_eq!(archive.path(), path.as_path());
        }
        assert!(path.exists(), "local archives must not be deleted");
    }

    #[tokio::test]
    async fn local_source_missing_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = ArchiveSource::Local {
            dir: dir.path().to_path_buf(),
        };
        let err = acquire(&source, DatasetKind::Minifigs).await.unwrap_err();
        assert!(err.to_string().contains("minifigs archive not found"));
    }

    #[test]
    fn temporary_archive_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_sets.zip");
        std::fs::write(&path, b"partial").unwrap();
        drop(AcquiredArchive::temporary(path.clone()));
        assert!(!path.exists());
    }
}
