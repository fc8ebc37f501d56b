use bytes::Bytes;
use futures_util::Stream;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::common::upload::stream_to_file;
use crate::modules::convert::model::JobId;

const OUTPUT_PREFIX: &str = "converted_";
const OUTPUT_EXTENSION: &str = "mp4";

/// Flat directory holding the transient per-job files.
///
/// Inputs live at `<job_id>_<original_name>`, outputs at
/// `converted_<job_id>.mp4`. The job id prefix is what keeps concurrent
/// jobs apart; nothing in here locks.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(dir = %root.display(), "Artifact store ready");
        Ok(Self { root })
    }

    pub fn input_path(&self, job_id: &JobId, original_name: &str) -> PathBuf {
        self.root.join(format!("{}_{}", job_id, original_name))
    }

    pub fn output_path(&self, job_id: &JobId) -> PathBuf {
        self.root
            .join(format!("{}{}.{}", OUTPUT_PREFIX, job_id, OUTPUT_EXTENSION))
    }

    pub async fn persist<S, E>(&self, path: &Path, upload: S) -> io::Result<u64>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<io::Error>,
    {
        stream_to_file(upload, path).await
    }

    /// Removes job artifacts left behind by an earlier process.
    ///
    /// Only names produced by this store are touched; anything else in the
    /// directory is left alone. Call before accepting jobs.
    pub async fn purge_stale(&self) -> io::Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_job_artifact(name) || !entry.file_type().await?.is_file() {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(file = %name, "Failed to purge stale artifact: {}", e),
            }
        }

        if removed > 0 {
            info!(count = removed, "Purged stale artifacts from a previous run");
        }
        Ok(removed)
    }
}

fn is_job_artifact(name: &str) -> bool {
    if let Some(rest) = name.strip_prefix(OUTPUT_PREFIX) {
        if let Some(id) = rest.strip_suffix(".mp4") {
            return JobId::looks_like(id);
        }
    }

    match name.split_once('_') {
        Some((id, original)) => !original.is_empty() && JobId::looks_like(id),
        None => false,
    }
}
