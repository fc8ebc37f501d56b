use bytes::Bytes;
use futures_util::Stream;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use super::error::{ConvertError, InvalidInput};
use super::model::{ConvertedVideo, Job, JobId, JobState};
use crate::common::filename::{extension_of, secure_filename, stem_of};
use crate::config::settings::AppConfig;
use crate::infrastructure::storage::artifact_store::ArtifactStore;
use crate::workers::cleanup::CleanupScheduler;
use crate::workers::transcoder::{TranscodeOutcome, Transcoder};

/// Keeps `<job_id>_<name>` well under common filesystem name limits.
const MAX_STORED_NAME_LEN: usize = 128;

/// Process-wide job settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct JobPolicy {
    pub allowed_extensions: Vec<String>,
    pub transcode_timeout: Duration,
    /// Must outlast the slowest realistic download of the output.
    pub success_cleanup_delay: Duration,
    pub failure_cleanup_delay: Duration,
}

impl JobPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            allowed_extensions: config.allowed_extensions.clone(),
            transcode_timeout: config.transcode_timeout(),
            success_cleanup_delay: config.success_cleanup_delay(),
            failure_cleanup_delay: config.failure_cleanup_delay(),
        }
    }

    /// Checks the declared name and returns the sanitized name to store.
    pub fn validate(&self, declared_filename: &str) -> Result<String, InvalidInput> {
        let declared = declared_filename.trim();
        if declared.is_empty() {
            return Err(InvalidInput::EmptyFilename);
        }

        let extension = extension_of(declared)
            .filter(|ext| self.allowed_extensions.iter().any(|allowed| allowed == ext))
            .ok_or(InvalidInput::UnsupportedExtension)?;

        let safe = secure_filename(declared);
        if extension_of(&safe).is_none() {
            return Ok(format!("upload.{}", extension));
        }
        if safe.len() <= MAX_STORED_NAME_LEN {
            return Ok(safe);
        }

        let keep = MAX_STORED_NAME_LEN.saturating_sub(extension.len() + 1);
        let stem = stem_of(&safe);
        Ok(format!("{}.{}", &stem[..keep.min(stem.len())], extension))
    }
}

/// Owns a conversion from validated upload to guaranteed artifact cleanup.
#[derive(Debug, Clone)]
pub struct ConversionService {
    store: ArtifactStore,
    transcoder: Transcoder,
    cleanup: CleanupScheduler,
    policy: JobPolicy,
}

impl ConversionService {
    pub fn new(
        store: ArtifactStore,
        transcoder: Transcoder,
        cleanup: CleanupScheduler,
        policy: JobPolicy,
    ) -> Self {
        Self {
            store,
            transcoder,
            cleanup,
            policy,
        }
    }

    /// Runs one job end to end.
    ///
    /// Validation happens before any disk or process work. Once the upload
    /// is on disk the rest of the job runs in its own task, so dropping the
    /// returned future (client gone) neither stops the transcoder nor skips
    /// cleanup. Every outcome past validation arms exactly one cleanup batch.
    pub async fn run_conversion_job<S, E>(
        &self,
        upload: S,
        declared_filename: &str,
    ) -> Result<ConvertedVideo, ConvertError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<io::Error>,
    {
        let original_name = self
            .policy
            .validate(declared_filename)
            .inspect_err(|reason| info!(declared = %declared_filename, %reason, "Upload rejected"))?;

        let id = JobId::generate();
        let input_path = self.store.input_path(&id, &original_name);
        let output_path = self.store.output_path(&id);
        let mut job = Job::new(id, original_name, input_path, output_path);
        info!(job_id = %job.id, file = %job.original_name, "Job received");

        let guard = PartialUploadGuard::arm(self.cleanup.clone(), job.input_path.clone());
        let persisted = self.store.persist(&job.input_path, upload).await;
        guard.disarm();

        let bytes = persisted.map_err(|e| {
            if e.kind() == io::ErrorKind::FileTooLarge {
                warn!(job_id = %job.id, "Upload exceeded the size ceiling: {}", e);
                ConvertError::PayloadTooLarge
            } else {
                error!(job_id = %job.id, "Upload failed: {}", e);
                ConvertError::StorageFailure(e)
            }
        })?;
        job.advance(JobState::Saved);
        info!(job_id = %job.id, bytes, path = %job.input_path.display(), "File uploaded");

        let artifacts = vec![job.input_path.clone(), job.output_path.clone()];
        let service = self.clone();
        match tokio::spawn(async move { service.transcode(job).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!("Transcode task aborted: {}", e);
                self.cleanup
                    .schedule_deletion(artifacts, self.policy.failure_cleanup_delay);
                Err(ConvertError::TranscodeFailed {
                    diagnostic: format!("transcode task aborted: {}", e),
                })
            }
        }
    }

    async fn transcode(&self, mut job: Job) -> Result<ConvertedVideo, ConvertError> {
        job.advance(JobState::Transcoding);
        info!(job_id = %job.id, "Starting FFmpeg conversion");

        let timeout = self.policy.transcode_timeout;
        let outcome = self
            .transcoder
            .invoke(&job.input_path, &job.output_path, timeout)
            .await;

        match outcome {
            TranscodeOutcome::Success => {
                job.advance(JobState::Succeeded);
                self.cleanup.schedule_deletion(
                    [job.input_path.clone(), job.output_path.clone()],
                    self.policy.success_cleanup_delay,
                );
                Ok(ConvertedVideo {
                    download_name: job.download_name(),
                    job_id: job.id,
                    path: job.output_path,
                    content_type: "video/mp4",
                })
            }
            TranscodeOutcome::ProcessFailure { exit_code, diagnostic } => {
                job.advance(JobState::Failed);
                error!(job_id = %job.id, exit_code = ?exit_code, "FFmpeg failed: {}", diagnostic);

                let mut doomed = vec![job.input_path.clone()];
                if tokio::fs::try_exists(&job.output_path).await.unwrap_or(true) {
                    doomed.push(job.output_path.clone());
                }
                self.cleanup
                    .schedule_deletion(doomed, self.policy.failure_cleanup_delay);
                Err(ConvertError::TranscodeFailed { diagnostic })
            }
            TranscodeOutcome::Timeout => {
                job.advance(JobState::TimedOut);
                error!(job_id = %job.id, timeout_secs = timeout.as_secs(), "FFmpeg timed out");
                self.cleanup.schedule_deletion(
                    [job.input_path.clone(), job.output_path.clone()],
                    self.policy.failure_cleanup_delay,
                );
                Err(ConvertError::TranscodeTimeout(timeout))
            }
        }
    }
}

/// Removes a half-written input if the job future is dropped mid-upload.
struct PartialUploadGuard {
    cleanup: CleanupScheduler,
    path: Option<PathBuf>,
}

impl PartialUploadGuard {
    fn arm(cleanup: CleanupScheduler, path: PathBuf) -> Self {
        Self {
            cleanup,
            path: Some(path),
        }
    }

    fn disarm(mut self) {
        self.path = None;
    }
}

impl Drop for PartialUploadGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            warn!(path = %path.display(), "Upload abandoned mid-stream");
            self.cleanup.schedule_deletion([path], Duration::ZERO);
        }
    }
}
