use std::fmt;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Random 128-bit job identifier rendered as 32 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `value` has the shape of a generated id.
    pub fn looks_like(value: &str) -> bool {
        value.len() == 32 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Received,
    Saved,
    Transcoding,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Received, JobState::Saved)
                | (JobState::Saved, JobState::Transcoding)
                | (JobState::Transcoding, JobState::Succeeded)
                | (JobState::Transcoding, JobState::Failed)
                | (JobState::Transcoding, JobState::TimedOut)
        )
    }
}

/// One conversion, alive for the duration of a single request.
#[derive(Debug)]
pub struct Job {
    pub id: JobId,
    pub original_name: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    state: JobState,
}

impl Job {
    pub fn new(id: JobId, original_name: String, input_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            id,
            original_name,
            input_path,
            output_path,
            state: JobState::Received,
        }
    }

    /// Moves the job forward. Transitions outside the lifecycle are bugs.
    pub fn advance(&mut self, next: JobState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal job transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(job_id = %self.id, from = ?self.state, to = ?next, "Job state changed");
        self.state = next;
    }

    /// Name offered to the browser for the converted file.
    pub fn download_name(&self) -> String {
        format!("{}_aac.mp4", crate::common::filename::stem_of(&self.original_name))
    }
}

/// A finished conversion, ready to be streamed back.
///
/// The file stays on disk for at least the success grace delay after the
/// job returns.
#[derive(Debug, Clone)]
pub struct ConvertedVideo {
    pub job_id: JobId,
    pub path: PathBuf,
    pub download_name: String,
    pub content_type: &'static str,
}
