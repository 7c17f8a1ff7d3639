use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type JobId = u64;

/// Remote processing state. Always sourced from the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` end a job; no further progress is expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Path-like references handed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRefs {
    #[serde(rename = "video_path", default)]
    pub input_video: Option<String>,
    #[serde(rename = "audio_path", default)]
    pub input_audio: Option<String>,
    #[serde(rename = "output_path", default)]
    pub output_video: Option<String>,
}

/// One remote job as reported by `GET` on the job resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default, alias = "statusMessage")]
    pub status_message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Server-side progress counter. Passed through, never parsed.
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub use_gan_model: Option<bool>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub files: FileRefs,
}

impl Job {
    /// Minimal record; mostly useful for tests and placeholders.
    pub fn new(id: JobId, status: JobStatus) -> Self {
        Self {
            id,
            status,
            status_message: None,
            name: None,
            description: None,
            progress: None,
            error_message: None,
            use_gan_model: None,
            created_at: None,
            updated_at: None,
            completed_at: None,
            files: FileRefs::default(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }
}

/// Timestamps arrive either as RFC 3339 or as naive date-times without an
/// offset, which the service writes in UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, ParseError, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    const NAIVE_T: &str = "%Y-%m-%dT%H:%M:%S%.f";
    const NAIVE_SPACE: &str = "%Y-%m-%d %H:%M:%S%.f";

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }

    pub(super) fn parse(raw: &str) -> Result<DateTime<Utc>, ParseError> {
        let raw = raw.trim();
        if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
            return Ok(stamp.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, NAIVE_T)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, NAIVE_SPACE))
            .map(|naive| naive.and_utc())
    }
}
