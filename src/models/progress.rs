//! Broadcast job progress snapshot and admission result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the most recent broadcast job ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Every captured contact was attempted.
    Completed,
    /// The requested template was absent from the catalog at execution time.
    TemplateNotFound,
    /// An operator or shutdown cancelled the run.
    Cancelled,
    /// The run stopped unexpectedly (the job task panicked).
    Aborted,
}

/// Readable snapshot of the current (or most recent) broadcast job.
///
/// `sent_count` counts attempts, successful or not; `succeeded` and
/// `failed` split it by outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastProgress {
    /// Identifier of the job this snapshot describes.
    pub job_id: Option<String>,
    /// Whether a job is currently running.
    pub is_active: bool,
    /// Number of contacts captured at admission.
    pub total: usize,
    /// Number of contacts attempted so far.
    pub sent_count: usize,
    /// Attempts the provider accepted.
    pub succeeded: usize,
    /// Attempts the provider rejected or that never reached it.
    pub failed: usize,
    /// Group being broadcast to.
    pub group_id: Option<i64>,
    /// Human-readable group name.
    pub group_label: String,
    /// Template being sent.
    pub template_name: Option<String>,
    /// Admission timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Termination timestamp; `None` while active.
    pub finished_at: Option<DateTime<Utc>>,
    /// Terminal outcome; `None` while active or before the first job.
    pub outcome: Option<JobOutcome>,
}

/// Result of a broadcast admission check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Admission {
    /// Whether a job was started.
    pub accepted: bool,
    /// Rejection reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Number of contacts captured for the started job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Admission {
    /// A started job covering `count` contacts.
    #[must_use]
    pub fn accepted(count: usize) -> Self {
        Self {
            accepted: true,
            reason: None,
            count: Some(count),
        }
    }

    /// A rejection with a descriptive reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
            count: None,
        }
    }
}
