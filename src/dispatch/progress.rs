//! Process-wide broadcast job state.
//!
//! The [`ProgressPublisher`] owns the single job record. Readers take
//! snapshots or subscribe to changes; only the dispatcher mutates it. The
//! admission check-and-set runs inside one `watch` write lock, so two
//! concurrent admissions can never both observe an idle state.

use std::fmt::{Display, Formatter};

use chrono::Utc;
use tokio::sync::watch;

use crate::models::contact::DeliveryStatus;
use crate::models::progress::{BroadcastProgress, JobOutcome};

/// Why an admission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionRejection {
    /// Another job is still running.
    AlreadyActive,
    /// The batch has no contacts.
    NothingToDo,
}

impl Display for AdmissionRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "Broadcast already in progress"),
            Self::NothingToDo => write!(f, "No pending contacts in this group"),
        }
    }
}

/// Identity of a job being admitted.
#[derive(Debug, Clone)]
pub(crate) struct JobStart {
    pub job_id: String,
    pub group_id: i64,
    pub group_label: String,
    pub template_name: String,
    pub total: usize,
}

/// Owner of the broadcast job snapshot.
#[derive(Debug)]
pub struct ProgressPublisher {
    tx: watch::Sender<BroadcastProgress>,
}

impl Default for ProgressPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressPublisher {
    /// Create a publisher in the idle state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(BroadcastProgress::default());
        Self { tx }
    }

    /// Copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> BroadcastProgress {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BroadcastProgress> {
        self.tx.subscribe()
    }

    /// Resolve once no job is active.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|progress| !progress.is_active).await;
    }

    /// Atomically admit a job if none is active and the batch is non-empty.
    pub(crate) fn try_begin(&self, start: &JobStart) -> Result<(), AdmissionRejection> {
        let mut verdict = Ok(());
        self.tx.send_if_modified(|state| {
            if state.is_active {
                verdict = Err(AdmissionRejection::AlreadyActive);
                return false;
            }
            if start.total == 0 {
                verdict = Err(AdmissionRejection::NothingToDo);
                return false;
            }
            *state = BroadcastProgress {
                job_id: Some(start.job_id.clone()),
                is_active: true,
                total: start.total,
                sent_count: 0,
                succeeded: 0,
                failed: 0,
                group_id: Some(start.group_id),
                group_label: start.group_label.clone(),
                template_name: Some(start.template_name.clone()),
                started_at: Some(Utc::now()),
                finished_at: None,
                outcome: None,
            };
            true
        });
        verdict
    }

    /// Count one attempted contact.
    pub(crate) fn record_attempt(&self, status: DeliveryStatus) {
        self.tx.send_modify(|state| {
            state.sent_count += 1;
            if status == DeliveryStatus::Sent {
                state.succeeded += 1;
            } else {
                state.failed += 1;
            }
        });
    }

    /// Return to idle with a terminal outcome.
    pub(crate) fn finish(&self, outcome: JobOutcome) {
        self.tx.send_modify(|state| {
            state.is_active = false;
            state.finished_at = Some(Utc::now());
            state.outcome = Some(outcome);
        });
    }
}
