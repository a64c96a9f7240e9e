//! Broadcast dispatcher: admission gate and paced background execution.
//!
//! [`BroadcastDispatcher::accept`] is synchronous and never waits: it either
//! rejects immediately or claims the job slot and spawns the run. The run
//! resolves the template, then for each captured contact builds a payload,
//! sends it, persists the contact's status, counts the attempt, and pauses
//! for the send interval. It checks for cancellation before each contact and
//! during each pause.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::analyzer::analyze;
use super::payload::PayloadBuilder;
use super::progress::{JobStart, ProgressPublisher};
use crate::models::contact::ContactRow;
use crate::models::progress::{Admission, JobOutcome};
use crate::persistence::contact_repo::ContactRepo;
use crate::provider::catalog::TemplateCatalog;
use crate::provider::MessageSender;

/// Everything a broadcast needs, captured at admission time.
#[derive(Debug, Clone)]
pub struct BroadcastRequest {
    /// Name of the template to send.
    pub template_name: String,
    /// Target group.
    pub group_id: i64,
    /// Group name shown in progress snapshots.
    pub group_label: String,
    /// Contacts to attempt, in order.
    pub contacts: Vec<ContactRow>,
}

/// Runs at most one broadcast at a time.
#[derive(Clone)]
pub struct BroadcastDispatcher {
    catalog: Arc<TemplateCatalog>,
    sender: Arc<dyn MessageSender>,
    contacts: ContactRepo,
    builder: Arc<PayloadBuilder>,
    progress: Arc<ProgressPublisher>,
    send_interval: Duration,
    shutdown: CancellationToken,
    active_cancel: Arc<Mutex<Option<CancellationToken>>>,
}

impl BroadcastDispatcher {
    /// Assemble a dispatcher. Job tokens are children of `shutdown`, so
    /// cancelling it stops any running broadcast.
    #[must_use]
    pub fn new(
        catalog: Arc<TemplateCatalog>,
        sender: Arc<dyn MessageSender>,
        contacts: ContactRepo,
        builder: Arc<PayloadBuilder>,
        send_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            sender,
            contacts,
            builder,
            progress: Arc::new(ProgressPublisher::new()),
            send_interval,
            shutdown,
            active_cancel: Arc::new(Mutex::new(None)),
        }
    }

    /// Read-only progress view.
    #[must_use]
    pub fn progress(&self) -> &Arc<ProgressPublisher> {
        &self.progress
    }

    /// Admit and start a broadcast, or reject it immediately.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn accept(&self, request: BroadcastRequest) -> Admission {
        let start = JobStart {
            job_id: Uuid::new_v4().to_string(),
            group_id: request.group_id,
            group_label: request.group_label.clone(),
            template_name: request.template_name.clone(),
            total: request.contacts.len(),
        };

        // The slot lock spans admission so `cancel` never sees an active job
        // paired with another job's token.
        let mut slot = self.lock_slot();
        if let Err(rejection) = self.progress.try_begin(&start) {
            info!(
                group_id = request.group_id,
                template = %request.template_name,
                %rejection,
                "broadcast rejected"
            );
            return Admission::rejected(rejection.to_string());
        }
        let cancel = self.shutdown.child_token();
        *slot = Some(cancel.clone());
        drop(slot);

        info!(
            job_id = %start.job_id,
            group_id = start.group_id,
            template = %start.template_name,
            total = start.total,
            "broadcast accepted"
        );

        let span = info_span!("broadcast", job_id = %start.job_id);
        let this = self.clone();
        tokio::spawn(
            async move {
                let guard = JobGuard::new(&this);
                let outcome = this
                    .run(request.template_name, request.contacts, cancel)
                    .await;
                guard.finish(outcome);
            }
            .instrument(span),
        );

        Admission::accepted(start.total)
    }

    /// Request cancellation of the running broadcast.
    ///
    /// Returns `false` when no broadcast is active.
    pub fn cancel(&self) -> bool {
        let slot = self.lock_slot();
        if !self.progress.snapshot().is_active {
            return false;
        }
        match slot.as_ref() {
            Some(token) => {
                token.cancel();
                info!("broadcast cancellation requested");
                true
            }
            None => false,
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the job's token and publish its terminal outcome.
    fn complete(&self, outcome: JobOutcome) {
        let mut slot = self.lock_slot();
        *slot = None;
        self.progress.finish(outcome);
    }

    async fn run(
        &self,
        template_name: String,
        contacts: Vec<ContactRow>,
        cancel: CancellationToken,
    ) -> JobOutcome {
        let Some(template) = self.catalog.find(&template_name).await else {
            warn!(template = %template_name, "template not in catalog, broadcast aborted");
            return JobOutcome::TemplateNotFound;
        };

        let plan = analyze(&template);
        let total = contacts.len();

        for (index, row) in contacts.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!(attempted = index, total, "broadcast cancelled");
                return JobOutcome::Cancelled;
            }

            let payload = self.builder.build(
                &row.phone,
                row.name.as_deref().unwrap_or_default(),
                &template,
                &plan,
            );
            let outcome = self.sender.send(&payload).await;
            let status = outcome.delivery_status();

            // Persist before counting.
            if let Err(err) = self.contacts.set_status(row.id, status).await {
                error!(contact_id = row.id, %err, "failed to persist delivery status");
            }
            self.progress.record_attempt(status);
            info!(
                contact_id = row.id,
                code = outcome.status_code,
                status = status.as_str(),
                "contact attempted"
            );

            let interrupted = tokio::select! {
                biased;
                () = cancel.cancelled() => true,
                () = tokio::time::sleep(self.send_interval) => false,
            };
            if interrupted && index + 1 < total {
                info!(attempted = index + 1, total, "broadcast cancelled");
                return JobOutcome::Cancelled;
            }
        }

        let snapshot = self.progress.snapshot();
        info!(
            attempted = snapshot.sent_count,
            succeeded = snapshot.succeeded,
            failed = snapshot.failed,
            "broadcast completed"
        );
        JobOutcome::Completed
    }
}

/// Publishes the job's outcome when the job task ends, including by panic.
struct JobGuard<'a> {
    dispatcher: &'a BroadcastDispatcher,
    outcome: Option<JobOutcome>,
}

impl<'a> JobGuard<'a> {
    fn new(dispatcher: &'a BroadcastDispatcher) -> Self {
        Self {
            dispatcher,
            outcome: None,
        }
    }

    fn finish(mut self, outcome: JobOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(|| {
            error!("broadcast task ended without an outcome");
            JobOutcome::Aborted
        });
        self.dispatcher.complete(outcome);
    }
}
