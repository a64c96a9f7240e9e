//! Integration tests for operator cancellation and shutdown of a running
//! broadcast.

use std::time::Duration;

use template_broadcast::dispatch::dispatcher::BroadcastRequest;
use template_broadcast::models::contact::DeliveryStatus;
use template_broadcast::models::progress::JobOutcome;

use super::test_helpers::{harness, plain_template, seed_group, wait_idle, Harness};

const SLOW: Duration = Duration::from_secs(10);

async fn start(h: &Harness, group_id: i64) {
    let contacts = h
        .contacts()
        .list_pending_rows(group_id)
        .await
        .expect("pending");
    let admission = h.dispatcher.accept(BroadcastRequest {
        template_name: "plain_notice".into(),
        group_id,
        group_label: "Clinic A".into(),
        contacts,
    });
    assert!(admission.accepted);
}

async fn wait_for_attempts(h: &Harness, n: usize) {
    let mut rx = h.dispatcher.progress().subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|p| p.sent_count >= n))
        .await
        .expect("attempt in time")
        .expect("publisher alive");
}

#[tokio::test]
async fn cancel_during_pause_stops_remaining_contacts() {
    let h = harness(vec![plain_template()], SLOW).await;
    let gid = seed_group(
        &h,
        "Clinic A",
        &[("Ada", "111"), ("Bola", "222"), ("Chidi", "333")],
    )
    .await;

    start(&h, gid).await;
    wait_for_attempts(&h, 1).await;

    assert!(h.dispatcher.cancel());
    let progress = wait_idle(&h).await;

    assert_eq!(progress.outcome, Some(JobOutcome::Cancelled));
    assert_eq!(progress.sent_count, 1);
    assert_eq!(progress.total, 3);

    let pending = h.contacts().list_pending_rows(gid).await.expect("pending");
    let phones: Vec<_> = pending.iter().map(|r| r.phone.as_str()).collect();
    assert_eq!(phones, vec!["222", "333"]);
    assert_eq!(h.provider.sent().len(), 1);
}

#[tokio::test]
async fn cancel_when_idle_reports_nothing_to_cancel() {
    let h = harness(vec![plain_template()], Duration::ZERO).await;
    assert!(!h.dispatcher.cancel());
}

#[tokio::test]
async fn shutdown_token_stops_running_broadcast() {
    let h = harness(vec![plain_template()], SLOW).await;
    let gid = seed_group(&h, "Clinic A", &[("Ada", "111"), ("Bola", "222")]).await;

    start(&h, gid).await;
    wait_for_attempts(&h, 1).await;

    h.shutdown.cancel();
    let progress = wait_idle(&h).await;

    assert_eq!(progress.outcome, Some(JobOutcome::Cancelled));
    let stored = h.contacts().list(Some(gid)).await.expect("list");
    assert_eq!(
        stored
            .iter()
            .filter(|c| c.status == DeliveryStatus::Sent)
            .count(),
        1
    );
}

#[tokio::test]
async fn new_broadcast_admitted_after_cancellation() {
    let h = harness(vec![plain_template()], SLOW).await;
    let gid = seed_group(&h, "Clinic A", &[("Ada", "111"), ("Bola", "222")]).await;

    start(&h, gid).await;
    wait_for_attempts(&h, 1).await;
    assert!(h.dispatcher.cancel());
    wait_idle(&h).await;

    // Only the unattempted contact remains pending.
    start(&h, gid).await;
    assert_eq!(h.dispatcher.progress().snapshot().total, 1);
    assert!(h.dispatcher.cancel());
    wait_idle(&h).await;
}

#[tokio::test]
async fn cancel_right_after_admission_targets_the_new_job() {
    let h = harness(vec![plain_template()], SLOW).await;
    let first = seed_group(&h, "Clinic A", &[("Ada", "111")]).await;
    let second = seed_group(&h, "Clinic B", &[("Bola", "222"), ("Chidi", "333")]).await;

    start(&h, first).await;
    assert!(h.dispatcher.cancel());
    wait_idle(&h).await;

    // The first job's token is gone; this cancel must reach the second job
    // before it sends anything.
    start(&h, second).await;
    assert!(h.dispatcher.cancel());
    let progress = wait_idle(&h).await;

    assert_eq!(progress.outcome, Some(JobOutcome::Cancelled));
    assert_eq!(progress.sent_count, 0);
    assert_eq!(progress.group_id, Some(second));
    assert!(h.provider.sent().iter().all(|p| p.to != "222"));
}
