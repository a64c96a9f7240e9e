//! Integration tests for the broadcast run: admission, per-contact sends,
//! status persistence, and terminal outcomes.

use std::time::Duration;

use tokio::time::Instant;

use template_broadcast::dispatch::dispatcher::BroadcastRequest;
use template_broadcast::dispatch::payload::{Parameter, PayloadComponent};
use template_broadcast::models::contact::DeliveryStatus;
use template_broadcast::models::progress::JobOutcome;

use super::test_helpers::{harness, plain_template, promo_template, seed_group, wait_idle, Harness};

async fn request(h: &Harness, group_id: i64, template: &str) -> BroadcastRequest {
    let group = h.groups().get_by_id(group_id).await.expect("group");
    BroadcastRequest {
        template_name: template.into(),
        group_id,
        group_label: group.name,
        contacts: h
            .contacts()
            .list_pending_rows(group_id)
            .await
            .expect("pending"),
    }
}

async fn statuses(h: &Harness, group_id: i64) -> Vec<(String, DeliveryStatus)> {
    let mut contacts = h.contacts().list(Some(group_id)).await.expect("list");
    contacts.sort_by_key(|c| c.id);
    contacts.into_iter().map(|c| (c.phone, c.status)).collect()
}

#[tokio::test]
async fn mixed_outcomes_are_persisted_and_counted() {
    let h = harness(vec![promo_template()], Duration::ZERO).await;
    let gid = seed_group(
        &h,
        "Clinic A",
        &[("Ada", "111"), ("Bola", "222"), ("Chidi", "333")],
    )
    .await;
    h.provider.script("222", 500);

    let admission = h.dispatcher.accept(request(&h, gid, "promo_with_image").await);
    assert!(admission.accepted);
    assert_eq!(admission.count, Some(3));

    let progress = wait_idle(&h).await;
    assert_eq!(progress.outcome, Some(JobOutcome::Completed));
    assert_eq!(progress.total, 3);
    assert_eq!(progress.sent_count, 3);
    assert_eq!((progress.succeeded, progress.failed), (2, 1));
    assert_eq!(progress.group_label, "Clinic A");
    assert_eq!(progress.template_name.as_deref(), Some("promo_with_image"));
    assert!(progress.finished_at.is_some());

    assert_eq!(
        statuses(&h, gid).await,
        vec![
            ("111".into(), DeliveryStatus::Sent),
            ("222".into(), DeliveryStatus::Failed),
            ("333".into(), DeliveryStatus::Sent),
        ]
    );
}

#[tokio::test]
async fn payloads_are_personalised_per_contact() {
    let h = harness(vec![promo_template()], Duration::ZERO).await;
    let gid = seed_group(&h, "Clinic A", &[("Ada", "111"), ("", "222")]).await;

    let _ = h.dispatcher.accept(request(&h, gid, "promo_with_image").await);
    wait_idle(&h).await;

    let sent = h.provider.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, "111");
    assert_eq!(sent[0].template.language.code, "en_US");

    let Some(PayloadComponent::Header { parameters }) = sent[0].header() else {
        panic!("expected header");
    };
    assert!(matches!(
        &parameters[0],
        Parameter::Image { image } if image.link == "https://img.example/promo.png"
    ));

    let Some(PayloadComponent::Body { parameters }) = sent[1].body() else {
        panic!("expected body");
    };
    assert_eq!(parameters.len(), 2);
    assert!(parameters
        .iter()
        .all(|p| matches!(p, Parameter::Text { text } if text == "Patient")));

    let button = sent[1]
        .template
        .components
        .iter()
        .find(|c| matches!(c, PayloadComponent::Button { .. }))
        .expect("button");
    assert!(matches!(
        button,
        PayloadComponent::Button { index, parameters, .. }
            if index == "0" && matches!(&parameters[0], Parameter::Text { text } if text == "222")
    ));
}

#[tokio::test]
async fn unknown_template_ends_without_sending() {
    let h = harness(vec![plain_template()], Duration::ZERO).await;
    let gid = seed_group(&h, "Clinic A", &[("Ada", "111"), ("Bola", "222")]).await;

    let admission = h.dispatcher.accept(request(&h, gid, "does_not_exist").await);
    assert!(admission.accepted);

    let progress = wait_idle(&h).await;
    assert_eq!(progress.outcome, Some(JobOutcome::TemplateNotFound));
    assert_eq!(progress.sent_count, 0);
    assert!(h.provider.sent().is_empty());
    assert!(statuses(&h, gid)
        .await
        .iter()
        .all(|(_, s)| *s == DeliveryStatus::Pending));
}

#[tokio::test]
async fn second_admission_while_active_is_rejected() {
    let h = harness(vec![plain_template()], Duration::from_secs(10)).await;
    let gid = seed_group(&h, "Clinic A", &[("Ada", "111"), ("Bola", "222")]).await;
    let other = seed_group(&h, "Clinic B", &[("Chidi", "333")]).await;

    assert!(h.dispatcher.accept(request(&h, gid, "plain_notice").await).accepted);

    let second = h.dispatcher.accept(request(&h, other, "plain_notice").await);
    assert!(!second.accepted);
    assert!(second.count.is_none());
    assert_eq!(
        second.reason.as_deref(),
        Some("Broadcast already in progress")
    );

    let progress = h.dispatcher.progress().snapshot();
    assert!(progress.is_active);
    assert_eq!(progress.total, 2);
    assert_eq!(progress.group_id, Some(gid));

    assert!(h.dispatcher.cancel());
    wait_idle(&h).await;
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let h = harness(vec![plain_template()], Duration::ZERO).await;
    let gid = seed_group(&h, "Empty", &[]).await;

    let admission = h.dispatcher.accept(request(&h, gid, "plain_notice").await);
    assert!(!admission.accepted);
    assert_eq!(
        admission.reason.as_deref(),
        Some("No pending contacts in this group")
    );
    assert!(!h.dispatcher.progress().snapshot().is_active);
}

#[tokio::test]
async fn rerun_only_targets_contacts_not_yet_sent() {
    let h = harness(vec![plain_template()], Duration::ZERO).await;
    let gid = seed_group(&h, "Clinic A", &[("Ada", "111"), ("Bola", "222")]).await;
    h.provider.script("222", 400);

    let _ = h.dispatcher.accept(request(&h, gid, "plain_notice").await);
    wait_idle(&h).await;

    h.provider.script("222", 201);
    let retry = h.dispatcher.accept(request(&h, gid, "plain_notice").await);
    assert_eq!(retry.count, Some(1));
    let progress = wait_idle(&h).await;
    assert_eq!((progress.sent_count, progress.succeeded), (1, 1));

    let sent: Vec<_> = h.provider.sent().into_iter().map(|p| p.to).collect();
    assert_eq!(sent, vec!["111", "222", "222"]);
    assert!(statuses(&h, gid)
        .await
        .iter()
        .all(|(_, s)| *s == DeliveryStatus::Sent));
}

#[tokio::test]
async fn fresh_job_resets_counters() {
    let h = harness(vec![plain_template()], Duration::ZERO).await;
    let first = seed_group(&h, "Clinic A", &[("Ada", "111"), ("Bola", "222")]).await;
    let second = seed_group(&h, "Clinic B", &[("Chidi", "333")]).await;

    let _ = h.dispatcher.accept(request(&h, first, "plain_notice").await);
    let done = wait_idle(&h).await;

    let _ = h.dispatcher.accept(request(&h, second, "plain_notice").await);
    let progress = wait_idle(&h).await;

    assert_ne!(progress.job_id, done.job_id);
    assert_eq!(progress.total, 1);
    assert_eq!(progress.sent_count, 1);
    assert_eq!(progress.group_label, "Clinic B");
}

#[tokio::test]
async fn pause_follows_every_contact_including_the_last() {
    let interval = Duration::from_millis(300);
    let h = harness(vec![plain_template()], interval).await;
    let gid = seed_group(&h, "Clinic A", &[("Ada", "111"), ("Bola", "222")]).await;

    let started = Instant::now();
    let mut rx = h.dispatcher.progress().subscribe();
    assert!(h.dispatcher.accept(request(&h, gid, "plain_notice").await).accepted);

    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|p| p.sent_count >= 2))
        .await
        .expect("second attempt in time")
        .expect("publisher alive");
    assert!(started.elapsed() >= interval);
    assert!(
        h.dispatcher.progress().snapshot().is_active,
        "job stays active through the final pause"
    );

    let progress = wait_idle(&h).await;
    assert!(started.elapsed() >= interval * 2);
    assert_eq!(progress.outcome, Some(JobOutcome::Completed));
}

#[tokio::test]
async fn panicking_sender_releases_the_job_slot() {
    let h = harness(vec![plain_template()], Duration::ZERO).await;
    let gid = seed_group(&h, "Clinic A", &[("Ada", "111"), ("Bola", "222")]).await;
    h.provider.panic_on("222");

    assert!(h.dispatcher.accept(request(&h, gid, "plain_notice").await).accepted);
    let progress = wait_idle(&h).await;

    assert_eq!(progress.outcome, Some(JobOutcome::Aborted));
    assert_eq!(progress.sent_count, 1);
    assert!(!h.dispatcher.cancel());

    let other = seed_group(&h, "Clinic B", &[("Chidi", "333")]).await;
    let next = h.dispatcher.accept(request(&h, other, "plain_notice").await);
    assert!(next.accepted);
    assert_eq!(wait_idle(&h).await.outcome, Some(JobOutcome::Completed));
}
