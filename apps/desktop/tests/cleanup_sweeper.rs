//! Sweeping past-dated reminders from both stores.

mod common;

use std::sync::{Arc, Mutex};

use alarm_core::identity::LegacyId;
use alarm_core::mirror::MirrorEntry;
use alarm_core::types::ReminderId;
use chrono::Duration;
use pretty_assertions::assert_eq;

use common::fixtures::{base_time, mirror_entry, reminder};
use common::{FailingRepository, TestContext};
use loanbook_lib::db::date_utils::start_of_local_day;
use loanbook_lib::db::ReminderRepository;

fn ids(entries: &[MirrorEntry]) -> Vec<LegacyId> {
    entries.iter().map(|e| e.id.clone()).collect()
}

fn text(id: i64) -> LegacyId {
    LegacyId::Text(id.to_string())
}

/// Reminders 1, 2 and 3 dated yesterday, earlier today and tomorrow.
fn seed_three_days(ctx: &TestContext) {
    let today_start = start_of_local_day(base_time());
    let yesterday = reminder(1, Duration::days(-1));
    let mut today = reminder(2, Duration::zero());
    today.scheduled_at = today_start;
    let tomorrow = reminder(3, Duration::days(1));

    let repo = ctx.repository.lock().unwrap();
    let mut entries = Vec::new();
    for r in [&yesterday, &today, &tomorrow] {
        repo.insert(r).unwrap();
        entries.push(mirror_entry(r.id.get(), r.scheduled_at));
    }
    ctx.mirror
        .write_raw(&MirrorEntry::to_collection(&entries).unwrap())
        .unwrap();
}

#[tokio::test]
async fn test_sweep_removes_only_yesterday() {
    let ctx = TestContext::new();
    seed_three_days(&ctx);
    let sweeper = ctx.sweeper();

    let report = sweeper.sweep().await;

    assert_eq!(report.reminders_removed, 1);
    assert_eq!(report.mirror_removed, 1);
    assert!(report.failures.is_empty());

    assert_eq!(ctx.stored(ReminderId::new(1)), None);
    assert!(ctx.stored(ReminderId::new(2)).is_some());
    assert!(ctx.stored(ReminderId::new(3)).is_some());
    assert_eq!(ids(&ctx.mirror_entries().await), vec![text(2), text(3)]);
}

#[tokio::test]
async fn test_second_sweep_finds_nothing() {
    let ctx = TestContext::new();
    seed_three_days(&ctx);
    let sweeper = ctx.sweeper();

    assert_eq!(sweeper.pending().unwrap(), 1);
    sweeper.sweep().await;
    assert_eq!(sweeper.pending().unwrap(), 0);

    let report = sweeper.sweep().await;
    assert_eq!(report.total_removed(), 0);
}

#[tokio::test]
async fn test_unreadable_mirror_dates_are_kept() {
    let ctx = TestContext::new();
    let old = mirror_entry(1, base_time() - Duration::days(3));
    let mut odd = mirror_entry(2, base_time());
    odd.date = "next tuesday".to_string();
    ctx.mirror
        .write_raw(&MirrorEntry::to_collection(&[old, odd]).unwrap())
        .unwrap();

    let report = ctx.sweeper().sweep().await;

    assert_eq!(report.mirror_removed, 1);
    assert_eq!(ids(&ctx.mirror_entries().await), vec![text(2)]);
}

#[tokio::test]
async fn test_repository_failure_does_not_stop_mirror_sweep() {
    let ctx = TestContext::with_repository(Arc::new(Mutex::new(FailingRepository)));
    let old = mirror_entry(1, base_time() - Duration::days(2));
    ctx.mirror
        .write_raw(&MirrorEntry::to_collection(&[old]).unwrap())
        .unwrap();

    let report = ctx.sweeper().sweep().await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.mirror_removed, 1);
    assert!(ctx.mirror_entries().await.is_empty());
}

#[tokio::test]
async fn test_load_calendar_sweeps_and_orders_entries() {
    let ctx = TestContext::new();
    let entries = [
        mirror_entry(4, base_time() + Duration::days(2)),
        mirror_entry(5, base_time() + Duration::days(1) + Duration::hours(2)),
        mirror_entry(6, base_time() - Duration::days(1)),
        mirror_entry(7, base_time() + Duration::days(1)),
    ];
    ctx.mirror
        .write_raw(&MirrorEntry::to_collection(&entries).unwrap())
        .unwrap();

    let calendar = ctx.sweeper().load_calendar().await.unwrap();

    assert_eq!(ids(&calendar), vec![text(7), text(5), text(4)]);
}
