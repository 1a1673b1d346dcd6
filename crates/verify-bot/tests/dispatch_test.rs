//! Batch dispatch integration tests.

mod common;

use common::{phones, settings, test_pool, Harness, ScriptedLookup};
use phone_verifier::{Presence, VerifyError};
use session_store::{CheckOutcome, SessionError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use verify_bot::export::render_summary;
use verify_bot::{DispatchError, DispatchSettings, DispatchState, RunContext};

#[tokio::test(start_paused = true)]
async fn test_twelve_numbers_run_in_three_batches() {
    let lookup = Arc::new(
        ScriptedLookup::always(Presence::Unregistered).with_latency(Duration::from_millis(100)),
    );
    let h = Harness::new(
        lookup.clone(),
        test_pool(3, 5),
        settings(5, Duration::from_secs(2)),
        30,
    );
    let numbers = phones(12);

    let report = h
        .dispatcher
        .run(&RunContext::new("s1", "chat-1"), numbers.clone())
        .await
        .unwrap();

    assert_eq!(report.state, DispatchState::Completed);
    assert_eq!(report.batch_sizes, vec![5, 5, 2]);
    assert_eq!(report.delays, 2);
    assert_eq!(report.record.unregistered.len(), 12);
    assert_eq!(report.unchecked(), 0);

    // Every check of batch N starts only after batch N-1 finished and the
    // delay elapsed.
    let calls = lookup.calls().await;
    let started_at = |phone: &String| {
        calls
            .iter()
            .find(|(p, _)| p == phone)
            .map(|(_, at)| *at)
            .unwrap()
    };
    let batches: Vec<&[String]> = numbers.chunks(5).collect();
    for pair in batches.windows(2) {
        let latest_prev = pair[0].iter().map(started_at).max().unwrap();
        let earliest_next = pair[1].iter().map(started_at).min().unwrap();
        assert!(earliest_next - latest_prev >= Duration::from_millis(2100));
    }

    assert!(!h.sessions.is_active("s1").await);
    assert_eq!(h.finish().await, 12);
}

#[tokio::test(start_paused = true)]
async fn test_stop_lets_in_flight_checks_finish() {
    let ctx = RunContext::new("s1", "chat-1");
    let lookup = Arc::new(
        ScriptedLookup::always(Presence::Registered)
            .with_latency(Duration::from_millis(50))
            .raise_stop_after_first(ctx.stop.clone()),
    );
    let h = Harness::new(
        lookup.clone(),
        test_pool(2, 5),
        settings(5, Duration::from_secs(2)),
        30,
    );
    let numbers = phones(12);

    let report = h.dispatcher.run(&ctx, numbers.clone()).await.unwrap();

    assert_eq!(report.state, DispatchState::Stopped);
    assert_eq!(report.batch_sizes, vec![5]);
    assert_eq!(report.delays, 0);
    assert_eq!(report.record.registered.len(), 5);
    assert_eq!(report.unchecked(), 7);

    let first_batch: HashSet<&String> = numbers[..5].iter().collect();
    let calls = lookup.calls().await;
    assert_eq!(calls.len(), 5);
    assert!(calls.iter().all(|(phone, _)| first_batch.contains(phone)));

    assert!(render_summary(&report).contains("Verification stopped"));
    assert_eq!(h.finish().await, 5);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_last_batch_still_completes() {
    let ctx = RunContext::new("s1", "chat-1");
    let lookup = Arc::new(
        ScriptedLookup::always(Presence::Registered)
            .with_latency(Duration::from_millis(50))
            .raise_stop_after_first(ctx.stop.clone()),
    );
    let h = Harness::new(lookup, test_pool(2, 5), settings(5, Duration::from_secs(2)), 30);

    let report = h.dispatcher.run(&ctx, phones(3)).await.unwrap();

    assert_eq!(report.state, DispatchState::Completed);
    assert_eq!(report.batch_sizes, vec![3]);
    assert_eq!(report.record.processed(), 3);
    assert_eq!(report.unchecked(), 0);
    assert!(render_summary(&report).contains("Verification completed"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_run_checks_nothing() {
    let ctx = RunContext::new("s1", "chat-1");
    ctx.stop.raise();
    let lookup = Arc::new(ScriptedLookup::always(Presence::Registered));
    let h = Harness::new(lookup.clone(), test_pool(1, 1), settings(5, Duration::ZERO), 30);

    let report = h.dispatcher.run(&ctx, phones(3)).await.unwrap();

    assert_eq!(report.state, DispatchState::Stopped);
    assert!(report.batch_sizes.is_empty());
    assert_eq!(lookup.call_count().await, 0);
    assert_eq!(report.unchecked(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_are_unresolved_and_silent() {
    let lookup = Arc::new(ScriptedLookup::failing());
    let h = Harness::new(lookup.clone(), test_pool(2, 1), settings(5, Duration::ZERO), 3);
    let notifier = h.notifier.clone();

    let report = h
        .dispatcher
        .run(&RunContext::new("s1", "chat-1"), phones(4))
        .await
        .unwrap();

    assert_eq!(report.state, DispatchState::Completed);
    assert!(report.record.registered.is_empty());
    assert!(report.record.unregistered.is_empty());
    assert_eq!(report.record.unresolved.len(), 4);
    assert_eq!(lookup.call_count().await, 12);

    assert_eq!(h.finish().await, 0);
    assert!(notifier.texts().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_are_disjoint_and_unique() {
    let lookup = Arc::new(ScriptedLookup::new(|phone| {
        match phone.chars().last() {
            Some('7') => Err(VerifyError::InvalidProxy("dead".into())),
            Some(c) if c.to_digit(10).unwrap_or(0) % 2 == 0 => Ok(Presence::Registered),
            _ => Ok(Presence::Unregistered),
        }
    }));
    let h = Harness::new(lookup, test_pool(3, 2), settings(4, Duration::ZERO), 2);
    let notifier = h.notifier.clone();

    let mut numbers = phones(10);
    numbers.push(numbers[0].clone());
    numbers.push(numbers[3].clone());

    let report = h
        .dispatcher
        .run(&RunContext::new("s1", "chat-1"), numbers)
        .await
        .unwrap();

    let record = &report.record;
    let mut seen = HashSet::new();
    for outcome in [
        CheckOutcome::Registered,
        CheckOutcome::Unregistered,
        CheckOutcome::Unresolved,
    ] {
        for phone in record.numbers(outcome) {
            assert!(seen.insert(phone.clone()), "{} recorded twice", phone);
        }
    }
    assert_eq!(seen.len(), 10);
    assert_eq!(record.registered.len(), 5);
    assert_eq!(record.unregistered.len(), 4);
    assert_eq!(record.unresolved, vec!["15550000007"]);

    // One real-time message per terminal classification.
    assert_eq!(h.finish().await, 9);
    assert_eq!(notifier.texts().await.len(), 9);
}

#[tokio::test]
async fn test_empty_pool_refuses_to_start() {
    let lookup = Arc::new(ScriptedLookup::always(Presence::Registered));
    let h = Harness::new(lookup.clone(), test_pool(0, 5), DispatchSettings::default(), 30);

    let result = h
        .dispatcher
        .run(&RunContext::new("s1", "chat-1"), phones(3))
        .await;

    assert!(matches!(result, Err(DispatchError::PoolEmpty)));
    assert!(!h.sessions.is_active("s1").await);
    assert_eq!(lookup.call_count().await, 0);
}

#[tokio::test]
async fn test_concurrent_run_for_same_session_is_rejected() {
    let lookup = Arc::new(ScriptedLookup::always(Presence::Registered));
    let h = Harness::new(lookup, test_pool(1, 5), DispatchSettings::default(), 30);
    h.sessions.open("s1").await.unwrap();

    let result = h
        .dispatcher
        .run(&RunContext::new("s1", "chat-1"), phones(3))
        .await;

    assert!(matches!(
        result,
        Err(DispatchError::Session(SessionError::AlreadyRunning(id))) if id == "s1"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_pool_emptied_mid_run_halts() {
    let pool = test_pool(2, 1);
    let lookup = Arc::new(ScriptedLookup::always(Presence::Registered).purge_on_first(pool.clone()));
    let h = Harness::new(lookup, pool, settings(5, Duration::from_secs(2)), 30);

    let report = h
        .dispatcher
        .run(&RunContext::new("s1", "chat-1"), phones(10))
        .await
        .unwrap();

    assert_eq!(report.state, DispatchState::Stopped);
    assert!(report.pool_exhausted);
    assert_eq!(report.batch_sizes, vec![5]);
    assert!(report.record.processed() >= 1);
    assert!(report.unchecked() >= 5);
    assert!(h.pool.is_empty().await);
    assert!(render_summary(&report).contains("no proxies left"));
}

#[tokio::test(start_paused = true)]
async fn test_status_updates_while_running() {
    let lookup = Arc::new(
        ScriptedLookup::always(Presence::Registered).with_latency(Duration::from_millis(1500)),
    );
    let h = Harness::new(
        lookup,
        test_pool(2, 5),
        DispatchSettings {
            batch_size: 5,
            batch_delay: Duration::from_secs(2),
            status_interval: Duration::from_secs(1),
        },
        30,
    );
    let notifier = h.notifier.clone();

    h.dispatcher
        .run(&RunContext::new("s1", "chat-1"), phones(10))
        .await
        .unwrap();

    let statuses = notifier.statuses.lock().await.clone();
    assert!(statuses.len() >= 3);
    assert!(statuses.iter().all(|(dest, _)| dest == "chat-1"));
    assert!(statuses[0].1.contains("Progress: 0/10 (0%)"));
    assert!(statuses.last().unwrap().1.contains("/10"));
}
