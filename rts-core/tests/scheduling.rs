/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! End-to-end scenarios on a paused, auto-advancing clock.

use std::sync::Arc;
use std::time::Duration;

use rts_core::clock::Millis;
use rts_core::engine::{start_edf, start_rm, EngineConfig, Policy};
use rts_core::event::{Event, EventKind, MemorySink};
use rts_core::job::JobSpec;

fn timestamps(events: &[Event]) -> Vec<Millis> {
    events.iter().map(|e| e.timestamp_ms).collect()
}

async fn run_for(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ── EDF ───────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn edf_reference_set_meets_every_deadline() {
    let sink = Arc::new(MemorySink::new());
    let handle = start_edf(EngineConfig::reference(Policy::Edf), sink.clone()).unwrap();

    run_for(2_000).await;
    handle.halt();

    let events = sink.events();
    assert!(
        events.iter().all(|e| e.kind != EventKind::Miss),
        "unexpected miss: {events:?}"
    );

    for (job, period, offset, releases) in [
        ("Task1", 200, 10, 10),
        ("Task2", 500, 20, 4),
        ("Task3", 1_000, 30, 2),
    ] {
        let released = sink.of(EventKind::Release, job);
        let started = sink.of(EventKind::Start, job);
        let completed = sink.of(EventKind::Complete, job);

        assert_eq!(released.len(), releases, "{job} releases");
        assert_eq!(started.len(), releases, "{job} starts");
        assert_eq!(completed.len(), releases, "{job} completions");

        // Deadlines advance by exactly one period, anchored at the offset.
        let deadlines: Vec<Millis> = released.iter().filter_map(Event::deadline).collect();
        let expected: Vec<Millis> = (1..=releases as u64).map(|k| offset + k * period).collect();
        assert_eq!(deadlines, expected, "{job} deadlines");

        // Each START carries the deadline of the activation it runs.
        let start_deadlines: Vec<Millis> = started.iter().filter_map(Event::deadline).collect();
        assert_eq!(start_deadlines, expected, "{job} START detail");

        // Never released before its release instant.
        for (r, d) in timestamps(&released).iter().zip(&deadlines) {
            assert!(*r >= d - period, "{job} released early at {r}");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn edf_first_activation_runs_alone() {
    let sink = Arc::new(MemorySink::new());
    let handle = start_edf(EngineConfig::reference(Policy::Edf), sink.clone()).unwrap();

    run_for(60).await;
    handle.halt();

    let task1_start = sink.of(EventKind::Start, "Task1");
    let task1_done = sink.of(EventKind::Complete, "Task1");
    assert_eq!(timestamps(&task1_start), vec![10]);
    assert_eq!(timestamps(&task1_done), vec![50]);
}

#[tokio::test(start_paused = true)]
async fn edf_overload_reports_miss_for_the_later_job() {
    let jobs = vec![JobSpec::new("J1", 100, 80), JobSpec::new("J2", 100, 80)];
    let sink = Arc::new(MemorySink::new());
    let handle = start_edf(EngineConfig::with_jobs(jobs), sink.clone()).unwrap();

    run_for(170).await;
    handle.halt();

    // Equal deadlines: registry order decides.
    assert_eq!(timestamps(&sink.of(EventKind::Start, "J1"))[0], 0);
    assert_eq!(timestamps(&sink.of(EventKind::Start, "J2"))[0], 80);

    let misses = sink.of(EventKind::Miss, "J2");
    assert_eq!(misses.len(), 1, "{misses:?}");
    assert_eq!(misses[0].timestamp_ms, 160);
    assert_eq!(misses[0].deadline(), Some(100));

    assert!(sink.of(EventKind::Miss, "J1").is_empty());
}

#[tokio::test(start_paused = true)]
async fn edf_miss_follows_completion_in_the_log() {
    let jobs = vec![JobSpec::new("J1", 100, 80), JobSpec::new("J2", 100, 80)];
    let sink = Arc::new(MemorySink::new());
    let handle = start_edf(EngineConfig::with_jobs(jobs), sink.clone()).unwrap();

    run_for(170).await;
    handle.halt();

    let events = sink.events();
    let miss = events
        .iter()
        .position(|e| e.kind == EventKind::Miss)
        .unwrap();
    let prev = &events[miss - 1];
    assert_eq!(prev.kind, EventKind::Complete);
    assert_eq!(prev.job, "J2");
}

/// START and COMPLETE of one job strictly alternate, beginning with START.
fn assert_never_woken_twice(sink: &MemorySink, job: &str) {
    let mut running = false;
    for e in sink.events().iter().filter(|e| e.job == job) {
        match e.kind {
            EventKind::Start => {
                assert!(!running, "{job} started again at {} before completing", e.timestamp_ms);
                running = true;
            }
            EventKind::Complete => {
                assert!(running, "{job} completed at {} without a start", e.timestamp_ms);
                running = false;
            }
            _ => {}
        }
    }
}

#[tokio::test(start_paused = true)]
async fn edf_overrun_gives_up_after_one_period_and_misses_once_per_deadline() {
    let jobs = vec![JobSpec::new("J", 100, 250)];
    let sink = Arc::new(MemorySink::new());
    let handle = start_edf(EngineConfig::with_jobs(jobs), sink.clone()).unwrap();

    run_for(620).await;
    handle.halt();

    // Given up one millisecond past each bound, one MISS per deadline.
    let misses: Vec<(Millis, Option<Millis>)> = sink
        .of(EventKind::Miss, "J")
        .iter()
        .map(|e| (e.timestamp_ms, e.deadline()))
        .collect();
    assert_eq!(
        misses,
        vec![(101, Some(100)), (351, Some(200)), (601, Some(300))]
    );

    // Every release gets the next deadline: no skipped or doubled advance.
    let released: Vec<(Millis, Option<Millis>)> = sink
        .of(EventKind::Release, "J")
        .iter()
        .map(|e| (e.timestamp_ms, e.deadline()))
        .collect();
    assert_eq!(
        released,
        vec![(0, Some(100)), (250, Some(200)), (500, Some(300))]
    );

    assert_eq!(timestamps(&sink.of(EventKind::Complete, "J")), vec![250, 500]);
    assert_never_woken_twice(&sink, "J");
}

#[tokio::test(start_paused = true)]
async fn edf_overlapping_overruns_keep_workers_serialised() {
    let jobs = vec![JobSpec::new("B", 50, 6), JobSpec::new("A", 100, 150)];
    let sink = Arc::new(MemorySink::new());
    let handle = start_edf(EngineConfig::with_jobs(jobs), sink.clone()).unwrap();

    run_for(200).await;
    handle.halt();

    // A's late completion at 156 is picked up while B is dispatched, and A
    // is released again with the next deadline.
    assert_eq!(timestamps(&sink.of(EventKind::Complete, "A")), vec![156]);
    let a_released: Vec<Option<Millis>> = sink
        .of(EventKind::Release, "A")
        .iter()
        .map(Event::deadline)
        .collect();
    assert_eq!(a_released, vec![Some(100), Some(200)]);

    for job in ["A", "B"] {
        assert_never_woken_twice(&sink, job);
        let deadlines: Vec<Option<Millis>> = sink
            .of(EventKind::Miss, job)
            .iter()
            .map(Event::deadline)
            .collect();
        let mut unique = deadlines.clone();
        unique.dedup();
        assert_eq!(deadlines, unique, "{job} missed one deadline twice");
    }
}

#[tokio::test(start_paused = true)]
async fn edf_waiting_job_is_not_reported_running() {
    let jobs = vec![JobSpec::new("J1", 100, 80), JobSpec::new("J2", 100, 80)];
    let sink = Arc::new(MemorySink::new());
    let handle = start_edf(EngineConfig::with_jobs(jobs), sink.clone()).unwrap();
    let telemetry = handle.telemetry();

    // J2 is released at 0 but waits behind J1 until 80.
    run_for(40).await;
    assert!(!sink.of(EventKind::Release, "J2").is_empty());
    assert_eq!(telemetry.snapshot(), vec![1, 0]);

    run_for(80).await;
    assert_eq!(telemetry.snapshot(), vec![0, 1]);
    handle.halt();
}

// ── RM ────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn rm_highest_priority_starts_on_time_without_drift() {
    let sink = Arc::new(MemorySink::new());
    let handle = start_rm(EngineConfig::reference(Policy::Rm), sink.clone()).unwrap();

    run_for(1_990).await;
    handle.halt();

    let starts = timestamps(&sink.of(EventKind::Start, "Task1"));
    assert_eq!(starts.len(), 10, "{starts:?}");
    for (k, ts) in starts.iter().enumerate() {
        let release = k as u64 * 200;
        assert!(
            (release..=release + 2).contains(ts),
            "activation {k} started at {ts}"
        );
    }

    // RM starts carry no deadline.
    assert!(sink
        .of(EventKind::Start, "Task1")
        .iter()
        .all(|e| e.detail.is_none()));
}

#[tokio::test(start_paused = true)]
async fn rm_lower_priorities_are_delayed_not_dropped() {
    let sink = Arc::new(MemorySink::new());
    let handle = start_rm(EngineConfig::reference(Policy::Rm), sink.clone()).unwrap();

    run_for(1_990).await;
    handle.halt();

    assert_eq!(sink.of(EventKind::Start, "Task2").len(), 4);
    assert_eq!(sink.of(EventKind::Complete, "Task2").len(), 4);
    assert_eq!(sink.of(EventKind::Start, "Task3").len(), 2);
    assert_eq!(sink.of(EventKind::Complete, "Task3").len(), 2);

    // Task2 waits for Task1, Task3 for both.
    assert_eq!(timestamps(&sink.of(EventKind::Start, "Task2"))[0], 40);
    assert_eq!(timestamps(&sink.of(EventKind::Start, "Task3"))[0], 120);

    // Task3 is preempted by Task1 at 200, so it finishes 40 ms late.
    let t3_done = timestamps(&sink.of(EventKind::Complete, "Task3"))[0];
    assert!((280..=283).contains(&t3_done), "Task3 completed at {t3_done}");

    assert!(sink.events().iter().all(|e| e.kind != EventKind::Miss));
    assert!(sink.events().iter().all(|e| e.kind != EventKind::Release));
}

#[tokio::test(start_paused = true)]
async fn rm_telemetry_mirrors_running_state() {
    let sink = Arc::new(MemorySink::new());
    let handle = start_rm(EngineConfig::reference(Policy::Rm), sink.clone()).unwrap();
    let telemetry = handle.telemetry();

    run_for(1_010).await;
    assert_eq!(telemetry.snapshot(), vec![1, 0, 0]);
    assert_eq!(telemetry.plot_line(), "1 0 0");

    run_for(940).await;
    assert_eq!(telemetry.snapshot(), vec![0, 0, 0]);
    handle.halt();
}

// ── Contention ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn blocked_job_falls_back_after_bounded_wait() {
    let jobs = vec![JobSpec::new("H", 100, 20), JobSpec::new("L", 1_000, 400)];
    let sink = Arc::new(MemorySink::new());
    let handle = start_rm(EngineConfig::with_jobs(jobs), sink.clone()).unwrap();
    let resource = handle.resource();

    run_for(180).await;
    handle.halt();

    // H arrives at 100 while L holds the lock; it gives up at ~150 and still
    // finishes its activation.
    let h_done = timestamps(&sink.of(EventKind::Complete, "H"));
    assert_eq!(h_done.len(), 2, "{h_done:?}");
    assert_eq!(h_done[0], 20);
    assert!((165..=180).contains(&h_done[1]), "H completed at {}", h_done[1]);

    assert_eq!(resource.stats().timed_out(), 1);
    assert_eq!(resource.stats().acquired(), 2);

    // The degraded acquisition is not an event of its own.
    assert!(sink
        .events()
        .iter()
        .all(|e| matches!(e.kind, EventKind::Start | EventKind::Complete)));
}
