// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{ProgressSink, SHUTDOWN_MESSAGE, TaskQueue};
use crate::error::{QueueError, SardineError};
use crate::task::{QueueEvent, TaskKind, TaskPayload, TaskRequest, TaskResult};
use flume::Receiver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

fn echo(request: &TaskRequest, _progress: &ProgressSink) -> TaskResult {
    TaskResult::ok(request, request.args.join(" "), TaskPayload::None)
}

fn next_completed(events: &Receiver<QueueEvent>) -> TaskResult {
    loop {
        match events.recv_timeout(WAIT).expect("no event before timeout") {
            QueueEvent::Completed(result) => return result,
            QueueEvent::Progress(_) => {}
        }
    }
}

#[test]
fn test_result_identity() {
    let (queue, events) = TaskQueue::start(echo).unwrap();
    let kinds = [TaskKind::Fetch, TaskKind::GetDiff, TaskKind::Stash];
    let ids: Vec<_> = kinds
        .iter()
        .map(|kind| queue.submit(*kind, "/repo", vec![kind.to_string()]).unwrap())
        .collect();
    assert_eq!(ids, [1, 2, 3]);

    for (id, kind) in ids.iter().zip(kinds) {
        let result = next_completed(&events);
        assert_eq!((result.request_id, result.kind), (*id, kind));
        assert!(result.success);
    }
}

#[test]
fn test_handler_cannot_forge_identity() {
    let (queue, events) = TaskQueue::start(|request: &TaskRequest, _: &ProgressSink| {
        let mut result = TaskResult::ok(request, "", TaskPayload::None);
        result.request_id = 999;
        result.kind = TaskKind::Push;
        result
    })
    .unwrap();
    let id = queue.submit(TaskKind::Reset, "/repo", Vec::new()).unwrap();
    let result = next_completed(&events);
    assert_eq!((result.request_id, result.kind), (id, TaskKind::Reset));
}

#[test]
fn test_mutual_exclusion_under_many_producers() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let handler = {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        move |request: &TaskRequest, _: &ProgressSink| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
            active.fetch_sub(1, Ordering::SeqCst);
            TaskResult::ok(request, "", TaskPayload::None)
        }
    };
    let (queue, events) = TaskQueue::start(handler).unwrap();
    let queue = Arc::new(queue);

    let producers = 8;
    let per_producer = 10;
    let barrier = Arc::new(Barrier::new(producers));
    let threads: Vec<_> = (0..producers)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_producer {
                    queue.submit(TaskKind::CheckStatus, "/repo", Vec::new()).unwrap();
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    let mut ids: Vec<_> = (0..producers * per_producer)
        .map(|_| next_completed(&events).request_id)
        .collect();
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), producers * per_producer);
}

#[test]
fn test_fifo_completion_order() {
    let (queue, events) = TaskQueue::start(echo).unwrap();
    let ids: Vec<_> = (0..20)
        .map(|i| queue.submit(TaskKind::Fetch, "/repo", vec![i.to_string()]).unwrap())
        .collect();
    let completed: Vec<_> = (0..20).map(|_| next_completed(&events).request_id).collect();
    assert_eq!(completed, ids);
}

#[test]
fn test_cancel_only_affects_queued_requests() {
    let gate = Arc::new(Barrier::new(2));
    let handler = {
        let gate = Arc::clone(&gate);
        move |request: &TaskRequest, _: &ProgressSink| {
            if request.kind == TaskKind::Pull {
                gate.wait();
            }
            TaskResult::ok(request, "", TaskPayload::None)
        }
    };
    let (queue, events) = TaskQueue::start(handler).unwrap();

    let running = queue.submit(TaskKind::Pull, "/repo", Vec::new()).unwrap();
    let queued = queue.submit(TaskKind::Fetch, "/repo", Vec::new()).unwrap();
    let kept = queue.submit(TaskKind::Push, "/repo", Vec::new()).unwrap();

    // Wait until the worker has taken the first request
    while queue.pending() != 2 {
        thread::yield_now();
    }
    assert_eq!(queue.cancel(running), 0);
    assert_eq!(queue.cancel(queued), 1);
    assert_eq!(queue.cancel(queued), 0);
    gate.wait();

    let delivered: Vec<_> = (0..2).map(|_| next_completed(&events).request_id).collect();
    assert_eq!(delivered, [running, kept]);
    assert!(events.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn test_shutdown_fails_pending_and_rejects_new_work() {
    let gate = Arc::new(Barrier::new(2));
    let handler = {
        let gate = Arc::clone(&gate);
        move |request: &TaskRequest, _: &ProgressSink| {
            if request.kind == TaskKind::Pull {
                gate.wait();
            }
            TaskResult::ok(request, "done", TaskPayload::None)
        }
    };
    let (mut queue, events) = TaskQueue::start(handler).unwrap();
    let first = queue.submit(TaskKind::Pull, "/repo", Vec::new()).unwrap();
    let second = queue.submit(TaskKind::Fetch, "/repo", Vec::new()).unwrap();
    while queue.pending() != 1 {
        thread::yield_now();
    }

    let releaser = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            gate.wait();
        })
    };
    queue.shutdown();
    releaser.join().unwrap();
    assert!(!queue.is_running());

    let a = next_completed(&events);
    assert_eq!((a.request_id, a.success), (first, true));
    let b = next_completed(&events);
    assert_eq!((b.request_id, b.success), (second, false));
    assert_eq!(b.message, SHUTDOWN_MESSAGE);
    assert_eq!(b.payload, TaskPayload::None);

    let err = queue.submit(TaskKind::Fetch, "/repo", Vec::new()).unwrap_err();
    assert!(matches!(err, SardineError::Queue(e) if matches!(*e, QueueError::ShutDown)));

    // Worker is gone, so the channel disconnects once drained
    assert!(events.recv_timeout(WAIT).is_err());
}

#[test]
fn test_panicking_handler_yields_failed_result() {
    let (queue, events) = TaskQueue::start(|request: &TaskRequest, _: &ProgressSink| {
        assert!(request.kind != TaskKind::Merge, "merge exploded");
        TaskResult::ok(request, "fine", TaskPayload::None)
    })
    .unwrap();
    let boom = queue.submit(TaskKind::Merge, "/repo", Vec::new()).unwrap();
    let after = queue.submit(TaskKind::Fetch, "/repo", Vec::new()).unwrap();

    let failed = next_completed(&events);
    assert_eq!(failed.request_id, boom);
    assert!(!failed.success);
    insta::assert_snapshot!(failed.message, @"task panicked: merge exploded");
    assert_eq!(failed.payload, TaskPayload::Merge(None));

    let ok = next_completed(&events);
    assert_eq!((ok.request_id, ok.success), (after, true));
}

#[test]
fn test_progress_is_delivered_before_result() {
    let (queue, events) = TaskQueue::start(|request: &TaskRequest, progress: &ProgressSink| {
        progress.report(50, "half");
        progress.report(150, "over");
        TaskResult::ok(request, "", TaskPayload::None)
    })
    .unwrap();
    let id = queue.submit(TaskKind::CheckAllStatus, "", Vec::new()).unwrap();

    let mut seen = Vec::new();
    loop {
        match events.recv_timeout(WAIT).unwrap() {
            QueueEvent::Progress(p) => {
                assert_eq!(p.request_id, id);
                seen.push((p.percent, p.label));
            }
            QueueEvent::Completed(_) => break,
        }
    }
    assert_eq!(
        seen,
        [(50, "half".to_string()), (100, "over".to_string())]
    );
}

#[test]
fn test_drop_joins_worker() {
    let (queue, events) = TaskQueue::start(echo).unwrap();
    queue.submit(TaskKind::Fetch, "/repo", Vec::new()).unwrap();
    drop(queue);
    // Either the task ran or it was failed by shutdown; exactly one result
    assert!(matches!(
        events.recv_timeout(WAIT).unwrap(),
        QueueEvent::Completed(_)
    ));
    assert!(events.recv_timeout(WAIT).is_err());
}
