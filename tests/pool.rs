//! Thread pool contract: FIFO draining, cooperative stop, caller
//! participation, re-entrant submission.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pnflow::pool::Pool;

#[test]
fn fifo_order_with_caller_only() {
    let pool = Pool::new(0);
    let handle = pool.handle();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for i in 0..20 {
        let seen = Arc::clone(&seen);
        handle.submit(Box::new(move || seen.lock().unwrap().push(i)));
    }
    handle.request_stop();
    pool.join_all();
    assert_eq!(*seen.lock().unwrap(), (0..20).collect::<Vec<_>>());
}

#[test]
fn workers_run_every_submission() {
    let pool = Pool::new(4);
    let handle = pool.handle();
    let hits = Arc::new(AtomicUsize::new(0));
    for _ in 0..1000 {
        let hits = Arc::clone(&hits);
        handle.submit(Box::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        }));
    }
    handle.request_stop();
    pool.join_all();
    assert_eq!(hits.load(Ordering::SeqCst), 1000);
}

#[test]
fn work_may_submit_more_work() {
    let pool = Pool::new(2);
    let handle = pool.handle();
    let hits = Arc::new(AtomicUsize::new(0));
    for _ in 0..8 {
        let hits = Arc::clone(&hits);
        let nested = handle.clone();
        handle.submit(Box::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
            for _ in 0..4 {
                let hits = Arc::clone(&hits);
                nested.submit(Box::new(move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }));
    }
    handle.request_stop();
    pool.join_all();
    assert_eq!(hits.load(Ordering::SeqCst), 8 + 8 * 4);
}

#[test]
fn stop_is_honored_only_once_queue_drains() {
    let pool = Pool::new(1);
    let handle = pool.handle();
    let hits = Arc::new(AtomicUsize::new(0));
    // Stop first, then submit: everything queued before the drain
    // still runs.
    handle.request_stop();
    for _ in 0..50 {
        let hits = Arc::clone(&hits);
        handle.submit(Box::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        }));
    }
    pool.join_all();
    assert_eq!(hits.load(Ordering::SeqCst), 50);
    assert!(handle.stop_requested());
}
