//! Background reminder scheduler for MyNote.
//!
//! This module owns the worker that periodically scans the store for due
//! reminders, dispatches a notification for each through a
//! [`NotificationSink`], and marks the reminder resolved. The scheduler is an
//! owned object with an explicit Stopped/Running lifecycle; construct one per
//! store and pass it to whoever drives application start/shutdown.
//!
//! Delivery semantics are at-most-once per cycle: a reminder is marked
//! resolved only after a successful dispatch, so a failed dispatch leaves the
//! note eligible for the next cycle, and a resolved note is never dispatched
//! again.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::store::SharedStore;

/// Wait between poll cycles
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Prefix prepended to every reminder notification title
pub const NOTIFICATION_TITLE_PREFIX: &str = "Напоминание";

/// A single dispatch attempt failed. The scheduler does not retry the
/// attempt; the note stays unresolved and is picked up on the next cycle.
#[derive(Debug, Error)]
#[error("notification dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Platform notification delivery, consumed by the scheduler through this
/// narrow interface only. Implementations must be callable from the worker
/// thread.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, message: &str) -> Result<(), DispatchError>;
}

/// Interruptible stop flag shared with the worker thread.
///
/// `trigger` wakes a worker parked in `wait` immediately instead of letting
/// the full interval elapse.
struct StopSignal {
    stopped: Mutex<bool>,
    cv: Condvar,
}

impl StopSignal {
    fn new() -> Self {
        Self {
            stopped: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap()
    }

    /// Park for up to `timeout`. Returns true if stop was requested.
    fn wait(&self, timeout: Duration) -> bool {
        let guard = self.stopped.lock().unwrap();
        let (guard, _timed_out) = self
            .cv
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap();
        *guard
    }

    fn trigger(&self) {
        *self.stopped.lock().unwrap() = true;
        self.cv.notify_all();
    }
}

struct Worker {
    handle: JoinHandle<()>,
    stop: Arc<StopSignal>,
}

/// Background worker with a Stopped -> Running -> Stopping -> Stopped
/// lifecycle. At most one poll loop runs at a time.
pub struct ReminderScheduler {
    store: SharedStore,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
    worker: Option<Worker>,
}

impl ReminderScheduler {
    pub fn new(store: SharedStore, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_interval(store, sink, DEFAULT_POLL_INTERVAL)
    }

    /// Scheduler with a custom poll interval (tests use short ones)
    pub fn with_interval(
        store: SharedStore,
        sink: Arc<dyn NotificationSink>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            sink,
            interval,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Start the poll loop. If a worker is already running it is stopped and
    /// joined first, so calling `start` repeatedly (e.g. on every app resume)
    /// is safe and never leaves two loops running.
    ///
    /// The first cycle runs immediately, subsequent cycles every interval.
    pub fn start(&mut self) {
        self.stop();

        let stop = Arc::new(StopSignal::new());
        let thread_stop = Arc::clone(&stop);
        let store = Arc::clone(&self.store);
        let sink = Arc::clone(&self.sink);
        let interval = self.interval;

        let handle = thread::spawn(move || {
            tracing::info!("reminder worker started");
            loop {
                if thread_stop.is_stopped() {
                    break;
                }
                run_cycle(&store, sink.as_ref());
                if thread_stop.wait(interval) {
                    break;
                }
            }
            tracing::info!("reminder worker stopped");
        });

        self.worker = Some(Worker { handle, stop });
    }

    /// Signal cancellation and block until the worker has fully exited.
    /// After `stop` returns no further notifications are dispatched until
    /// `start` is called again. No-op when already stopped.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.trigger();
            if worker.handle.join().is_err() {
                tracing::error!("reminder worker panicked");
            }
        }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One full pass: scan, dispatch, resolve.
///
/// The store lock is held for the due-read and for each per-note resolution
/// write, never across a dispatch call. Each note's resolution is
/// independent: one failure never blocks or rolls back another.
fn run_cycle(store: &SharedStore, sink: &dyn NotificationSink) {
    let due = {
        let store = store.lock().unwrap();
        match store.due_reminders(Utc::now()) {
            Ok(due) => due,
            Err(e) => {
                // Storage trouble: log and let the loop retry after one
                // interval
                tracing::error!("failed to read due reminders: {}", e);
                return;
            }
        }
    };

    for note in due {
        let title = format!("{}: {}", NOTIFICATION_TITLE_PREFIX, note.title);
        match sink.notify(&title, &note.body) {
            Ok(()) => {
                tracing::info!("dispatched reminder for '{}'", note.title);
                let store = store.lock().unwrap();
                if let Err(e) = store.mark_reminder_resolved(note.id) {
                    // Only this note is skipped; the rest of the cycle
                    // proceeds
                    if e.is_storage() {
                        tracing::error!("storage error resolving reminder {}: {}", note.id, e);
                    } else {
                        tracing::warn!("could not mark reminder {} resolved: {}", note.id, e);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("dispatch failed for '{}': {}", note.title, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteFields;
    use crate::store::ItemStore;
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    const TEST_INTERVAL: Duration = Duration::from_millis(25);

    /// Records every dispatch; fails any whose title contains the configured
    /// fragment.
    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, String)>>,
        fail_titles_containing: Option<&'static str>,
    }

    impl RecordingSink {
        fn failing_on(fragment: &'static str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_titles_containing: Some(fragment),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, title: &str, message: &str) -> Result<(), DispatchError> {
            self.calls
                .lock()
                .unwrap()
                .push((title.to_string(), message.to_string()));
            if let Some(fragment) = self.fail_titles_containing {
                if title.contains(fragment) {
                    return Err(DispatchError("sink offline".to_string()));
                }
            }
            Ok(())
        }
    }

    fn shared_store() -> SharedStore {
        Arc::new(Mutex::new(ItemStore::new_in_memory().unwrap()))
    }

    fn create_due_note(store: &SharedStore, title: &str, body: &str) -> Uuid {
        let mut fields = NoteFields::new(title, body);
        fields.reminder_at = Some(Utc::now() - ChronoDuration::seconds(1));
        store.lock().unwrap().create_note(&fields).unwrap()
    }

    /// Poll until `predicate` holds or two seconds pass
    fn wait_until(predicate: impl Fn() -> bool) -> bool {
        for _ in 0..200 {
            if predicate() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_due_reminder_dispatched_once_and_resolved() {
        let store = shared_store();
        let id = create_due_note(&store, "Pay bills", "electricity, rent");
        let sink = Arc::new(RecordingSink::default());
        let mut scheduler =
            ReminderScheduler::with_interval(Arc::clone(&store), sink.clone(), TEST_INTERVAL);

        scheduler.start();
        assert!(wait_until(|| !sink.calls().is_empty()));
        // Let a few more cycles run to prove it does not fire again
        thread::sleep(TEST_INTERVAL * 4);
        scheduler.stop();

        let calls = sink.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Напоминание: Pay bills");
        assert_eq!(calls[0].1, "electricity, rent");

        let store = store.lock().unwrap();
        assert!(store.get_note(id).unwrap().unwrap().reminder_resolved);
        assert!(store.due_reminders(Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn test_start_is_idempotent() {
        let store = shared_store();
        create_due_note(&store, "once", "body");
        let sink = Arc::new(RecordingSink::default());
        let mut scheduler =
            ReminderScheduler::with_interval(Arc::clone(&store), sink.clone(), TEST_INTERVAL);

        scheduler.start();
        scheduler.start();
        assert!(scheduler.is_running());

        assert!(wait_until(|| !sink.calls().is_empty()));
        thread::sleep(TEST_INTERVAL * 4);
        scheduler.stop();

        assert_eq!(sink.calls().len(), 1, "two rapid starts, one poll loop");
    }

    #[test]
    fn test_dispatch_failure_leaves_note_due() {
        let store = shared_store();
        let id = create_due_note(&store, "stubborn", "body");
        let sink = Arc::new(RecordingSink::failing_on("")); // fail everything
        let mut scheduler =
            ReminderScheduler::with_interval(Arc::clone(&store), sink.clone(), TEST_INTERVAL);

        scheduler.start();
        // A failed dispatch is retried on later cycles
        assert!(wait_until(|| sink.calls().len() >= 2));
        scheduler.stop();

        let store = store.lock().unwrap();
        let note = store.get_note(id).unwrap().unwrap();
        assert!(!note.reminder_resolved);
        assert_eq!(store.due_reminders(Utc::now()).unwrap().len(), 1);
    }

    #[test]
    fn test_one_failure_does_not_block_others() {
        let store = shared_store();
        let bad = create_due_note(&store, "bad apple", "body");
        let good = create_due_note(&store, "good egg", "body");
        let sink = Arc::new(RecordingSink::failing_on("bad apple"));
        let mut scheduler =
            ReminderScheduler::with_interval(Arc::clone(&store), sink.clone(), TEST_INTERVAL);

        scheduler.start();
        assert!(wait_until(|| {
            let store = store.lock().unwrap();
            store.get_note(good).unwrap().unwrap().reminder_resolved
        }));
        scheduler.stop();

        let store = store.lock().unwrap();
        assert!(!store.get_note(bad).unwrap().unwrap().reminder_resolved);
        let still_due = store.due_reminders(Utc::now()).unwrap();
        assert_eq!(still_due.len(), 1);
        assert_eq!(still_due[0].id, bad);
    }

    #[test]
    fn test_clean_stop_dispatches_nothing_after_return() {
        let store = shared_store();
        let sink = Arc::new(RecordingSink::default());
        let mut scheduler =
            ReminderScheduler::with_interval(Arc::clone(&store), sink.clone(), TEST_INTERVAL);

        scheduler.start();
        scheduler.stop();
        assert!(!scheduler.is_running());

        // A reminder becoming due after stop() must not fire
        create_due_note(&store, "too late", "body");
        thread::sleep(TEST_INTERVAL * 6);
        assert!(sink.calls().is_empty());
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let store = shared_store();
        let sink = Arc::new(RecordingSink::default());
        let mut scheduler = ReminderScheduler::with_interval(store, sink, TEST_INTERVAL);
        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_worker_survives_storage_error() {
        let store = shared_store();
        let sink = Arc::new(RecordingSink::default());
        let mut scheduler =
            ReminderScheduler::with_interval(Arc::clone(&store), sink.clone(), TEST_INTERVAL);

        // Break the storage out from under the worker
        store
            .lock()
            .unwrap()
            .connection()
            .execute("ALTER TABLE notes RENAME TO notes_broken", [])
            .unwrap();

        scheduler.start();
        // Several cycles fail against the missing table; the worker logs,
        // backs off, and keeps running
        thread::sleep(TEST_INTERVAL * 4);
        assert!(sink.calls().is_empty());
        assert!(scheduler.is_running());

        store
            .lock()
            .unwrap()
            .connection()
            .execute("ALTER TABLE notes_broken RENAME TO notes", [])
            .unwrap();
        create_due_note(&store, "after outage", "body");

        assert!(wait_until(|| !sink.calls().is_empty()));
        scheduler.stop();

        assert_eq!(sink.calls()[0].0, "Напоминание: after outage");
    }

    #[test]
    fn test_restart_after_stop_picks_up_pending() {
        let store = shared_store();
        let sink = Arc::new(RecordingSink::default());
        let mut scheduler =
            ReminderScheduler::with_interval(Arc::clone(&store), sink.clone(), TEST_INTERVAL);

        scheduler.start();
        scheduler.stop();
        create_due_note(&store, "second wind", "body");

        scheduler.start();
        assert!(wait_until(|| !sink.calls().is_empty()));
        scheduler.stop();

        assert_eq!(sink.calls()[0].0, "Напоминание: second wind");
    }
}
