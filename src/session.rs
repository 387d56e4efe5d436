//! In-memory state of an exercise being performed.
//!
//! A [`SetSession`] is bound to one workout entry. At most one of its sets
//! runs at a time; the running set lives only in memory until it is stopped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::error::{Error, Result};
use crate::models::{SetEntry, WorkoutEntry};
use crate::store::Database;
use crate::workouts::{self, SetResult};

const TICK: Duration = Duration::from_secs(1);

/// A repeating once-per-interval counter on a background thread.
///
/// The ticker stops on [`Stopwatch::cancel`] or when dropped.
pub struct Stopwatch {
    started: Instant,
    ticks: Arc<AtomicU64>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self::with_interval(TICK)
    }

    pub fn with_interval(interval: Duration) -> Self {
        let ticks = Arc::new(AtomicU64::new(0));
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let counter = Arc::clone(&ticks);
        let handle = std::thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        Self {
            started: Instant::now(),
            ticks,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Number of intervals elapsed, for display.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop ticking and wait for the background thread to finish.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Stopwatch thread panicked");
            }
        }
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Display state of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetState {
    Pending,
    Running,
    Completed,
}

struct RunningSet {
    set_number: u32,
    stopwatch: Stopwatch,
}

/// Set tracking for one workout entry.
pub struct SetSession {
    entry: WorkoutEntry,
    sets: Vec<SetEntry>,
    running: Option<RunningSet>,
    tick: Duration,
}

impl SetSession {
    /// Open an entry, creating its set rows on first use.
    pub fn open(db: &mut Database, entry_id: i64) -> Result<Self> {
        let sets = workouts::ensure_sets(db, entry_id)?;
        let entry = workouts::entry(db, entry_id)?;
        Ok(Self {
            entry,
            sets,
            running: None,
            tick: TICK,
        })
    }

    /// Change the display tick of sets started from now on.
    pub fn set_tick_interval(&mut self, interval: Duration) {
        self.tick = interval;
    }

    pub fn entry(&self) -> &WorkoutEntry {
        &self.entry
    }

    pub fn sets(&self) -> &[SetEntry] {
        &self.sets
    }

    pub fn running_set(&self) -> Option<u32> {
        self.running.as_ref().map(|r| r.set_number)
    }

    /// Elapsed time of the running set.
    pub fn running_elapsed(&self) -> Option<Duration> {
        self.running.as_ref().map(|r| r.stopwatch.elapsed())
    }

    /// Ticks counted by the running set's stopwatch, for a live display.
    pub fn running_ticks(&self) -> Option<u64> {
        self.running.as_ref().map(|r| r.stopwatch.ticks())
    }

    pub fn state(&self, set_number: u32) -> Option<SetState> {
        if self.running_set() == Some(set_number) {
            return Some(SetState::Running);
        }
        self.find(set_number).map(|s| {
            if s.is_completed {
                SetState::Completed
            } else {
                SetState::Pending
            }
        })
    }

    fn find(&self, set_number: u32) -> Option<&SetEntry> {
        self.sets.iter().find(|s| s.set_number == set_number)
    }

    /// Start timing a pending set. Any other running set is abandoned
    /// without being saved.
    pub fn start(&mut self, set_number: u32) -> Result<()> {
        let set = self.find(set_number).ok_or(Error::SetNotFound {
            entry_id: self.entry.id,
            set_number,
        })?;
        if set.is_completed {
            return Err(Error::Invalid(format!(
                "set {set_number} is already completed; reset it first"
            )));
        }
        if let Some(previous) = self.running.take() {
            log::debug!(
                "Abandoning running set {} of entry {}",
                previous.set_number,
                self.entry.id
            );
        }
        self.running = Some(RunningSet {
            set_number,
            stopwatch: Stopwatch::with_interval(self.tick),
        });
        Ok(())
    }

    /// Abandon the running set, if any, without saving it.
    pub fn cancel(&mut self) {
        self.running = None;
    }

    /// Stop the running set and save it as completed.
    pub fn stop(&mut self, db: &mut Database, reps: u32, weight: f64) -> Result<SetEntry> {
        let running = self.running.take().ok_or(Error::NoRunningSet)?;
        let elapsed_seconds =
            u32::try_from(running.stopwatch.elapsed().as_secs()).unwrap_or(u32::MAX);
        let saved = workouts::complete_set(
            db,
            self.entry.id,
            running.set_number,
            SetResult {
                reps,
                weight,
                elapsed_seconds,
            },
            Utc::now(),
        );
        match saved {
            Ok(set) => {
                drop(running);
                self.reload(db)?;
                Ok(set)
            }
            Err(e) => {
                // Still running so the values can be corrected.
                self.running = Some(running);
                Err(e)
            }
        }
    }

    /// Return a completed set to pending.
    pub fn reset(&mut self, db: &mut Database, set_number: u32) -> Result<SetEntry> {
        if self.running_set() == Some(set_number) {
            self.running = None;
        }
        let set = workouts::reset_set(db, self.entry.id, set_number)?;
        self.reload(db)?;
        Ok(set)
    }

    /// Correct the reps and weight recorded for a set.
    pub fn edit(
        &mut self,
        db: &mut Database,
        set_number: u32,
        reps: u32,
        weight: f64,
    ) -> Result<SetEntry> {
        let set = workouts::edit_set(db, self.entry.id, set_number, reps, weight)?;
        self.reload(db)?;
        Ok(set)
    }

    pub fn is_entry_completed(&self) -> bool {
        self.entry.is_completed
    }

    fn reload(&mut self, db: &Database) -> Result<()> {
        self.entry = workouts::entry(db, self.entry.id)?;
        self.sets = workouts::sets_for_entry(db, self.entry.id)?;
        Ok(())
    }
}
