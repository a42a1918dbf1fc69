//! The active test session: navigation, answers, marks, and the
//! countdown timer.
//!
//! The session owns the test and the answer sheet for its whole
//! lifetime; submission transfers them back to the caller together with
//! the scored result. The countdown runs as a single spawned task that
//! ticks once per second and is commanded (pause/resume/cancel) over a
//! channel; the task is never re-created, so pausing cannot drift.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::model::{AnswerSheet, ChoiceLabel, Question, Test};
use crate::scoring::{self, ExamResult};

/// Default test duration: 60 minutes.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(60 * 60);

/// Events the session emits to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One second elapsed.
    Tick { remaining_secs: u64 },
    /// The countdown reached zero; the test must be force-submitted.
    Expired,
}

enum TimerCmd {
    Pause,
    Resume,
    Cancel,
}

/// A cancellable one-second countdown task.
pub struct CountdownTimer {
    cmd_tx: mpsc::Sender<TimerCmd>,
    remaining: Arc<AtomicU64>,
    total_secs: u64,
    handle: JoinHandle<()>,
}

impl CountdownTimer {
    /// Spawn the countdown. Ticks and the final `Expired` event arrive
    /// on `events`; if the receiver is dropped the task stops.
    pub fn spawn(duration: Duration, events: mpsc::Sender<SessionEvent>) -> Self {
        let total_secs = duration.as_secs();
        let remaining = Arc::new(AtomicU64::new(total_secs));
        let shared = Arc::clone(&remaining);
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);

        let handle = tokio::spawn(async move {
            let mut paused = false;
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so the
            // first decrement lands a full second after spawn.
            interval.tick().await;

            loop {
                tokio::select! {
                    cmd = cmd_rx.recv() => match cmd {
                        Some(TimerCmd::Pause) => paused = true,
                        Some(TimerCmd::Resume) => {
                            if paused {
                                paused = false;
                                interval.reset();
                            }
                        }
                        Some(TimerCmd::Cancel) | None => break,
                    },
                    _ = interval.tick(), if !paused => {
                        let left = shared.load(Ordering::Relaxed).saturating_sub(1);
                        shared.store(left, Ordering::Relaxed);
                        if events.send(SessionEvent::Tick { remaining_secs: left }).await.is_err() {
                            break;
                        }
                        if left == 0 {
                            let _ = events.send(SessionEvent::Expired).await;
                            break;
                        }
                    }
                }
            }
        });

        Self {
            cmd_tx,
            remaining,
            total_secs,
            handle,
        }
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining.load(Ordering::Relaxed)
    }

    /// Time accrued while ticking. Paused stretches accrue nothing.
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs(self.total_secs - self.remaining_secs())
    }

    /// Suspend ticking. The remaining duration is kept exactly.
    pub async fn pause(&self) {
        let _ = self.cmd_tx.send(TimerCmd::Pause).await;
    }

    /// Resume ticking with the remaining duration unchanged.
    pub async fn resume(&self) {
        let _ = self.cmd_tx.send(TimerCmd::Resume).await;
    }

    /// Stop the task. Idempotent; the task also stops on its own when
    /// the countdown expires.
    pub async fn cancel(&self) {
        let _ = self.cmd_tx.send(TimerCmd::Cancel).await;
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// One in-progress test. Owns the test, the answer sheet, the marked
/// set, and the countdown.
pub struct TestSession {
    test: Test,
    answers: AnswerSheet,
    marked: BTreeSet<usize>,
    current: usize,
    timer: CountdownTimer,
}

impl TestSession {
    /// Start a session over a freshly generated test. Timer events
    /// arrive on the returned receiver.
    pub fn begin(test: Test, duration: Duration) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(32);
        let timer = CountdownTimer::spawn(duration, events_tx);
        (
            Self {
                test,
                answers: AnswerSheet::new(),
                marked: BTreeSet::new(),
                current: 0,
                timer,
            },
            events_rx,
        )
    }

    pub fn test(&self) -> &Test {
        &self.test
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    pub fn current_position(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.test.question(self.current)
    }

    /// Jump to a question. Out-of-range positions clamp; navigation can
    /// never leave the valid range.
    pub fn goto(&mut self, position: usize) {
        self.current = self.test.clamp_position(position);
    }

    pub fn next(&mut self) {
        self.goto(self.current.saturating_add(1));
    }

    pub fn prev(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    /// Answer the current question. Overwrites any earlier answer.
    pub fn answer_current(&mut self, choice: ChoiceLabel) {
        self.answers.set(self.current, choice);
    }

    pub fn answered_count(&self) -> usize {
        self.answers.answered_count()
    }

    /// Toggle the mark-for-review flag on the current question.
    /// Returns the new state.
    pub fn toggle_mark(&mut self) -> bool {
        if self.marked.remove(&self.current) {
            false
        } else {
            self.marked.insert(self.current);
            true
        }
    }

    pub fn is_marked(&self, position: usize) -> bool {
        self.marked.contains(&position)
    }

    pub fn marked(&self) -> &BTreeSet<usize> {
        &self.marked
    }

    pub fn remaining_secs(&self) -> u64 {
        self.timer.remaining_secs()
    }

    pub async fn pause(&self) {
        self.timer.pause().await;
    }

    pub async fn resume(&self) {
        self.timer.resume().await;
    }

    /// End the session: cancel the timer, score, and hand the test,
    /// answers, and result back to the caller for persistence.
    pub async fn submit(self) -> (Test, AnswerSheet, ExamResult) {
        self.timer.cancel().await;
        let result = scoring::score(&self.test, &self.answers, self.timer.elapsed());
        (self.test, self.answers, result)
    }

    /// Abandon the session without scoring. The timer is cancelled and
    /// the test discarded.
    pub async fn quit(self) {
        self.timer.cancel().await;
    }
}
