//! Test scoring.
//!
//! Scoring is a pure function of the test and the answer sheet: no side
//! effects, deterministic, and safe to call repeatedly, including with
//! a partially filled sheet for live progress displays.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{AnswerSheet, Test};

/// The scored outcome of a submitted test. Immutable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    pub correct: u32,
    pub wrong: u32,
    pub unanswered: u32,
    /// Sum of point values of correctly answered questions.
    pub score: u32,
    /// Sum of all point values in the test (96 for a standard test).
    pub max_score: u32,
    /// Percentage of correct answers, 0..=100.
    pub accuracy: u8,
    /// Whole seconds spent, floored.
    pub elapsed_secs: u64,
}

impl ExamResult {
    /// Elapsed time formatted as `m:ss`.
    pub fn elapsed_display(&self) -> String {
        format!("{}:{:02}", self.elapsed_secs / 60, self.elapsed_secs % 60)
    }
}

/// Score a test against an answer sheet.
///
/// A present answer matching the question's correct choice counts as
/// correct and earns the question's points; any other present answer
/// counts as wrong; an absent answer counts as unanswered.
pub fn score(test: &Test, answers: &AnswerSheet, elapsed: Duration) -> ExamResult {
    let mut correct = 0u32;
    let mut wrong = 0u32;
    let mut total = 0u32;

    for (position, question) in test.questions().iter().enumerate() {
        match answers.get(position) {
            Some(choice) if choice == question.answer => {
                correct += 1;
                total += question.points.points();
            }
            Some(_) => wrong += 1,
            None => {}
        }
    }

    let len = test.len() as u32;
    ExamResult {
        correct,
        wrong,
        unanswered: len - correct - wrong,
        score: total,
        max_score: test.max_score(),
        accuracy: accuracy_percent(correct, len),
        elapsed_secs: elapsed.as_secs(),
    }
}

/// Percentage of correct answers, rounded half-up (away from zero),
/// matching `f64::round`.
pub fn accuracy_percent(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    (f64::from(correct) / f64::from(total) * 100.0).round() as u8
}
