//! Persisted result snapshots.
//!
//! A history record captures everything needed to display a past test
//! (the question IDs used and both answer maps) at submission time, so
//! later edits to the live question bank cannot alter what the record
//! shows.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AnswerSheet, ChoiceLabel, Test, UserId};
use crate::scoring::ExamResult;

/// One completed test, as stored per user in the result store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub user: UserId,
    pub created_at: DateTime<Utc>,
    pub result: ExamResult,
    /// The exact question IDs of the test, in test order.
    pub question_ids: Vec<String>,
    /// Question ID to the user's chosen label. Unanswered questions are
    /// absent.
    pub user_answers: BTreeMap<String, ChoiceLabel>,
    /// Question ID to the correct label, snapshotted from the bank.
    pub correct_answers: BTreeMap<String, ChoiceLabel>,
}

impl HistoryRecord {
    /// Snapshot a submitted test into a record ready to persist.
    pub fn from_submission(
        user: UserId,
        test: &Test,
        answers: &AnswerSheet,
        result: ExamResult,
    ) -> Self {
        let mut question_ids = Vec::with_capacity(test.len());
        let mut user_answers = BTreeMap::new();
        let mut correct_answers = BTreeMap::new();

        for (position, question) in test.questions().iter().enumerate() {
            question_ids.push(question.id.clone());
            correct_answers.insert(question.id.clone(), question.answer);
            if let Some(choice) = answers.get(position) {
                user_answers.insert(question.id.clone(), choice);
            }
        }

        Self {
            id: Uuid::new_v4(),
            user,
            created_at: Utc::now(),
            result,
            question_ids,
            user_answers,
            correct_answers,
        }
    }

    /// Re-derive (correct, wrong, unanswered) from the snapshot fields
    /// alone, independent of the live bank.
    pub fn rederive_counts(&self) -> (u32, u32, u32) {
        let mut correct = 0u32;
        let mut wrong = 0u32;

        for id in &self.question_ids {
            match (self.user_answers.get(id), self.correct_answers.get(id)) {
                (Some(user), Some(answer)) if user == answer => correct += 1,
                (Some(_), _) => wrong += 1,
                (None, _) => {}
            }
        }

        let unanswered = self.question_ids.len() as u32 - correct - wrong;
        (correct, wrong, unanswered)
    }
}
