//! Question bank loading and validation.
//!
//! The bank is a static JSON document loaded once at startup and
//! read-only thereafter. Questions are grouped by tier at load time so
//! the generator never filters the full pool per draw.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::generator::QUESTIONS_PER_TIER;
use crate::model::{Question, Tier};

/// On-disk bank document shape: `{"questions": [...]}`.
#[derive(Debug, Deserialize)]
struct BankFile {
    questions: Vec<Question>,
}

/// The static pool of questions, grouped by tier.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    tiers: [Vec<Question>; 3],
}

impl QuestionBank {
    pub fn from_questions(questions: Vec<Question>) -> Self {
        let mut tiers: [Vec<Question>; 3] = Default::default();
        for question in questions {
            tiers[question.points.index()].push(question);
        }
        Self { tiers }
    }

    /// All questions in one tier, in bank order.
    pub fn tier(&self, tier: Tier) -> &[Question] {
        &self.tiers[tier.index()]
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load a question bank from a JSON file. Failure here is fatal for the
/// application: there is nothing to test without a bank.
pub fn load_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;
    parse_bank_str(&content, path)
}

/// Parse a JSON string into a `QuestionBank` (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: BankFile = serde_json::from_str(content)
        .with_context(|| format!("failed to parse question bank: {}", source_path.display()))?;
    Ok(QuestionBank::from_questions(parsed.questions))
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a bank for common issues.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    // Duplicate IDs break rotation tracking and history snapshots.
    let mut seen_ids = HashSet::new();
    for tier in Tier::ALL {
        for question in bank.tier(tier) {
            if !seen_ids.insert(&question.id) {
                warnings.push(ValidationWarning {
                    question_id: Some(question.id.clone()),
                    message: format!("duplicate question ID: {}", question.id),
                });
            }
        }
    }

    for tier in Tier::ALL {
        for question in bank.tier(tier) {
            if !question.choices.contains_key(&question.answer) {
                warnings.push(ValidationWarning {
                    question_id: Some(question.id.clone()),
                    message: format!(
                        "answer {} is not among the question's choices",
                        question.answer
                    ),
                });
            }
            if question.choices.len() < 2 {
                warnings.push(ValidationWarning {
                    question_id: Some(question.id.clone()),
                    message: format!(
                        "only {} choice(s) present, at least 2 required",
                        question.choices.len()
                    ),
                });
            }
        }
    }

    // A sparse tier makes standard generation fail.
    for tier in Tier::ALL {
        let count = bank.tier(tier).len();
        if count < QUESTIONS_PER_TIER {
            warnings.push(ValidationWarning {
                question_id: None,
                message: format!(
                    "tier {tier} has {count} questions, fewer than the {QUESTIONS_PER_TIER} a standard test draws"
                ),
            });
        }
    }

    warnings
}
