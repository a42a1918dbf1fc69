//! Rotation-aware question selection.
//!
//! Per tier, a user's `RotationState` records which question IDs were
//! already drawn in the current round. Once a full draw can no longer be
//! satisfied from unseen questions, the tier resets: the used set is
//! cleared and the round counter increments, signalling every question
//! has been shown at least once.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::bank::QuestionBank;
use crate::error::GenerateError;
use crate::model::{Question, RotationState, Tier};

/// Draw `count` questions from one tier without repetition across
/// sessions, updating the rotation state in place.
///
/// The caller is responsible for persisting the updated state; there is
/// no storage side effect here.
pub fn select_for_tier(
    tier: Tier,
    bank: &QuestionBank,
    state: &mut RotationState,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Question>, GenerateError> {
    let pool = bank.tier(tier);
    if pool.is_empty() {
        return Err(GenerateError::EmptyTier(tier));
    }
    if pool.len() < count {
        return Err(GenerateError::InsufficientQuestions {
            tier,
            need: count,
            have: pool.len(),
        });
    }

    let mut available: Vec<&Question> = pool
        .iter()
        .filter(|q| !state.used.contains(&q.id))
        .collect();

    if available.len() < count {
        state.reset();
        available = pool.iter().collect();
    }

    available.shuffle(rng);
    available.truncate(count);

    state
        .used
        .extend(available.iter().map(|q| q.id.clone()));

    Ok(available.into_iter().cloned().collect())
}
