//! Balanced test generation.
//!
//! A standard test is 24 questions: 8 from each tier, assembled as a
//! 3pt block, a 4pt block, and a 5pt block. Order within a block is
//! randomized per generation; the blocks themselves are never
//! interleaved.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::bank::QuestionBank;
use crate::error::GenerateError;
use crate::model::{Question, RotationSet, Test, Tier};
use crate::rotation;

/// Questions drawn from each tier for a standard test.
pub const QUESTIONS_PER_TIER: usize = 8;

/// Assembles tests from a question bank.
#[derive(Debug, Clone)]
pub struct TestGenerator {
    per_tier: usize,
}

impl Default for TestGenerator {
    fn default() -> Self {
        Self {
            per_tier: QUESTIONS_PER_TIER,
        }
    }
}

impl TestGenerator {
    pub fn new(per_tier: usize) -> Self {
        Self { per_tier }
    }

    /// Guest-mode generation: per tier, shuffle the full list and take
    /// the first `per_tier`. No rotation tracking.
    pub fn generate(
        &self,
        bank: &QuestionBank,
        rng: &mut impl Rng,
    ) -> Result<Test, GenerateError> {
        let mut questions = Vec::with_capacity(self.per_tier * Tier::ALL.len());
        for tier in Tier::ALL {
            questions.extend(self.draw_tier(bank, tier, rng)?);
        }
        Ok(Test::new(questions))
    }

    /// Authenticated-mode generation: delegate each tier to the
    /// rotation tracker. The caller must persist the updated
    /// `RotationSet` after the test is submitted.
    pub fn generate_with_rotation(
        &self,
        bank: &QuestionBank,
        rotation: &mut RotationSet,
        rng: &mut impl Rng,
    ) -> Result<Test, GenerateError> {
        let mut questions = Vec::with_capacity(self.per_tier * Tier::ALL.len());
        for tier in Tier::ALL {
            let drawn = rotation::select_for_tier(
                tier,
                bank,
                rotation.tier_mut(tier),
                self.per_tier,
                rng,
            )?;
            questions.extend(drawn);
        }
        Ok(Test::new(questions))
    }

    fn draw_tier(
        &self,
        bank: &QuestionBank,
        tier: Tier,
        rng: &mut impl Rng,
    ) -> Result<Vec<Question>, GenerateError> {
        let pool = bank.tier(tier);
        if pool.is_empty() {
            return Err(GenerateError::EmptyTier(tier));
        }
        if pool.len() < self.per_tier {
            return Err(GenerateError::InsufficientQuestions {
                tier,
                need: self.per_tier,
                have: pool.len(),
            });
        }

        let mut block: Vec<Question> = pool.to_vec();
        block.shuffle(rng);
        block.truncate(self.per_tier);
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChoiceLabel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn make_question(id: &str, tier: Tier) -> Question {
        Question {
            id: id.into(),
            points: tier,
            question: format!("prompt {id}"),
            image: None,
            choices: BTreeMap::from([
                (ChoiceLabel::A, "yes".to_string()),
                (ChoiceLabel::B, "no".to_string()),
            ]),
            answer: ChoiceLabel::A,
        }
    }

    fn make_bank(per_tier: usize) -> QuestionBank {
        let mut questions = Vec::new();
        for tier in Tier::ALL {
            for i in 0..per_tier {
                questions.push(make_question(&format!("q-{tier}-{i}"), tier));
            }
        }
        QuestionBank::from_questions(questions)
    }

    #[test]
    fn guest_test_has_standard_shape() {
        let bank = make_bank(12);
        let generator = TestGenerator::default();
        let mut rng = StdRng::seed_from_u64(42);

        let test = generator.generate(&bank, &mut rng).unwrap();
        assert_eq!(test.len(), 24);
        assert_eq!(test.max_score(), 96);

        // Blocks of 8/8/8 in non-decreasing point order.
        let points: Vec<u32> = test.questions().iter().map(|q| q.points.points()).collect();
        assert_eq!(&points[0..8], &[3; 8]);
        assert_eq!(&points[8..16], &[4; 8]);
        assert_eq!(&points[16..24], &[5; 8]);
    }

    #[test]
    fn exact_size_bank_uses_every_question() {
        let bank = make_bank(8);
        let generator = TestGenerator::default();
        let mut rng = StdRng::seed_from_u64(1);

        let test = generator.generate(&bank, &mut rng).unwrap();
        assert_eq!(test.len(), 24);

        let mut ids: Vec<&str> = test.questions().iter().map(|q| q.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 24);
    }

    #[test]
    fn per_tier_order_varies_between_generations() {
        let bank = make_bank(12);
        let generator = TestGenerator::default();
        let mut rng = StdRng::seed_from_u64(5);

        let first = generator.generate(&bank, &mut rng).unwrap();
        let second = generator.generate(&bank, &mut rng).unwrap();
        let ids = |t: &Test| -> Vec<String> {
            t.questions().iter().map(|q| q.id.clone()).collect()
        };
        assert_ne!(ids(&first), ids(&second));
    }

    #[test]
    fn empty_tier_fails_generation() {
        let mut questions = Vec::new();
        for i in 0..8 {
            questions.push(make_question(&format!("q3-{i}"), Tier::Three));
            questions.push(make_question(&format!("q4-{i}"), Tier::Four));
        }
        let bank = QuestionBank::from_questions(questions);
        let generator = TestGenerator::default();
        let mut rng = StdRng::seed_from_u64(2);

        let err = generator.generate(&bank, &mut rng).unwrap_err();
        assert_eq!(err, GenerateError::EmptyTier(Tier::Five));
    }

    #[test]
    fn short_tier_fails_generation() {
        let mut questions = Vec::new();
        for tier in Tier::ALL {
            let count = if tier == Tier::Four { 5 } else { 8 };
            for i in 0..count {
                questions.push(make_question(&format!("q-{tier}-{i}"), tier));
            }
        }
        let bank = QuestionBank::from_questions(questions);
        let generator = TestGenerator::default();
        let mut rng = StdRng::seed_from_u64(2);

        let err = generator.generate(&bank, &mut rng).unwrap_err();
        assert_eq!(
            err,
            GenerateError::InsufficientQuestions {
                tier: Tier::Four,
                need: 8,
                have: 5
            }
        );
    }

    #[test]
    fn rotation_generation_updates_all_tiers() {
        let bank = make_bank(16);
        let generator = TestGenerator::default();
        let mut rotation = RotationSet::default();
        let mut rng = StdRng::seed_from_u64(9);

        let test = generator
            .generate_with_rotation(&bank, &mut rotation, &mut rng)
            .unwrap();
        assert_eq!(test.len(), 24);
        for tier in Tier::ALL {
            assert_eq!(rotation.tier(tier).used.len(), 8);
            assert_eq!(rotation.tier(tier).round, 1);
        }
    }

    #[test]
    fn rotation_generation_never_repeats_within_round() {
        let bank = make_bank(16);
        let generator = TestGenerator::default();
        let mut rotation = RotationSet::default();
        let mut rng = StdRng::seed_from_u64(9);

        let first = generator
            .generate_with_rotation(&bank, &mut rotation, &mut rng)
            .unwrap();
        let second = generator
            .generate_with_rotation(&bank, &mut rotation, &mut rng)
            .unwrap();

        for question in second.questions() {
            assert!(!first.questions().iter().any(|q| q.id == question.id));
        }
    }
}
