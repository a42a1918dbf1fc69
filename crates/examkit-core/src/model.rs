//! Core data model types for examkit.
//!
//! These are the fundamental types that the entire examkit system uses
//! to represent questions, assembled tests, answers, and rotation state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the three difficulty tiers, identified by its point value.
///
/// A standard test draws a fixed count from each tier and lays the blocks
/// out in `Tier::ALL` order, never interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    Three,
    Four,
    Five,
}

impl Tier {
    /// All tiers in fixed block order (3pt, 4pt, 5pt).
    pub const ALL: [Tier; 3] = [Tier::Three, Tier::Four, Tier::Five];

    /// The point value awarded for a correct answer in this tier.
    pub fn points(self) -> u32 {
        match self {
            Tier::Three => 3,
            Tier::Four => 4,
            Tier::Five => 5,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Tier::Three => 0,
            Tier::Four => 1,
            Tier::Five => 2,
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(Tier::Three),
            4 => Ok(Tier::Four),
            5 => Ok(Tier::Five),
            other => Err(format!("invalid tier point value: {other}")),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier.points() as u8
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.points())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .parse()
            .map_err(|_| format!("invalid tier: {s}"))?;
        Tier::try_from(value)
    }
}

/// A choice label within a question (A through E).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ChoiceLabel {
    A,
    B,
    C,
    D,
    E,
}

impl fmt::Display for ChoiceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            ChoiceLabel::A => "A",
            ChoiceLabel::B => "B",
            ChoiceLabel::C => "C",
            ChoiceLabel::D => "D",
            ChoiceLabel::E => "E",
        };
        write!(f, "{letter}")
    }
}

impl FromStr for ChoiceLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(ChoiceLabel::A),
            "B" => Ok(ChoiceLabel::B),
            "C" => Ok(ChoiceLabel::C),
            "D" => Ok(ChoiceLabel::D),
            "E" => Ok(ChoiceLabel::E),
            other => Err(format!("invalid choice label: {other}")),
        }
    }
}

/// A single multiple-choice question. Immutable once loaded from the bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier, stable across sessions.
    pub id: String,
    /// Point value, which also determines the tier.
    pub points: Tier,
    /// The prompt text.
    pub question: String,
    /// Optional image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Choice label to choice text. At least two labels present.
    pub choices: BTreeMap<ChoiceLabel, String>,
    /// The correct choice. Must be one of the present labels.
    pub answer: ChoiceLabel,
}

/// An assembled, ordered test: contiguous tier blocks in `Tier::ALL`
/// order, each block internally shuffled at generation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Test {
    questions: Vec<Question>,
}

impl Test {
    pub(crate) fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, position: usize) -> Option<&Question> {
        self.questions.get(position)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Maximum attainable score: the sum of all point values.
    /// 96 for a standard 8/8/8 test.
    pub fn max_score(&self) -> u32 {
        self.questions.iter().map(|q| q.points.points()).sum()
    }

    /// Clamp a position into the valid range. A test is never empty in
    /// practice, but an empty test clamps to 0.
    pub fn clamp_position(&self, position: usize) -> usize {
        position.min(self.questions.len().saturating_sub(1))
    }
}

/// Answers accumulated while a test is in progress. Position-keyed;
/// absence of an entry means unanswered. Overwriting is allowed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerSheet {
    answers: BTreeMap<usize, ChoiceLabel>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, position: usize, choice: ChoiceLabel) {
        self.answers.insert(position, choice);
    }

    pub fn get(&self, position: usize) -> Option<ChoiceLabel> {
        self.answers.get(&position).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, ChoiceLabel)> + '_ {
        self.answers.iter().map(|(&pos, &choice)| (pos, choice))
    }
}

/// Per-tier rotation state for one user: which question IDs have been
/// used in the current round, and the round counter.
///
/// `used` stays a subset of the tier's question-ID universe; it is
/// cleared exactly when a full draw can no longer be satisfied from
/// unseen questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    pub used: BTreeSet<String>,
    pub round: u32,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            used: BTreeSet::new(),
            round: 1,
        }
    }
}

impl RotationState {
    /// Start a new round: clear the used set and bump the counter.
    pub fn reset(&mut self) {
        self.used.clear();
        self.round += 1;
    }
}

/// The rotation state for all three tiers of one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSet {
    three: RotationState,
    four: RotationState,
    five: RotationState,
}

impl RotationSet {
    pub fn tier(&self, tier: Tier) -> &RotationState {
        match tier {
            Tier::Three => &self.three,
            Tier::Four => &self.four,
            Tier::Five => &self.five,
        }
    }

    pub fn tier_mut(&mut self, tier: Tier) -> &mut RotationState {
        match tier {
            Tier::Three => &mut self.three,
            Tier::Four => &mut self.four,
            Tier::Five => &mut self.five,
        }
    }

    pub fn set_tier(&mut self, tier: Tier, state: RotationState) {
        *self.tier_mut(tier) = state;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, &RotationState)> {
        Tier::ALL.iter().map(move |&t| (t, self.tier(t)))
    }
}

/// An authenticated user identity, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operating mode: guest (no rotation tracking, no persistence) or
/// authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Guest,
    Authenticated(UserId),
}

impl Mode {
    pub fn user(&self) -> Option<&UserId> {
        match self {
            Mode::Guest => None,
            Mode::Authenticated(user) => Some(user),
        }
    }
}
