use std::collections::BTreeMap;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use examkit_core::bank::QuestionBank;
use examkit_core::generator::TestGenerator;
use examkit_core::model::{AnswerSheet, ChoiceLabel, Question, Tier};
use examkit_core::scoring::score;

fn make_bank(per_tier: usize) -> QuestionBank {
    let mut questions = Vec::new();
    for tier in Tier::ALL {
        for i in 0..per_tier {
            questions.push(Question {
                id: format!("q-{tier}-{i}"),
                points: tier,
                question: format!("prompt {i}"),
                image: None,
                choices: BTreeMap::from([
                    (ChoiceLabel::A, "first".to_string()),
                    (ChoiceLabel::B, "second".to_string()),
                    (ChoiceLabel::C, "third".to_string()),
                    (ChoiceLabel::D, "fourth".to_string()),
                ]),
                answer: ChoiceLabel::A,
            });
        }
    }
    QuestionBank::from_questions(questions)
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");
    let bank = make_bank(16);
    let generator = TestGenerator::default();
    let mut rng = StdRng::seed_from_u64(42);
    let test = generator.generate(&bank, &mut rng).unwrap();

    let empty = AnswerSheet::new();
    group.bench_function("empty_sheet", |b| {
        b.iter(|| score(black_box(&test), black_box(&empty), Duration::from_secs(600)))
    });

    let mut full = AnswerSheet::new();
    for (position, question) in test.questions().iter().enumerate() {
        full.set(position, question.answer);
    }
    group.bench_function("full_sheet", |b| {
        b.iter(|| score(black_box(&test), black_box(&full), Duration::from_secs(600)))
    });

    group.finish();
}

criterion_group!(benches, bench_score);
criterion_main!(benches);
