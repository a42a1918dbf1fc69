use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use examkit_core::bank::QuestionBank;
use examkit_core::generator::TestGenerator;
use examkit_core::model::{ChoiceLabel, Question, RotationSet, Tier};

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
                ]),
                answer: ChoiceLabel::A,
            });
        }
    }
    QuestionBank::from_questions(questions)
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    let generator = TestGenerator::default();

    for per_tier in [8usize, 64, 512] {
        let bank = make_bank(per_tier);
        group.bench_function(format!("guest_{per_tier}_per_tier"), |b| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| generator.generate(black_box(&bank), &mut rng).unwrap())
        });
    }

    let bank = make_bank(64);
    group.bench_function("rotation_64_per_tier", |b| {
        let mut rng = StdRng::seed_from_u64(42);
        let mut rotation = RotationSet::default();
        b.iter(|| {
            generator
                .generate_with_rotation(black_box(&bank), &mut rotation, &mut rng)
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
