//! The `examkit init` command.

use std::collections::BTreeMap;

use anyhow::Result;

use examkit_core::model::{ChoiceLabel, Question, Tier};

pub fn execute() -> Result<()> {
    // Create examkit.toml
    if std::path::Path::new("examkit.toml").exists() {
        println!("examkit.toml already exists, skipping.");
    } else {
        std::fs::write("examkit.toml", SAMPLE_CONFIG)?;
        println!("Created examkit.toml");
    }

    // Create a sample question bank with a full 8/8/8 spread
    let bank_path = std::path::Path::new("questions.json");
    if bank_path.exists() {
        println!("questions.json already exists, skipping.");
    } else {
        let bank = serde_json::json!({ "questions": sample_questions() });
        std::fs::write(bank_path, serde_json::to_string_pretty(&bank)?)?;
        println!("Created questions.json");
    }

    println!("\nNext steps:");
    println!("  1. Replace questions.json with your own bank");
    println!("  2. Run: examkit validate --bank questions.json");
    println!("  3. Run: examkit take --bank questions.json");

    Ok(())
}

/// 24 arithmetic questions, 8 per tier, enough to drive a full
/// standard test out of the box.
fn sample_questions() -> Vec<Question> {
    let mut questions = Vec::new();
    for tier in Tier::ALL {
        for i in 0..8u32 {
            let (prompt, value) = match tier {
                Tier::Three => (
                    format!("What is {} + {}?", i + 2, i + 5),
                    (i + 2) + (i + 5),
                ),
                Tier::Four => (
                    format!("What is {} * {}?", i + 2, i + 3),
                    (i + 2) * (i + 3),
                ),
                Tier::Five => (format!("What is {} squared?", i + 4), (i + 4) * (i + 4)),
            };
            questions.push(Question {
                id: format!("sample-{}-{}", tier.points(), i + 1),
                points: tier,
                question: prompt,
                image: None,
                choices: BTreeMap::from([
                    (ChoiceLabel::A, (value - 1).to_string()),
                    (ChoiceLabel::B, value.to_string()),
                    (ChoiceLabel::C, (value + 1).to_string()),
                    (ChoiceLabel::D, (value + 3).to_string()),
                ]),
                answer: ChoiceLabel::B,
            });
        }
    }
    questions
}

const SAMPLE_CONFIG: &str = r#"# examkit configuration

bank_path = "questions.json"
test_duration_mins = 60

# Bounded waits for persistence writes and pending-write settlement.
write_timeout_secs = 10
settle_timeout_secs = 12

# Result store. Guest sessions never touch it.
[store]
type = "memory"

# For a REST-backed remote store:
# [store]
# type = "rest"
# base_url = "https://quiz.example.com/api"
# api_key = "${EXAMKIT_API_KEY}"
"#;
