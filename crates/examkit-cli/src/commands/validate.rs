//! The `examkit validate` command.

use std::path::PathBuf;

use anyhow::Result;

use examkit_core::bank::{load_bank, validate_bank};
use examkit_core::model::Tier;

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let bank = load_bank(&bank_path)?;

    let counts: Vec<String> = Tier::ALL
        .iter()
        .map(|&tier| format!("{} x {}pt", bank.tier(tier).len(), tier.points()))
        .collect();
    println!(
        "Question bank: {} questions ({})",
        bank.len(),
        counts.join(", ")
    );

    let warnings = validate_bank(&bank);
    for warning in &warnings {
        let prefix = warning
            .question_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", warning.message);
    }

    if warnings.is_empty() {
        println!("Bank valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
