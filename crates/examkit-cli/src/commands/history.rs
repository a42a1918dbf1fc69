//! The `examkit history` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use uuid::Uuid;

use examkit_core::model::UserId;
use examkit_store::config::load_config_from;
use examkit_store::create_store;

pub async fn execute(
    user: String,
    delete: Option<Uuid>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = create_store(&config.store);
    let user = UserId::new(user);

    if let Some(id) = delete {
        store.delete_history(&user, id).await?;
        println!("Deleted record {id}.");
        return Ok(());
    }

    let records = store.list_history(&user).await?;
    if records.is_empty() {
        println!("No history for {user}.");
        return Ok(());
    }

    use comfy_table::Table;
    let mut table = Table::new();
    table.set_header(vec![
        "Date", "Score", "Correct", "Wrong", "Unanswered", "Accuracy", "Time", "ID",
    ]);
    for record in &records {
        let result = &record.result;
        table.add_row(vec![
            record
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            format!("{}/{}", result.score, result.max_score),
            result.correct.to_string(),
            result.wrong.to_string(),
            result.unanswered.to_string(),
            format!("{}%", result.accuracy),
            result.elapsed_display(),
            record.id.to_string(),
        ]);
    }

    println!("{table}");
    println!("{} record(s).", records.len());

    Ok(())
}
