//! The `examkit favorites` command.

use std::path::PathBuf;

use anyhow::Result;

use examkit_core::model::UserId;
use examkit_store::config::load_config_from;
use examkit_store::create_store;

pub async fn execute(
    user: String,
    add: Option<String>,
    remove: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = create_store(&config.store);
    let user = UserId::new(user);

    if let Some(question_id) = add {
        store.add_favorite(&user, &question_id).await?;
        println!("Favorited {question_id}.");
        return Ok(());
    }
    if let Some(question_id) = remove {
        store.remove_favorite(&user, &question_id).await?;
        println!("Unfavorited {question_id}.");
        return Ok(());
    }

    let favorites = store.list_favorites(&user).await?;
    if favorites.is_empty() {
        println!("No favorites for {user}.");
    } else {
        for question_id in &favorites {
            println!("{question_id}");
        }
        println!("{} favorite(s).", favorites.len());
    }

    Ok(())
}
