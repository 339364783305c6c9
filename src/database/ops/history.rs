//! Search history operations

use anyhow::Result;

use super::KEY_SEARCH_HISTORY;
use crate::database::KvStore;

/// Maximum number of remembered searches
pub const SEARCH_HISTORY_LIMIT: usize = 20;

/// Newest first
pub async fn get_search_history(store: &KvStore) -> Result<Vec<String>> {
    Ok(store.get(KEY_SEARCH_HISTORY).await.unwrap_or_default())
}

/// Move `query` to the front of the history; blank queries are ignored
pub async fn add_to_search_history(store: &KvStore, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Ok(());
    }

    let mut history = get_search_history(store).await?;
    history.retain(|q| q != query);
    history.insert(0, query.to_string());
    history.truncate(SEARCH_HISTORY_LIMIT);
    store.set(KEY_SEARCH_HISTORY, &history).await
}

pub async fn clear_search_history(store: &KvStore) -> Result<()> {
    store.set(KEY_SEARCH_HISTORY, &Vec::<String>::new()).await
}
