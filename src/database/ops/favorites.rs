//! Favorite songs, stored as a list of paths

use anyhow::Result;

use super::KEY_FAVORITES;
use crate::database::{FavoriteToggle, KvStore};

pub async fn get_favorites(store: &KvStore) -> Result<Vec<String>> {
    Ok(store.get(KEY_FAVORITES).await.unwrap_or_default())
}

pub async fn set_favorites(store: &KvStore, favorites: &[String]) -> Result<()> {
    store.set(KEY_FAVORITES, favorites).await
}

pub async fn is_favorite(store: &KvStore, path: &str) -> Result<bool> {
    Ok(get_favorites(store).await?.iter().any(|p| p == path))
}

/// Returns false when the path was already a favorite
pub async fn add_favorite(store: &KvStore, path: &str) -> Result<bool> {
    let mut favorites = get_favorites(store).await?;
    if favorites.iter().any(|p| p == path) {
        return Ok(false);
    }
    favorites.push(path.to_string());
    set_favorites(store, &favorites).await?;
    Ok(true)
}

pub async fn remove_favorite(store: &KvStore, path: &str) -> Result<bool> {
    let mut favorites = get_favorites(store).await?;
    let before = favorites.len();
    favorites.retain(|p| p != path);
    if favorites.len() == before {
        return Ok(false);
    }
    set_favorites(store, &favorites).await?;
    Ok(true)
}

pub async fn toggle_favorite(store: &KvStore, path: &str) -> Result<FavoriteToggle> {
    if remove_favorite(store, path).await? {
        Ok(FavoriteToggle::Removed)
    } else {
        add_favorite(store, path).await?;
        Ok(FavoriteToggle::Added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_toggle_favorite() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path(), "t_").await.unwrap();

        assert!(!is_favorite(&store, "/a").await.unwrap());
        assert_eq!(toggle_favorite(&store, "/a").await.unwrap(), FavoriteToggle::Added);
        assert!(is_favorite(&store, "/a").await.unwrap());
        assert!(!add_favorite(&store, "/a").await.unwrap());
        assert_eq!(toggle_favorite(&store, "/a").await.unwrap(), FavoriteToggle::Removed);
        assert!(get_favorites(&store).await.unwrap().is_empty());
    }
}
