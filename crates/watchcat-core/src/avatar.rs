//! Owner avatar lookup with a 24 hour on-disk cache.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::source::{ActivitySource, SourceError};
use crate::store::{blocking, CachedAvatar, StateStore};

/// How long a cached avatar URL is reused before it is fetched again.
pub fn avatar_ttl() -> Duration {
    Duration::hours(24)
}

/// Resolve `owner`'s avatar URL, using the cache while it is fresh.
pub async fn owner_avatar(
    store: &Arc<StateStore>,
    source: &dyn ActivitySource,
    owner: &str,
) -> Result<String, SourceError> {
    owner_avatar_at(store, source, owner, Utc::now()).await
}

/// [`owner_avatar`] with an explicit clock.
pub async fn owner_avatar_at(
    store: &Arc<StateStore>,
    source: &dyn ActivitySource,
    owner: &str,
    now: DateTime<Utc>,
) -> Result<String, SourceError> {
    let (db, key) = (store.clone(), owner.to_string());
    match blocking(move || db.read_avatar(&key)).await {
        Ok(Some(cached)) if !cached.is_stale(now, avatar_ttl()) => {
            return Ok(cached.avatar_url);
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(owner, error = %e, "avatar cache unreadable, refetching"),
    }

    let avatar_url = source.owner_avatar(owner).await?;
    let (db, key) = (store.clone(), owner.to_string());
    let entry = CachedAvatar::new(avatar_url.clone(), now);
    if let Err(e) = blocking(move || db.write_avatar(&key, &entry)).await {
        tracing::warn!(owner, error = %e, "failed to cache avatar");
    }
    Ok(avatar_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Activity;
    use crate::types::TargetKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ActivitySource for CountingSource {
        async fn latest(&self, _: TargetKind, _: &str, _: &str) -> Result<Activity, SourceError> {
            Err(SourceError::NotFound)
        }

        async fn owner_avatar(&self, owner: &str) -> Result<String, SourceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("https://avatars/{owner}?v={n}"))
        }
    }

    fn setup() -> (TempDir, Arc<StateStore>, CountingSource) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(StateStore::open(&dir.path().join("w.db")).unwrap());
        let source = CountingSource {
            calls: AtomicUsize::new(0),
        };
        (dir, store, source)
    }

    #[tokio::test]
    async fn absent_entry_is_fetched_and_cached() {
        let (_dir, store, source) = setup();
        let now = Utc::now();

        let url = owner_avatar_at(&store, &source, "octocat", now).await.unwrap();
        assert_eq!(url, "https://avatars/octocat?v=1");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.read_avatar("octocat").unwrap(),
            Some(CachedAvatar::new(url, now))
        );
    }

    #[tokio::test]
    async fn fresh_entry_is_reused_without_network() {
        let (_dir, store, source) = setup();
        let now = Utc::now();
        store
            .write_avatar(
                "octocat",
                &CachedAvatar::new("https://cached", now - Duration::hours(23)),
            )
            .unwrap();

        let url = owner_avatar_at(&store, &source, "octocat", now).await.unwrap();
        assert_eq!(url, "https://cached");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_entry_is_refetched_and_overwritten() {
        let (_dir, store, source) = setup();
        let now = Utc::now();
        store
            .write_avatar(
                "octocat",
                &CachedAvatar::new("https://old", now - Duration::hours(25)),
            )
            .unwrap();

        let url = owner_avatar_at(&store, &source, "octocat", now).await.unwrap();
        assert_eq!(url, "https://avatars/octocat?v=1");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        let cached = store.read_avatar("octocat").unwrap().unwrap();
        assert_eq!(cached.avatar_url, url);
        assert_eq!(cached.cached_at, now);
    }
}
