use std::collections::HashMap;
use std::future::Future;

use tokio::sync::{Mutex, RwLock};

use super::entities::Entity;

/// Resolved entities keyed by the identifier the caller used.
///
/// Entries live as long as the cache; there is no eviction. Two tasks that
/// miss on the same key both resolve it and the later insert wins.
#[derive(Debug, Default)]
pub struct EntityCache {
    entries: RwLock<HashMap<String, Entity>>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Entity> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: String, entity: Entity) {
        log::trace!("caching entity {:?} as {:?}", entity.id(), key);
        self.entries.write().await.insert(key, entity);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Exported senders keyed by data-center id.
///
/// The lock is held while a missing sender is being created, so each data
/// center gets exactly one sender no matter how many tasks ask at once.
#[derive(Debug)]
pub struct SenderRegistry<S> {
    senders: Mutex<HashMap<i32, S>>,
}

impl<S> Default for SenderRegistry<S> {
    fn default() -> Self {
        SenderRegistry {
            senders: Mutex::new(HashMap::new()),
        }
    }
}

impl<S: Clone> SenderRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, dc_id: i32) -> Option<S> {
        self.senders.lock().await.get(&dc_id).cloned()
    }

    pub async fn get_or_try_insert_with<F, Fut, E>(&self, dc_id: i32, create: F) -> Result<S, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S, E>>,
    {
        let mut senders = self.senders.lock().await;
        if let Some(sender) = senders.get(&dc_id) {
            return Ok(sender.clone());
        }

        log::debug!("exporting sender for dc {}", dc_id);
        let sender = create().await?;
        senders.insert(dc_id, sender.clone());
        Ok(sender)
    }

    pub async fn len(&self) -> usize {
        self.senders.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.senders.lock().await.is_empty()
    }
}

/// The per-session state shared by the utilities: one entity cache and one
/// sender registry. Owned by whoever drives the client and passed down by
/// reference.
#[derive(Debug)]
pub struct SessionCache<S> {
    pub entities: EntityCache,
    pub senders: SenderRegistry<S>,
}

impl<S> Default for SessionCache<S> {
    fn default() -> Self {
        SessionCache {
            entities: EntityCache::default(),
            senders: SenderRegistry::default(),
        }
    }
}

impl<S: Clone> SessionCache<S> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::tg::entities::Chat;

    #[tokio::test]
    async fn entity_cache_keeps_one_entry_per_key() {
        let cache = EntityCache::new();
        let first = Entity::Chat(Chat {
            id: 1,
            title: "first".to_string(),
            participants_count: 0,
        });
        let second = Entity::ChatEmpty { id: 1 };

        cache.insert("1".to_string(), first).await;
        cache.insert("1".to_string(), second.clone()).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("1").await, Some(second));
        assert_eq!(cache.get("2").await, None);
    }

    #[tokio::test]
    async fn concurrent_first_use_creates_one_sender() {
        let registry: Arc<SenderRegistry<i32>> = Arc::new(SenderRegistry::new());
        let created = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let created = created.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .get_or_try_insert_with(4, || async {
                        created.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, ()>(40)
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(40));
        }

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn failed_creation_is_not_cached() {
        let registry: SenderRegistry<i32> = SenderRegistry::new();
        let result = registry
            .get_or_try_insert_with(2, || async { Err::<i32, _>("offline") })
            .await;
        assert_eq!(result, Err("offline"));
        assert!(registry.is_empty().await);
    }
}
