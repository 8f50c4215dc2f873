#[cfg(test)]
mod test {

    use std::sync::Arc;
    use std::time::Duration;

    use tokio::task::JoinSet;

    use crate::cache::memory::MemoryCache;
    use crate::cache::scheduler::{NoopScheduler, TokioScheduler};
    use crate::cache::store::CacheStore;
    use crate::cache::token::CachedToken;
    use crate::error::CacheError;
    use crate::helpers::time::ManualClock;
    use crate::tests::common::START_MS;

    fn lazy_cache() -> (Arc<ManualClock>, MemoryCache) {
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = MemoryCache::new(clock.clone(), Arc::new(NoopScheduler));
        (clock, cache)
    }

    #[tokio::test]
    async fn ttl_entry_is_unreadable_after_ttl() {
        let (clock, cache) = lazy_cache();
        cache.set("k", &"v".to_string(), Some(1)).await.unwrap();

        clock.advance_ms(1000);
        assert_eq!(cache.get::<String>("k").await.unwrap().as_deref(), Some("v"));

        clock.advance_ms(1);
        assert_eq!(cache.get::<String>("k").await.unwrap(), None);
        // expired entry removed on read
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn entries_without_positive_ttl_never_expire() {
        let (clock, cache) = lazy_cache();
        cache.set("none", &1u32, None).await.unwrap();
        cache.set("zero", &2u32, Some(0)).await.unwrap();

        clock.advance_ms(365 * 24 * 3600 * 1000);

        assert_eq!(cache.get::<u32>("none").await.unwrap(), Some(1));
        assert_eq!(cache.get::<u32>("zero").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn missing_key_and_repeated_delete() {
        let (_, cache) = lazy_cache();
        assert_eq!(cache.get::<String>("absent").await.unwrap(), None);

        cache.set("k", &"v".to_string(), None).await.unwrap();
        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get::<String>("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwrite_replaces_value_and_expiry() {
        let (clock, cache) = lazy_cache();
        cache.set("k", &CachedToken::new("old".into(), 1), Some(1)).await.unwrap();
        cache.set("k", &CachedToken::new("new".into(), 2), Some(60)).await.unwrap();

        clock.advance_ms(5_000);

        let token = cache.get::<CachedToken>("k").await.unwrap().unwrap();
        assert_eq!(token.value, "new");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn value_of_another_type_is_a_decode_error() {
        let (_, cache) = lazy_cache();
        cache.set("k", &"plain string".to_string(), None).await.unwrap();

        let err = cache.get::<CachedToken>("k").await.unwrap_err();
        assert!(matches!(err, CacheError::Decode { ref key, .. } if key == "k"));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_eviction_removes_entry_without_reads() {
        // the clock never moves, only the scheduler can remove the entry
        let clock = Arc::new(ManualClock::new(START_MS));
        let scheduler = Arc::new(TokioScheduler::new());
        let cache = MemoryCache::new(clock, scheduler.clone());

        cache.set("k", &"v".to_string(), Some(1)).await.unwrap();
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(cache.len().await, 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.len().await, 0);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn oversized_ttl_saturates_instead_of_overflowing() {
        let (clock, cache) = lazy_cache();
        cache.set("max", &1u32, Some(u64::MAX)).await.unwrap();
        cache.set("edge", &2u32, Some(u64::MAX / 1000)).await.unwrap();
        cache.set("largest", &3u32, Some((i64::MAX / 1000) as u64)).await.unwrap();

        clock.advance_ms(100 * 365 * 24 * 3600 * 1000);

        assert_eq!(cache.get::<u32>("max").await.unwrap(), Some(1));
        assert_eq!(cache.get::<u32>("edge").await.unwrap(), Some(2));
        assert_eq!(cache.get::<u32>("largest").await.unwrap(), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_evictions_are_not_tracked_forever() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let scheduler = Arc::new(TokioScheduler::new());
        let cache = MemoryCache::new(clock, scheduler.clone());

        for i in 0..8 {
            cache.set(&format!("short-{}", i), &i, Some(1)).await.unwrap();
        }
        assert_eq!(scheduler.tracked(), 8);

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(cache.is_empty().await);

        cache.set("next", &"v".to_string(), Some(60)).await.unwrap();
        assert_eq!(scheduler.tracked(), 1);
        assert_eq!(scheduler.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_cancels_previous_eviction() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = MemoryCache::new(clock, Arc::new(TokioScheduler::new()));

        cache.set("k", &"first".to_string(), Some(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        cache.set("k", &"second".to_string(), Some(5)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(cache.get::<String>("k").await.unwrap().as_deref(), Some("second"));

        tokio::time::sleep(Duration::from_millis(4_600)).await;
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_cancels_scheduled_eviction() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let scheduler = Arc::new(TokioScheduler::new());
        let cache = MemoryCache::new(clock, scheduler.clone());

        cache.set("k", &"v".to_string(), Some(10)).await.unwrap();
        assert_eq!(scheduler.pending(), 1);

        cache.delete("k").await.unwrap();
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn setting_without_ttl_cancels_pending_eviction() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = MemoryCache::new(clock, Arc::new(TokioScheduler::new()));

        cache.set("k", &"short".to_string(), Some(1)).await.unwrap();
        cache.set("k", &"forever".to_string(), None).await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(cache.get::<String>("k").await.unwrap().as_deref(), Some("forever"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_access_keeps_every_key() {
        let (_, cache) = lazy_cache();
        let cache = Arc::new(cache);

        let mut tasks = JoinSet::new();
        for i in 0..64u32 {
            let cache = cache.clone();
            tasks.spawn(async move {
                let key = format!("key-{}", i);
                cache.set(&key, &i, Some(60)).await.unwrap();
                cache.get::<u32>(&key).await.unwrap()
            });
        }
        let values = tasks.join_all().await;

        assert!(values.iter().all(Option::is_some));
        assert_eq!(cache.len().await, 64);
    }
}
