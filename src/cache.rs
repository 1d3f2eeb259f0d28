//! cache.rs — Cache em memória com expiração, usado para as leituras do banco.

use crate::time::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

/// Valores por chave, válidos até `expires_at` (exclusivo).
#[derive(Debug)]
pub struct TtlCache<T, C> {
    entries: HashMap<String, CacheEntry<T>>,
    clock: C,
}

impl<T: Clone, C: Clock> TtlCache<T, C> {
    pub fn new(clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    /// Devolve o valor em cache ou executa `loader`. TTL zero desliga o cache.
    /// Erros do loader não são guardados.
    pub async fn get_or_load<F, Fut, E>(&mut self, key: &str, ttl: Duration, loader: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if ttl.is_zero() {
            return loader().await;
        }

        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key).filter(|entry| entry.expires_at > now) {
            return Ok(entry.value.clone());
        }

        let value = loader().await?;
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expires_at,
            },
        );
        Ok(value)
    }

    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<ManualClock>, TtlCache<u32, Arc<ManualClock>>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        ));
        (clock.clone(), TtlCache::new(clock))
    }

    async fn load(cache: &mut TtlCache<u32, Arc<ManualClock>>, calls: &AtomicUsize, ttl: Duration) -> u32 {
        cache
            .get_or_load("rows", ttl, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) as u32;
                Ok::<_, std::convert::Infallible>(n)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn value_is_reused_until_expiry() {
        let (clock, mut cache) = setup();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);

        assert_eq!(load(&mut cache, &calls, ttl).await, 0);
        clock.advance(chrono::Duration::seconds(59));
        assert_eq!(load(&mut cache, &calls, ttl).await, 0);
        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(load(&mut cache, &calls, ttl).await, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_ttl_always_loads() {
        let (_, mut cache) = setup();
        let calls = AtomicUsize::new(0);
        assert_eq!(load(&mut cache, &calls, Duration::ZERO).await, 0);
        assert_eq!(load(&mut cache, &calls, Duration::ZERO).await, 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidate_and_clear_force_reload() {
        let (_, mut cache) = setup();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);

        load(&mut cache, &calls, ttl).await;
        cache.invalidate("rows");
        assert_eq!(load(&mut cache, &calls, ttl).await, 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(load(&mut cache, &calls, ttl).await, 2);
    }

    #[tokio::test]
    async fn loader_errors_are_not_cached() {
        let (_, mut cache) = setup();
        let ttl = Duration::from_secs(60);

        let failed: Result<u32, &str> = cache.get_or_load("rows", ttl, || async { Err("offline") }).await;
        assert_eq!(failed, Err("offline"));
        assert!(cache.is_empty());

        let loaded: Result<u32, &str> = cache.get_or_load("rows", ttl, || async { Ok(7) }).await;
        assert_eq!(loaded, Ok(7));
    }
}
