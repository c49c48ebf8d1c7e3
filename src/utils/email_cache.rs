use moka::future::Cache;
use std::time::Duration;

use super::email_filter::normalize;

/// Positive cache of emails known to be taken.
#[derive(Clone)]
pub struct EmailCache {
    cache: Cache<String, bool>,
}

impl Default for EmailCache {
    fn default() -> Self {
        Self::new(50_000, Duration::from_secs(86400)) // 24h TTL
    }
}

impl EmailCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn mark_taken(&self, email: &str) {
        self.cache.insert(normalize(email), true).await;
    }

    pub async fn forget(&self, email: &str) {
        self.cache.invalidate(&normalize(email)).await;
    }

    pub async fn is_taken(&self, email: &str) -> bool {
        self.cache.get(&normalize(email)).await.unwrap_or(false)
    }

    /// Batch mark emails as taken
    pub async fn batch_mark(&self, emails: &[String]) {
        let futures: Vec<_> = emails
            .iter()
            .map(|e| self.cache.insert(normalize(e), true))
            .collect();

        // Await all insertions concurrently
        futures::future::join_all(futures).await;
    }
}
