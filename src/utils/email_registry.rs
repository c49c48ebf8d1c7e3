use anyhow::{Result, anyhow};
use futures_util::StreamExt;
use sqlx::MySqlPool;

use super::email_cache::EmailCache;
use super::email_filter::{EmailFilter, normalize};

/// Coach email availability: cuckoo filter for fast negatives, moka cache for
/// fast positives, database as the fallback. Shared through app data.
#[derive(Default)]
pub struct EmailRegistry {
    filter: EmailFilter,
    cache: EmailCache,
}

impl EmailRegistry {
    pub fn new(filter: EmailFilter, cache: EmailCache) -> Self {
        Self { filter, cache }
    }

    /// true  => email AVAILABLE
    /// false => email TAKEN
    pub async fn is_available(&self, email: &str, pool: &MySqlPool) -> bool {
        let email = normalize(email);

        // 1️⃣ Cuckoo filter: fast negative
        if !self.filter.might_exist(&email) {
            return true;
        }

        // 2️⃣ Moka cache: fast positive
        if self.cache.is_taken(&email).await {
            return false;
        }

        // 3️⃣ Database fallback
        let matches = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM coaches WHERE LOWER(email) = ?",
        )
        .bind(&email)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Email availability lookup failed");
            1 // fail-safe: treat as taken, the unique key has the final word
        });

        if matches > 0 {
            self.cache.mark_taken(&email).await;
            return false;
        }

        true
    }

    /// Record a freshly inserted email.
    pub async fn register(&self, email: &str) {
        self.filter.insert(email);
        self.cache.mark_taken(email).await;
    }

    /// Forget an email after its coach is deleted or renamed.
    pub async fn release(&self, email: &str) {
        self.filter.remove(email);
        self.cache.forget(email).await;
    }

    /// Warm up the filter using streaming + batching
    pub async fn warmup(&self, pool: &MySqlPool, batch_size: usize) -> Result<()> {
        let mut stream = sqlx::query_as::<_, (String,)>("SELECT email FROM coaches").fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            let (email,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

            batch.push(normalize(&email));
            total += 1;

            if batch.len() == batch_size {
                self.filter.insert_batch(&batch);
                self.cache.batch_mark(&batch).await;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.filter.insert_batch(&batch);
            self.cache.batch_mark(&batch).await;
        }

        log::info!("Coach email registry warmup complete: {} coaches", total);
        Ok(())
    }
}
