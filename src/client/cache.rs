use moka::future::Cache;
use std::time::Duration;

use super::api::{ApiError, AttendanceApi, AttendancePage};
use crate::model::attendance::AttendanceQuery;

/// Attendance pages keyed by their full query. Every mutation invalidates the
/// whole cache, so entries only need a short TTL as a backstop.
#[derive(Clone)]
pub struct QueryCache {
    pages: Cache<AttendanceQuery, AttendancePage>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(256, Duration::from_secs(300))
    }
}

impl QueryCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            pages: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, query: &AttendanceQuery) -> Option<AttendancePage> {
        self.pages.get(query).await
    }

    pub async fn insert(&self, query: AttendanceQuery, page: AttendancePage) {
        self.pages.insert(query, page).await;
    }

    pub fn invalidate_all(&self) {
        self.pages.invalidate_all();
    }

    /// Cached page for `query`, fetching and storing it on a miss. Failures are
    /// not cached.
    pub async fn fetch<A: AttendanceApi>(
        &self,
        api: &A,
        query: &AttendanceQuery,
    ) -> Result<AttendancePage, ApiError> {
        if let Some(page) = self.get(query).await {
            return Ok(page);
        }

        let page = api.fetch_page(query).await?;
        self.insert(query.clone(), page.clone()).await;
        Ok(page)
    }
}
