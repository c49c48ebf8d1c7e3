use autoscale_cuckoo_filter::CuckooFilter;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real coach counts.
const FILTER_CAPACITY: usize = 10_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

#[inline]
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Probabilistic set of registered coach emails. A miss is authoritative,
/// a hit still has to be confirmed.
pub struct EmailFilter {
    inner: RwLock<CuckooFilter<String>>,
}

impl Default for EmailFilter {
    fn default() -> Self {
        Self::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)
    }
}

impl EmailFilter {
    pub fn new(capacity: usize, false_positive_rate: f64) -> Self {
        Self {
            inner: RwLock::new(CuckooFilter::new(capacity, false_positive_rate)),
        }
    }

    /// Check if an email might be registered (false positives possible)
    pub fn might_exist(&self, email: &str) -> bool {
        let email = normalize(email);
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&email)
    }

    pub fn insert(&self, email: &str) {
        let email = normalize(email);
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .add(&email);
    }

    pub fn remove(&self, email: &str) {
        let email = normalize(email);
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&email);
    }

    /// Insert a batch of normalized emails under one write lock
    pub fn insert_batch(&self, emails: &[String]) {
        let mut filter = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for email in emails {
            filter.add(email);
        }
    }
}
