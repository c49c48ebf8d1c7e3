//! Two consumers of the attendance list endpoint: a page-indexed view that
//! replaces its rows on every fetch, and an append-only feed for read-only
//! previews. Both are keyed on their query and drop results that arrive for a
//! key they no longer hold.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use super::api::AttendancePage;
use crate::model::{
    attendance::{AttendanceQuery, AttendanceRecord},
    response::Pagination,
};

/// Fetch-and-replace view behind the marking screen.
#[derive(Debug, Default)]
pub struct PagedView {
    query: Option<AttendanceQuery>,
    page: Option<AttendancePage>,
}

impl PagedView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> Option<&AttendanceQuery> {
        self.query.as_ref()
    }

    pub fn group_id(&self) -> Option<u64> {
        self.query.as_ref().and_then(|q| q.group_id)
    }

    /// Re-key the view. The current page is kept on screen until the new one
    /// arrives, unless the filter itself changed.
    pub fn set_query(&mut self, query: AttendanceQuery) {
        let same_filter = self.query.as_ref().is_some_and(|q| q.same_filter(&query));
        if !same_filter {
            self.page = None;
        }
        self.query = Some(query);
    }

    /// Accepts `page` only if it was fetched for the current key.
    pub fn apply(&mut self, query: &AttendanceQuery, page: AttendancePage) -> bool {
        if self.query.as_ref() != Some(query) {
            debug!(page = query.page, "Discarding attendance page for a stale query");
            return false;
        }
        self.page = Some(page);
        true
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        self.page.as_ref().map(|p| p.data.as_slice()).unwrap_or_default()
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.page.as_ref().map(|p| p.pagination)
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination().is_some_and(|p| p.has_next_page())
    }

    pub fn has_previous_page(&self) -> bool {
        self.pagination().is_some_and(|p| p.has_previous_page())
    }

    /// The active filter at the page currently on screen. Differs from
    /// [`query`](Self::query) while a fetch is in flight or after one failed.
    fn shown_query(&self) -> Option<AttendanceQuery> {
        let shown = self.pagination()?;
        self.query.as_ref().map(|q| AttendanceQuery {
            page: shown.page,
            ..q.clone()
        })
    }

    pub fn next_query(&self) -> Option<AttendanceQuery> {
        self.shown_query()
            .filter(|_| self.has_next_page())
            .map(|q| q.next())
    }

    pub fn previous_query(&self) -> Option<AttendanceQuery> {
        self.shown_query()
            .filter(|_| self.has_previous_page())
            .map(|q| q.previous())
    }
}

/// Accumulate-and-append feed. Pages are concatenated in fetch order and rows
/// already seen for the same (child, group, date) are skipped.
#[derive(Debug, Default)]
pub struct InfiniteFeed {
    filter: Option<AttendanceQuery>,
    records: Vec<AttendanceRecord>,
    seen: HashSet<(u64, u64, NaiveDate)>,
    last: Option<Pagination>,
}

impl InfiniteFeed {
    pub fn new(query: AttendanceQuery) -> Self {
        let mut feed = Self::default();
        feed.reset(query);
        feed
    }

    /// Start over from page 1 of `query`'s filter.
    pub fn reset(&mut self, query: AttendanceQuery) {
        self.filter = Some(AttendanceQuery { page: 1, ..query });
        self.records.clear();
        self.seen.clear();
        self.last = None;
    }

    /// The next page to request, `None` when exhausted.
    pub fn next_query(&self) -> Option<AttendanceQuery> {
        let filter = self.filter.as_ref()?;
        match self.last {
            None => Some(filter.clone()),
            Some(p) if p.has_next_page() => Some(AttendanceQuery {
                page: p.page + 1,
                ..filter.clone()
            }),
            Some(_) => None,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.next_query().is_some()
    }

    /// Appends `page` if it belongs to the current filter. Returns the number
    /// of new rows.
    pub fn append(&mut self, query: &AttendanceQuery, page: AttendancePage) -> usize {
        let matches = self.filter.as_ref().is_some_and(|f| f.same_filter(query));
        if !matches {
            debug!(page = query.page, "Discarding feed page for a stale filter");
            return 0;
        }

        let before = self.records.len();
        for record in page.data {
            if self.seen.insert((record.child_id, record.group_id, record.date)) {
                self.records.push(record);
            }
        }
        self.last = Some(page.pagination);
        self.records.len() - before
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
