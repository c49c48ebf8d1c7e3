use std::cell::RefCell;

use tracing::{debug, error, info, warn};

use super::{
    api::{ApiError, AttendanceApi},
    cache::QueryCache,
    feed::{InfiniteFeed, PagedView},
    notify::{NoticeLevel, Notifications},
    table::{AttendanceTable, RollbackPolicy},
};
use crate::model::attendance::AttendanceQuery;

/// State owned by one attendance screen.
#[derive(Debug, Default)]
pub struct AttendanceStore {
    pub table: RefCell<AttendanceTable>,
    pub view: RefCell<PagedView>,
    pub notices: RefCell<Notifications>,
}

impl AttendanceStore {
    pub fn new(policy: RollbackPolicy) -> Self {
        Self {
            table: RefCell::new(AttendanceTable::new(policy)),
            ..Self::default()
        }
    }
}

/// Drives the marking workflow against an [`AttendanceApi`]. Every failure is
/// turned into a notice before it is returned; nothing is retried.
pub struct AttendanceController<'a, A> {
    api: &'a A,
    cache: &'a QueryCache,
    store: &'a AttendanceStore,
}

impl<'a, A: AttendanceApi> AttendanceController<'a, A> {
    pub fn new(api: &'a A, cache: &'a QueryCache, store: &'a AttendanceStore) -> Self {
        Self { api, cache, store }
    }

    /// Switch the screen to `query` and fetch it.
    pub async fn load(&self, query: AttendanceQuery) -> Result<(), ApiError> {
        self.store.view.borrow_mut().set_query(query);
        self.refetch().await
    }

    /// Fetch the active query again and reconcile the table with it. A result
    /// for a query the view no longer holds is dropped.
    pub async fn refetch(&self) -> Result<(), ApiError> {
        let Some(query) = self.store.view.borrow().query().cloned() else {
            return Ok(());
        };

        match self.cache.fetch(self.api, &query).await {
            Ok(page) => {
                let records = page.data.clone();
                if self.store.view.borrow_mut().apply(&query, page) {
                    self.store.table.borrow_mut().load(query.date, records);
                }
                Ok(())
            }
            Err(err) => {
                warn!(status = err.status, message = %err.message, "Attendance fetch failed");
                self.store.notices.borrow_mut().error(&err);
                Err(err)
            }
        }
    }

    /// Returns `false` when already on the last page.
    pub async fn next_page(&self) -> Result<bool, ApiError> {
        let Some(next) = self.store.view.borrow().next_query() else {
            return Ok(false);
        };
        self.load(next).await.map(|_| true)
    }

    pub async fn previous_page(&self) -> Result<bool, ApiError> {
        let Some(previous) = self.store.view.borrow().previous_query() else {
            return Ok(false);
        };
        self.load(previous).await.map(|_| true)
    }

    /// Fetch the next page of `feed` and append it. Returns the number of new rows.
    pub async fn load_more(&self, feed: &RefCell<InfiniteFeed>) -> Result<usize, ApiError> {
        let Some(query) = feed.borrow().next_query() else {
            return Ok(0);
        };

        match self.cache.fetch(self.api, &query).await {
            Ok(page) => Ok(feed.borrow_mut().append(&query, page)),
            Err(err) => {
                warn!(status = err.status, page = query.page, "Attendance feed fetch failed");
                self.store.notices.borrow_mut().error(&err);
                Err(err)
            }
        }
    }

    /// Optimistically set one child's status and send it. The new value shows
    /// immediately. A change made while an earlier one for the same child is
    /// in flight returns at once; the call that owns the in-flight write sends
    /// it and reports its outcome.
    pub async fn change_status(
        &self,
        child_id: u64,
        group_id: u64,
        status: &str,
    ) -> Result<(), ApiError> {
        let started = self
            .store
            .table
            .borrow_mut()
            .change_status(child_id, group_id, status);

        let mut next = match started {
            Ok(Some(write)) => Some(write),
            Ok(None) => return Ok(()),
            Err(err) => {
                self.store.notices.borrow_mut().warning(err.message.clone());
                return Err(err);
            }
        };

        let mut outcome = Ok(());
        while let Some(write) = next.take() {
            next = match self.api.mark(&write.request).await {
                Ok(record) => self.store.table.borrow_mut().confirm(&write, &record),
                Err(err) => {
                    error!(
                        child_id,
                        status = err.status,
                        message = %err.message,
                        "Failed to mark attendance"
                    );
                    self.store.notices.borrow_mut().error(&err);
                    let queued = self.store.table.borrow_mut().reject(&write);
                    if outcome.is_ok() {
                        outcome = Err(err);
                    }
                    queued
                }
            };
        }

        self.cache.invalidate_all();
        outcome
    }

    /// Mark the selected group present for the selected date. Needs a group
    /// filter; the table is refetched whether or not the request succeeds.
    pub async fn mark_all_present(&self) -> Result<(), ApiError> {
        let target = self
            .store
            .view
            .borrow()
            .query()
            .and_then(|q| q.group_id.map(|group_id| (group_id, q.date)));

        let Some((group_id, date)) = target else {
            let err = ApiError::validation("Please select a group first");
            self.store.notices.borrow_mut().warning(err.message.clone());
            return Err(err);
        };

        let result = self.api.mark_all_present(group_id, date).await;
        match &result {
            Ok(()) => {
                info!(group_id, %date, "Group marked present");
                self.store
                    .notices
                    .borrow_mut()
                    .success("All children marked present");
            }
            Err(err) => {
                error!(group_id, %date, status = err.status, message = %err.message, "Mark all present failed");
                self.store.notices.borrow_mut().push(
                    NoticeLevel::Error,
                    "Failed to mark all children present",
                    err.status,
                );
            }
        }

        self.cache.invalidate_all();
        if let Err(err) = self.refetch().await {
            debug!(status = err.status, "Refetch after mark all present failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api::AttendancePage;
    use crate::model::{
        attendance::{AttendanceRecord, AttendanceStatus, MarkAttendance},
        response::{ListResponse, Pagination},
    };
    use chrono::NaiveDate;
    use futures::{channel::oneshot, poll};
    use std::{collections::VecDeque, pin::pin};

    type Reply = oneshot::Sender<Result<AttendanceRecord, ApiError>>;

    /// In-memory server: a roster of 25 children in group 5 and 3 in group 6.
    /// Single writes wait until the test answers them.
    struct FakeApi {
        roster: RefCell<Vec<AttendanceRecord>>,
        page_requests: RefCell<Vec<AttendanceQuery>>,
        marks: RefCell<VecDeque<(MarkAttendance, Reply)>>,
        bulk_requests: RefCell<Vec<(u64, NaiveDate)>>,
        bulk_failure: Option<ApiError>,
        /// Page number whose next fetch fails once.
        failing_page: RefCell<Option<u32>>,
    }

    impl FakeApi {
        fn new() -> Self {
            let roster = (1..=28)
                .map(|child_id| AttendanceRecord {
                    child_id,
                    child_name: format!("Child {child_id:02}"),
                    group_id: if child_id <= 25 { 5 } else { 6 },
                    date: day(),
                    status: None,
                    updated_at: None,
                })
                .collect();
            Self {
                roster: RefCell::new(roster),
                page_requests: RefCell::default(),
                marks: RefCell::default(),
                bulk_requests: RefCell::default(),
                bulk_failure: None,
                failing_page: RefCell::default(),
            }
        }

        fn in_flight(&self) -> Vec<(u64, AttendanceStatus)> {
            self.marks
                .borrow()
                .iter()
                .map(|(req, _)| (req.children_id, req.status))
                .collect()
        }

        /// Answer the oldest in-flight write for `child_id`.
        fn answer(&self, child_id: u64, result: Result<AttendanceStatus, ApiError>) {
            let mut marks = self.marks.borrow_mut();
            let at = marks
                .iter()
                .position(|(req, _)| req.children_id == child_id)
                .expect("no write in flight for child");
            let (request, reply) = marks.remove(at).unwrap();

            let result = result.map(|status| AttendanceRecord {
                child_id: request.children_id,
                child_name: String::new(),
                group_id: request.group_id,
                date: request.date,
                status: Some(status),
                updated_at: None,
            });
            let _ = reply.send(result);
        }
    }

    impl AttendanceApi for FakeApi {
        async fn fetch_page(&self, query: &AttendanceQuery) -> Result<AttendancePage, ApiError> {
            self.page_requests.borrow_mut().push(query.clone());
            if *self.failing_page.borrow() == Some(query.page) {
                self.failing_page.replace(None);
                return Err(ApiError::new("Service Unavailable", 503));
            }

            let rows: Vec<AttendanceRecord> = self
                .roster
                .borrow()
                .iter()
                .filter(|r| query.group_id.is_none_or(|g| r.group_id == g))
                .cloned()
                .collect();
            let total = rows.len() as u64;
            let data = rows
                .into_iter()
                .skip(((query.page - 1) * query.limit) as usize)
                .take(query.limit as usize)
                .collect();

            Ok(ListResponse::new(
                "Attendance fetched",
                data,
                Pagination::new(query.page, query.limit, total),
            ))
        }

        async fn mark(&self, request: &MarkAttendance) -> Result<AttendanceRecord, ApiError> {
            let (tx, rx) = oneshot::channel();
            self.marks.borrow_mut().push_back((request.clone(), tx));
            rx.await
                .unwrap_or_else(|_| Err(ApiError::new("Request cancelled", 0)))
        }

        async fn mark_all_present(&self, group_id: u64, date: NaiveDate) -> Result<(), ApiError> {
            self.bulk_requests.borrow_mut().push((group_id, date));
            if let Some(err) = &self.bulk_failure {
                return Err(err.clone());
            }
            for row in self.roster.borrow_mut().iter_mut() {
                if row.group_id == group_id {
                    row.status = Some(AttendanceStatus::Present);
                }
            }
            Ok(())
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn group_five() -> AttendanceQuery {
        AttendanceQuery::new(day(), Some(5), 10)
    }

    fn server_error() -> ApiError {
        ApiError::new("Internal Server Error", 500)
    }

    #[actix_web::test]
    async fn paged_mode_replaces_and_feed_mode_appends() {
        let api = FakeApi::new();
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);

        controller.load(group_five()).await.unwrap();
        {
            let view = store.view.borrow();
            assert_eq!(view.records().len(), 10);
            assert_eq!(view.pagination().unwrap().total_pages, 3);
            assert!(view.has_next_page());
        }

        assert!(controller.next_page().await.unwrap());
        {
            let view = store.view.borrow();
            let query = view.query().unwrap();
            assert_eq!((query.page, query.group_id, query.date), (2, Some(5), day()));
            assert_eq!(view.records()[0].child_id, 11);
            assert_eq!(view.records().len(), 10);
        }
        assert_eq!(store.table.borrow().len(), 10);

        let feed = RefCell::new(InfiniteFeed::new(group_five()));
        assert_eq!(controller.load_more(&feed).await.unwrap(), 10);
        assert_eq!(controller.load_more(&feed).await.unwrap(), 10);
        let ids: Vec<u64> = feed.borrow().records().iter().map(|r| r.child_id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());

        // pages 1 and 2 came from the cache
        assert_eq!(api.page_requests.borrow().len(), 2);
    }

    #[actix_web::test]
    async fn failed_change_shows_then_reverts_to_unmarked() {
        let api = FakeApi::new();
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);
        controller.load(group_five()).await.unwrap();

        let mut change = pin!(controller.change_status(1, 5, "present"));
        assert!(poll!(&mut change).is_pending());
        assert_eq!(store.table.borrow().displayed(1), Some(AttendanceStatus::Present));
        assert_eq!(api.in_flight(), [(1, AttendanceStatus::Present)]);

        api.answer(1, Err(server_error()));
        let err = change.await.unwrap_err();

        assert_eq!(err.status, 500);
        assert_eq!(store.table.borrow().displayed(1), None);
        assert!(!store.table.borrow().is_pending(1));
        let notices = store.notices.borrow();
        let notice = notices.latest().unwrap();
        assert_eq!((notice.level, notice.status), (NoticeLevel::Error, 500));
    }

    #[actix_web::test]
    async fn successful_change_commits_and_invalidates_cache() {
        let api = FakeApi::new();
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);
        controller.load(group_five()).await.unwrap();
        assert!(cache.get(&group_five()).await.is_some());

        let mut change = pin!(controller.change_status(4, 5, "late"));
        assert!(poll!(&mut change).is_pending());
        api.answer(4, Ok(AttendanceStatus::Late));
        change.await.unwrap();

        let table = store.table.borrow();
        assert_eq!(table.committed(4), Some(AttendanceStatus::Late));
        assert!(!table.is_pending(4));
        assert_eq!(table.rollback_value(4), None);
        assert!(cache.get(&group_five()).await.is_none());
    }

    #[actix_web::test]
    async fn overlapping_changes_for_one_child_are_sent_in_order() {
        let api = FakeApi::new();
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);
        controller.load(group_five()).await.unwrap();

        let mut first = pin!(controller.change_status(2, 5, "present"));
        assert!(poll!(&mut first).is_pending());

        // queued behind the first write, shown at once
        controller.change_status(2, 5, "late").await.unwrap();
        assert_eq!(store.table.borrow().displayed(2), Some(AttendanceStatus::Late));
        assert_eq!(api.in_flight(), [(2, AttendanceStatus::Present)]);

        api.answer(2, Err(server_error()));
        assert!(poll!(&mut first).is_pending());
        assert_eq!(api.in_flight(), [(2, AttendanceStatus::Late)]);
        assert_eq!(store.table.borrow().displayed(2), Some(AttendanceStatus::Late));

        api.answer(2, Err(server_error()));
        assert!(first.await.is_err());

        // back to the server value, not the first pending one
        assert_eq!(store.table.borrow().displayed(2), None);
        assert_eq!(store.notices.borrow().len(), 2);
    }

    #[actix_web::test]
    async fn writes_for_different_children_settle_in_any_order() {
        let api = FakeApi::new();
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);
        controller.load(group_five()).await.unwrap();

        let mut a = pin!(controller.change_status(1, 5, "present"));
        let mut b = pin!(controller.change_status(3, 5, "absent"));
        assert!(poll!(&mut a).is_pending());
        assert!(poll!(&mut b).is_pending());

        api.answer(3, Ok(AttendanceStatus::Absent));
        b.await.unwrap();
        api.answer(1, Err(server_error()));
        a.await.unwrap_err();

        let table = store.table.borrow();
        assert_eq!(table.displayed(1), None);
        assert_eq!(table.displayed(3), Some(AttendanceStatus::Absent));
    }

    #[actix_web::test]
    async fn invalid_status_never_reaches_the_server() {
        let api = FakeApi::new();
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);
        controller.load(group_five()).await.unwrap();

        let err = controller.change_status(1, 5, "excused").await.unwrap_err();
        assert_eq!(err.status, 0);
        assert!(api.in_flight().is_empty());
        assert_eq!(store.notices.borrow().latest().unwrap().level, NoticeLevel::Warning);
    }

    #[actix_web::test]
    async fn mark_all_present_without_group_warns_and_sends_nothing() {
        let api = FakeApi::new();
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);
        controller.load(AttendanceQuery::new(day(), None, 10)).await.unwrap();
        let fetches = api.page_requests.borrow().len();

        let err = controller.mark_all_present().await.unwrap_err();

        assert_eq!(err.status, 0);
        assert!(api.bulk_requests.borrow().is_empty());
        assert_eq!(api.page_requests.borrow().len(), fetches);
        let notices = store.notices.borrow();
        let notice = notices.latest().unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.message, "Please select a group first");
    }

    #[actix_web::test]
    async fn mark_all_present_refetches_the_table() {
        let api = FakeApi::new();
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);
        controller.load(group_five()).await.unwrap();

        controller.mark_all_present().await.unwrap();

        assert_eq!(*api.bulk_requests.borrow(), [(5, day())]);
        assert_eq!(api.page_requests.borrow().len(), 2);
        assert!(
            store
                .table
                .borrow()
                .rows()
                .iter()
                .all(|r| r.status == Some(AttendanceStatus::Present))
        );
        assert_eq!(store.notices.borrow().latest().unwrap().level, NoticeLevel::Success);
    }

    #[actix_web::test]
    async fn failed_mark_all_present_still_refetches() {
        let api = FakeApi {
            bulk_failure: Some(server_error()),
            ..FakeApi::new()
        };
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);
        controller.load(group_five()).await.unwrap();

        let err = controller.mark_all_present().await.unwrap_err();

        assert_eq!(err.status, 500);
        assert_eq!(api.page_requests.borrow().len(), 2);
        assert_eq!(store.table.borrow().displayed(1), None);
        let notices = store.notices.borrow();
        let notice = notices.latest().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Failed to mark all children present");
    }

    fn requested_pages(api: &FakeApi) -> Vec<u32> {
        api.page_requests.borrow().iter().map(|q| q.page).collect()
    }

    #[actix_web::test]
    async fn failed_next_page_keeps_the_shown_page_and_retries_it() {
        let api = FakeApi::new();
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);
        controller.load(group_five()).await.unwrap();
        *api.failing_page.borrow_mut() = Some(2);

        let err = controller.next_page().await.unwrap_err();

        assert_eq!(err.status, 503);
        {
            let notices = store.notices.borrow();
            let notice = notices.latest().unwrap();
            assert_eq!((notice.level, notice.status), (NoticeLevel::Error, 503));
            let view = store.view.borrow();
            assert_eq!(view.records()[0].child_id, 1);
            assert_eq!(view.pagination().unwrap().page, 1);
            assert!(!view.has_previous_page());
        }
        assert_eq!(store.table.borrow().len(), 10);

        assert!(controller.next_page().await.unwrap());
        assert_eq!(requested_pages(&api), [1, 2, 2]);
        assert_eq!(store.view.borrow().records()[0].child_id, 11);
    }

    #[actix_web::test]
    async fn failed_refetch_reports_and_can_be_repeated() {
        let api = FakeApi::new();
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);
        *api.failing_page.borrow_mut() = Some(1);

        let err = controller.load(group_five()).await.unwrap_err();
        assert_eq!(err.status, 503);
        assert!(store.view.borrow().records().is_empty());
        assert!(store.table.borrow().is_empty());
        assert_eq!(store.notices.borrow().len(), 1);

        controller.refetch().await.unwrap();
        assert_eq!(requested_pages(&api), [1, 1]);
        assert_eq!(store.view.borrow().records().len(), 10);
    }

    #[actix_web::test]
    async fn failed_load_more_keeps_the_feed_and_retries_the_same_page() {
        let api = FakeApi::new();
        let cache = QueryCache::default();
        let store = AttendanceStore::default();
        let controller = AttendanceController::new(&api, &cache, &store);
        let feed = RefCell::new(InfiniteFeed::new(group_five()));
        controller.load_more(&feed).await.unwrap();
        *api.failing_page.borrow_mut() = Some(2);

        let err = controller.load_more(&feed).await.unwrap_err();

        assert_eq!(err.status, 503);
        assert_eq!(feed.borrow().len(), 10);
        assert_eq!(feed.borrow().next_query().map(|q| q.page), Some(2));
        assert_eq!(store.notices.borrow().latest().unwrap().level, NoticeLevel::Error);

        assert_eq!(controller.load_more(&feed).await.unwrap(), 10);
        assert_eq!(requested_pages(&api), [1, 2, 2]);
        assert_eq!(feed.borrow().records()[10].child_id, 11);
    }
}
