//! Dashboard side of attendance marking: an optimistic table over the
//! attendance endpoints, page and feed consumers, a keyed page cache and the
//! notice outbox. Runs on a single-threaded executor; state lives in `RefCell`s
//! owned by the screen.

pub mod api;
pub mod cache;
pub mod controller;
pub mod feed;
pub mod notify;
pub mod table;

pub use api::{ApiError, AttendanceApi, AttendancePage, HttpAttendanceApi};
pub use cache::QueryCache;
pub use controller::{AttendanceController, AttendanceStore};
pub use feed::{InfiniteFeed, PagedView};
pub use notify::{Notice, NoticeLevel, Notifications};
pub use table::{AttendanceTable, RollbackPolicy, StatusWrite};
