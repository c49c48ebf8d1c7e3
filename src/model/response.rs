use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::model::{
    attendance::AttendanceRecord, child::Child, coach::Coach, event::Event, group::Group,
    message::Message,
};

/// Page metadata shared by every list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub limit: u32,
    #[schema(example = 25)]
    pub total: u64,
    #[serde(rename = "totalPages")]
    #[schema(example = 3)]
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit)) as u32
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }
}

/// `page` / `limit` query parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number
    pub page: Option<u32>,
    /// Items per page
    pub limit: Option<u32>,
}

impl PageParams {
    /// Resolves to `(page, limit, offset)`, clamping `limit` into `1..=max_limit`.
    pub fn resolve(&self, default_limit: u32, max_limit: u32) -> (u32, u32, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit);
        let offset = u64::from(page - 1) * u64::from(limit);
        (page, limit, offset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[aliases(
    AttendanceList = ListResponse<AttendanceRecord>,
    ChildList = ListResponse<Child>,
    CoachList = ListResponse<Coach>,
    GroupList = ListResponse<Group>,
    EventList = ListResponse<Event>,
    MessageList = ListResponse<Message>
)]
pub struct ListResponse<T> {
    #[schema(example = "Attendance fetched")]
    pub message: String,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> ListResponse<T> {
    pub fn new(message: impl Into<String>, data: Vec<T>, pagination: Pagination) -> Self {
        Self {
            message: message.into(),
            data,
            pagination,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "All children marked present")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
