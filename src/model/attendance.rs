use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    /// Accepted wire values, lowercase and case-sensitive.
    pub const VALUES: &'static [&'static str] = &["present", "absent", "late"];
}

/// One child's attendance on one date within one group. `status` is null
/// until the child has been marked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "child_id": 12,
    "child_name": "Ada Lovelace",
    "group_id": 5,
    "date": "2025-06-10",
    "status": "present",
    "updated_at": "2025-06-10T08:15:00Z"
}))]
pub struct AttendanceRecord {
    #[serde(alias = "children_id")]
    pub child_id: u64,
    #[serde(default)]
    pub child_name: String,
    pub group_id: u64,
    #[schema(example = "2025-06-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(nullable = true)]
    pub status: Option<AttendanceStatus>,
    #[schema(example = "2025-06-10T08:15:00Z", format = "date-time", value_type = Option<String>)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row shape of the attendance queries. `date` and `status` are null for
/// children with no record on the requested date.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub child_id: u64,
    pub child_name: Option<String>,
    pub group_id: u64,
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AttendanceRow {
    pub fn into_record(
        self,
        requested_date: NaiveDate,
    ) -> Result<AttendanceRecord, strum::ParseError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<AttendanceStatus>)
            .transpose()?;
        Ok(AttendanceRecord {
            child_id: self.child_id,
            child_name: self.child_name.unwrap_or_default(),
            group_id: self.group_id,
            date: self.date.unwrap_or(requested_date),
            status,
            updated_at: self.updated_at,
        })
    }
}

/// Single-status upsert body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MarkAttendance {
    #[schema(example = 12)]
    pub children_id: u64,
    #[schema(example = 5)]
    pub group_id: u64,
    #[schema(example = "2025-06-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "present")]
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MarkAllPresent {
    #[schema(example = 5)]
    pub group_id: u64,
    #[schema(example = "2025-06-10", format = "date", value_type = String)]
    pub date: NaiveDate,
}

/// Attendance list filter. Omitting `group_id` lists every group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttendanceQuery {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

impl AttendanceQuery {
    pub fn new(date: NaiveDate, group_id: Option<u64>, limit: u32) -> Self {
        Self {
            date,
            group_id,
            page: 1,
            limit,
        }
    }

    /// Same filter, one page further.
    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }

    pub fn previous(&self) -> Self {
        Self {
            page: self.page.saturating_sub(1).max(1),
            ..self.clone()
        }
    }

    /// True when both queries select the same rows apart from the page.
    pub fn same_filter(&self, other: &AttendanceQuery) -> bool {
        self.date == other.date && self.group_id == other.group_id && self.limit == other.limit
    }
}
