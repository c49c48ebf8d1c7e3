use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Group {
    #[schema(example = 5)]
    pub id: u64,
    #[schema(example = "Under-10 Tigers")]
    pub name: String,
    #[schema(example = "Tuesday and Thursday evening training", nullable = true)]
    pub description: Option<String>,
    #[schema(example = 2, nullable = true)]
    pub coach_id: Option<u64>,
    /// Number of children currently assigned to the group
    #[schema(example = 14)]
    pub children_count: i64,
    #[schema(example = "2025-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
