use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A calendar entry, either club-wide (`group_id` null) or for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Event {
    #[schema(example = 31)]
    pub id: u64,
    #[schema(example = "Summer tournament")]
    pub title: String,
    #[schema(nullable = true)]
    pub description: Option<String>,
    #[schema(example = 5, nullable = true)]
    pub group_id: Option<u64>,
    #[schema(example = "2025-06-14T09:00:00Z", value_type = String, format = "date-time")]
    pub starts_at: DateTime<Utc>,
    #[schema(example = "2025-06-14T15:00:00Z", value_type = String, format = "date-time")]
    pub ends_at: DateTime<Utc>,
    #[schema(example = "Main pitch", nullable = true)]
    pub location: Option<String>,
}
