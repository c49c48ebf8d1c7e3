use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Feed entry. A null `group_id` is a broadcast to every group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Message {
    #[schema(example = 8)]
    pub id: u64,
    #[schema(example = "Training cancelled")]
    pub title: String,
    #[schema(example = "Pitch is flooded, see you on Thursday.")]
    pub body: String,
    #[schema(example = 5, nullable = true)]
    pub group_id: Option<u64>,
    #[schema(example = "2025-06-10T07:30:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
