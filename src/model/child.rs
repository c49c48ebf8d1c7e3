use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 12,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "birth_date": "2016-12-10",
        "group_id": 5,
        "parent_phone": "+8801712345678",
        "created_at": "2025-01-01T00:00:00Z"
    })
)]
pub struct Child {
    #[schema(example = 12)]
    pub id: u64,

    #[schema(example = "Ada")]
    pub first_name: String,

    #[schema(example = "Lovelace")]
    pub last_name: String,

    #[schema(example = "2016-12-10", value_type = Option<String>, format = "date")]
    pub birth_date: Option<NaiveDate>,

    #[schema(example = 5, nullable = true)]
    pub group_id: Option<u64>,

    #[schema(example = "+8801712345678", nullable = true)]
    pub parent_phone: Option<String>,

    #[schema(example = "2025-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
