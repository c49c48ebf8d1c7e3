use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Coach {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "Grace")]
    pub first_name: String,
    #[schema(example = "Hopper")]
    pub last_name: String,
    #[schema(example = "grace@club.org", format = "email")]
    pub email: String,
    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,
    #[schema(example = "2025-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
