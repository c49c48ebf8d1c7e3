use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    config::Config,
    error::{AppError, FieldError},
    model::{
        event::Event,
        response::{DataResponse, ListResponse, MessageResponse, PageParams, Pagination},
    },
    utils::db_utils::{build_update_sql, execute_update},
    validation::{Rule, Schema},
};

static CREATE_EVENT_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("title", &[Rule::Required, Rule::NonEmpty, Rule::MaxLen(200)])
        .field("description", &[Rule::MaxLen(5000)])
        .field("group_id", &[Rule::PositiveInt])
        .field("starts_at", &[Rule::Required, Rule::DateTime])
        .field("ends_at", &[Rule::Required, Rule::DateTime])
        .field("location", &[Rule::MaxLen(255)])
});

static UPDATE_EVENT_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("title", &[Rule::NotNull, Rule::NonEmpty, Rule::MaxLen(200)])
        .field("description", &[Rule::MaxLen(5000)])
        .field("group_id", &[Rule::PositiveInt])
        .field("starts_at", &[Rule::NotNull, Rule::DateTime])
        .field("ends_at", &[Rule::NotNull, Rule::DateTime])
        .field("location", &[Rule::MaxLen(255)])
        .deny_unknown()
});

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEvent {
    #[schema(example = "Summer tournament")]
    pub title: String,
    pub description: Option<String>,
    /// Omit for a club-wide event
    #[schema(example = 5)]
    pub group_id: Option<u64>,
    #[schema(example = "2025-06-14T09:00:00Z", value_type = String, format = "date-time")]
    pub starts_at: DateTime<Utc>,
    #[schema(example = "2025-06-14T15:00:00Z", value_type = String, format = "date-time")]
    pub ends_at: DateTime<Utc>,
    #[schema(example = "Main pitch")]
    pub location: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub group_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub starts_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub ends_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventQuery {
    /// Events ending at or after this instant
    #[param(value_type = Option<String>, format = "date-time")]
    pub from: Option<DateTime<Utc>>,
    /// Events starting before this instant
    #[param(value_type = Option<String>, format = "date-time")]
    pub to: Option<DateTime<Utc>>,
    /// Group events plus club-wide ones
    pub group_id: Option<u64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

const SELECT_EVENT: &str =
    "SELECT id, title, description, group_id, starts_at, ends_at, location FROM events";

fn check_time_range(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), AppError> {
    if ends_at < starts_at {
        return Err(AppError::Validation(vec![FieldError::new(
            "ends_at",
            "must not be before starts_at",
        )]));
    }
    Ok(())
}

fn timestamp_field(body: &Value, key: &str) -> Option<DateTime<Utc>> {
    body.get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

async fn fetch_event(pool: &MySqlPool, event_id: u64) -> Result<Option<Event>, AppError> {
    let event = sqlx::query_as::<_, Event>(&format!("{SELECT_EVENT} WHERE id = ?"))
        .bind(event_id)
        .fetch_optional(pool)
        .await?;
    Ok(event)
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(EventQuery),
    responses(
        (status = 200, description = "Paginated event list, soonest first", body = crate::model::response::EventList)
    ),
    tag = "Event"
)]
pub async fn list_events(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<EventQuery>,
) -> Result<HttpResponse, AppError> {
    let (page, limit, offset) = PageParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(config.default_page_limit, config.max_page_limit);

    let where_clause = r#"
        WHERE (? IS NULL OR ends_at >= ?)
        AND (? IS NULL OR starts_at < ?)
        AND (? IS NULL OR group_id = ? OR group_id IS NULL)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM events {where_clause}"))
        .bind(query.from)
        .bind(query.from)
        .bind(query.to)
        .bind(query.to)
        .bind(query.group_id)
        .bind(query.group_id)
        .fetch_one(pool.get_ref())
        .await?;

    debug!(page, limit, offset, group_id = ?query.group_id, "Fetching events");

    let events = sqlx::query_as::<_, Event>(&format!(
        "{SELECT_EVENT} {where_clause} ORDER BY starts_at, id LIMIT ? OFFSET ?"
    ))
    .bind(query.from)
    .bind(query.from)
    .bind(query.to)
    .bind(query.to)
    .bind(query.group_id)
    .bind(query.group_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(ListResponse::new(
        "Events fetched",
        events,
        Pagination::new(page, limit, total.max(0) as u64),
    )))
}

#[utoipa::path(
    get,
    path = "/api/events/{event_id}",
    params(("event_id" = u64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event found", body = Event),
        (status = 404, description = "Event not found", body = crate::error::ErrorBody)
    ),
    tag = "Event"
)]
pub async fn get_event(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    match fetch_event(pool.get_ref(), path.into_inner()).await? {
        Some(event) => Ok(HttpResponse::Ok().json(DataResponse::new("Event fetched", event))),
        None => Err(AppError::not_found("Event")),
    }
}

#[utoipa::path(
    post,
    path = "/api/events",
    request_body = CreateEvent,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody)
    ),
    tag = "Event"
)]
pub async fn create_event(
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let payload: CreateEvent = CREATE_EVENT_SCHEMA.parse(body.into_inner())?;
    check_time_range(payload.starts_at, payload.ends_at)?;

    let result = sqlx::query(
        r#"
        INSERT INTO events (title, description, group_id, starts_at, ends_at, location)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(payload.group_id)
    .bind(payload.starts_at)
    .bind(payload.ends_at)
    .bind(&payload.location)
    .execute(pool.get_ref())
    .await?;

    let event_id = result.last_insert_id();
    info!(event_id, group_id = ?payload.group_id, "Event created");

    let event = fetch_event(pool.get_ref(), event_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("event {event_id} vanished after insert")))?;

    Ok(HttpResponse::Created().json(DataResponse::new("Event created", event)))
}

#[utoipa::path(
    put,
    path = "/api/events/{event_id}",
    params(("event_id" = u64, Path, description = "Event ID")),
    request_body = UpdateEvent,
    responses(
        (status = 200, description = "Event updated", body = MessageResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
        (status = 404, description = "Event not found", body = crate::error::ErrorBody)
    ),
    tag = "Event"
)]
pub async fn update_event(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let event_id = path.into_inner();
    let body = body.into_inner();
    UPDATE_EVENT_SCHEMA.validate(&body)?;

    let current = fetch_event(pool.get_ref(), event_id)
        .await?
        .ok_or_else(|| AppError::not_found("Event"))?;

    // the range must hold after a partial update too
    let starts_at = timestamp_field(&body, "starts_at").unwrap_or(current.starts_at);
    let ends_at = timestamp_field(&body, "ends_at").unwrap_or(current.ends_at);
    check_time_range(starts_at, ends_at)?;

    let update = build_update_sql("events", &body, &UPDATE_EVENT_SCHEMA.field_names(), event_id)?;
    execute_update(pool.get_ref(), update).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Event updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/events/{event_id}",
    params(("event_id" = u64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = MessageResponse),
        (status = 404, description = "Event not found", body = crate::error::ErrorBody)
    ),
    tag = "Event"
)]
pub async fn delete_event(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let event_id = path.into_inner();

    let result = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(event_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Event"));
    }

    info!(event_id, "Event deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Successfully deleted")))
}
