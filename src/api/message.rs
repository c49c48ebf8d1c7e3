use actix_web::{HttpResponse, web};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    config::Config,
    error::AppError,
    model::{
        message::Message,
        response::{DataResponse, ListResponse, MessageResponse, PageParams, Pagination},
    },
    utils::db_utils::row_exists,
    validation::{Rule, Schema},
};

static CREATE_MESSAGE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("title", &[Rule::Required, Rule::NonEmpty, Rule::MaxLen(200)])
        .field("body", &[Rule::Required, Rule::NonEmpty, Rule::MaxLen(10_000)])
        .field("group_id", &[Rule::PositiveInt])
});

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateMessage {
    #[schema(example = "Training cancelled")]
    pub title: String,
    #[schema(example = "Pitch is flooded, see you on Thursday.")]
    pub body: String,
    /// Omit to broadcast to every group
    #[schema(example = 5)]
    pub group_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessageQuery {
    /// Messages for this group, broadcasts included
    pub group_id: Option<u64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

const SELECT_MESSAGE: &str = "SELECT id, title, body, group_id, created_at FROM messages";

#[utoipa::path(
    get,
    path = "/api/messages",
    params(MessageQuery),
    responses(
        (status = 200, description = "Paginated message feed, newest first", body = crate::model::response::MessageList)
    ),
    tag = "Message"
)]
pub async fn list_messages(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<MessageQuery>,
) -> Result<HttpResponse, AppError> {
    let (page, limit, offset) = PageParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(config.default_page_limit, config.max_page_limit);

    let where_clause = "WHERE (? IS NULL OR group_id = ? OR group_id IS NULL)";

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM messages {where_clause}"))
        .bind(query.group_id)
        .bind(query.group_id)
        .fetch_one(pool.get_ref())
        .await?;

    debug!(page, limit, offset, group_id = ?query.group_id, "Fetching messages");

    let messages = sqlx::query_as::<_, Message>(&format!(
        "{SELECT_MESSAGE} {where_clause} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    ))
    .bind(query.group_id)
    .bind(query.group_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(ListResponse::new(
        "Messages fetched",
        messages,
        Pagination::new(page, limit, total.max(0) as u64),
    )))
}

#[utoipa::path(
    get,
    path = "/api/messages/{message_id}",
    params(("message_id" = u64, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message found", body = Message),
        (status = 404, description = "Message not found", body = crate::error::ErrorBody)
    ),
    tag = "Message"
)]
pub async fn get_message(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let message = sqlx::query_as::<_, Message>(&format!("{SELECT_MESSAGE} WHERE id = ?"))
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Message"))?;

    Ok(HttpResponse::Ok().json(DataResponse::new("Message fetched", message)))
}

#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = CreateMessage,
    responses(
        (status = 201, description = "Message posted", body = Message),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
        (status = 404, description = "Group not found", body = crate::error::ErrorBody)
    ),
    tag = "Message"
)]
pub async fn create_message(
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let payload: CreateMessage = CREATE_MESSAGE_SCHEMA.parse(body.into_inner())?;

    if let Some(group_id) = payload.group_id {
        if !row_exists(pool.get_ref(), "groups", group_id).await? {
            return Err(AppError::not_found("Group"));
        }
    }

    let result = sqlx::query("INSERT INTO messages (title, body, group_id) VALUES (?, ?, ?)")
        .bind(payload.title.trim())
        .bind(&payload.body)
        .bind(payload.group_id)
        .execute(pool.get_ref())
        .await?;

    let message_id = result.last_insert_id();
    info!(message_id, group_id = ?payload.group_id, "Message posted");

    let message = sqlx::query_as::<_, Message>(&format!("{SELECT_MESSAGE} WHERE id = ?"))
        .bind(message_id)
        .fetch_one(pool.get_ref())
        .await?;

    Ok(HttpResponse::Created().json(DataResponse::new("Message posted", message)))
}

#[utoipa::path(
    delete,
    path = "/api/messages/{message_id}",
    params(("message_id" = u64, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = MessageResponse),
        (status = 404, description = "Message not found", body = crate::error::ErrorBody)
    ),
    tag = "Message"
)]
pub async fn delete_message(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let message_id = path.into_inner();

    let result = sqlx::query("DELETE FROM messages WHERE id = ?")
        .bind(message_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Message"));
    }

    info!(message_id, "Message deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Successfully deleted")))
}
