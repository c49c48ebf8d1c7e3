use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
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
        child::Child,
        response::{DataResponse, ListResponse, MessageResponse, PageParams, Pagination},
    },
    utils::db_utils::{build_update_sql, execute_update, like_pattern, row_exists},
    validation::{Rule, Schema},
};

static CREATE_CHILD_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("first_name", &[Rule::Required, Rule::NonEmpty, Rule::MaxLen(100)])
        .field("last_name", &[Rule::Required, Rule::NonEmpty, Rule::MaxLen(100)])
        .field("birth_date", &[Rule::Date])
        .field("group_id", &[Rule::PositiveInt])
        .field("parent_phone", &[Rule::MaxLen(32)])
});

static UPDATE_CHILD_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("first_name", &[Rule::NotNull, Rule::NonEmpty, Rule::MaxLen(100)])
        .field("last_name", &[Rule::NotNull, Rule::NonEmpty, Rule::MaxLen(100)])
        .field("birth_date", &[Rule::Date])
        .field("group_id", &[Rule::PositiveInt])
        .field("parent_phone", &[Rule::MaxLen(32)])
        .deny_unknown()
});

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateChild {
    #[schema(example = "Ada", value_type = String)]
    pub first_name: String,
    #[schema(example = "Lovelace", value_type = String)]
    pub last_name: String,
    #[schema(example = "2016-12-10", format = "date", value_type = Option<String>)]
    pub birth_date: Option<NaiveDate>,
    #[schema(example = 5)]
    pub group_id: Option<u64>,
    #[schema(example = "+8801712345678")]
    pub parent_phone: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateChild {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[schema(example = "2016-12-10", format = "date", value_type = Option<String>)]
    pub birth_date: Option<NaiveDate>,
    /// Pass `null` to remove the child from its group
    pub group_id: Option<u64>,
    pub parent_phone: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChildQuery {
    /// Filter by group
    pub group_id: Option<u64>,
    /// Search by first or last name
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

const SELECT_CHILD: &str =
    "SELECT id, first_name, last_name, birth_date, group_id, parent_phone, created_at FROM children";

#[utoipa::path(
    get,
    path = "/api/children",
    params(ChildQuery),
    responses(
        (status = 200, description = "Paginated child list", body = crate::model::response::ChildList)
    ),
    tag = "Child"
)]
pub async fn list_children(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ChildQuery>,
) -> Result<HttpResponse, AppError> {
    let (page, limit, offset) = PageParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(config.default_page_limit, config.max_page_limit);

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);

    // ---------- shared WHERE clause ----------
    let where_clause = r#"
        WHERE (? IS NULL OR group_id = ?)
        AND (? IS NULL OR first_name LIKE ? OR last_name LIKE ?)
    "#;

    let count_sql = format!("SELECT COUNT(*) FROM children {where_clause}");
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(query.group_id)
        .bind(query.group_id)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql =
        format!("{SELECT_CHILD} {where_clause} ORDER BY last_name, first_name, id LIMIT ? OFFSET ?");
    debug!(group_id = ?query.group_id, page, limit, offset, "Fetching children");

    let children = sqlx::query_as::<_, Child>(&data_sql)
        .bind(query.group_id)
        .bind(query.group_id)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(ListResponse::new(
        "Children fetched",
        children,
        Pagination::new(page, limit, total.max(0) as u64),
    )))
}

#[utoipa::path(
    get,
    path = "/api/children/{child_id}",
    params(("child_id" = u64, Path, description = "Child ID")),
    responses(
        (status = 200, description = "Child found", body = Child),
        (status = 404, description = "Child not found", body = crate::error::ErrorBody)
    ),
    tag = "Child"
)]
pub async fn get_child(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let child_id = path.into_inner();

    let child = sqlx::query_as::<_, Child>(&format!("{SELECT_CHILD} WHERE id = ?"))
        .bind(child_id)
        .fetch_optional(pool.get_ref())
        .await?;

    match child {
        Some(child) => Ok(HttpResponse::Ok().json(DataResponse::new("Child fetched", child))),
        None => Err(AppError::not_found("Child")),
    }
}

#[utoipa::path(
    post,
    path = "/api/children",
    request_body = CreateChild,
    responses(
        (status = 201, description = "Child created", body = Object, example = json!({
            "message": "Child created",
            "data": { "id": 12 }
        })),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody)
    ),
    tag = "Child"
)]
pub async fn create_child(
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let payload: CreateChild = CREATE_CHILD_SCHEMA.parse(body.into_inner())?;

    if let Some(group_id) = payload.group_id {
        if !row_exists(pool.get_ref(), "groups", group_id).await? {
            return Err(AppError::not_found("Group"));
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO children (first_name, last_name, birth_date, group_id, parent_phone)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.birth_date)
    .bind(payload.group_id)
    .bind(&payload.parent_phone)
    .execute(pool.get_ref())
    .await?;

    let child_id = result.last_insert_id();
    info!(child_id, group_id = ?payload.group_id, "Child created");

    Ok(HttpResponse::Created().json(DataResponse::new(
        "Child created",
        serde_json::json!({ "id": child_id }),
    )))
}

#[utoipa::path(
    put,
    path = "/api/children/{child_id}",
    params(("child_id" = u64, Path, description = "Child ID")),
    request_body = UpdateChild,
    responses(
        (status = 200, description = "Child updated", body = MessageResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
        (status = 404, description = "Child not found", body = crate::error::ErrorBody)
    ),
    tag = "Child"
)]
pub async fn update_child(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let child_id = path.into_inner();
    let body = body.into_inner();
    UPDATE_CHILD_SCHEMA.validate(&body)?;

    let update = build_update_sql("children", &body, &UPDATE_CHILD_SCHEMA.field_names(), child_id)?;
    let affected = execute_update(pool.get_ref(), update).await?;

    // MySQL reports changed rows, so 0 can also mean "same values"
    if affected == 0 && !row_exists(pool.get_ref(), "children", child_id).await? {
        return Err(AppError::not_found("Child"));
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new("Child updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/children/{child_id}",
    params(("child_id" = u64, Path, description = "Child ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = MessageResponse),
        (status = 404, description = "Child not found", body = crate::error::ErrorBody)
    ),
    tag = "Child"
)]
pub async fn delete_child(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let child_id = path.into_inner();

    let result = sqlx::query("DELETE FROM children WHERE id = ?")
        .bind(child_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Child"));
    }

    info!(child_id, "Child deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Successfully deleted")))
}
