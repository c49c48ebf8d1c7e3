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
        group::Group,
        response::{DataResponse, ListResponse, MessageResponse, Pagination, PageParams},
    },
    utils::db_utils::{build_update_sql, execute_update, like_pattern},
    validation::{Rule, Schema},
};

static CREATE_GROUP_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("name", &[Rule::Required, Rule::NonEmpty, Rule::MaxLen(100)])
        .field("description", &[Rule::MaxLen(2000)])
        .field("coach_id", &[Rule::PositiveInt])
});

static UPDATE_GROUP_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("name", &[Rule::NotNull, Rule::NonEmpty, Rule::MaxLen(100)])
        .field("description", &[Rule::MaxLen(2000)])
        .field("coach_id", &[Rule::PositiveInt])
        .deny_unknown()
});

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateGroup {
    #[schema(example = "Under-10 Tigers")]
    pub name: String,
    #[schema(example = "Tuesday and Thursday evening training")]
    pub description: Option<String>,
    #[schema(example = 2)]
    pub coach_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub description: Option<String>,
    pub coach_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GroupQuery {
    /// Search by name
    pub search: Option<String>,
    /// Only groups led by this coach
    pub coach_id: Option<u64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

const SELECT_GROUP: &str = r#"
    SELECT
        g.id,
        g.name,
        g.description,
        g.coach_id,
        (SELECT COUNT(*) FROM children c WHERE c.group_id = g.id) AS children_count,
        g.created_at
    FROM `groups` g
"#;

async fn fetch_group(pool: &MySqlPool, group_id: u64) -> Result<Option<Group>, AppError> {
    let group = sqlx::query_as::<_, Group>(&format!("{SELECT_GROUP} WHERE g.id = ?"))
        .bind(group_id)
        .fetch_optional(pool)
        .await?;
    Ok(group)
}

#[utoipa::path(
    get,
    path = "/api/groups",
    params(GroupQuery),
    responses(
        (status = 200, description = "Paginated group list", body = crate::model::response::GroupList)
    ),
    tag = "Group"
)]
pub async fn list_groups(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<GroupQuery>,
) -> Result<HttpResponse, AppError> {
    let (page, limit, offset) = PageParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(config.default_page_limit, config.max_page_limit);

    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(like_pattern);

    let where_clause = r#"
        WHERE (? IS NULL OR g.name LIKE ?)
        AND (? IS NULL OR g.coach_id = ?)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM `groups` g {where_clause}"))
        .bind(&search)
        .bind(&search)
        .bind(query.coach_id)
        .bind(query.coach_id)
        .fetch_one(pool.get_ref())
        .await?;

    debug!(page, limit, offset, search = ?search, "Fetching groups");

    let groups = sqlx::query_as::<_, Group>(&format!(
        "{SELECT_GROUP} {where_clause} ORDER BY g.name LIMIT ? OFFSET ?"
    ))
    .bind(&search)
    .bind(&search)
    .bind(query.coach_id)
    .bind(query.coach_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(ListResponse::new(
        "Groups fetched",
        groups,
        Pagination::new(page, limit, total.max(0) as u64),
    )))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}",
    params(("group_id" = u64, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group found", body = Group),
        (status = 404, description = "Group not found", body = crate::error::ErrorBody)
    ),
    tag = "Group"
)]
pub async fn get_group(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();
    match fetch_group(pool.get_ref(), group_id).await? {
        Some(group) => Ok(HttpResponse::Ok().json(DataResponse::new("Group fetched", group))),
        None => Err(AppError::not_found("Group")),
    }
}

#[utoipa::path(
    post,
    path = "/api/groups",
    request_body = CreateGroup,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody)
    ),
    tag = "Group"
)]
pub async fn create_group(
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let payload: CreateGroup = CREATE_GROUP_SCHEMA.parse(body.into_inner())?;

    let result = sqlx::query("INSERT INTO `groups` (name, description, coach_id) VALUES (?, ?, ?)")
        .bind(payload.name.trim())
        .bind(&payload.description)
        .bind(payload.coach_id)
        .execute(pool.get_ref())
        .await?;

    let group_id = result.last_insert_id();
    info!(group_id, "Group created");

    let group = fetch_group(pool.get_ref(), group_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("group {group_id} vanished after insert")))?;

    Ok(HttpResponse::Created().json(DataResponse::new("Group created", group)))
}

#[utoipa::path(
    put,
    path = "/api/groups/{group_id}",
    params(("group_id" = u64, Path, description = "Group ID")),
    request_body = UpdateGroup,
    responses(
        (status = 200, description = "Group updated", body = MessageResponse),
        (status = 404, description = "Group not found", body = crate::error::ErrorBody)
    ),
    tag = "Group"
)]
pub async fn update_group(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();
    let body = body.into_inner();
    UPDATE_GROUP_SCHEMA.validate(&body)?;

    let update = build_update_sql("groups", &body, &UPDATE_GROUP_SCHEMA.field_names(), group_id)?;
    let affected = execute_update(pool.get_ref(), update).await?;

    if affected == 0 && fetch_group(pool.get_ref(), group_id).await?.is_none() {
        return Err(AppError::not_found("Group"));
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new("Group updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{group_id}",
    params(("group_id" = u64, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = MessageResponse),
        (status = 404, description = "Group not found", body = crate::error::ErrorBody)
    ),
    tag = "Group"
)]
pub async fn delete_group(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();

    let result = sqlx::query("DELETE FROM `groups` WHERE id = ?")
        .bind(group_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Group"));
    }

    info!(group_id, "Group deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Successfully deleted")))
}
