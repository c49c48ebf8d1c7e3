use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{MySql, MySqlPool};

use crate::error::AppError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Only keys listed in `allowed_columns` may appear in the SET clause; the
/// payload is expected to have passed its update schema already.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed_columns: &[&str],
    id_value: u64,
) -> Result<SqlUpdate, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Payload must be a JSON object".into()))?;

    if obj.is_empty() {
        return Err(AppError::BadRequest("No fields provided for update".into()));
    }

    if let Some(unknown) = obj.keys().find(|k| !allowed_columns.contains(&k.as_str())) {
        return Err(AppError::BadRequest(format!("Field `{unknown}` cannot be updated")));
    }

    // Build SET clause
    let set_clause = obj
        .keys()
        .map(|k| format!("`{}` = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE `{}` SET {} WHERE id = ?", table, set_clause);

    let mut values = Vec::with_capacity(obj.len() + 1);

    // Convert JSON values → SqlValue
    for value in obj.values() {
        values.push(to_sql_value(value)?);
    }

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

fn to_sql_value(value: &Value) -> Result<SqlValue, AppError> {
    Ok(match value {
        Value::String(s) => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                SqlValue::Date(d)
            } else if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                SqlValue::DateTime(dt.with_timezone(&Utc))
            } else {
                SqlValue::String(s.clone())
            }
        }
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                SqlValue::U64(u)
            } else if let Some(i) = n.as_i64() {
                SqlValue::I64(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::F64(f)
            } else {
                return Err(AppError::BadRequest("Unsupported number".into()));
            }
        }
        Value::Bool(b) => SqlValue::Bool(*b),
        Value::Null => SqlValue::Null,
        _ => return Err(AppError::BadRequest("Unsupported JSON value type".into())),
    })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn row_exists<'c, E>(executor: E, table: &str, id: u64) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = MySql>,
{
    let sql = format!("SELECT COUNT(*) FROM `{}` WHERE id = ?", table);
    let count: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(executor).await?;
    Ok(count > 0)
}

/// Escapes LIKE wildcards and wraps the term for a contains-match.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
