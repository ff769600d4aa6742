//! Connection lookups.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::ConnectionRow};

/// The most recently used `active` connection for `(user_id, service)`.
///
/// Never-used connections sort after used ones; among those the newest wins.
pub async fn find_active_connection(
    pool: &PgPool,
    user_id: Uuid,
    service: &str,
) -> Result<Option<ConnectionRow>, DbError> {
    let row = sqlx::query_as::<_, ConnectionRow>(
        r#"
        SELECT id, user_id, service, auth_data, metadata, status, last_used_at, created_at
        FROM connections
        WHERE user_id = $1 AND service = $2 AND status = 'active'
        ORDER BY last_used_at DESC NULLS LAST, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(service)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Stamp `last_used_at` on a connection.
pub async fn touch_connection(pool: &PgPool, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE connections SET last_used_at = $1 WHERE id = $2")
        .bind(at)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
