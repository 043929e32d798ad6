//! User and usage-accounting database queries.

use sqlx::PgPool;

use super::AuthError;
use crate::models::auth::User;

const USER_COLUMNS: &str = "id, email, username, full_name, password_hash, \
     subscription_tier, usage_count, usage_limit, is_active, role, created_at";

/// Fetch a user by email.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AuthError> {
    let row = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Fetch a user by ID.
pub async fn find_user_by_id(pool: &PgPool, user_id: i64) -> Result<Option<User>, AuthError> {
    let row = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Create a new user on the free tier, returning the full record.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    username: &str,
    full_name: Option<&str>,
    password_hash: &str,
    usage_limit: i32,
) -> Result<User, AuthError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, username, full_name, password_hash, usage_limit) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(email)
    .bind(username)
    .bind(full_name)
    .bind(password_hash)
    .bind(usage_limit)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

/// Check whether an email is already registered.
pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, AuthError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Check whether a username is already taken.
pub async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, AuthError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Fetch the daily usage pair for a user: (usage_count, usage_limit).
pub async fn fetch_usage(pool: &PgPool, user_id: i64) -> Result<Option<(i32, i32)>, AuthError> {
    let row = sqlx::query_as::<_, (i32, i32)>(
        "SELECT usage_count, usage_limit FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Count one metered operation against a user's daily quota.
pub async fn increment_usage(pool: &PgPool, user_id: i64) -> Result<(), AuthError> {
    sqlx::query("UPDATE users SET usage_count = usage_count + 1, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Reset every user's daily usage counter to zero.
///
/// Called by the midnight scheduler. Returns the number of rows updated.
pub async fn reset_all_usage(pool: &PgPool) -> Result<u64, AuthError> {
    let result = sqlx::query("UPDATE users SET usage_count = 0, updated_at = now()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Deactivate a user account. The auth layer never hard-deletes.
pub async fn deactivate_user(pool: &PgPool, user_id: i64) -> Result<(), AuthError> {
    sqlx::query("UPDATE users SET is_active = FALSE, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
