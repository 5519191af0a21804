use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionKeys},
    },
    error::{FoodgramError, QueryError},
    pagination::{PageContext, PageQuery},
    schema::{SetPasswordForm, User, UserForm, UserProfile, UserProfileRow, Uuid},
    validation::{validate_password_change, validate_username},
};

use potion::HtmlError;
use sqlx::{Pool, Postgres};

const PROFILE_COLUMNS: &str = "
    u.email, u.id, u.username, u.first_name, u.last_name,
    EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = $1 AND s.author_id = u.id) AS is_subscribed
";

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn find_user(pool: &Pool<Postgres>, username: &str) -> Result<Option<Uuid>, potion::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row.map(|r| r.0))
}

/// Profile of `user_id` as seen by `viewer`.
pub async fn get_user_profile(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, potion::Error> {
    let row: Option<UserProfile> =
        sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = $2"))
            .bind(viewer)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    row.ok_or_else(|| FoodgramError::NotFound(format!("user {user_id}")).into())
}

pub async fn list_users(
    viewer: Uuid,
    query: PageQuery,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserProfile>, potion::Error> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLUMNS}, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $2 OFFSET $3"
    ))
    .bind(viewer)
    .bind(query.limit)
    .bind(query.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|p| p.count).unwrap_or(0);
    let rows = rows.into_iter().map(|row| row.profile).collect();
    Ok(PageContext::from_rows(rows, total_count, query, "/api/users/")?)
}

/// Creates a user from the registration form. The password is stored as an argon2 hash.
pub async fn register_user(form: &UserForm, pool: &Pool<Postgres>) -> Result<UserProfile, potion::Error> {
    validate_username(&form.username)?;

    let password = hash_password(&form.password)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to hash password"))?;

    let id: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(&form.email)
    .bind(&form.username)
    .bind(&form.first_name)
    .bind(&form.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let id = id.ok_or(FoodgramError::UserExists)?.0;
    log::info!("Registered user {} ({id})", form.username);

    Ok(UserProfile {
        email: form.email.to_owned(),
        id,
        username: form.username.to_owned(),
        first_name: form.first_name.to_owned(),
        last_name: form.last_name.to_owned(),
        is_subscribed: false,
    })
}

/// Exchanges email and password for a session token.
pub async fn login_user(
    email: &str,
    password: &str,
    keys: &SessionKeys,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    let user = get_user(pool, email)
        .await?
        .ok_or(FoodgramError::InvalidCredentials)?;

    let authenticated = verify_password(password, &user.password).unwrap_or(false);
    if !authenticated {
        log::warn!("Failed login for {email}");
        return Err(FoodgramError::InvalidCredentials.into());
    }

    generate_jwt_session(&user, keys)
}

pub async fn set_password(
    user_id: Uuid,
    form: &SetPasswordForm,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| FoodgramError::NotFound(format!("user {user_id}")))?;

    let current_valid = verify_password(&form.current_password, &user.password).unwrap_or(false);
    validate_password_change(current_valid, &form.current_password, &form.new_password)?;

    let password = hash_password(&form.new_password)
        .map_err(|_| HtmlError::InternalServerError.new("Failed to hash password"))?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
