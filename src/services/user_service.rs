use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{new_id, now};
use crate::error::{AppError, AppResult};
use crate::models::common::{order_clause, search_pattern, PageWindow, Paginated};
use crate::models::user::{AuthProvider, User, UserQuery, UserStatus};
use crate::rbac::Role;

const USER_COLUMNS: &str =
    "id, name, email, phone, password_hash, role, status, auth_provider, created_at, updated_at";

const SORTABLE: &[(&str, &str)] = &[
    ("name", "name"),
    ("email", "email"),
    ("role", "role"),
    ("createdAt", "created_at"),
    ("created_at", "created_at"),
];

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub role: Role,
    pub auth_provider: AuthProvider,
}

pub async fn insert(pool: &SqlitePool, new: NewUser<'_>) -> AppResult<User> {
    let id = new_id();
    let ts = now();
    sqlx::query(
        "INSERT INTO users (id, name, email, phone, password_hash, role, status, auth_provider, created_at, \
         updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(new.name)
    .bind(new.email)
    .bind(new.phone)
    .bind(new.password_hash)
    .bind(new.role)
    .bind(UserStatus::Active)
    .bind(new.auth_provider)
    .bind(ts)
    .bind(ts)
    .execute(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("An account with this email already exists".into()),
        other => other,
    })?;

    get(pool, &id).await
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn get(pool: &SqlitePool, id: &str) -> AppResult<User> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".into()))
}

/// Deactivated accounts never match: their email is free for re-registration.
pub async fn find_active_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? AND status = 'active'");
    Ok(sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(pool).await?)
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, q: &UserQuery) {
    qb.push(" WHERE 1 = 1");
    if let Some(role) = q.role {
        qb.push(" AND role = ").push_bind(role);
    }
    match q.status {
        Some(status) => {
            qb.push(" AND status = ").push_bind(status);
        }
        // guest identities are plumbing, not accounts
        None => {
            qb.push(" AND role != 'guest'");
        }
    }
    if let Some(pattern) = search_pattern(q.search.as_deref()) {
        qb.push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list(pool: &SqlitePool, q: &UserQuery) -> AppResult<Paginated<User>> {
    let window = PageWindow::new(q.page, q.limit);

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
    push_filters(&mut count, q);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut page = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users"));
    push_filters(&mut page, q);
    page.push(" ORDER BY ")
        .push(order_clause(q.sort.as_deref(), SORTABLE, "created_at DESC"))
        .push(" LIMIT ")
        .push_bind(i64::from(window.limit))
        .push(" OFFSET ")
        .push_bind(window.offset());
    let users = page.build_query_as::<User>().fetch_all(pool).await?;

    Ok(window.paginate(users, total))
}

pub async fn export(pool: &SqlitePool) -> AppResult<Vec<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role != 'guest' ORDER BY created_at DESC");
    Ok(sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?)
}

pub async fn update_role(pool: &SqlitePool, actor_id: &str, target_id: &str, role: Role) -> AppResult<User> {
    if actor_id == target_id {
        return Err(AppError::BadRequest("You cannot change your own role".into()));
    }
    if role == Role::Guest {
        return Err(AppError::BadRequest("The guest role cannot be assigned".into()));
    }
    let target = get(pool, target_id).await?;
    if target.auth_provider == AuthProvider::Guest {
        return Err(AppError::BadRequest("Guest identities cannot be promoted".into()));
    }

    sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role)
        .bind(now())
        .bind(target_id)
        .execute(pool)
        .await?;
    tracing::info!(user_id = %target_id, from = %target.role, to = %role, by = %actor_id, "role changed");
    get(pool, target_id).await
}

pub async fn deactivate(pool: &SqlitePool, actor_id: &str, target_id: &str) -> AppResult<User> {
    if actor_id == target_id {
        return Err(AppError::BadRequest("You cannot deactivate your own account".into()));
    }
    let target = get(pool, target_id).await?;
    if !target.is_active() {
        return Err(AppError::BadRequest("Account is already deactivated".into()));
    }

    sqlx::query("UPDATE users SET status = ?, updated_at = ? WHERE id = ?")
        .bind(UserStatus::Deactivated)
        .bind(now())
        .bind(target_id)
        .execute(pool)
        .await?;
    tracing::info!(user_id = %target_id, by = %actor_id, "account deactivated");
    get(pool, target_id).await
}
