use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{new_id, now};
use crate::error::{AppError, AppResult};
use crate::models::common::{order_clause, ListQuery, Paginated};
use crate::models::newsletter::Subscriber;
use crate::validation::normalize_email;

const COLUMNS: &str = "id, email, is_active, subscribed_at, unsubscribed_at";

const SORTABLE: &[(&str, &str)] = &[
    ("email", "email"),
    ("subscribedAt", "subscribed_at"),
    ("subscribed_at", "subscribed_at"),
];

async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<Subscriber>> {
    let sql = format!("SELECT {COLUMNS} FROM newsletter_subscribers WHERE email = ?");
    Ok(sqlx::query_as::<_, Subscriber>(&sql).bind(email).fetch_optional(pool).await?)
}

/// Subscribes `email`, re-activating a past subscription.
pub async fn subscribe(pool: &SqlitePool, email: &str) -> AppResult<Subscriber> {
    let email = normalize_email(email);
    match find_by_email(pool, &email).await? {
        Some(existing) if existing.is_active => {
            Err(AppError::Conflict("This email is already subscribed".into()))
        }
        Some(existing) => {
            sqlx::query(
                "UPDATE newsletter_subscribers SET is_active = 1, subscribed_at = ?, unsubscribed_at = NULL \
                 WHERE id = ?",
            )
            .bind(now())
            .bind(&existing.id)
            .execute(pool)
            .await?;
            tracing::info!(subscriber_id = %existing.id, "newsletter subscription renewed");
            find_by_email(pool, &email)
                .await?
                .ok_or_else(|| AppError::NotFound("Subscriber".into()))
        }
        None => {
            let id = new_id();
            sqlx::query("INSERT INTO newsletter_subscribers (id, email, is_active, subscribed_at) VALUES (?, ?, 1, ?)")
                .bind(&id)
                .bind(&email)
                .bind(now())
                .execute(pool)
                .await?;
            tracing::info!(subscriber_id = %id, "newsletter subscription created");
            find_by_email(pool, &email)
                .await?
                .ok_or_else(|| AppError::NotFound("Subscriber".into()))
        }
    }
}

pub async fn unsubscribe(pool: &SqlitePool, email: &str) -> AppResult<()> {
    let email = normalize_email(email);
    let updated = sqlx::query(
        "UPDATE newsletter_subscribers SET is_active = 0, unsubscribed_at = ? WHERE email = ? AND is_active = 1",
    )
    .bind(now())
    .bind(&email)
    .execute(pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Subscription".into()));
    }
    Ok(())
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, q: &ListQuery) {
    qb.push(" WHERE 1 = 1");
    if let Some(active) = q.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(pattern) = q.search_pattern() {
        qb.push(" AND email LIKE ").push_bind(pattern);
    }
}

pub async fn list(pool: &SqlitePool, q: &ListQuery) -> AppResult<Paginated<Subscriber>> {
    let window = q.window();

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM newsletter_subscribers");
    push_filters(&mut count, q);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut page = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM newsletter_subscribers"));
    push_filters(&mut page, q);
    page.push(" ORDER BY ")
        .push(order_clause(q.sort.as_deref(), SORTABLE, "subscribed_at DESC"))
        .push(" LIMIT ")
        .push_bind(i64::from(window.limit))
        .push(" OFFSET ")
        .push_bind(window.offset());
    let subscribers = page.build_query_as::<Subscriber>().fetch_all(pool).await?;

    Ok(window.paginate(subscribers, total))
}

pub async fn export(pool: &SqlitePool) -> AppResult<Vec<Subscriber>> {
    let sql = format!("SELECT {COLUMNS} FROM newsletter_subscribers ORDER BY subscribed_at DESC");
    Ok(sqlx::query_as::<_, Subscriber>(&sql).fetch_all(pool).await?)
}

pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<()> {
    let deleted = sqlx::query("DELETE FROM newsletter_subscribers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Subscriber".into()));
    }
    Ok(())
}
