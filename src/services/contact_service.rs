use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{new_id, now};
use crate::error::{AppError, AppResult};
use crate::models::common::{order_clause, search_pattern, PageWindow, Paginated};
use crate::models::contact::{ContactMessage, ContactQuery, ContactReq, ContactStatus};
use crate::validation::{clean_opt, clean_text, normalize_email};

const COLUMNS: &str = "id, name, email, phone, subject, message, status, created_at, updated_at";

const SORTABLE: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("created_at", "created_at"),
    ("status", "status"),
    ("name", "name"),
];

pub async fn create(pool: &SqlitePool, req: &ContactReq) -> AppResult<ContactMessage> {
    let id = new_id();
    let ts = now();
    sqlx::query(
        "INSERT INTO contact_messages (id, name, email, phone, subject, message, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(clean_text(&req.name))
    .bind(normalize_email(&req.email))
    .bind(clean_opt(req.phone.as_deref()))
    .bind(clean_text(&req.subject))
    .bind(clean_text(&req.message))
    .bind(ContactStatus::New)
    .bind(ts)
    .bind(ts)
    .execute(pool)
    .await?;
    tracing::info!(message_id = %id, "contact message received");
    get(pool, &id).await
}

pub async fn get(pool: &SqlitePool, id: &str) -> AppResult<ContactMessage> {
    let sql = format!("SELECT {COLUMNS} FROM contact_messages WHERE id = ?");
    sqlx::query_as::<_, ContactMessage>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Message".into()))
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, q: &ContactQuery) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = q.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(pattern) = search_pattern(q.search.as_deref()) {
        qb.push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern.clone())
            .push(" OR subject LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list(pool: &SqlitePool, q: &ContactQuery) -> AppResult<Paginated<ContactMessage>> {
    let window = PageWindow::new(q.page, q.limit);

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM contact_messages");
    push_filters(&mut count, q);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut page = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM contact_messages"));
    push_filters(&mut page, q);
    page.push(" ORDER BY ")
        .push(order_clause(q.sort.as_deref(), SORTABLE, "created_at DESC"))
        .push(" LIMIT ")
        .push_bind(i64::from(window.limit))
        .push(" OFFSET ")
        .push_bind(window.offset());
    let messages = page.build_query_as::<ContactMessage>().fetch_all(pool).await?;

    Ok(window.paginate(messages, total))
}

pub async fn update_status(pool: &SqlitePool, id: &str, status: ContactStatus) -> AppResult<ContactMessage> {
    let updated = sqlx::query("UPDATE contact_messages SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now())
        .bind(id)
        .execute(pool)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Message".into()));
    }
    get(pool, id).await
}

pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<()> {
    let deleted = sqlx::query("DELETE FROM contact_messages WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Message".into()));
    }
    Ok(())
}
