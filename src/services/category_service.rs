//! Category tree: vegetarian / non-vegetarian parents with menu categories
//! underneath. A menu category's flag is always copied from its parent.
use std::sync::Arc;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{new_id, now, unique_slug};
use crate::error::{AppError, AppResult};
use crate::models::category::{Category, CategoryQuery, CategoryType, CreateCategoryReq, UpdateCategoryReq};
use crate::models::common::{order_clause, search_pattern, PageWindow, Paginated};
use crate::rbac::{ensure_can, Action, Role, RoleFilter};
use crate::services::image_store::{delete_best_effort, ImageStore, ImageUpload};
use crate::validation::{clean_opt, clean_text, slugify};

const COLUMNS: &str = "id, name, slug, description, category_type, parent_id, is_vegetarian, image_url, \
                       image_public_id, is_active, sort_order, created_at, updated_at";

const SORTABLE: &[(&str, &str)] = &[
    ("name", "name"),
    ("sortOrder", "sort_order"),
    ("sort_order", "sort_order"),
    ("createdAt", "created_at"),
    ("created_at", "created_at"),
];

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: RoleFilter, q: &CategoryQuery) {
    qb.push(" WHERE 1 = 1");
    if let Some(veg) = filter.is_vegetarian {
        qb.push(" AND is_vegetarian = ").push_bind(veg);
    }
    if let Some(active) = q.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(kind) = q.category_type {
        qb.push(" AND category_type = ").push_bind(kind);
    }
    if let Some(parent) = q.parent_id.as_deref().filter(|p| !p.is_empty()) {
        qb.push(" AND parent_id = ").push_bind(parent.to_string());
    }
    if let Some(pattern) = search_pattern(q.search.as_deref()) {
        qb.push(" AND name LIKE ").push_bind(pattern);
    }
}

pub async fn list(pool: &SqlitePool, filter: RoleFilter, q: &CategoryQuery) -> AppResult<Paginated<Category>> {
    let window = PageWindow::new(q.page, q.limit);

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM categories");
    push_filters(&mut count, filter, q);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut page = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM categories"));
    push_filters(&mut page, filter, q);
    page.push(" ORDER BY ")
        .push(order_clause(q.sort.as_deref(), SORTABLE, "sort_order ASC, name ASC"))
        .push(" LIMIT ")
        .push_bind(i64::from(window.limit))
        .push(" OFFSET ")
        .push_bind(window.offset());
    let items = page.build_query_as::<Category>().fetch_all(pool).await?;

    Ok(window.paginate(items, total))
}

/// Active categories for the storefront, parents first.
pub async fn list_active(pool: &SqlitePool, vegetarian: Option<bool>) -> AppResult<Vec<Category>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM categories WHERE is_active = 1"));
    if let Some(veg) = vegetarian {
        qb.push(" AND is_vegetarian = ").push_bind(veg);
    }
    qb.push(" ORDER BY category_type DESC, sort_order ASC, name ASC");
    Ok(qb.build_query_as::<Category>().fetch_all(pool).await?)
}

pub async fn get(pool: &SqlitePool, id: &str) -> AppResult<Category> {
    let sql = format!("SELECT {COLUMNS} FROM categories WHERE id = ?");
    sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".into()))
}

async fn parent_of(pool: &SqlitePool, parent_id: &str) -> AppResult<Category> {
    let parent = get(pool, parent_id)
        .await
        .map_err(|_| AppError::BadRequest("Parent category does not exist".into()))?;
    if parent.category_type != CategoryType::Parent {
        return Err(AppError::BadRequest("Menu categories must belong to a parent category".into()));
    }
    Ok(parent)
}

async fn upload_one(images: &dyn ImageStore, image: Option<ImageUpload>) -> AppResult<Option<(String, String)>> {
    let Some(image) = image else { return Ok(None) };
    let stored = images.upload(image, "categories").await.map_err(|e| {
        tracing::warn!(error = %e, "category image upload failed");
        AppError::BadRequest("Image upload failed".into())
    })?;
    Ok(Some((stored.url, stored.public_id)))
}

pub async fn create(
    pool: &SqlitePool,
    images: &Arc<dyn ImageStore>,
    role: Role,
    req: &CreateCategoryReq,
    image: Option<ImageUpload>,
) -> AppResult<Category> {
    let (parent_id, is_vegetarian) = match req.category_type {
        CategoryType::Parent => (None, req.is_vegetarian.unwrap_or(false)),
        CategoryType::Menu => {
            let parent_id = req.parent_id.as_deref().unwrap_or_default();
            let parent = parent_of(pool, parent_id).await?;
            (Some(parent.id), parent.is_vegetarian)
        }
    };
    ensure_can(role, Action::Create, is_vegetarian, "categories")?;

    let name = clean_text(&req.name);
    let slug = unique_slug(pool, "categories", &slugify(&name), None).await?;
    let uploaded = upload_one(images.as_ref(), image).await?;
    let (image_url, image_public_id) = uploaded.clone().unzip();

    let id = new_id();
    let ts = now();
    let inserted = sqlx::query(
        "INSERT INTO categories (id, name, slug, description, category_type, parent_id, is_vegetarian, image_url, \
         image_public_id, is_active, sort_order, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&name)
    .bind(&slug)
    .bind(clean_opt(req.description.as_deref()))
    .bind(req.category_type)
    .bind(&parent_id)
    .bind(is_vegetarian)
    .bind(image_url)
    .bind(image_public_id)
    .bind(req.is_active.unwrap_or(true))
    .bind(req.sort_order.unwrap_or(0))
    .bind(ts)
    .bind(ts)
    .execute(pool)
    .await;

    if let Err(e) = inserted {
        if let Some((_, public_id)) = uploaded {
            delete_best_effort(images.clone(), vec![public_id]);
        }
        return Err(e.into());
    }
    tracing::info!(category_id = %id, kind = ?req.category_type, is_vegetarian, "category created");
    get(pool, &id).await
}

async fn count_items_in(pool: &SqlitePool, category_ids: &[String]) -> AppResult<i64> {
    if category_ids.is_empty() {
        return Ok(0);
    }
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM catalog_items WHERE category_id IN (");
    let mut sep = qb.separated(", ");
    for id in category_ids {
        sep.push_bind(id.clone());
    }
    sep.push_unseparated(")");
    Ok(qb.build_query_scalar().fetch_one(pool).await?)
}

async fn child_ids(pool: &SqlitePool, parent_id: &str) -> AppResult<Vec<String>> {
    Ok(sqlx::query_scalar("SELECT id FROM categories WHERE parent_id = ?")
        .bind(parent_id)
        .fetch_all(pool)
        .await?)
}

pub async fn update(
    pool: &SqlitePool,
    images: &Arc<dyn ImageStore>,
    role: Role,
    id: &str,
    req: &UpdateCategoryReq,
    image: Option<ImageUpload>,
) -> AppResult<Category> {
    let current = get(pool, id).await?;
    ensure_can(role, Action::Update, current.is_vegetarian, "categories")?;

    let mut parent_id = current.parent_id.clone();
    let mut is_vegetarian = current.is_vegetarian;
    match current.category_type {
        CategoryType::Parent => {
            if req.parent_id.is_some() {
                return Err(AppError::BadRequest("Parent categories cannot have a parent".into()));
            }
            if let Some(veg) = req.is_vegetarian.filter(|v| *v != current.is_vegetarian) {
                let mut scope = child_ids(pool, id).await?;
                scope.push(id.to_string());
                if count_items_in(pool, &scope).await? > 0 {
                    return Err(AppError::BadRequest(
                        "Cannot change the vegetarian status of a category that still has items".into(),
                    ));
                }
                is_vegetarian = veg;
            }
        }
        CategoryType::Menu => {
            if req.is_vegetarian.is_some_and(|v| v != current.is_vegetarian) {
                return Err(AppError::BadRequest(
                    "Menu categories inherit their vegetarian status from the parent".into(),
                ));
            }
            if let Some(new_parent) = req.parent_id.as_deref().filter(|p| Some(*p) != current.parent_id.as_deref()) {
                let parent = parent_of(pool, new_parent).await?;
                if parent.is_vegetarian != current.is_vegetarian && count_items_in(pool, &[id.to_string()]).await? > 0 {
                    return Err(AppError::BadRequest(
                        "Cannot move a category with items under a parent of the other type".into(),
                    ));
                }
                parent_id = Some(parent.id);
                is_vegetarian = parent.is_vegetarian;
            }
        }
    }
    if is_vegetarian != current.is_vegetarian {
        ensure_can(role, Action::Update, is_vegetarian, "categories")?;
    }

    let name = req.name.as_deref().map(clean_text).unwrap_or_else(|| current.name.clone());
    let slug = if name != current.name {
        unique_slug(pool, "categories", &slugify(&name), Some(id)).await?
    } else {
        current.slug.clone()
    };
    let description = match &req.description {
        Some(d) => clean_opt(Some(d.as_str())),
        None => current.description.clone(),
    };
    let uploaded = upload_one(images.as_ref(), image).await?;
    let (image_url, image_public_id) = match &uploaded {
        Some((url, public_id)) => (Some(url.clone()), Some(public_id.clone())),
        None => (current.image_url.clone(), current.image_public_id.clone()),
    };

    let result: AppResult<()> = async {
        let mut tx = pool.begin().await?;
        sqlx::query(
            "UPDATE categories SET name = ?, slug = ?, description = ?, parent_id = ?, is_vegetarian = ?, \
             image_url = ?, image_public_id = ?, is_active = ?, sort_order = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&name)
        .bind(&slug)
        .bind(description)
        .bind(&parent_id)
        .bind(is_vegetarian)
        .bind(image_url)
        .bind(image_public_id)
        .bind(req.is_active.unwrap_or(current.is_active))
        .bind(req.sort_order.unwrap_or(current.sort_order))
        .bind(now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if current.category_type == CategoryType::Parent && is_vegetarian != current.is_vegetarian {
            let moved = sqlx::query("UPDATE categories SET is_vegetarian = ?, updated_at = ? WHERE parent_id = ?")
                .bind(is_vegetarian)
                .bind(now())
                .bind(id)
                .execute(&mut *tx)
                .await?;
            tracing::info!(
                category_id = %id,
                children = moved.rows_affected(),
                is_vegetarian,
                "vegetarian flag propagated"
            );
        }
        tx.commit().await?;
        Ok(())
    }
    .await;

    match (&result, uploaded) {
        (Err(_), Some((_, public_id))) => delete_best_effort(images.clone(), vec![public_id]),
        (Ok(()), Some(_)) => {
            if let Some(old) = current.image_public_id.clone() {
                delete_best_effort(images.clone(), vec![old]);
            }
        }
        _ => {}
    }
    result?;
    get(pool, id).await
}

pub async fn delete(pool: &SqlitePool, images: &Arc<dyn ImageStore>, role: Role, id: &str) -> AppResult<()> {
    let category = get(pool, id).await?;
    ensure_can(role, Action::Delete, category.is_vegetarian, "categories")?;

    if category.category_type == CategoryType::Parent {
        let children = child_ids(pool, id).await?;
        if !children.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Cannot delete a category with {} menu categories; remove them first",
                children.len()
            )));
        }
    }
    let items = count_items_in(pool, &[id.to_string()]).await?;
    if items > 0 {
        return Err(AppError::BadRequest(format!(
            "Cannot delete a category with {items} items; remove or move them first"
        )));
    }

    sqlx::query("DELETE FROM categories WHERE id = ?").bind(id).execute(pool).await?;
    if let Some(public_id) = category.image_public_id {
        delete_best_effort(images.clone(), vec![public_id]);
    }
    tracing::info!(category_id = %id, "category deleted");
    Ok(())
}
