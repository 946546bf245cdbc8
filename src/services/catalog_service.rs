//! Menu items and products. Both live in `catalog_items` and differ only in
//! `kind` and in which category type they hang off.
use std::sync::Arc;

use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{new_id, now, unique_slug};
use crate::error::{AppError, AppResult, FieldError};
use crate::models::catalog::{CatalogItem, CatalogKind, CatalogQuery, CreateItemReq, ImageRef, UpdateItemReq};
use crate::models::category::{Category, CategoryType};
use crate::models::common::{order_clause, search_pattern, PageWindow, Paginated};
use crate::rbac::{ensure_can, Action, Role, RoleFilter};
use crate::services::category_service;
use crate::services::image_store::{delete_best_effort, upload_all, ImageStore, ImageUpload};
use crate::validation::{clean_opt, clean_text, slugify};

const COLUMNS: &str = "id, kind, name, slug, description, category_id, is_vegetarian, price, discounted_price, \
                       stock, sizes, addons, images, tags, spicy_level, preparation_time, is_active, is_featured, \
                       created_at, updated_at";

const SORTABLE: &[(&str, &str)] = &[
    ("name", "name"),
    ("price", "price"),
    ("stock", "stock"),
    ("createdAt", "created_at"),
    ("created_at", "created_at"),
];

pub const MAX_IMAGES: usize = 5;

fn folder(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::MenuItem => "menu",
        CatalogKind::Product => "products",
    }
}

fn required_category_type(kind: CatalogKind) -> CategoryType {
    match kind {
        CatalogKind::MenuItem => CategoryType::Menu,
        CatalogKind::Product => CategoryType::Parent,
    }
}

fn not_found(kind: CatalogKind) -> AppError {
    let label = kind.label();
    let mut chars = label.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    AppError::NotFound(capitalized)
}

fn push_filters(
    qb: &mut QueryBuilder<'_, Sqlite>,
    kind: CatalogKind,
    filter: RoleFilter,
    q: &CatalogQuery,
    active_only: bool,
) {
    qb.push(" WHERE kind = ").push_bind(kind);
    if let Some(veg) = filter.is_vegetarian {
        qb.push(" AND is_vegetarian = ").push_bind(veg);
    }
    if active_only {
        qb.push(" AND is_active = 1");
    } else if let Some(active) = q.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(veg) = q.vegetarian {
        qb.push(" AND is_vegetarian = ").push_bind(veg);
    }
    if let Some(featured) = q.featured {
        qb.push(" AND is_featured = ").push_bind(featured);
    }
    if let Some(category) = q.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        // id or slug
        qb.push(" AND category_id IN (SELECT id FROM categories WHERE id = ")
            .push_bind(category.to_string())
            .push(" OR slug = ")
            .push_bind(category.to_string())
            .push(")");
    }
    if let Some(pattern) = search_pattern(q.search.as_deref()) {
        qb.push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR tags LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

async fn list_where(
    pool: &SqlitePool,
    kind: CatalogKind,
    filter: RoleFilter,
    q: &CatalogQuery,
    active_only: bool,
) -> AppResult<Paginated<CatalogItem>> {
    let window = PageWindow::new(q.page, q.limit);

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM catalog_items");
    push_filters(&mut count, kind, filter, q, active_only);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut page = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM catalog_items"));
    push_filters(&mut page, kind, filter, q, active_only);
    let default_order = if active_only { "is_featured DESC, name ASC" } else { "created_at DESC" };
    page.push(" ORDER BY ")
        .push(order_clause(q.sort.as_deref(), SORTABLE, default_order))
        .push(" LIMIT ")
        .push_bind(i64::from(window.limit))
        .push(" OFFSET ")
        .push_bind(window.offset());
    let items = page.build_query_as::<CatalogItem>().fetch_all(pool).await?;

    Ok(window.paginate(items, total))
}

pub async fn admin_list(
    pool: &SqlitePool,
    kind: CatalogKind,
    filter: RoleFilter,
    q: &CatalogQuery,
) -> AppResult<Paginated<CatalogItem>> {
    list_where(pool, kind, filter, q, false).await
}

pub async fn shop_list(pool: &SqlitePool, kind: CatalogKind, q: &CatalogQuery) -> AppResult<Paginated<CatalogItem>> {
    list_where(pool, kind, RoleFilter::unrestricted(), q, true).await
}

async fn find(pool: &SqlitePool, id: &str) -> AppResult<Option<CatalogItem>> {
    let sql = format!("SELECT {COLUMNS} FROM catalog_items WHERE id = ?");
    Ok(sqlx::query_as::<_, CatalogItem>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn get(pool: &SqlitePool, kind: CatalogKind, id: &str) -> AppResult<CatalogItem> {
    find(pool, id)
        .await?
        .filter(|item| item.kind == kind)
        .ok_or_else(|| not_found(kind))
}

pub async fn admin_get(pool: &SqlitePool, kind: CatalogKind, role: Role, id: &str) -> AppResult<CatalogItem> {
    let item = get(pool, kind, id).await?;
    ensure_can(role, Action::View, item.is_vegetarian, kind.label())?;
    Ok(item)
}

pub async fn shop_get(pool: &SqlitePool, kind: CatalogKind, id: &str) -> AppResult<CatalogItem> {
    let item = get(pool, kind, id).await?;
    if !item.is_active {
        return Err(not_found(kind));
    }
    Ok(item)
}

/// An orderable item of either kind.
pub async fn find_for_cart(pool: &SqlitePool, id: &str) -> AppResult<CatalogItem> {
    find(pool, id)
        .await?
        .filter(|item| item.is_active)
        .ok_or_else(|| AppError::NotFound("Item".into()))
}

/// Loads the category an item is being attached to and checks it fits the
/// item's kind and vegetarian flag.
async fn category_for(
    pool: &SqlitePool,
    kind: CatalogKind,
    category_id: &str,
    is_vegetarian: bool,
) -> AppResult<Category> {
    let category = category_service::get(pool, category_id)
        .await
        .map_err(|_| AppError::BadRequest("Category does not exist".into()))?;
    if category.category_type != required_category_type(kind) {
        let expected = match kind {
            CatalogKind::MenuItem => "a menu category",
            CatalogKind::Product => "a parent category",
        };
        return Err(AppError::BadRequest(format!("A {} must belong to {expected}", kind.label())));
    }
    if category.is_vegetarian != is_vegetarian {
        let side = if category.is_vegetarian { "vegetarian" } else { "non-vegetarian" };
        return Err(AppError::BadRequest(format!(
            "Vegetarian status must match the {side} category"
        )));
    }
    Ok(category)
}

async fn upload_images(
    images: &Arc<dyn ImageStore>,
    kind: CatalogKind,
    uploads: Vec<ImageUpload>,
) -> AppResult<Vec<ImageRef>> {
    if uploads.is_empty() {
        return Ok(Vec::new());
    }
    upload_all(images.as_ref(), uploads, folder(kind)).await.map_err(|e| {
        tracing::warn!(error = %e, "catalog image upload failed");
        AppError::BadRequest("Image upload failed".into())
    })
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().map(|t| clean_text(t).to_lowercase()) {
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

pub async fn create(
    pool: &SqlitePool,
    images: &Arc<dyn ImageStore>,
    role: Role,
    kind: CatalogKind,
    req: &CreateItemReq,
    uploads: Vec<ImageUpload>,
) -> AppResult<CatalogItem> {
    if uploads.len() > MAX_IMAGES {
        return Err(AppError::BadRequest(format!("At most {MAX_IMAGES} images are allowed")));
    }
    ensure_can(role, Action::Create, req.is_vegetarian, kind.label())?;
    category_for(pool, kind, &req.category_id, req.is_vegetarian).await?;

    let name = clean_text(&req.name);
    let slug = unique_slug(pool, "catalog_items", &slugify(&name), None).await?;
    let stored = upload_images(images, kind, uploads).await?;

    let id = new_id();
    let ts = now();
    let inserted = sqlx::query(
        "INSERT INTO catalog_items (id, kind, name, slug, description, category_id, is_vegetarian, price, \
         discounted_price, stock, sizes, addons, images, tags, spicy_level, preparation_time, is_active, is_featured, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(kind)
    .bind(&name)
    .bind(&slug)
    .bind(clean_opt(req.description.as_deref()))
    .bind(&req.category_id)
    .bind(req.is_vegetarian)
    .bind(req.price)
    .bind(req.discounted_price)
    .bind(req.stock)
    .bind(Json(&req.sizes))
    .bind(Json(&req.addons))
    .bind(Json(&stored))
    .bind(Json(clean_tags(&req.tags)))
    .bind(req.spicy_level)
    .bind(req.preparation_time)
    .bind(req.is_active.unwrap_or(true))
    .bind(req.is_featured.unwrap_or(false))
    .bind(ts)
    .bind(ts)
    .execute(pool)
    .await;

    if let Err(e) = inserted {
        delete_best_effort(images.clone(), stored.into_iter().map(|i| i.public_id).collect());
        return Err(e.into());
    }
    tracing::info!(item_id = %id, kind = kind.label(), is_vegetarian = req.is_vegetarian, "catalog item created");
    get(pool, kind, &id).await
}

pub async fn update(
    pool: &SqlitePool,
    images: &Arc<dyn ImageStore>,
    role: Role,
    kind: CatalogKind,
    id: &str,
    req: &UpdateItemReq,
    uploads: Vec<ImageUpload>,
) -> AppResult<CatalogItem> {
    let current = get(pool, kind, id).await?;
    ensure_can(role, Action::Update, current.is_vegetarian, kind.label())?;
    req.validate_against(&current)?;
    if current.images.len() + uploads.len() > MAX_IMAGES {
        return Err(AppError::BadRequest(format!("At most {MAX_IMAGES} images are allowed")));
    }

    let is_vegetarian = req.is_vegetarian.unwrap_or(current.is_vegetarian);
    let category_id = req.category_id.clone().unwrap_or_else(|| current.category_id.clone());
    if is_vegetarian != current.is_vegetarian {
        ensure_can(role, Action::Update, is_vegetarian, kind.label())?;
    }
    if is_vegetarian != current.is_vegetarian || category_id != current.category_id {
        category_for(pool, kind, &category_id, is_vegetarian).await?;
    }

    let name = req.name.as_deref().map(clean_text).unwrap_or_else(|| current.name.clone());
    let slug = if name != current.name {
        unique_slug(pool, "catalog_items", &slugify(&name), Some(id)).await?
    } else {
        current.slug.clone()
    };
    let stored = upload_images(images, kind, uploads).await?;
    let mut all_images = current.images.0.clone();
    all_images.extend(stored.iter().cloned());

    let description = match &req.description {
        Some(d) => clean_opt(Some(d.as_str())),
        None => current.description.clone(),
    };
    let tags = req.tags.as_deref().map(clean_tags).unwrap_or_else(|| current.tags.0.clone());

    let updated = sqlx::query(
        "UPDATE catalog_items SET name = ?, slug = ?, description = ?, category_id = ?, is_vegetarian = ?, price = ?, \
         discounted_price = ?, stock = ?, sizes = ?, addons = ?, images = ?, tags = ?, spicy_level = ?, \
         preparation_time = ?, is_active = ?, is_featured = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&name)
    .bind(&slug)
    .bind(description)
    .bind(&category_id)
    .bind(is_vegetarian)
    .bind(req.price.unwrap_or(current.price))
    .bind(req.merged_discount(&current))
    .bind(req.stock.unwrap_or(current.stock))
    .bind(Json(req.sizes.as_ref().unwrap_or(&current.sizes.0)))
    .bind(Json(req.addons.as_ref().unwrap_or(&current.addons.0)))
    .bind(Json(&all_images))
    .bind(Json(tags))
    .bind(req.spicy_level.or(current.spicy_level))
    .bind(req.preparation_time.or(current.preparation_time))
    .bind(req.is_active.unwrap_or(current.is_active))
    .bind(req.is_featured.unwrap_or(current.is_featured))
    .bind(now())
    .bind(id)
    .execute(pool)
    .await;

    if let Err(e) = updated {
        delete_best_effort(images.clone(), stored.into_iter().map(|i| i.public_id).collect());
        return Err(e.into());
    }
    get(pool, kind, id).await
}

pub async fn delete(
    pool: &SqlitePool,
    images: &Arc<dyn ImageStore>,
    role: Role,
    kind: CatalogKind,
    id: &str,
) -> AppResult<()> {
    let item = get(pool, kind, id).await?;
    ensure_can(role, Action::Delete, item.is_vegetarian, kind.label())?;

    sqlx::query("DELETE FROM catalog_items WHERE id = ?").bind(id).execute(pool).await?;
    delete_best_effort(images.clone(), item.images.0.into_iter().map(|i| i.public_id).collect());
    tracing::info!(item_id = %id, kind = kind.label(), "catalog item deleted");
    Ok(())
}

pub async fn add_images(
    pool: &SqlitePool,
    images: &Arc<dyn ImageStore>,
    role: Role,
    kind: CatalogKind,
    id: &str,
    uploads: Vec<ImageUpload>,
) -> AppResult<CatalogItem> {
    if uploads.is_empty() {
        return Err(AppError::BadRequest("No images provided".into()));
    }
    update(pool, images, role, kind, id, &UpdateItemReq::default(), uploads).await
}

pub async fn remove_image(
    pool: &SqlitePool,
    images: &Arc<dyn ImageStore>,
    role: Role,
    kind: CatalogKind,
    id: &str,
    public_id: &str,
) -> AppResult<CatalogItem> {
    let item = get(pool, kind, id).await?;
    ensure_can(role, Action::Update, item.is_vegetarian, kind.label())?;

    let mut remaining = item.images.0.clone();
    let before = remaining.len();
    remaining.retain(|i| i.public_id != public_id);
    if remaining.len() == before {
        return Err(AppError::NotFound("Image".into()));
    }

    sqlx::query("UPDATE catalog_items SET images = ?, updated_at = ? WHERE id = ?")
        .bind(Json(&remaining))
        .bind(now())
        .bind(id)
        .execute(pool)
        .await?;
    delete_best_effort(images.clone(), vec![public_id.to_string()]);
    get(pool, kind, id).await
}

pub async fn update_stock(
    pool: &SqlitePool,
    role: Role,
    kind: CatalogKind,
    id: &str,
    stock: i64,
) -> AppResult<CatalogItem> {
    let item = get(pool, kind, id).await?;
    ensure_can(role, Action::Update, item.is_vegetarian, kind.label())?;
    if stock < 0 {
        return Err(AppError::Validation(vec![FieldError::new("stock", "must not be negative")]));
    }

    sqlx::query("UPDATE catalog_items SET stock = ?, updated_at = ? WHERE id = ?")
        .bind(stock)
        .bind(now())
        .bind(id)
        .execute(pool)
        .await?;
    tracing::debug!(item_id = %id, stock, "stock updated");
    get(pool, kind, id).await
}
