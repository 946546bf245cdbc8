use serde::{Deserialize, Deserializer, Serialize};

/// Keeps an explicit `null` apart from an absent field: absent is `None`,
/// `null` is `Some(None)`. Pair with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Uniform response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: i64,
    pub items_per_page: u32,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Normalized page/limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub limit: u32,
}

impl PageWindow {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn paginate<T>(&self, items: Vec<T>, total_items: i64) -> Paginated<T> {
        let limit = i64::from(self.limit);
        let total_pages = ((total_items + limit - 1) / limit) as u32;
        Paginated {
            items,
            pagination: Pagination {
                current_page: self.page,
                total_pages,
                total_items,
                items_per_page: self.limit,
            },
        }
    }
}

/// Generic list parameters: `?page=&limit=&search=&sort=&is_active=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub is_active: Option<bool>,
}

impl ListQuery {
    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page, self.limit)
    }

    pub fn search_pattern(&self) -> Option<String> {
        search_pattern(self.search.as_deref())
    }
}

pub fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.replace('%', "").replace('_', "")))
}

/// Resolves `sort=field` / `sort=-field` against a whitelist of
/// `(public name, column)` pairs into an `ORDER BY` clause body.
pub fn order_clause(sort: Option<&str>, allowed: &[(&str, &str)], default: &str) -> String {
    let Some(sort) = sort.map(str::trim).filter(|s| !s.is_empty()) else {
        return default.to_string();
    };
    let (field, dir) = match sort.strip_prefix('-') {
        Some(f) => (f, "DESC"),
        None => (sort, "ASC"),
    };
    allowed
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, column)| format!("{column} {dir}"))
        .unwrap_or_else(|| default.to_string())
}
