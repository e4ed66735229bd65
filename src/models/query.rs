//! Shared list query parameters and pagination

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse a client value; anything other than "desc" sorts ascending
    pub fn parse(value: Option<&str>) -> SortOrder {
        match value {
            Some(v) if v.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// List query for locations and categories
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Case-insensitive substring match on name and description
    pub search: Option<String>,
    pub sort: Option<String>,
    /// "asc" (default) or "desc"
    pub order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// Normalised page and limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            pages: (total + self.limit - 1) / self.limit,
        }
    }
}

/// Pagination block returned with every list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

/// Resolve a client sort key against a whitelist of `(key, column)` pairs.
/// Unknown keys fall back to the first entry.
pub fn sort_column(requested: Option<&str>, allowed: &[(&str, &'static str)]) -> &'static str {
    requested
        .and_then(|key| allowed.iter().find(|(k, _)| *k == key))
        .or_else(|| allowed.first())
        .map(|(_, column)| *column)
        .unwrap_or("name")
}

/// Key used for per-owner name uniqueness: trimmed and lowercased with
/// full Unicode case folding.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Build a LIKE pattern for a substring search, escaping wildcards with
/// `\`. Case is folded on the SQL side so both operands go through the
/// same `LOWER`.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_defaults_and_bounds() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(0), Some(1000)), PageRequest { page: 1, limit: 100 });
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn pages_round_up() {
        let req = PageRequest::new(None, Some(10));
        assert_eq!(req.pagination(0).pages, 0);
        assert_eq!(req.pagination(10).pages, 1);
        assert_eq!(req.pagination(11).pages, 2);
    }

    #[test]
    fn unknown_sort_keys_fall_back() {
        let allowed = [("name", "name"), ("createdAt", "created_at")];
        assert_eq!(sort_column(Some("createdAt"), &allowed), "created_at");
        assert_eq!(sort_column(Some("1; DROP TABLE"), &allowed), "name");
        assert_eq!(sort_column(None, &allowed), "name");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" Sail "), "%Sail%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
    }

    #[test]
    fn name_keys_fold_unicode_case() {
        assert_eq!(name_key("  Île de Ré "), "île de ré");
        assert_eq!(name_key("ÎLE DE RÉ"), name_key("île de ré"));
    }

    #[test]
    fn sort_order_parse() {
        assert_eq!(SortOrder::parse(Some("DESC")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("sideways")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(None), SortOrder::Asc);
    }
}
