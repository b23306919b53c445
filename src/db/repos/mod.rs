mod auth_domains;
mod principals;
mod sso_credentials;

pub use auth_domains::*;
pub use principals::*;
pub use sso_credentials::*;

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order (oldest first)
    Asc,
    /// Descending order (newest first)
    #[default]
    Desc,
}

impl SortOrder {
    /// Get the SQL ORDER BY direction string.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Pagination and listing parameters.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// Maximum number of records to return. Defaults to 100.
    pub limit: Option<i64>,
    /// Number of records to skip.
    pub offset: Option<i64>,
    /// Sort order for results (asc = oldest first, desc = newest first).
    pub sort_order: SortOrder,
}

impl ListParams {
    pub(crate) fn limit_or_default(&self) -> i64 {
        self.limit.unwrap_or(100)
    }

    pub(crate) fn offset_or_default(&self) -> i64 {
        self.offset.unwrap_or(0)
    }
}
