use serde::{Deserialize, Serialize};

use crate::{error::FoodgramError, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// 1-based page number and page size requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageQuery {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    fn link(&self, path: &str, page: i64) -> String {
        format!("{path}?page={page}&limit={}", self.limit)
    }
}

impl<T> PageContext<T> {
    /// Builds the page from rows fetched with `COUNT(*) OVER()`, which yields no rows past the
    /// end of the listing. An empty page other than the first is therefore out of range.
    pub fn from_rows(
        rows: Vec<T>,
        total_rows: i64,
        query: PageQuery,
        path: &str,
    ) -> Result<Self, FoodgramError> {
        if rows.is_empty() && query.page > 1 {
            return Err(FoodgramError::NotFound(format!("page {}", query.page)));
        }

        let next = if query.page * query.limit < total_rows {
            Some(query.link(path, query.page + 1))
        } else {
            None
        };
        let previous = if query.page > 1 {
            Some(query.link(path, query.page - 1))
        } else {
            None
        };

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }
}
