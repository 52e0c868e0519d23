mod categories;
mod questions;
mod quizzes;

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::db::Category;

use super::error::ApiError;

pub use categories::category_router;
pub use questions::questions_router;
pub use quizzes::quizzes_router;

pub type ApiResponse<T> = Result<T, ApiError>;

pub const QUESTIONS_PER_PAGE: usize = 10;

/// `{id: type}`; integer keys serialize as JSON strings.
pub type CategoryMap = BTreeMap<i64, String>;

pub fn category_map(categories: Vec<Category>) -> CategoryMap {
    categories.into_iter().map(|c| (c.id, c.kind)).collect()
}

/// Built from the raw query pairs; a repeated `page` keeps its first value.
#[derive(Debug, Default, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct PageQuery {
    page: Option<String>,
}

impl From<Vec<(String, String)>> for PageQuery {
    fn from(pairs: Vec<(String, String)>) -> Self {
        let page = pairs
            .into_iter()
            .find_map(|(key, value)| (key == "page").then_some(value));
        PageQuery { page }
    }
}

impl PageQuery {
    /// 1-indexed; anything that is not an integer means the first page.
    pub fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }
}

pub fn paginate<T>(items: &[T], page: i64) -> &[T] {
    let Some(start) = usize::try_from(page)
        .ok()
        .and_then(|p| p.checked_sub(1))
        .and_then(|p| p.checked_mul(QUESTIONS_PER_PAGE))
    else {
        return &[];
    };
    if start >= items.len() {
        return &[];
    }
    let end = items.len().min(start + QUESTIONS_PER_PAGE);
    &items[start..end]
}
