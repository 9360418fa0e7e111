use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Select};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Optional paging. Lists are returned whole unless `page` is given.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct Pagination {
    #[param(minimum = 1)]
    pub page: Option<u64>,
    #[param(default = 20, minimum = 1, maximum = 100)]
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageInfo {
    pub count: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
}

impl PageInfo {
    pub fn new(count: u64, page: u64, page_size: u64) -> Self {
        Self {
            count,
            total_pages: count.div_ceil(page_size),
            current_page: page,
            page_size,
        }
    }
}

impl Pagination {
    fn page_size(&self) -> u64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Runs `select`, fetching a single page when paging was requested.
    pub async fn fetch<E, C>(
        &self,
        db: &C,
        select: Select<E>,
    ) -> AppResult<(Vec<E::Model>, Option<PageInfo>)>
    where
        E: EntityTrait,
        E::Model: Sync,
        C: ConnectionTrait,
    {
        let Some(page) = self.page else {
            return Ok((select.all(db).await?, None));
        };
        if page == 0 {
            return Err(AppError::InvalidParameter("Invalid page.".to_string()));
        }

        let page_size = self.page_size();
        let paginator = select.paginate(db, page_size);
        let info = PageInfo::new(paginator.num_items().await?, page, page_size);
        if page > info.total_pages.max(1) {
            return Err(AppError::NotFound("Invalid page.".to_string()));
        }

        Ok((paginator.fetch_page(page - 1).await?, Some(info)))
    }
}

/// Wraps rendered results in the paging envelope when a page was requested.
pub fn envelope(results: Value, info: Option<PageInfo>) -> Value {
    match info {
        Some(info) => json!({
            "count": info.count,
            "total_pages": info.total_pages,
            "current_page": info.current_page,
            "page_size": info.page_size,
            "results": results,
        }),
        None => results,
    }
}
