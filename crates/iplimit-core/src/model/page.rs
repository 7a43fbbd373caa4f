//! Offset paging used by every list operation.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 999;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_PAGE_LIMIT }
    }
}

impl PageParams {
    /// Clamp raw inputs: page >= 1, 1 <= limit <= max_limit.
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, max_limit),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageList<T> {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub records: Vec<T>,
}

impl<T> PageList<T> {
    /// Cut one page out of an already ordered result set.
    pub fn paginate(all: Vec<T>, params: PageParams) -> Self {
        let total = all.len();
        let records = all
            .into_iter()
            .skip(params.offset())
            .take(params.limit as usize)
            .collect();
        Self { page: params.page, limit: params.limit, total, records }
    }
}
