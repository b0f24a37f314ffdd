//! Shared pagination utilities
//!
//! List endpoints read `page` and `per_page` from the query string. The
//! response metadata is [`crate::api::response::PaginationMeta`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use rbac_server::features::shared::pagination::PaginationParams;
//!
//! let params = PaginationParams::new(Some(2), Some(20));
//! params.validate()?;
//! let rows = repo.list(params.limit(), params.offset()).await?;
//! let meta = params.meta(total);
//! ```

use serde::{Deserialize, Serialize};

use crate::api::response::PaginationMeta;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;
pub const MAX_PAGE: i64 = 1_000_000;

/// Common pagination request parameters
///
/// Provides defaults (page 1, 20 items per page).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,

    /// Items per page. Defaults to 20, at most 100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

impl PaginationParams {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self { page, per_page }
    }

    /// Get the page number (1-indexed), defaulting to 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(DEFAULT_PAGE).max(1)
    }

    /// Get items per page, defaulting to 20 and clamped to 1-100
    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    /// SQL LIMIT
    pub fn limit(&self) -> i64 {
        self.per_page()
    }

    /// SQL OFFSET; saturates for pages past [`MAX_PAGE`], which `validate` rejects
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }

    /// Reject explicit out-of-range values instead of clamping them
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(page) = self.page {
            if !(1..=MAX_PAGE).contains(&page) {
                return Err("Page must be between 1 and 1000000");
            }
        }
        if let Some(per_page) = self.per_page {
            if !(1..=MAX_PER_PAGE).contains(&per_page) {
                return Err("Per page must be between 1 and 100");
            }
        }
        Ok(())
    }

    /// Response metadata for a result set of `total` rows
    pub fn meta(&self, total: i64) -> PaginationMeta {
        PaginationMeta::new(self.page(), self.per_page(), total)
    }
}
