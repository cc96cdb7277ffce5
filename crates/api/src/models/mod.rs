//! Request and response bodies. Every field is camelCase on the wire.

mod admin;
mod auth;
mod course;
mod me;
mod quiz;
mod tutor;

pub use admin::*;
pub use auth::*;
pub use course::*;
pub use me::*;
pub use quiz::*;
pub use tutor::*;

use serde::{Deserialize, Serialize};
use study_core::model::{Page, PageRequest};

use crate::error::ApiError;

/// `?page=&limit=` shared by every listing.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    pub fn to_request(self) -> Result<PageRequest, ApiError> {
        Ok(PageRequest::new(self.page, self.limit)?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    pub fn from_page<S>(page: Page<S>, f: impl FnMut(S) -> T) -> Self {
        let total_pages = page.total_pages();
        let page = page.map(f);
        Self {
            items: page.items,
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages,
        }
    }
}

/// Blank query strings count as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
