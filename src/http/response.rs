//! Success envelopes.

use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::service::Page;

/// `{results, limit, offset, count, total?}`
#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub results: Vec<T>,
    pub limit: i64,
    pub offset: i64,
    pub count: usize,
    pub total: Option<i64>,
}

impl<T> From<Page<T>> for Paginated<T> {
    fn from(page: Page<T>) -> Self {
        Paginated {
            count: page.items.len(),
            results: page.items,
            limit: page.page.limit,
            offset: page.page.offset,
            total: page.total,
        }
    }
}

/// `{message, data}`, used for 201s and acknowledgements.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: &'static str,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(message: &'static str, data: T) -> Self {
        Envelope { message, data }
    }
}

#[derive(Debug, Serialize)]
pub struct InviteCodeResponse {
    pub invite_code: String,
    pub message: &'static str,
}
