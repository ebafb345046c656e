//! Continuation-token pagination

use crate::error::{Error, Result};
use std::future::Future;
use tracing::debug;

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }

    /// Final page (no continuation token)
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Fetch pages until the provider stops returning a continuation token.
///
/// `fetch` receives `None` for the first page and the previous page's
/// token afterwards. Items keep provider order across pages. The first
/// error aborts the listing and drops what was collected so far. After
/// `max_pages` pages that still carry a token the listing fails with
/// [`Error::PageLimitExceeded`].
pub async fn collect_pages<T, F, Fut>(max_pages: u32, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0u32;

    loop {
        let page = fetch(page_token.take()).await?;
        pages += 1;
        debug!(page = pages, items = page.items.len(), "Fetched page");
        items.extend(page.items);

        match page.next_page_token.filter(|token| !token.is_empty()) {
            None => break,
            Some(_) if pages >= max_pages => return Err(Error::PageLimitExceeded(pages)),
            Some(token) => page_token = Some(token),
        }
    }

    Ok(items)
}
