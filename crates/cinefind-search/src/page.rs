//! Decoded result pages.

use cinefind_api::tmdb::{Movie, MoviePageResponse};

use crate::error::{Result, SearchError};
use crate::query::MAX_PAGE;

/// One page of movies plus its position in the result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    /// Movies in service order.
    pub movies: Vec<Movie>,
    /// 1-based page number.
    pub page: u32,
    /// Total pages; 0 means the search matched nothing.
    pub total_pages: u32,
    /// Total matching movies.
    pub total_results: u32,
}

impl ResultPage {
    /// Whether the search matched nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_pages == 0
    }

    /// Highest page navigation may reach: `min(total_pages, MAX_PAGE)`.
    #[must_use]
    pub fn last_reachable_page(&self) -> u32 {
        self.total_pages.min(MAX_PAGE)
    }
}

/// Parses a raw listing body and checks the page invariant.
///
/// # Errors
///
/// - `Decode` when the body is not a page object.
/// - `InvalidPage` when `total_pages > 0` and `page` is outside
///   `1..=total_pages`.
pub fn decode_page(body: &[u8]) -> Result<ResultPage> {
    let response: MoviePageResponse = serde_json::from_slice(body)?;

    if response.total_pages > 0 && !(1..=response.total_pages).contains(&response.page) {
        return Err(SearchError::InvalidPage {
            page: response.page,
            total_pages: response.total_pages,
        });
    }

    Ok(ResultPage {
        movies: response.results,
        page: response.page,
        total_pages: response.total_pages,
        total_results: response.total_results,
    })
}
