//! Search-query translation and pagination engine.
//!
//! Turns typed [`SearchCriteria`] into TMDB request descriptors, decodes
//! the returned pages, and walks them with a [`PaginationController`].
//! Transport is abstracted behind `cinefind_api::tmdb::LocalTmdbTransport`.

/// Typed criteria and validators.
pub mod criteria;
mod error;
/// In-memory favorites.
pub mod favorites;
/// Local re-filtering.
pub mod filter;
/// Genre dictionary.
pub mod genres;
/// Decoded result pages.
pub mod page;
/// Page navigation.
pub mod pagination;
/// Criteria <-> descriptor translation.
pub mod query;

pub use criteria::{
    MIN_ACCEPTABLE_YEAR, SearchCriteria, VoteThreshold, YearFilter, max_acceptable_year,
};
pub use error::{Result, SearchError};
pub use favorites::Favorites;
pub use filter::MovieFilterer;
pub use genres::GenreCatalog;
pub use page::{ResultPage, decode_page};
pub use pagination::{DEFAULT_TIMEOUT, FetchState, PageCursor, PaginationController};
pub use query::{DEFAULT_LANGUAGE, MAX_PAGE, QueryBuilder};
