//! Error types for cinefind-search

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors produced by the search engine.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A criterion value is malformed or out of bounds.
    #[error("Invalid search criteria: {reason}")]
    InvalidCriteria {
        /// Human-readable cause.
        reason: String,
    },

    /// A genre name or id is not in the catalog.
    #[error("Unknown genre: {name}")]
    UnknownGenre {
        /// The name (or id) that failed to resolve.
        name: String,
    },

    /// Title and every filter are empty.
    #[error("Nothing to search for: give a title or at least one filter")]
    EmptyQuery,

    /// `next` on the last reachable page.
    #[error("Already on the last page ({page} of {total_pages})")]
    NoNextPage {
        /// Current page.
        page: u32,
        /// Last reachable page.
        total_pages: u32,
    },

    /// `previous` on the first page.
    #[error("Already on the first page")]
    NoPreviousPage,

    /// `go_to` outside `1..=total_pages`.
    #[error("Page {requested} is out of range (1..={total_pages})")]
    PageOutOfRange {
        /// Requested page.
        requested: u32,
        /// Last reachable page.
        total_pages: u32,
    },

    /// The transport failed to deliver a response.
    #[error("Transport error: {0:#}")]
    Transport(#[source] anyhow::Error),

    /// The transport did not answer within the controller timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body is not a valid page or genre list.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The decoded page number breaks `1 <= page <= total_pages`.
    #[error("Response page {page} is outside 1..={total_pages}")]
    InvalidPage {
        /// Page reported by the service.
        page: u32,
        /// Total pages reported by the service.
        total_pages: u32,
    },

    /// Another fetch on the same controller is still in flight.
    #[error("A fetch is already in progress")]
    Busy,

    /// Reading or writing the genre snapshot file failed.
    #[error("Genre snapshot error ({}): {source:#}", path.display())]
    Snapshot {
        /// Snapshot file path.
        path: PathBuf,
        /// Underlying I/O or JSON error.
        #[source]
        source: anyhow::Error,
    },
}

impl SearchError {
    /// Builds an `InvalidCriteria` error.
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidCriteria {
            reason: reason.into(),
        }
    }

    /// Whether re-prompting the user or retrying the same call can succeed.
    ///
    /// Decode, page-invariant and snapshot errors describe data that will
    /// not change on a retry.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Decode(_) | Self::InvalidPage { .. } | Self::Snapshot { .. }
        )
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, SearchError>;
