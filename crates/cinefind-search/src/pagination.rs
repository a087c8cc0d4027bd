//! Page-by-page navigation over one search session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cinefind_api::tmdb::{LocalTmdbTransport, RequestDescriptor};
use tracing::instrument;

use crate::criteria::SearchCriteria;
use crate::error::{Result, SearchError};
use crate::genres::GenreCatalog;
use crate::page::{ResultPage, decode_page};
use crate::query::{MAX_PAGE, QueryBuilder};

/// Default limit for one transport call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle of the controller's current fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    /// Nothing fetched yet.
    #[default]
    Idle,
    /// A transport call is in flight.
    Fetching,
    /// The last fetch succeeded.
    Ready,
    /// The last fetch failed; the cursor still points at the last good page.
    Failed,
}

/// Position of the last successfully fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageCursor {
    /// Current page (1-based; 0 before any fetch).
    pub page: u32,
    /// Total pages reported by the service.
    pub total_pages: u32,
}

impl PageCursor {
    /// `min(total_pages, MAX_PAGE)`.
    #[must_use]
    pub fn last_reachable_page(self) -> u32 {
        self.total_pages.min(MAX_PAGE)
    }
}

#[derive(Debug, Default)]
struct Session {
    state: FetchState,
    /// `None` while browsing the popular catalog.
    criteria: Option<SearchCriteria>,
    descriptor: Option<RequestDescriptor>,
    cursor: Option<PageCursor>,
}

/// Runs a search and walks its pages while the criteria stay fixed.
///
/// Only one fetch may be in flight per controller: a call made while another
/// is still waiting on the transport fails with `SearchError::Busy`.
#[derive(Debug)]
pub struct PaginationController<T> {
    transport: T,
    builder: QueryBuilder,
    catalog: Arc<GenreCatalog>,
    timeout: Duration,
    in_flight: tokio::sync::Mutex<()>,
    session: Mutex<Session>,
}

impl<T: LocalTmdbTransport> PaginationController<T> {
    /// Creates an idle controller.
    pub fn new(transport: T, builder: QueryBuilder, catalog: Arc<GenreCatalog>) -> Self {
        Self {
            transport,
            builder,
            catalog,
            timeout: DEFAULT_TIMEOUT,
            in_flight: tokio::sync::Mutex::new(()),
            session: Mutex::new(Session::default()),
        }
    }

    /// Overrides the per-call timeout (default: 10s).
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Genre catalog used to validate criteria.
    pub fn catalog(&self) -> &GenreCatalog {
        &self.catalog
    }

    /// Current fetch state.
    pub fn state(&self) -> FetchState {
        self.session().state
    }

    /// Page and total of the last successful fetch.
    pub fn cursor(&self) -> Option<PageCursor> {
        self.session().cursor
    }

    /// Descriptor of the last successful fetch.
    pub fn current_descriptor(&self) -> Option<RequestDescriptor> {
        self.session().descriptor.clone()
    }

    /// Criteria of the current session, with `page` at the cursor.
    ///
    /// `None` before any search and while browsing popular movies.
    pub fn current_criteria(&self) -> Option<SearchCriteria> {
        self.session().criteria.clone()
    }

    /// Starts a new session at page 1, superseding the previous one.
    ///
    /// # Errors
    ///
    /// - `EmptyQuery` when title and all filters are empty (no request is made).
    /// - `Busy` while another fetch is in flight.
    /// - `InvalidCriteria` / `UnknownGenre` from the query builder.
    /// - `Transport`, `Timeout`, `Decode`, `InvalidPage` from the fetch.
    #[instrument(skip_all)]
    pub async fn start(&self, criteria: &SearchCriteria) -> Result<ResultPage> {
        if criteria.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let _guard = self.in_flight.try_lock().map_err(|_| SearchError::Busy)?;

        let criteria = criteria.clone().with_page(1);
        let descriptor = self.builder.build(&criteria, &self.catalog)?;
        self.reset_session(Some(criteria));
        self.fetch(descriptor).await
    }

    /// Starts a session over the popular catalog at page 1.
    ///
    /// # Errors
    ///
    /// - `Busy` while another fetch is in flight.
    /// - `Transport`, `Timeout`, `Decode`, `InvalidPage` from the fetch.
    #[instrument(skip_all)]
    pub async fn start_popular(&self) -> Result<ResultPage> {
        let _guard = self.in_flight.try_lock().map_err(|_| SearchError::Busy)?;

        let descriptor = self.builder.popular(1)?;
        self.reset_session(None);
        self.fetch(descriptor).await
    }

    /// Fetches the page after the cursor.
    ///
    /// # Errors
    ///
    /// `NoNextPage` on the last reachable page, `Busy`, or any fetch error.
    #[instrument(skip_all)]
    pub async fn next(&self) -> Result<ResultPage> {
        let _guard = self.in_flight.try_lock().map_err(|_| SearchError::Busy)?;

        let cursor = self.cursor().unwrap_or_default();
        let last = cursor.last_reachable_page();
        if cursor.page >= last {
            tracing::warn!(page = cursor.page, total_pages = last, "no next page");
            return Err(SearchError::NoNextPage {
                page: cursor.page,
                total_pages: last,
            });
        }
        self.fetch_page(cursor.page.saturating_add(1)).await
    }

    /// Fetches the page before the cursor.
    ///
    /// # Errors
    ///
    /// `NoPreviousPage` on page 1, `Busy`, or any fetch error.
    #[instrument(skip_all)]
    pub async fn previous(&self) -> Result<ResultPage> {
        let _guard = self.in_flight.try_lock().map_err(|_| SearchError::Busy)?;

        let cursor = self.cursor().unwrap_or_default();
        if cursor.page <= 1 {
            tracing::warn!(page = cursor.page, "no previous page");
            return Err(SearchError::NoPreviousPage);
        }
        self.fetch_page(cursor.page.saturating_sub(1)).await
    }

    /// Fetches page `page` of the current session.
    ///
    /// # Errors
    ///
    /// `PageOutOfRange` unless `1 <= page <= last reachable page`, `Busy`,
    /// or any fetch error.
    #[instrument(skip_all)]
    pub async fn go_to(&self, page: u32) -> Result<ResultPage> {
        let _guard = self.in_flight.try_lock().map_err(|_| SearchError::Busy)?;

        let last = self.cursor().unwrap_or_default().last_reachable_page();
        if page < 1 || page > last {
            tracing::warn!(requested = page, total_pages = last, "page out of range");
            return Err(SearchError::PageOutOfRange {
                requested: page,
                total_pages: last,
            });
        }
        self.fetch_page(page).await
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset_session(&self, criteria: Option<SearchCriteria>) {
        *self.session() = Session {
            criteria,
            ..Session::default()
        };
    }

    /// Re-issues the last successful descriptor with a different page.
    async fn fetch_page(&self, page: u32) -> Result<ResultPage> {
        let descriptor = self
            .current_descriptor()
            .map(|descriptor| descriptor.with_page(page))
            .ok_or(SearchError::PageOutOfRange {
                requested: page,
                total_pages: 0,
            })?;
        self.fetch(descriptor).await
    }

    async fn fetch(&self, descriptor: RequestDescriptor) -> Result<ResultPage> {
        self.session().state = FetchState::Fetching;
        tracing::debug!(%descriptor, "fetching page");

        let mut guard = FetchGuard {
            session: &self.session,
            settled: false,
        };
        let outcome = self.send_and_decode(&descriptor).await;
        guard.settled = true;

        let mut session = self.session();
        match outcome {
            Ok(page) => {
                session.state = FetchState::Ready;
                session.cursor = Some(PageCursor {
                    page: page.page,
                    total_pages: page.total_pages,
                });
                if let Some(criteria) = session.criteria.as_mut() {
                    criteria.page = page.page;
                }
                session.descriptor = Some(descriptor);
                drop(session);
                tracing::debug!(
                    page = page.page,
                    total_pages = page.total_pages,
                    movies = page.movies.len(),
                    "page ready"
                );
                Ok(page)
            }
            Err(err) => {
                session.state = FetchState::Failed;
                drop(session);
                tracing::warn!(error = %err, "fetch failed");
                Err(err)
            }
        }
    }

    async fn send_and_decode(&self, descriptor: &RequestDescriptor) -> Result<ResultPage> {
        let body = tokio::time::timeout(self.timeout, self.transport.send_request(descriptor))
            .await
            .map_err(|_| SearchError::Timeout(self.timeout))?
            .map_err(SearchError::Transport)?;
        decode_page(&body)
    }
}

/// Marks the session `Failed` when a fetch is dropped before it settles.
struct FetchGuard<'a> {
    session: &'a Mutex<Session>,
    settled: bool,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.session
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .state = FetchState::Failed;
            tracing::debug!("fetch cancelled before completion");
        }
    }
}
