#![allow(clippy::unwrap_used)]
#![allow(missing_docs)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cinefind_api::tmdb::{Endpoint, GenreListResponse, LocalTmdbTransport, RequestDescriptor};
use cinefind_search::{
    FetchState, GenreCatalog, PageCursor, PaginationController, QueryBuilder, SearchCriteria,
    SearchError, YearFilter,
};

/// In-memory TMDB stand-in serving `total_pages` synthetic pages.
#[derive(Debug, Default)]
struct FakeTransport {
    total_pages: u32,
    calls: AtomicUsize,
    delay_ms: AtomicU64,
    failing: AtomicBool,
    requests: Mutex<Vec<RequestDescriptor>>,
}

impl FakeTransport {
    fn with_pages(total_pages: u32) -> Self {
        Self {
            total_pages,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> RequestDescriptor {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    fn page_body(&self, page: u32) -> Vec<u8> {
        let results: Vec<serde_json::Value> = (0..3)
            .map(|i| {
                serde_json::json!({
                    "id": u64::from(page) * 100 + i,
                    "title": format!("Movie {page}-{i}"),
                    "original_title": format!("Movie {page}-{i}"),
                    "release_date": "2005-06-01",
                    "genre_ids": [28],
                    "vote_average": 7.5,
                })
            })
            .collect();
        serde_json::to_vec(&serde_json::json!({
            "page": page,
            "results": results,
            "total_pages": self.total_pages,
            "total_results": self.total_pages * 3,
        }))
        .unwrap()
    }
}

impl LocalTmdbTransport for FakeTransport {
    async fn send_request(&self, descriptor: &RequestDescriptor) -> anyhow::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(descriptor.clone());

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("connection reset by peer");
        }

        let page: u32 = descriptor.get("page").unwrap_or("1").parse()?;
        Ok(self.page_body(page))
    }
}

fn catalog() -> Arc<GenreCatalog> {
    let json = include_str!("../../../fixtures/tmdb/genre_movie_list.json");
    let response: GenreListResponse = serde_json::from_str(json).unwrap();
    Arc::new(GenreCatalog::from_genres(response.genres))
}

fn controller(total_pages: u32) -> PaginationController<FakeTransport> {
    PaginationController::new(
        FakeTransport::with_pages(total_pages),
        QueryBuilder::default(),
        catalog(),
    )
}

fn action_2000s(catalog: &GenreCatalog) -> SearchCriteria {
    SearchCriteria::new()
        .with_years(YearFilter::parse_range("2000", "2009").unwrap())
        .with_genre_names(catalog, ["Action"])
        .unwrap()
}

#[tokio::test]
async fn test_start_fetches_page_one() {
    // Arrange
    let controller = controller(4);
    let criteria = action_2000s(controller.catalog()).with_page(3);

    // Act
    let page = controller.start(&criteria).await.unwrap();

    // Assert
    assert_eq!(page.page, 1);
    assert_eq!(page.movies.len(), 3);
    assert_eq!(controller.state(), FetchState::Ready);
    assert_eq!(
        controller.cursor(),
        Some(PageCursor {
            page: 1,
            total_pages: 4
        })
    );
    let request = controller.transport().last_request();
    assert_eq!(request.endpoint(), Endpoint::Discover);
    assert_eq!(request.get("page"), Some("1"));
    assert_eq!(controller.current_criteria().unwrap().page, 1);
}

#[tokio::test]
async fn test_next_walks_to_last_page() {
    // Arrange
    let total = 5;
    let controller = controller(total);
    let criteria = action_2000s(controller.catalog());
    controller.start(&criteria).await.unwrap();

    // Act
    for expected in 2..=total {
        let page = controller.next().await.unwrap();
        assert_eq!(page.page, expected);
    }
    let past_end = controller.next().await;

    // Assert
    assert!(matches!(
        past_end,
        Err(SearchError::NoNextPage {
            page: 5,
            total_pages: 5
        })
    ));
    assert_eq!(controller.transport().calls(), 5);
    assert_eq!(controller.state(), FetchState::Ready);
}

#[tokio::test]
async fn test_navigation_keeps_criteria_except_page() {
    // Arrange
    let controller = controller(3);
    let criteria = action_2000s(controller.catalog());
    controller.start(&criteria).await.unwrap();
    let first = controller.transport().last_request();

    // Act
    controller.next().await.unwrap();
    let second = controller.transport().last_request();

    // Assert
    assert_eq!(second, first.with_page(2));
    assert_eq!(
        controller.current_criteria().unwrap(),
        criteria.with_page(2)
    );
}

#[tokio::test]
async fn test_previous_on_first_page() {
    // Arrange
    let controller = controller(3);
    let criteria = action_2000s(controller.catalog());
    controller.start(&criteria).await.unwrap();

    // Act
    let result = controller.previous().await;

    // Assert
    assert!(matches!(result, Err(SearchError::NoPreviousPage)));
    assert_eq!(controller.transport().calls(), 1);
}

#[tokio::test]
async fn test_go_to_bounds() {
    // Arrange
    let controller = controller(7);
    let criteria = action_2000s(controller.catalog());
    controller.start(&criteria).await.unwrap();

    // Act & Assert
    assert!(matches!(
        controller.go_to(0).await,
        Err(SearchError::PageOutOfRange {
            requested: 0,
            total_pages: 7
        })
    ));
    assert!(matches!(
        controller.go_to(8).await,
        Err(SearchError::PageOutOfRange {
            requested: 8,
            total_pages: 7
        })
    ));
    let last = controller.go_to(7).await.unwrap();
    assert_eq!(last.page, 7);
    let back = controller.previous().await.unwrap();
    assert_eq!(back.page, 6);
}

#[tokio::test]
async fn test_empty_query_makes_no_request() {
    // Arrange
    let controller = controller(3);

    // Act
    let result = controller.start(&SearchCriteria::new()).await;

    // Assert
    assert!(matches!(result, Err(SearchError::EmptyQuery)));
    assert_eq!(controller.transport().calls(), 0);
    assert_eq!(controller.state(), FetchState::Idle);
}

#[tokio::test]
async fn test_unknown_genre_makes_no_request() {
    // Arrange
    let controller = controller(3);
    let criteria = SearchCriteria::new().with_genre_ids([cinefind_api::tmdb::GenreId(4242)]);

    // Act
    let result = controller.start(&criteria).await;

    // Assert
    assert!(matches!(result, Err(SearchError::UnknownGenre { .. })));
    assert_eq!(controller.transport().calls(), 0);
}

#[tokio::test]
async fn test_concurrent_navigation_is_rejected_as_busy() {
    // Arrange
    let controller = controller(3);
    let criteria = action_2000s(controller.catalog());
    controller.start(&criteria).await.unwrap();
    controller
        .transport()
        .delay_ms
        .store(100, Ordering::SeqCst);

    // Act
    let (a, b) = tokio::join!(controller.next(), controller.next());

    // Assert
    let busy = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(SearchError::Busy)))
        .count();
    let ok = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!((ok, busy), (1, 1));
    assert_eq!(controller.transport().calls(), 2);
    assert_eq!(controller.cursor().unwrap().page, 2);
}

#[tokio::test]
async fn test_timeout_then_retry_same_page() {
    // Arrange
    let controller = controller(3).with_timeout(Duration::from_millis(50));
    let criteria = action_2000s(controller.catalog());
    controller.start(&criteria).await.unwrap();
    controller
        .transport()
        .delay_ms
        .store(500, Ordering::SeqCst);

    // Act
    let timed_out = controller.next().await;
    let state_after_timeout = controller.state();
    let cursor_after_timeout = controller.cursor();
    controller.transport().delay_ms.store(0, Ordering::SeqCst);
    let retried = controller.next().await.unwrap();

    // Assert
    assert!(matches!(timed_out, Err(SearchError::Timeout(_))));
    assert_eq!(state_after_timeout, FetchState::Failed);
    assert_eq!(cursor_after_timeout.unwrap().page, 1);
    assert_eq!(retried.page, 2);
    assert_eq!(controller.state(), FetchState::Ready);
}

#[tokio::test]
async fn test_cancelled_fetch_leaves_failed_state() {
    // Arrange
    let controller = controller(3);
    let criteria = action_2000s(controller.catalog());
    controller.start(&criteria).await.unwrap();
    controller
        .transport()
        .delay_ms
        .store(5_000, Ordering::SeqCst);

    // Act
    let cancelled = tokio::time::timeout(Duration::from_millis(20), controller.next()).await;
    let state_after_cancel = controller.state();
    let cursor_after_cancel = controller.cursor();
    controller.transport().delay_ms.store(0, Ordering::SeqCst);
    let retried = controller.next().await.unwrap();

    // Assert
    assert!(cancelled.is_err());
    assert_eq!(state_after_cancel, FetchState::Failed);
    assert_eq!(cursor_after_cancel.unwrap().page, 1);
    assert_eq!(retried.page, 2);
    assert_eq!(controller.state(), FetchState::Ready);
}

#[tokio::test]
async fn test_transport_failure_keeps_cursor() {
    // Arrange
    let controller = controller(4);
    let criteria = action_2000s(controller.catalog());
    controller.start(&criteria).await.unwrap();
    controller.next().await.unwrap();
    controller.transport().failing.store(true, Ordering::SeqCst);

    // Act
    let failed = controller.go_to(4).await;

    // Assert
    let err = failed.unwrap_err();
    assert!(matches!(err, SearchError::Transport(_)));
    assert!(err.to_string().contains("connection reset"));
    assert!(err.is_recoverable());
    assert_eq!(controller.state(), FetchState::Failed);
    assert_eq!(controller.cursor().unwrap().page, 2);
    assert_eq!(
        controller.current_descriptor().unwrap().get("page"),
        Some("2")
    );
}

#[tokio::test]
async fn test_title_search_session() {
    // Arrange
    let controller = controller(2);
    let criteria = SearchCriteria::new().with_title("matrix");

    // Act
    controller.start(&criteria).await.unwrap();
    controller.next().await.unwrap();

    // Assert
    let request = controller.transport().last_request();
    assert_eq!(request.endpoint(), Endpoint::SearchMovie);
    assert_eq!(request.query_string(), "language=en-US&query=matrix&page=2");
}

#[tokio::test]
async fn test_popular_session_pages() {
    // Arrange
    let controller = controller(800);

    // Act
    controller.start_popular().await.unwrap();
    let last = controller.go_to(500).await.unwrap();
    let beyond = controller.next().await;

    // Assert
    assert_eq!(last.page, 500);
    assert!(matches!(
        beyond,
        Err(SearchError::NoNextPage {
            page: 500,
            total_pages: 500
        })
    ));
    assert!(controller.current_criteria().is_none());
    assert_eq!(
        controller.transport().last_request().endpoint(),
        Endpoint::Popular
    );
}

#[tokio::test]
async fn test_new_start_supersedes_session() {
    // Arrange
    let controller = controller(6);
    let first = action_2000s(controller.catalog());
    controller.start(&first).await.unwrap();
    controller.go_to(5).await.unwrap();

    // Act
    let second = SearchCriteria::new().with_title("alien");
    let page = controller.start(&second).await.unwrap();

    // Assert
    assert_eq!(page.page, 1);
    assert_eq!(controller.cursor().unwrap().page, 1);
    assert_eq!(controller.current_criteria().unwrap().title, "alien");
}

#[tokio::test]
async fn test_empty_result_cannot_navigate() {
    // Arrange
    let controller = controller(0);
    let criteria = action_2000s(controller.catalog());

    // Act
    let page = controller.start(&criteria).await.unwrap();

    // Assert
    assert!(page.is_empty());
    assert!(matches!(
        controller.next().await,
        Err(SearchError::NoNextPage { .. })
    ));
    assert!(matches!(
        controller.go_to(1).await,
        Err(SearchError::PageOutOfRange { .. })
    ));
}
