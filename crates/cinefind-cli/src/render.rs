//! Table output for movies, pages and genres.
//!
//! Rows are emitted as `info!` events, one per line.

use cinefind_api::tmdb::Movie;
use cinefind_search::{GenreCatalog, MovieFilterer, ResultPage};

/// Logs one row per movie, numbered from 1.
pub fn render_movies(movies: &[Movie], catalog: &GenreCatalog) {
    tracing::info!("#\tID\tMovie\tGenres");
    for (index, movie) in (1_usize..).zip(movies) {
        tracing::info!(
            "{}\t{}\t{}\t{}",
            index,
            movie.id,
            movie,
            genre_names(movie, catalog),
        );
    }
}

/// Renders a fetched page, optionally narrowed by a local filter.
///
/// Returns the movies that were shown so row numbers can be resolved later.
pub fn render_page(
    page: &ResultPage,
    filter: Option<&MovieFilterer<'_>>,
    catalog: &GenreCatalog,
) -> Vec<Movie> {
    let shown = filter.map_or_else(
        || page.movies.clone(),
        |f| f.filter(page.movies.iter().cloned()),
    );

    if shown.is_empty() {
        tracing::info!("No movies found.");
    } else {
        render_movies(&shown, catalog);
    }
    tracing::info!(
        "Page {}/{} ({} results)",
        page.page,
        page.last_reachable_page(),
        page.total_results
    );
    shown
}

/// Logs the catalog as `id<TAB>name`, ordered by id.
pub fn render_genres(catalog: &GenreCatalog) {
    tracing::info!("ID\tName");
    for genre in catalog.genres() {
        tracing::info!("{}\t{}", genre.id, genre.name);
    }
    tracing::info!("Total: {} genres", catalog.len());
}

fn genre_names(movie: &Movie, catalog: &GenreCatalog) -> String {
    let names: Vec<&str> = movie
        .genre_ids
        .iter()
        .filter_map(|id| catalog.name_for(*id))
        .collect();
    if names.is_empty() {
        String::from("-")
    } else {
        names.join(", ")
    }
}
