//! Line-driven page navigation for `--interactive` runs.

use std::io::BufRead;

use anyhow::{Context, Result, bail};
use cinefind_api::tmdb::{GenreId, LocalTmdbTransport, Movie};
use cinefind_db::{Connection, FavoriteRecord, load_favorite, save_favorite, save_favorites};
use cinefind_search::{MovieFilterer, PaginationController, ResultPage};
use tracing::instrument;

use crate::render::render_page;

/// Prompt shown before each command is read.
pub const PAGER_PROMPT: &str =
    "[n] next  [p] previous  [g N] go to page  [f N] favorite row  [a] favorite all  [q] quit";

/// One pager instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerCommand {
    /// Fetch the following page.
    Next,
    /// Fetch the preceding page.
    Previous,
    /// Jump to a page number.
    GoTo(u32),
    /// Save the row with this 1-based number.
    Favorite(usize),
    /// Save every row on screen.
    FavoriteAll,
    /// Leave the pager.
    Quit,
}

/// Parses one input line.
///
/// # Errors
///
/// Returns an error for unknown commands or a missing / malformed number.
pub fn parse_pager_command(line: &str) -> Result<PagerCommand> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        bail!("empty command");
    };
    let arg = parts.next();
    if parts.next().is_some() {
        bail!("too many arguments: {}", line.trim());
    }

    match (head.to_lowercase().as_str(), arg) {
        ("n" | "next", None) => Ok(PagerCommand::Next),
        ("p" | "prev" | "previous", None) => Ok(PagerCommand::Previous),
        ("q" | "quit", None) => Ok(PagerCommand::Quit),
        ("a" | "all", None) => Ok(PagerCommand::FavoriteAll),
        ("g" | "go", Some(n)) => n
            .parse()
            .map(PagerCommand::GoTo)
            .with_context(|| format!("'{n}' is not a page number")),
        ("f" | "fav", Some(n)) => n
            .parse()
            .map(PagerCommand::Favorite)
            .with_context(|| format!("'{n}' is not a row number")),
        ("g" | "go" | "f" | "fav", None) => bail!("'{head}' needs a number"),
        _ => bail!("unknown command: {}", line.trim()),
    }
}

/// Converts a movie into the row stored by the favorites table.
#[must_use]
pub fn favorite_record(movie: &Movie) -> FavoriteRecord {
    FavoriteRecord {
        movie_id: movie.id,
        title: movie.title.clone(),
        original_title: movie.original_title.clone(),
        release_date: movie.release_date.clone().filter(|d| !d.is_empty()),
        vote_average: movie.vote_average,
        genre_ids: movie.genre_ids.iter().map(|id| id.0).collect(),
        poster_path: movie.poster_path.clone(),
        overview: movie.overview.clone(),
    }
}

/// Rebuilds a movie from a stored favorite; fields the table does not
/// keep are left at their defaults.
#[must_use]
pub fn movie_from_record(record: FavoriteRecord) -> Movie {
    Movie {
        adult: false,
        backdrop_path: None,
        genre_ids: record.genre_ids.into_iter().map(GenreId).collect(),
        id: record.movie_id,
        original_language: String::new(),
        original_title: record.original_title,
        overview: record.overview,
        popularity: 0.0,
        poster_path: record.poster_path,
        release_date: record.release_date,
        title: record.title,
        video: false,
        vote_average: record.vote_average,
        vote_count: 0,
    }
}

/// Runs the pager until `q` or end of input.
///
/// Navigation errors the user can act on (last page, bad page number,
/// timeout, network failure) are logged and the prompt is shown again.
///
/// # Errors
///
/// Returns an error if input cannot be read, a favorite cannot be saved,
/// or the fetched data is corrupt.
#[instrument(skip_all)]
pub async fn run_pager<T, R>(
    controller: &PaginationController<T>,
    first: &ResultPage,
    filter: Option<&MovieFilterer<'_>>,
    conn: &Connection,
    mut input: R,
) -> Result<()>
where
    T: LocalTmdbTransport,
    R: BufRead,
{
    let mut shown = render_page(first, filter, controller.catalog());

    loop {
        tracing::info!("{PAGER_PROMPT}");
        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("failed to read pager command")?;
        if read == 0 {
            break;
        }

        let command = match parse_pager_command(&line) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("{e:#}");
                continue;
            }
        };

        let fetched = match command {
            PagerCommand::Quit => break,
            PagerCommand::Next => controller.next().await,
            PagerCommand::Previous => controller.previous().await,
            PagerCommand::GoTo(page) => controller.go_to(page).await,
            PagerCommand::Favorite(row) => {
                favorite_row(conn, &shown, row)?;
                continue;
            }
            PagerCommand::FavoriteAll => {
                let records: Vec<FavoriteRecord> = shown.iter().map(favorite_record).collect();
                let added = save_favorites(conn, &records)?;
                tracing::info!("Added {added} of {} movies to favorites", records.len());
                continue;
            }
        };

        match fetched {
            Ok(page) => shown = render_page(&page, filter, controller.catalog()),
            Err(e) if e.is_recoverable() => tracing::warn!("{e}"),
            Err(e) => return Err(e).context("failed to load page"),
        }
    }

    Ok(())
}

fn favorite_row(conn: &Connection, shown: &[Movie], row: usize) -> Result<()> {
    let Some(movie) = row.checked_sub(1).and_then(|i| shown.get(i)) else {
        tracing::warn!("Row {row} is not on this page (1..={})", shown.len());
        return Ok(());
    };
    if let Some(saved) = load_favorite(conn, movie.id)? {
        tracing::info!("Already in favorites: {}", movie_from_record(saved));
        return Ok(());
    }
    save_favorite(conn, &favorite_record(movie))?;
    tracing::info!("Added to favorites: {movie}");
    Ok(())
}
