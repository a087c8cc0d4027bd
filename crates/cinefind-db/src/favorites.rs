//! Favorites CRUD operations.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

/// A movie saved to the favorites list.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteRecord {
    /// TMDB movie ID.
    pub movie_id: u64,
    /// Localized title.
    pub title: String,
    /// Original title.
    pub original_title: String,
    /// Release date (YYYY-MM-DD, nullable).
    pub release_date: Option<String>,
    /// Vote average (0-10).
    pub vote_average: f64,
    /// TMDB genre IDs.
    pub genre_ids: Vec<u32>,
    /// Poster image path (nullable).
    pub poster_path: Option<String>,
    /// Overview text (nullable).
    pub overview: Option<String>,
}

/// Inserts one favorite at the end of the list.
///
/// Returns `false` if a favorite with the same `movie_id` already exists;
/// the stored row is left untouched.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn save_favorite(conn: &Connection, record: &FavoriteRecord) -> Result<bool> {
    Ok(save_favorites(conn, std::slice::from_ref(record))? == 1)
}

/// Inserts favorites in order, skipping ids already present.
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn save_favorites(conn: &Connection, records: &[FavoriteRecord]) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to begin transaction")?;

    let mut next_position: i64 = tx
        .query_row(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM favorites",
            [],
            |row| row.get(0),
        )
        .context("failed to read next favorites position")?;

    let mut stmt = tx
        .prepare(
            "INSERT INTO favorites (
                movie_id, title, original_title, release_date,
                vote_average, genre_ids, poster_path, overview, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(movie_id) DO NOTHING",
        )
        .context("failed to prepare favorites insert")?;

    let mut inserted: usize = 0;
    for r in records {
        let changed = stmt
            .execute(rusqlite::params![
                r.movie_id,
                r.title,
                r.original_title,
                r.release_date,
                r.vote_average,
                join_genre_ids(&r.genre_ids),
                r.poster_path,
                r.overview,
                next_position,
            ])
            .with_context(|| format!("failed to insert favorite {}", r.movie_id))?;
        if changed > 0 {
            inserted = inserted.saturating_add(changed);
            next_position = next_position.saturating_add(1);
        }
    }

    drop(stmt);
    tx.commit().context("failed to commit favorites")?;
    tracing::debug!(inserted, "favorites saved");
    Ok(inserted)
}

/// Removes a favorite. Returns `false` if it was not in the list.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn remove_favorite(conn: &Connection, movie_id: u64) -> Result<bool> {
    let changed = conn
        .execute("DELETE FROM favorites WHERE movie_id = ?1", [movie_id])
        .with_context(|| format!("failed to delete favorite {movie_id}"))?;
    Ok(changed > 0)
}

/// Loads one favorite by id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn load_favorite(conn: &Connection, movie_id: u64) -> Result<Option<FavoriteRecord>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_FAVORITES} WHERE movie_id = ?1"))
        .context("failed to prepare favorite query")?;

    stmt.query_row([movie_id], row_to_record)
        .optional()
        .with_context(|| format!("failed to query favorite {movie_id}"))
}

/// Loads all favorites in insertion order.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn load_favorites(conn: &Connection) -> Result<Vec<FavoriteRecord>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_FAVORITES} ORDER BY position"))
        .context("failed to prepare favorites query")?;

    let rows = stmt
        .query_map([], row_to_record)
        .context("failed to query favorites")?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to read favorites rows")
}

/// Deletes every favorite. Returns the number of rows removed.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn clear_favorites(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM favorites", [])
        .context("failed to clear favorites")
}

const SELECT_FAVORITES: &str = "SELECT movie_id, title, original_title, release_date,
    vote_average, genre_ids, poster_path, overview FROM favorites";

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<FavoriteRecord> {
    let genre_ids: String = row.get(5)?;
    Ok(FavoriteRecord {
        movie_id: row.get(0)?,
        title: row.get(1)?,
        original_title: row.get(2)?,
        release_date: row.get(3)?,
        vote_average: row.get(4)?,
        genre_ids: split_genre_ids(&genre_ids),
        poster_path: row.get(6)?,
        overview: row.get(7)?,
    })
}

fn join_genre_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses the comma-joined id column; malformed entries are skipped.
fn split_genre_ids(raw: &str) -> Vec<u32> {
    raw.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}
