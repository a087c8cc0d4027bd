//! Database module for the favorites list.
//!
//! Uses `rusqlite` (bundled `SQLite`) to keep the user's favorite movies
//! between CLI runs.

mod connection;
/// Favorites CRUD operations.
pub mod favorites;
mod migrations;

#[allow(clippy::module_name_repetitions)]
pub use connection::open_db;
pub use rusqlite::Connection;
pub use favorites::{
    FavoriteRecord, clear_favorites, load_favorite, load_favorites, remove_favorite,
    save_favorite, save_favorites,
};
