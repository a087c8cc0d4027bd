//! Database connection management.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::migrations::run_migrations;

/// Database file name inside the data directory.
const DB_FILE_NAME: &str = "cinefind.db";

/// Opens (or creates) `{data_dir}/cinefind.db` and brings its schema up to
/// date. Missing parent directories are created.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created, or a
/// migration fails.
pub fn open_db(data_dir: &Path) -> Result<Connection> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create directory {}", data_dir.display()))?;

    let db_path = data_dir.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;

    run_migrations(&conn).context("database migration failed")?;
    tracing::debug!(path = %db_path.display(), "database ready");

    Ok(conn)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_open_db_creates_missing_directory() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("data");

        // Act
        let conn = open_db(&data_dir).unwrap();

        // Assert
        assert!(data_dir.join(DB_FILE_NAME).exists());
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert!(version > 0);
    }

    #[test]
    fn test_open_db_reuses_existing_file() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        drop(open_db(dir.path()).unwrap());

        // Act
        let conn = open_db(dir.path()).unwrap();

        // Assert
        let tables: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'favorites'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_open_db_rejects_file_as_directory() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("plain-file");
        std::fs::write(&not_a_dir, b"x").unwrap();

        // Act
        let result = open_db(&not_a_dir);

        // Assert
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to create directory"));
    }
}
