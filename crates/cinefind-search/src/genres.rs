//! Genre name <-> id dictionary.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use anyhow::Context;
use cinefind_api::tmdb::{Genre, GenreId, GenreListResponse, LocalTmdbTransport};
use tracing::instrument;

use crate::error::{Result, SearchError};
use crate::query::QueryBuilder;

/// Write-once genre dictionary, shared read-only through `Arc` after loading.
///
/// Name lookups are case-insensitive and ignore surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct GenreCatalog {
    by_id: BTreeMap<GenreId, String>,
    by_name: HashMap<String, GenreId>,
}

impl GenreCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-filled with `genres`.
    #[must_use]
    pub fn from_genres(genres: impl IntoIterator<Item = Genre>) -> Self {
        let mut catalog = Self::new();
        catalog.replace(genres);
        catalog
    }

    fn replace(&mut self, genres: impl IntoIterator<Item = Genre>) {
        self.by_id.clear();
        self.by_name.clear();
        for genre in genres {
            self.by_name.insert(normalize(&genre.name), genre.id);
            self.by_id.insert(genre.id, genre.name);
        }
    }

    /// Number of known genres.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether nothing has been loaded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Fetches `genre/movie/list` and fills the catalog.
    ///
    /// Returns `false` without a request when already loaded and `force` is
    /// not set.
    ///
    /// # Errors
    ///
    /// Returns `Transport` or `Decode` errors; the catalog is unchanged.
    #[instrument(skip_all)]
    pub async fn load_from_remote<T: LocalTmdbTransport>(
        &mut self,
        transport: &T,
        builder: &QueryBuilder,
        force: bool,
    ) -> Result<bool> {
        if !self.is_empty() && !force {
            tracing::debug!(genres = self.len(), "genre catalog already loaded");
            return Ok(false);
        }

        let descriptor = builder.genre_list();
        let body = transport
            .send_request(&descriptor)
            .await
            .map_err(SearchError::Transport)?;
        let response: GenreListResponse = serde_json::from_slice(&body)?;

        self.replace(response.genres);
        tracing::debug!(genres = self.len(), "genre catalog loaded from TMDB");
        Ok(true)
    }

    /// Reads a `{"genres":[...]}` snapshot file into the catalog.
    ///
    /// Returns `false` without touching the file when already loaded and
    /// `force` is not set.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if the file cannot be read or parsed.
    pub fn load_from_snapshot(&mut self, path: &Path, force: bool) -> Result<bool> {
        if !self.is_empty() && !force {
            return Ok(false);
        }

        let response = read_snapshot(path).map_err(|source| SearchError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;

        self.replace(response.genres);
        tracing::debug!(
            genres = self.len(),
            path = %path.display(),
            "genre catalog loaded from snapshot"
        );
        Ok(true)
    }

    /// Writes the catalog as a snapshot, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if serialization or the write fails.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let response = GenreListResponse {
            genres: self.genres(),
        };
        write_snapshot(path, &response).map_err(|source| SearchError::Snapshot {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Id for a genre name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownGenre` when the name is not in the catalog.
    pub fn id_for(&self, name: &str) -> Result<GenreId> {
        self.by_name
            .get(&normalize(name))
            .copied()
            .ok_or_else(|| SearchError::UnknownGenre {
                name: name.trim().to_owned(),
            })
    }

    /// Display name for a genre id.
    #[must_use]
    pub fn name_for(&self, id: GenreId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Whether `id` is a known genre.
    #[must_use]
    pub fn contains_id(&self, id: GenreId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// All genre names, alphabetically.
    #[must_use]
    pub fn list_all(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_id.values().map(String::as_str).collect();
        names.sort_unstable_by_key(|name| name.to_lowercase());
        names
    }

    /// Genres ordered by id.
    #[must_use]
    pub fn genres(&self) -> Vec<Genre> {
        self.by_id
            .iter()
            .map(|(id, name)| Genre {
                id: *id,
                name: name.clone(),
            })
            .collect()
    }

    /// Resolves every name to its id.
    ///
    /// # Errors
    ///
    /// Returns `UnknownGenre` for the first unknown name.
    pub fn resolve_names<I, S>(&self, names: I) -> Result<BTreeSet<GenreId>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter(|name| !name.as_ref().trim().is_empty())
            .map(|name| self.id_for(name.as_ref()))
            .collect()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn read_snapshot(path: &Path) -> anyhow::Result<GenreListResponse> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_snapshot(path: &Path, response: &GenreListResponse) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let content =
        serde_json::to_string_pretty(response).context("failed to serialize genre snapshot")?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
