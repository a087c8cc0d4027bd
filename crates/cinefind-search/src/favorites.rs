//! In-memory favorites collection.

use std::fmt;

use cinefind_api::tmdb::Movie;

/// Ordered set of movies, unique by TMDB id.
#[derive(Debug, Clone, Default)]
pub struct Favorites {
    movies: Vec<Movie>,
}

impl Favorites {
    /// Empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { movies: Vec::new() }
    }

    /// Adds `movie` unless an equal one is present. Returns whether it was added.
    pub fn add(&mut self, movie: Movie) -> bool {
        if self.contains(&movie) {
            return false;
        }
        self.movies.push(movie);
        true
    }

    /// Adds every movie; returns how many were new.
    pub fn add_all(&mut self, movies: impl IntoIterator<Item = Movie>) -> usize {
        movies
            .into_iter()
            .map(|movie| self.add(movie))
            .filter(|added| *added)
            .count()
    }

    /// Removes `movie`. Returns `false` if it was not present.
    pub fn remove(&mut self, movie: &Movie) -> bool {
        self.remove_id(movie.id)
    }

    /// Removes the movie with TMDB id `id`. Returns `false` if absent.
    pub fn remove_id(&mut self, id: u64) -> bool {
        let before = self.movies.len();
        self.movies.retain(|m| m.id != id);
        self.movies.len() != before
    }

    /// Removes every listed movie; returns how many were present.
    pub fn remove_all<'a>(&mut self, movies: impl IntoIterator<Item = &'a Movie>) -> usize {
        movies.into_iter().filter(|movie| self.remove(movie)).count()
    }

    /// Empties the collection.
    pub fn clear(&mut self) {
        self.movies.clear();
    }

    /// Whether an equal movie is present.
    #[must_use]
    pub fn contains(&self, movie: &Movie) -> bool {
        self.movies.contains(movie)
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Number of movies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.movies.len()
    }

    /// Movies in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Movie> {
        self.movies.iter()
    }
}

impl<'a> IntoIterator for &'a Favorites {
    type Item = &'a Movie;
    type IntoIter = std::slice::Iter<'a, Movie>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Movie> for Favorites {
    fn from_iter<I: IntoIterator<Item = Movie>>(iter: I) -> Self {
        let mut favorites = Self::new();
        favorites.add_all(iter);
        favorites
    }
}

impl fmt::Display for Favorites {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.movies.is_empty() {
            return f.write_str("Your list of favorites is empty.");
        }
        for (i, movie) in self.movies.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{movie}")?;
        }
        Ok(())
    }
}
