//! TMDB API response types.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Image base URL and poster size used for poster links.
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w220_and_h330_face";

// --- Genres ---

/// TMDB genre identifier.
///
/// Deserializes from either a JSON number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GenreId(pub u32);

impl fmt::Display for GenreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GenreId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl<'de> Deserialize<'de> for GenreId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Genre entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    /// Genre ID.
    pub id: GenreId,
    /// Genre name.
    pub name: String,
}

/// Response from `genre/movie/list`, also the on-disk snapshot format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreListResponse {
    /// All genres known to the service.
    pub genres: Vec<Genre>,
}

// --- Movies ---

/// A movie record as returned by search, discover, and popular listings.
///
/// Equality and hashing use the TMDB id only.
#[derive(Debug, Clone, Deserialize)]
pub struct Movie {
    /// Adult flag.
    #[serde(default)]
    pub adult: bool,
    /// Backdrop image path.
    #[serde(default)]
    pub backdrop_path: Option<String>,
    /// Genre IDs.
    #[serde(default)]
    pub genre_ids: Vec<GenreId>,
    /// TMDB movie ID.
    pub id: u64,
    /// Original language (ISO 639-1).
    #[serde(default)]
    pub original_language: String,
    /// Original title.
    #[serde(default)]
    pub original_title: String,
    /// Overview text.
    #[serde(default)]
    pub overview: Option<String>,
    /// Popularity score.
    #[serde(default)]
    pub popularity: f64,
    /// Poster image path.
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Release date (YYYY-MM-DD, empty or null when unknown).
    #[serde(default)]
    pub release_date: Option<String>,
    /// Localized title.
    #[serde(default)]
    pub title: String,
    /// Video flag.
    #[serde(default)]
    pub video: bool,
    /// Vote average (0-10).
    #[serde(default)]
    pub vote_average: f64,
    /// Vote count.
    #[serde(default)]
    pub vote_count: u32,
}

impl Movie {
    /// Release year parsed from the first four characters of `release_date`.
    #[must_use]
    pub fn release_year(&self) -> Option<u16> {
        self.release_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok())
    }

    /// Full poster URL, if the movie has a poster.
    #[must_use]
    pub fn poster_url(&self) -> Option<String> {
        self.poster_path
            .as_deref()
            .map(|path| format!("{IMAGE_BASE_URL}{path}"))
    }
}

impl PartialEq for Movie {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Movie {}

impl Hash for Movie {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Movie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.release_year() {
            Some(year) => write!(f, "{} ({year})", self.title)?,
            None => write!(f, "{}", self.title)?,
        }
        write!(f, " - {:.1}/10", self.vote_average)
    }
}

/// Paginated movie listing (`search/movie`, `discover/movie`, `movie/popular`).
#[derive(Debug, Clone, Deserialize)]
pub struct MoviePageResponse {
    /// Current page number.
    pub page: u32,
    /// Movies on this page, in service order.
    pub results: Vec<Movie>,
    /// Total number of pages.
    pub total_pages: u32,
    /// Total number of results.
    #[serde(default)]
    pub total_results: u32,
}

// --- Error Response ---

/// TMDB API error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbErrorResponse {
    /// TMDB error code.
    pub status_code: u32,
    /// Error message.
    pub status_message: String,
    /// Success flag (always false for errors).
    #[serde(default)]
    pub success: bool,
}
