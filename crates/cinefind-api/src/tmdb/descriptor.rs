//! Transport-ready request descriptors.

use std::fmt;

use anyhow::{Context, Result};
use url::Url;
use url::form_urlencoded;

/// Query parameter carrying the static API key; never stored in a descriptor.
pub(crate) const API_KEY_PARAM: &str = "api_key";

/// Remote operation a descriptor targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `search/movie` (title search).
    SearchMovie,
    /// `discover/movie` (filtered discovery).
    Discover,
    /// `movie/popular` (popular catalog listing).
    Popular,
    /// `genre/movie/list` (genre dictionary).
    GenreList,
}

impl Endpoint {
    /// All endpoints, in lookup order.
    const ALL: [Self; 4] = [
        Self::SearchMovie,
        Self::Discover,
        Self::Popular,
        Self::GenreList,
    ];

    /// Path relative to the API base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::SearchMovie => "search/movie",
            Self::Discover => "discover/movie",
            Self::Popular => "movie/popular",
            Self::GenreList => "genre/movie/list",
        }
    }

    /// Recognises an endpoint from a URL path such as `/3/discover/movie`.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        Self::ALL
            .into_iter()
            .find(|endpoint| trimmed.ends_with(endpoint.path()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A fully assembled request: endpoint plus ordered query parameters.
///
/// Credentials are not part of a descriptor; the transport appends them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    endpoint: Endpoint,
    params: Vec<(String, String)>,
}

impl RequestDescriptor {
    /// Creates an empty descriptor for `endpoint`.
    #[must_use]
    pub const fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((String::from(key), value.into()));
        self
    }

    /// Replaces the value of `key`, appending it when absent.
    pub fn set_param(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.params.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.params.push((String::from(key), value));
        }
    }

    /// Returns a copy of this descriptor pointing at `page`.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        let mut next = self.clone();
        next.set_param("page", page.to_string());
        next
    }

    /// Targeted endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Query parameters in emission order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Value of the first parameter named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether a parameter named `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| k == key)
    }

    /// URL-encoded query string (`application/x-www-form-urlencoded`).
    #[must_use]
    pub fn query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish()
    }

    /// Resolves the descriptor against `base` into a complete URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint path cannot be joined onto `base`.
    pub fn to_url(&self, base: &Url) -> Result<Url> {
        let mut url = base
            .join(self.endpoint.path())
            .with_context(|| format!("failed to join URL path: {}", self.endpoint))?;
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        Ok(url)
    }

    /// Rebuilds a descriptor from a previously issued URL.
    ///
    /// The `api_key` credential parameter is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL path is not a known TMDB endpoint.
    pub fn from_url(url: &Url) -> Result<Self> {
        let endpoint = Endpoint::from_path(url.path())
            .with_context(|| format!("unknown TMDB endpoint: {}", url.path()))?;
        let params = url
            .query_pairs()
            .filter(|(k, _)| k != API_KEY_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok(Self { endpoint, params })
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?{}", self.endpoint, self.query_string())
    }
}
