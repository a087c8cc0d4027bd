//! TMDB API client module.
//!
//! Sends request descriptors to the TMDB API v3 endpoints
//! and returns the raw JSON body for the caller to decode.

mod api;
mod client;
mod descriptor;
mod rate_limiter;
mod types;

#[allow(clippy::module_name_repetitions)]
pub use api::{LocalTmdbTransport, TmdbTransport};
#[allow(clippy::module_name_repetitions)]
pub use client::{Credential, TmdbClient, TmdbClientBuilder};
pub use descriptor::{Endpoint, RequestDescriptor};
#[allow(clippy::module_name_repetitions)]
pub use types::{
    Genre, GenreId, GenreListResponse, IMAGE_BASE_URL, Movie, MoviePageResponse,
    TmdbErrorResponse,
};
