//! API client library for cinefind.
//!
//! Provides the TMDB v3 transport used by the search engine: request
//! descriptors, the HTTP client, and the JSON wire types.

/// TMDB API client.
pub mod tmdb;
