//! `TmdbTransport` trait definition.
#![allow(clippy::future_not_send)]

use anyhow::Result;

use super::descriptor::RequestDescriptor;

/// Transport boundary between the search engine and the TMDB service.
///
/// One operation: send a request descriptor, get the raw JSON body back.
/// Retry and rate-limit policy belong to the implementor.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(TmdbTransport: Send)]
pub trait LocalTmdbTransport {
    /// Sends the request described by `descriptor` and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the service answers
    /// with a non-success status.
    async fn send_request(&self, descriptor: &RequestDescriptor) -> Result<Vec<u8>>;
}
