//! HTTP acquisition of the raw feed payload.

mod client;
pub mod auth;

pub use client::{BasicClient, HttpClient};

use anyhow::Result;

/// Performs a single GET against `url` and returns the full response body.
///
/// A transport failure or a non-success HTTP status is an error; retrying is
/// the caller's concern, not this function's.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}
