//! Network retrieval of transfer units.
//!
//! A [`Fetcher`] writes one resource to one staging path. It does not know
//! about final paths or promotion; the engine only promotes once `fetch`
//! returns `Ok`.

mod checksum;
mod http;

pub use checksum::{calculate_file_checksum, verify_checksum};
pub use http::{HttpFetcher, DEFAULT_TIMEOUT_SECS};

use std::path::Path;

use futures::future::BoxFuture;
use reqwest::Url;

use crate::error::UpdateResult;

/// Retrieves a network resource into a local file.
pub trait Fetcher: Send + Sync {
    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// On error `dest` may hold partial content; callers discard it.
    fn fetch<'a>(&'a self, url: &'a Url, dest: &'a Path) -> BoxFuture<'a, UpdateResult<u64>>;
}
