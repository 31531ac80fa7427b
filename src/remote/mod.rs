//! Remote source collaborator: resolves identifiers to available encodings
//! and opens byte streams for a chosen encoding.

pub mod http;
pub mod models;


pub use http::HttpRemoteSource;
pub use models::{Encoding, RemoteTrackInfo};

use crate::source::{ByteStream, SourceError};
use async_trait::async_trait;

/// Contract for the remote media source.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Resolves an identifier to its track metadata and available encodings.
    async fn resolve(&self, identifier: &str) -> Result<RemoteTrackInfo, SourceError>;

    /// Opens a byte stream for the given encoding, starting at `offset` bytes.
    /// Offsets allow an interrupted consumer to resume where it left off.
    async fn fetch(&self, encoding: &Encoding, offset: u64) -> Result<ByteStream, SourceError>;
}
