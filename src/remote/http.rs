//! HTTP-backed remote source implementation

use crate::remote::models::{Encoding, RemoteTrackInfo};
use crate::remote::RemoteSource;
use crate::source::{ByteStream, SourceError};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::io;
use tracing::{debug, warn};

const LOG_TARGET: &str = "resono::remote::http";

/// Remote source backed by an HTTP resolver endpoint and direct media URLs.
#[derive(Clone)]
pub struct HttpRemoteSource {
    client: Client,
    resolver_url: String,
}

impl HttpRemoteSource {
    /// Create a new remote source against the given resolver base URL.
    pub fn new(resolver_url: &str) -> Self {
        debug!(target: LOG_TARGET, "Creating HttpRemoteSource with resolver_url: {}", resolver_url);

        let client = match Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!(target: LOG_TARGET, "Error creating HTTP client with timeout: {:?}. Falling back to default.", e);
                Client::new()
            }
        };

        HttpRemoteSource {
            client,
            resolver_url: resolver_url.trim_end_matches('/').to_string(),
        }
    }

    /// Builds the resolver request. Identifiers are usually URLs themselves,
    /// so they go through the query builder, which percent-encodes them.
    pub(super) fn resolve_request(&self, identifier: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/resolve", self.resolver_url))
            .query(&[("identifier", identifier)])
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn resolve(&self, identifier: &str) -> Result<RemoteTrackInfo, SourceError> {
        debug!(target: LOG_TARGET, "Resolving track metadata for {}", identifier);

        let response = self.resolve_request(identifier).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Remote(format!(
                "Resolver returned {} for {}",
                response.status(),
                identifier
            )));
        }

        let info: RemoteTrackInfo = response.json().await?;
        debug!(
            target: LOG_TARGET,
            "Resolved {}: {} encodings, is_live={}",
            identifier,
            info.encodings.len(),
            info.is_live
        );
        Ok(info)
    }

    async fn fetch(&self, encoding: &Encoding, offset: u64) -> Result<ByteStream, SourceError> {
        debug!(target: LOG_TARGET, "Fetching {} from offset {}", encoding.url, offset);

        let mut request = self.client.get(&encoding.url);
        if offset > 0 {
            request = request.header(reqwest::header::RANGE, format!("bytes={}-", offset));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Remote(format!(
                "Media fetch returned {} for {}",
                response.status(),
                encoding.url
            )));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));
        Ok(Box::pin(stream))
    }
}
