//! Streaming export of appliance resources

use futures::StreamExt;
use reqwest::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::authn::negotiator::AuthNegotiator;
use crate::errors::ClientError;
use crate::http::client::unexpected_status;

/// Placeholder in export URL formats replaced by the appliance base URL
pub const BASE_PLACEHOLDER: &str = "{base}";

/// Copies remote resources into caller-supplied sinks
pub struct StreamExporter<'a> {
    negotiator: AuthNegotiator<'a>,
    base_url: &'a str,
}

impl<'a> StreamExporter<'a> {
    pub fn new(negotiator: AuthNegotiator<'a>, base_url: &'a str) -> Self {
        Self {
            negotiator,
            base_url: base_url.trim_end_matches('/'),
        }
    }

    /// Resolve `url_format` against the base URL. Both
    /// `{base}/api/installation_settings` and `/api/installation_settings`
    /// are accepted.
    pub fn resolve(&self, url_format: &str) -> String {
        if url_format.contains(BASE_PLACEHOLDER) {
            url_format.replace(BASE_PLACEHOLDER, self.base_url)
        } else {
            format!("{}/{}", self.base_url, url_format.trim_start_matches('/'))
        }
    }

    /// Stream the resource at `url_format` into `sink` and return the number
    /// of bytes written. Nothing but a 200 counts as success.
    pub async fn export<W>(&self, url_format: &str, sink: &mut W) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let url = self.resolve(url_format);
        debug!("Exporting url '{}'", url);

        let response = self.negotiator.fetch(&url).await?;
        if response.status() != StatusCode::OK {
            return Err(unexpected_status(&url, response, StatusCode::OK).await);
        }

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        info!("Exported {} bytes from {}", written, url);
        Ok(written)
    }
}
