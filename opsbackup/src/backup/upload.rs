//! Multipart upload encodings

use std::collections::BTreeMap;

use reqwest::{multipart, Body, Response};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::authn::negotiator::Credentials;
use crate::errors::ClientError;
use crate::http::client::{HttpTransport, OCTET_STREAM};

/// Largest archive the sized strategy will hold in memory when the caller
/// cannot say how big the upload is
pub const DEFAULT_MAX_BUFFER_BYTES: u64 = 4 * 1024 * 1024 * 1024;

/// Where an upload goes and who sends it
#[derive(Debug, Clone, Copy)]
pub struct ConnAuth<'a> {
    pub url: &'a str,
    pub credentials: &'a Credentials,
}

/// How the asset archive is encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// Chunked multipart body of any length, for appliances storing assets
    /// on local disk
    Streamed,

    /// Multipart body with a declared length, for appliances backed by
    /// object storage. An unknown size is learned by buffering at most
    /// `max_buffer_bytes`.
    Sized { max_buffer_bytes: u64 },
}

impl UploadStrategy {
    /// Pick the encoding for the storage backend
    pub fn for_backend(is_s3: bool) -> Self {
        if is_s3 {
            UploadStrategy::Sized {
                max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            }
        } else {
            UploadStrategy::Streamed
        }
    }

    /// Encode `reader` as the multipart field `field_name` next to the text
    /// fields in `params` and POST it. `file_size` of `None` means unknown.
    #[allow(clippy::too_many_arguments)]
    pub async fn upload<R>(
        &self,
        transport: &HttpTransport,
        conn: ConnAuth<'_>,
        field_name: &str,
        filename: &str,
        file_size: Option<u64>,
        reader: R,
        params: &BTreeMap<String, String>,
    ) -> Result<Response, ClientError>
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        let part = match *self {
            UploadStrategy::Streamed => {
                debug!("Streaming {} to {}", filename, conn.url);
                multipart::Part::stream(Body::wrap_stream(ReaderStream::new(reader)))
            }
            UploadStrategy::Sized { max_buffer_bytes } => match file_size {
                Some(length) => {
                    debug!("Streaming {} ({} bytes) to {}", filename, length, conn.url);
                    multipart::Part::stream_with_length(
                        Body::wrap_stream(ReaderStream::new(reader)),
                        length,
                    )
                }
                None => {
                    let buffer = read_bounded(reader, max_buffer_bytes).await?;
                    debug!("Buffered {} ({} bytes) for {}", filename, buffer.len(), conn.url);
                    multipart::Part::bytes(buffer)
                }
            },
        };

        let part = part
            .file_name(filename.to_string())
            .mime_str(OCTET_STREAM)
            .map_err(|source| ClientError::Upload {
                url: conn.url.to_string(),
                source,
            })?;

        // Rails expects bracketed field names untouched
        let mut form = multipart::Form::new().percent_encode_noop();
        for (name, value) in params {
            form = form.text(name.clone(), value.clone());
        }
        let form = form.part(field_name.to_string(), part);

        transport
            .post_multipart(conn.url, form, conn.credentials.basic())
            .await
    }
}

async fn read_bounded<R>(reader: R, limit: u64) -> Result<Vec<u8>, ClientError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut buffer).await?;
    if buffer.len() as u64 > limit {
        return Err(ClientError::UploadTooLarge { limit });
    }
    Ok(buffer)
}
