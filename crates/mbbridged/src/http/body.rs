//! Bounded collection of the `/cmd` body.

use std::error::Error as StdError;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Body;
use hyper::header::{CONTENT_LENGTH, HeaderMap};

use super::RequestError;

/// Largest accepted `/cmd` body.
pub(crate) const MAX_BODY_BYTES: usize = 64 * 1024;

/// Length announced by `Content-Length`; unparsable values count as absent.
fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Collects the body announced by `headers`, waiting at most `timeout`.
///
/// Only a `Content-Length` delimited body is read. A missing or zero length
/// is an empty body and a length above [`MAX_BODY_BYTES`] is refused before
/// anything is read.
pub(crate) async fn read_body<B>(
    headers: &HeaderMap,
    body: B,
    timeout: Duration,
) -> Result<Bytes, RequestError>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let length = match declared_length(headers) {
        None | Some(0) => return Err(RequestError::EmptyBody),
        Some(length) => length,
    };
    if length > MAX_BODY_BYTES {
        return Err(RequestError::BodyTooLarge {
            length,
            limit: MAX_BODY_BYTES,
        });
    }
    let collected = tokio::time::timeout(timeout, Limited::new(body, MAX_BODY_BYTES).collect())
        .await
        .map_err(|_| RequestError::body_read("timed out waiting for the body"))?
        .map_err(|source| RequestError::body_read(source.to_string()))?;
    Ok(collected.to_bytes())
}
