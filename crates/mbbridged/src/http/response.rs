//! JSON envelope responses.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONNECTION, CONTENT_TYPE, HeaderValue};
use hyper::{Response, StatusCode};
use mbbridge_protocol::HttpEnvelope;

use super::RequestError;

const SERIALISE_FALLBACK: &str = r#"{"ok":0,"err":"Internal error"}"#;

/// Response type produced by the bridge routes.
pub(crate) type BridgeResponse = Response<Full<Bytes>>;

/// Serialises `envelope` as the body of a `status` response.
pub(crate) fn json_response(status: StatusCode, envelope: &HttpEnvelope) -> BridgeResponse {
    let (status, body) = match envelope.to_json() {
        Ok(body) => (status, body),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            SERIALISE_FALLBACK.to_owned(),
        ),
    };
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    response
}

/// Envelope response for a recovered request failure.
pub(crate) fn error_response(error: &RequestError) -> BridgeResponse {
    json_response(error.status(), &HttpEnvelope::error(error.client_message()))
}
