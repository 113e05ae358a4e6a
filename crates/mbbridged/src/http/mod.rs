//! HTTP request boundary for the loopback bridge.
//!
//! Connection framing is left to `hyper`. This module adds what the bridge
//! layers on top: the failure table, the bounded `/cmd` body read and the
//! JSON envelope responses.

mod body;
mod errors;
mod response;

pub use self::errors::RequestError;
pub(crate) use self::body::{MAX_BODY_BYTES, read_body};
pub(crate) use self::response::{BridgeResponse, error_response, json_response};
