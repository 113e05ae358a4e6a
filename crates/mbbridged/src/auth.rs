//! Shared-secret verification for `/cmd`.

use hyper::header::HeaderMap;

/// Header carrying the client's token. Header names match in any casing.
pub const TOKEN_HEADER: &str = "X-MBBridge-Token";

/// Returns whether a request carrying `headers` may issue commands.
///
/// An unset or blank `configured` token disables authentication. Otherwise
/// the header must be present and equal to the configured token; an absent
/// header is treated the same as a wrong one.
#[must_use]
pub fn verify(headers: &HeaderMap, configured: Option<&str>) -> bool {
    let Some(expected) = configured.filter(|token| !token.is_empty()) else {
        return true;
    };
    headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|supplied| tokens_match(supplied, expected))
}

fn tokens_match(supplied: &str, expected: &str) -> bool {
    supplied == expected
}
