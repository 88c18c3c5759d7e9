//! The `X-Body-Byte-Length` trailer contract.
//!
//! A client that streams a body of unknown size announces this trailer field
//! up front via the `Trailer` header, then appends the actual byte count to
//! the chunked terminator once the body has been fully written. The value is
//! the base-10 ASCII byte count of the body.

use http::header::{HeaderMap, HeaderName, HeaderValue, TRAILER};

use crate::protocol::ParseError;

/// Trailer field carrying the body byte count.
pub const BODY_BYTE_LENGTH: HeaderName = HeaderName::from_static("x-body-byte-length");

/// Announces the [`BODY_BYTE_LENGTH`] trailer field in the request headers.
pub fn announce(headers: &mut HeaderMap) {
    headers.insert(TRAILER, HeaderValue::from_name(BODY_BYTE_LENGTH));
}

/// Returns the trailer field names announced by the `Trailer` header.
pub fn announced_names(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(TRAILER)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Builds the trailer section declaring `len` as the body byte count.
pub fn length_trailers(len: u64) -> HeaderMap {
    let mut trailers = HeaderMap::new();
    trailers.insert(BODY_BYTE_LENGTH, HeaderValue::from(len));
    trailers
}

/// Parses a [`BODY_BYTE_LENGTH`] trailer value as a base-10 byte count.
pub fn parse_length(value: &HeaderValue) -> Result<u64, ParseError> {
    let text = value.to_str().map_err(|_e| ParseError::invalid_trailer("trailer value is not visible ASCII"))?;
    text.parse::<u64>().map_err(|e| ParseError::invalid_trailer(format!("trailer value {:?} is not a base-10 length: {}", text, e)))
}
