//! Response head decoder for the client direction.
//!
//! Parses the status line and header fields with `httparse` and derives the
//! response body framing mode. The demonstration server always answers with a
//! Content-Length body; chunked responses are still decoded for completeness,
//! and a head with neither framing header is treated as bodyless.

use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue, Response, StatusCode};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::codec::header::{MAX_HEADER_BYTES, MAX_HEADER_NUM};
use crate::protocol::{ParseError, PayloadSize, ResponseHead};

/// Decoder for HTTP/1.1 response heads.
pub struct ResponseHeadDecoder;

impl Decoder for ResponseHeadDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // fast path: shortest status line is longer than this
        if src.len() < 14 {
            return Ok(None);
        }

        let (head, body_offset) = {
            let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
            let mut resp = httparse::Response::new(&mut headers);

            let parsed_result = resp.parse(src).map_err(|e| match e {
                Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
                e => ParseError::invalid_header(e.to_string()),
            });

            match parsed_result? {
                Status::Complete(body_offset) => {
                    trace!(head_size = body_offset, "parsed response head");
                    ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

                    let version = match resp.version {
                        Some(0) => http::Version::HTTP_10,
                        Some(1) => http::Version::HTTP_11,
                        _ => return Err(ParseError::InvalidVersion(resp.version)),
                    };

                    let status = StatusCode::from_u16(resp.code.ok_or(ParseError::InvalidStatus)?)
                        .map_err(|_| ParseError::InvalidStatus)?;

                    let mut builder = Response::builder().status(status).version(version);

                    let headers = builder.headers_mut().ok_or(ParseError::InvalidStatus)?;
                    headers.reserve(resp.headers.len());
                    for header in resp.headers.iter() {
                        let name = HeaderName::from_bytes(header.name.as_bytes())
                            .map_err(|e| ParseError::invalid_header(e.to_string()))?;
                        let value = HeaderValue::from_bytes(header.value)
                            .map_err(|e| ParseError::invalid_header(e.to_string()))?;
                        headers.append(name, value);
                    }

                    let head = builder.body(()).map_err(|e| ParseError::invalid_header(e.to_string()))?;
                    (head, body_offset)
                }
                Status::Partial => {
                    ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                    return Ok(None);
                }
            }
        };

        src.advance(body_offset);

        let payload_size = parse_payload(&head)?;
        Ok(Some((head, payload_size)))
    }
}

/// Determines the response body framing mode from its headers.
fn parse_payload(head: &ResponseHead) -> Result<PayloadSize, ParseError> {
    let te_header = head.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = head.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::new_empty()),

        (Some(te_value), None) => {
            let is_chunked = te_value
                .as_bytes()
                .rsplit(|b| *b == b',')
                .next()
                .map(|bytes| bytes.trim_ascii() == b"chunked")
                .unwrap_or(false);
            if is_chunked { Ok(PayloadSize::new_chunked()) } else { Ok(PayloadSize::new_empty()) }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

            let length =
                cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            Ok(PayloadSize::new_length(length))
        }

        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers")),
    }
}
