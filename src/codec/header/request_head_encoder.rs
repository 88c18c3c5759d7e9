//! Request head encoder for the client direction.
//!
//! Serializes the request line and header fields, pinning the body framing
//! header to the payload size the caller selected. Streaming a body of
//! unknown size with trailer fields requires `PayloadSize::Chunked`, which
//! writes `Transfer-Encoding: chunked`; nothing here infers the mode from the
//! body source.

use crate::codec::header::fast_write::FastWrite;
use crate::protocol::{PayloadSize, RequestHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Version, header};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size reserved for head serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP/1.1 request heads.
pub struct RequestHeadEncoder;

impl Encoder<(RequestHead, PayloadSize)> for RequestHeadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (RequestHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        match head.version() {
            Version::HTTP_11 => {
                let path = head.uri().path_and_query().map(|p| p.as_str()).unwrap_or("/");
                write!(FastWrite(dst), "{} {} HTTP/1.1\r\n", head.method(), path)?;
            }
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        }

        // pin the body framing header to the selected payload size
        match payload_size {
            PayloadSize::Length(n) => match head.headers_mut().get_mut(header::CONTENT_LENGTH) {
                Some(value) => *value = n.into(),
                None => {
                    head.headers_mut().insert(header::CONTENT_LENGTH, n.into());
                }
            },
            PayloadSize::Chunked => match head.headers_mut().get_mut(header::TRANSFER_ENCODING) {
                Some(value) => *value = HeaderValue::from_static("chunked"),
                None => {
                    head.headers_mut().insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
                }
            },
            PayloadSize::Empty => {}
        }

        for (header_name, header_value) in head.headers().iter() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
