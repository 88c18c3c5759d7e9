//! Streaming encoder for outbound HTTP requests (client direction).
//!
//! Mirrors the response encoder: the head goes out first with the explicitly
//! selected payload size, then payload items follow. For a chunked request
//! the final `Eof` item carries the trailer fields, which the chunked encoder
//! writes after the zero-sized chunk.

use crate::codec::body::PayloadEncoder;
use crate::codec::header::RequestHeadEncoder;
use crate::protocol::{Message, PayloadSize, RequestHead, SendError};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// An encoder for HTTP requests: the head first, then payload items encoded
/// with the framing mode the head selected.
pub struct RequestEncoder {
    head_encoder: RequestHeadEncoder,
    payload_encoder: Option<PayloadEncoder>,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for RequestEncoder {
    fn default() -> Self {
        Self { head_encoder: RequestHeadEncoder, payload_encoder: None }
    }
}

impl<D: Buf> Encoder<Message<(RequestHead, PayloadSize), D>> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(RequestHead, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive request head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                self.payload_encoder = Some(payload_size.into());
                self.head_encoder.encode((head, payload_size), dst)
            }

            Message::Payload(payload_item) => {
                let payload_encoder = match &mut self.payload_encoder {
                    Some(encoder) => encoder,
                    // a length-framed payload finishes with its last data
                    // chunk; the trailing end-of-payload marker is a no-op
                    None if payload_item.is_eof() => return Ok(()),
                    None => {
                        error!("expect request head but receive payload item");
                        return Err(io::Error::from(ErrorKind::InvalidInput).into());
                    }
                };

                let result = payload_encoder.encode(payload_item, dst);

                if payload_encoder.is_finish() {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PayloadItem;
    use bytes::Bytes;
    use http::{HeaderValue, Method, Request, header};

    #[test]
    fn full_chunked_request_wire_format() {
        let mut head = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::HOST, "127.0.0.1:8080")
            .body(())
            .unwrap();
        head.headers_mut().insert(header::TRAILER, HeaderValue::from_static("x-body-byte-length"));

        let mut trailers = http::HeaderMap::new();
        trailers.insert("x-body-byte-length", HeaderValue::from_static("5"));

        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header((head, PayloadSize::new_chunked())), &mut dst).unwrap();
        encoder.encode(Message::<_, Bytes>::Payload(PayloadItem::Chunk(Bytes::from_static(b"abcde"))), &mut dst).unwrap();
        encoder.encode(Message::<_, Bytes>::Payload(PayloadItem::Eof(Some(trailers))), &mut dst).unwrap();

        let text = std::str::from_utf8(&dst).unwrap();
        assert!(text.starts_with("POST / HTTP/1.1\r\n"));
        assert!(text.contains("transfer-encoding: chunked\r\n"));
        assert!(text.ends_with("\r\n\r\n5\r\nabcde\r\n0\r\nx-body-byte-length: 5\r\n\r\n"));
    }

    #[test]
    fn length_framed_request_tolerates_trailing_eof() {
        let head = Request::builder().method(Method::POST).uri("/upload").body(()).unwrap();

        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header((head, PayloadSize::new_length(5))), &mut dst).unwrap();
        encoder.encode(Message::<_, Bytes>::Payload(PayloadItem::Chunk(Bytes::from_static(b"abcde"))), &mut dst).unwrap();
        encoder.encode(Message::<_, Bytes>::Payload(PayloadItem::Eof(None)), &mut dst).unwrap();

        let text = std::str::from_utf8(&dst).unwrap();
        assert!(text.contains("content-length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nabcde"));
    }

    #[test]
    fn payload_before_head_is_rejected() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();

        let result = encoder.encode(Message::<(RequestHead, PayloadSize), Bytes>::Payload(PayloadItem::Chunk(Bytes::from_static(b"abc"))), &mut dst);
        assert!(result.is_err());
    }
}
