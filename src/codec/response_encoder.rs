//! Streaming encoder for outbound HTTP responses (server direction).

use crate::codec::body::PayloadEncoder;
use crate::codec::header::ResponseHeadEncoder;
use crate::protocol::{Message, PayloadSize, ResponseHead, SendError};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// An encoder for HTTP responses: the head first, then payload items encoded
/// with the framing mode the head selected.
pub struct ResponseEncoder {
    head_encoder: ResponseHeadEncoder,
    payload_encoder: Option<PayloadEncoder>,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self { head_encoder: ResponseHeadEncoder, payload_encoder: None }
    }
}

impl<D: Buf> Encoder<Message<(ResponseHead, PayloadSize), D>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(ResponseHead, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive response head");
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
                        error!("expect response head but receive payload item");
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
    use http::{Response, StatusCode};

    #[test]
    fn length_framed_response_tolerates_trailing_eof() {
        let head = Response::builder().status(StatusCode::OK).body(()).unwrap();

        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(Message::<_, Bytes>::Header((head, PayloadSize::new_length(5))), &mut dst).unwrap();
        encoder.encode(Message::<_, Bytes>::Payload(PayloadItem::Chunk(Bytes::from_static(b"abcde"))), &mut dst).unwrap();
        // payload finished with the last data chunk; the end-of-payload
        // marker that follows must be a no-op, not an error
        encoder.encode(Message::<_, Bytes>::Payload(PayloadItem::Eof(None)), &mut dst).unwrap();

        let text = std::str::from_utf8(&dst).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("content-length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nabcde"));
    }

    #[test]
    fn payload_before_head_is_rejected() {
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();

        let result = encoder.encode(Message::<(ResponseHead, PayloadSize), Bytes>::Payload(PayloadItem::Chunk(Bytes::from_static(b"abc"))), &mut dst);
        assert!(result.is_err());
    }
}
