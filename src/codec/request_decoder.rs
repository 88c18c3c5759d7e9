//! Streaming decoder for inbound HTTP requests (server direction).
//!
//! Two-phase state machine: the head is parsed first, then the payload is
//! decoded with the framing mode the head selected. The payload phase ends
//! with an `Eof` item that owns the trailer section when the chunked
//! terminator carried one.

use crate::codec::body::PayloadDecoder;
use crate::codec::header::RequestHeadDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A decoder for HTTP requests that handles both the head and the payload.
///
/// # State machine
///
/// - `payload_decoder == None`: parsing the head
/// - `payload_decoder == Some(_)`: decoding the payload
pub struct RequestDecoder {
    head_decoder: RequestHeadDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { head_decoder: RequestHeadDecoder, payload_decoder: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // decode payload if a payload decoder is active
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof(_)) => {
                    // this request's payload is finished; back to head parsing
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        // decode the request head
        let message = match self.head_decoder.decode(src)? {
            Some((header, payload_size)) => {
                self.payload_decoder = Some(payload_size.into());
                Some(Message::Header((header, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }
}
