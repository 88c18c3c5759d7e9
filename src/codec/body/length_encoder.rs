use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

/// Encoder for payloads whose size is fixed by the Content-Length header.
///
/// Trailer fields are only valid with chunked framing; an end-of-payload item
/// carrying them here is a caller bug and is dropped with a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    pub fn is_finish(&self) -> bool {
        self.length == 0
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.length == 0 {
            if item.is_chunk() {
                warn!("encode payload_item but no need to encode anymore");
            }
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(bytes) => {
                if !bytes.has_remaining() {
                    return Ok(());
                }
                dst.extend_from_slice(bytes.chunk());
                self.length -= bytes.remaining() as u64;
                Ok(())
            }
            PayloadItem::Eof(trailers) => {
                if trailers.is_some() {
                    warn!("trailer fields require chunked transfer encoding, dropping them");
                }
                Ok(())
            }
        }
    }
}
