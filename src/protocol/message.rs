use bytes::{Buf, Bytes};
use http::HeaderMap;

/// A frame travelling through the wire codecs: either a message head or a
/// piece of the payload.
///
/// `T` is the head type (request or response head paired with its payload
/// size), `Data` is the payload chunk type (defaults to `Bytes`).
#[derive(Debug)]
pub enum Message<T, Data: Buf = Bytes> {
    /// The head of the message
    Header(T),
    /// A payload chunk or the end-of-payload marker
    Payload(PayloadItem<Data>),
}

/// An item in the payload stream.
///
/// The end-of-payload marker carries the trailer section when the message was
/// sent with chunked transfer encoding and the peer appended trailer fields
/// after the final chunk. A message without trailers ends with `Eof(None)`.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// End of the payload stream, with the trailer fields if any were present
    Eof(Option<HeaderMap>),
}

/// Payload size of an HTTP message, which selects the body framing mode.
///
/// Callers pick the mode explicitly; in particular, trailer fields require
/// [`PayloadSize::Chunked`] and nothing in this crate auto-detects it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    pub fn new_length(length: u64) -> Self {
        PayloadSize::Length(length)
    }

    pub fn new_chunked() -> Self {
        PayloadSize::Chunked
    }

    pub fn new_empty() -> Self {
        PayloadSize::Empty
    }

    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl<T> Message<T> {
    /// Returns true if this message contains payload data
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Returns true if this message contains head information
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }
}

impl<D: Buf> PayloadItem<D> {
    /// Returns true if this item marks the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof(_))
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    /// Returns the trailer fields if this is an end-of-payload marker that
    /// carries them
    pub fn trailers(&self) -> Option<&HeaderMap> {
        match self {
            PayloadItem::Chunk(_) => None,
            PayloadItem::Eof(trailers) => trailers.as_ref(),
        }
    }
}

impl PayloadItem {
    /// Returns a reference to the contained bytes if this is a `Chunk`
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof(_) => None,
        }
    }

    /// Consumes the item and returns the contained bytes if this is a `Chunk`
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof(_) => None,
        }
    }
}
