use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use std::io::Write;

use tokio_util::codec::Encoder;

/// Encoder for chunked transfer encoded payloads.
///
/// Each data chunk is framed with its hex size; the end-of-payload item emits
/// the zero-sized chunk, the trailer fields carried on it, and the closing
/// CRLF. Empty data chunks are skipped: a zero size line is the terminator
/// and must never be produced for an empty write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(bytes) => {
                if !bytes.has_remaining() {
                    return Ok(());
                }
                write!(helper::Writer(dst), "{:X}\r\n", bytes.remaining())?;
                dst.reserve(bytes.remaining() + 2);
                dst.extend_from_slice(bytes.chunk());
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
            PayloadItem::Eof(trailers) => {
                self.eof = true;
                dst.extend_from_slice(b"0\r\n");
                if let Some(map) = trailers {
                    for (name, value) in map.iter() {
                        dst.extend_from_slice(name.as_str().as_bytes());
                        dst.extend_from_slice(b": ");
                        dst.extend_from_slice(value.as_bytes());
                        dst.extend_from_slice(b"\r\n");
                    }
                }
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
        }
    }
}

mod helper {
    use bytes::{BufMut, BytesMut};
    use std::io;

    pub struct Writer<'a>(pub &'a mut BytesMut);

    impl io::Write for Writer<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, HeaderValue};

    #[test]
    fn encodes_chunk_with_hex_size_line() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hello, world....")), &mut dst).unwrap();
        assert_eq!(&dst[..], b"10\r\nhello, world....\r\n");
        assert!(!encoder.is_finish());
    }

    #[test]
    fn empty_chunk_is_not_a_terminator() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::new()), &mut dst).unwrap();
        assert!(dst.is_empty());
        assert!(!encoder.is_finish());
    }

    #[test]
    fn bare_terminator_without_trailers() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::<Bytes>::Eof(None), &mut dst).unwrap();
        assert_eq!(&dst[..], b"0\r\n\r\n");
        assert!(encoder.is_finish());
    }

    #[test]
    fn terminator_carries_trailer_fields() {
        let mut trailers = HeaderMap::new();
        trailers.insert("x-body-byte-length", HeaderValue::from_static("5"));

        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"abcde")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof(Some(trailers)), &mut dst).unwrap();

        assert_eq!(&dst[..], b"5\r\nabcde\r\n0\r\nx-body-byte-length: 5\r\n\r\n");
        assert!(encoder.is_finish());
    }

    #[test]
    fn nothing_encoded_after_terminator() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::<Bytes>::Eof(None), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"late")), &mut dst).unwrap();
        assert_eq!(&dst[..], b"0\r\n\r\n");
    }
}
