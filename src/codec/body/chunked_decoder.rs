//! Decoder for HTTP chunked transfer encoding, including the trailer section.
//!
//! Chunked framing per [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112.html#name-chunked-transfer-coding):
//! each chunk carries its size in hex before its data, and a zero-sized chunk
//! ends the message. Between the zero-sized chunk and the final CRLF the
//! sender may place trailer fields. Unlike decoders that skip that section,
//! this one captures it: the decoded fields ride on the end-of-payload item so
//! a consumer can inspect them once the body is drained, and not earlier.

use crate::protocol::{ParseError, PayloadItem};
use ChunkedState::*;
use bytes::{Buf, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};
use httparse::Status;
use std::io;
use std::io::ErrorKind;
use std::task::Poll;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Maximum number of trailer fields accepted after the final chunk
const MAX_TRAILER_FIELDS: usize = 16;

/// Maximum size in bytes allowed for the whole trailer section
const MAX_TRAILER_BYTES: usize = 8 * 1024;

/// A decoder for chunked transfer encoded payloads.
///
/// Yields `PayloadItem::Chunk` for each run of chunk data and a final
/// `PayloadItem::Eof` carrying the parsed trailer fields, if the terminator
/// contained any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
    trailer_section: BytesMut,
}

impl ChunkedDecoder {
    /// Creates a decoder positioned at the size line of the first chunk.
    pub fn new() -> Self {
        Self { state: Size, remaining_size: 0, trailer_section: BytesMut::new() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size in hex
    Size,
    /// Handle whitespace after size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// Read LF after chunk size
    SizeLf,
    /// Read chunk data
    Body,
    /// Read CR after chunk data
    BodyCr,
    /// Read LF after chunk data
    BodyLf,
    /// Accumulate a trailer field line
    Trailer,
    /// Read LF after a trailer field line
    TrailerLf,
    /// Read final CR
    EndCr,
    /// Read final LF
    EndLf,
    /// Final state after reading last chunk
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Decodes chunked transfer encoded data from the input buffer.
    ///
    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when chunk data is decoded
    /// - `Ok(Some(PayloadItem::Eof(trailers)))` when the terminator is reached
    /// - `Ok(None)` when more data is needed
    /// - `Err(ParseError)` if the chunked encoding or trailer section is invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!(trailer_bytes = self.trailer_section.len(), "finished reading chunked data");
                let trailers = if self.trailer_section.is_empty() {
                    None
                } else {
                    Some(parse_trailer_section(&self.trailer_section)?)
                };
                return Ok(Some(PayloadItem::Eof(trailers)));
            }

            if src.is_empty() {
                // need more data
                return Ok(None);
            }

            let mut buf = None;

            self.state = match self.state.step(src, &mut self.remaining_size, &mut buf, &mut self.trailer_section) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(new_state)) => new_state,
                Poll::Ready(Err(e)) => return Err(ParseError::io(e)),
            };

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }
}

/// Parses the accumulated trailer section into a header map.
///
/// The section holds zero or more `name: value\r\n` lines without the blank
/// line terminator, which is appended here so `httparse` sees a complete
/// field block.
fn parse_trailer_section(section: &[u8]) -> Result<HeaderMap, ParseError> {
    let mut buf = BytesMut::with_capacity(section.len() + 2);
    buf.extend_from_slice(section);
    buf.extend_from_slice(b"\r\n");

    let mut parsed = [httparse::EMPTY_HEADER; MAX_TRAILER_FIELDS];
    match httparse::parse_headers(&buf, &mut parsed) {
        Ok(Status::Complete((_, fields))) => {
            let mut trailers = HeaderMap::with_capacity(fields.len());
            for field in fields {
                let name = HeaderName::from_bytes(field.name.as_bytes())
                    .map_err(|_| ParseError::invalid_trailer(format!("invalid trailer field name {:?}", field.name)))?;
                let value = HeaderValue::from_bytes(field.value)
                    .map_err(|_| ParseError::invalid_trailer(format!("invalid value for trailer field {}", name)))?;
                trailers.append(name, value);
            }
            Ok(trailers)
        }
        Ok(Status::Partial) => Err(ParseError::invalid_trailer("truncated trailer section")),
        Err(e) => Err(ParseError::invalid_trailer(e.to_string())),
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.len() > 0 {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

impl ChunkedState {
    /// Processes the next step in the chunked decoding state machine.
    fn step(
        &self,
        src: &mut BytesMut,
        remaining_size: &mut u64,
        buf: &mut Option<Bytes>,
        trailer_section: &mut BytesMut,
    ) -> Poll<Result<ChunkedState, io::Error>> {
        match self {
            Size => ChunkedState::read_size(src, remaining_size),
            SizeLws => ChunkedState::read_size_lws(src),
            Extension => ChunkedState::read_extension(src),
            SizeLf => ChunkedState::read_size_lf(src, remaining_size),
            Body => ChunkedState::read_body(src, remaining_size, buf),
            BodyCr => ChunkedState::read_body_cr(src),
            BodyLf => ChunkedState::read_body_lf(src),
            Trailer => ChunkedState::read_trailer(src, trailer_section),
            TrailerLf => ChunkedState::read_trailer_lf(src, trailer_section),
            EndCr => ChunkedState::read_end_cr(src, trailer_section),
            EndLf => ChunkedState::read_end_lf(src),
            End => Poll::Ready(Ok(End)),
        }
    }

    /// Reads the chunk size hex digit by hex digit until a delimiter.
    fn read_size(src: &mut BytesMut, size_per_chunk: &mut u64) -> Poll<Result<ChunkedState, io::Error>> {
        macro_rules! or_overflow {
            ($e:expr) => {
                match $e {
                    Some(val) => val,
                    None => {
                        return Poll::Ready(Err(io::Error::new(
                            ErrorKind::InvalidInput,
                            "invalid overflow chunked length",
                        )));
                    }
                }
            };
        }

        let radix = 16;
        match try_next_byte!(src) {
            b @ b'0'..=b'9' => {
                *size_per_chunk = or_overflow!(size_per_chunk.checked_mul(radix));
                *size_per_chunk = or_overflow!(size_per_chunk.checked_add((b - b'0') as u64));
            }

            b @ b'a'..=b'f' => {
                *size_per_chunk = or_overflow!(size_per_chunk.checked_mul(radix));
                *size_per_chunk = or_overflow!(size_per_chunk.checked_add((b + 10 - b'a') as u64));
            }
            b @ b'A'..=b'F' => {
                *size_per_chunk = or_overflow!(size_per_chunk.checked_mul(radix));
                *size_per_chunk = or_overflow!(size_per_chunk.checked_add((b + 10 - b'A') as u64));
            }
            b'\t' | b' ' => return Poll::Ready(Ok(SizeLws)),
            b';' => return Poll::Ready(Ok(Extension)),
            b'\r' => return Poll::Ready(Ok(SizeLf)),

            _ => {
                return Poll::Ready(Err(io::Error::new(
                    ErrorKind::InvalidInput,
                    "invalid chunk size line: Invalid Size",
                )));
            }
        }

        Poll::Ready(Ok(Size))
    }

    /// Linear whitespace after the chunk size: only tab and space, then an
    /// extension or the end of the size line.
    fn read_size_lws(src: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            // LWS can follow the chunk size, but no more digits can come
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            _ => Poll::Ready(Err(io::Error::new(ErrorKind::InvalidInput, "invalid chunk size linear white space"))),
        }
    }

    /// Chunk extensions are ignored; they end at the next CRLF. A bare LF
    /// inside an extension is rejected.
    fn read_extension(src: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => {
                Poll::Ready(Err(io::Error::new(ErrorKind::InvalidInput, "invalid chunk extension contains newline")))
            }
            _ => Poll::Ready(Ok(Extension)), // no supported extensions
        }
    }

    /// LF completing the size line. Size zero means the final chunk: what
    /// follows is either the bare terminator or a trailer section.
    fn read_size_lf(src: &mut BytesMut, size_per_chunk: &mut u64) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            b'\n' => {
                if *size_per_chunk == 0 {
                    Poll::Ready(Ok(EndCr))
                } else {
                    Poll::Ready(Ok(Body))
                }
            }

            _ => Poll::Ready(Err(io::Error::new(ErrorKind::InvalidInput, "invalid chunk size LF"))),
        }
    }

    /// Reads up to `size_per_chunk` bytes of chunk data from the buffer.
    fn read_body(
        src: &mut BytesMut,
        size_per_chunk: &mut u64,
        buf: &mut Option<Bytes>,
    ) -> Poll<Result<ChunkedState, io::Error>> {
        if src.is_empty() {
            return Poll::Ready(Ok(Body));
        }

        if *size_per_chunk == 0 {
            return Poll::Ready(Ok(BodyCr));
        }

        // cap remaining bytes at the max capacity of usize
        let remaining = match *size_per_chunk {
            r if r > usize::MAX as u64 => usize::MAX,
            r => r as usize,
        };

        let read_size = std::cmp::min(remaining, src.len());

        *size_per_chunk -= read_size as u64;
        let bytes = src.split_to(read_size).freeze();
        *buf = Some(bytes);

        if *size_per_chunk > 0 {
            Poll::Ready(Ok(Body))
        } else {
            Poll::Ready(Ok(BodyCr))
        }
    }

    /// CR terminating the chunk data.
    fn read_body_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(BodyLf)),
            _ => Poll::Ready(Err(io::Error::new(ErrorKind::InvalidInput, "invalid chunk body CR"))),
        }
    }

    /// LF terminating the chunk data; back to the next size line.
    fn read_body_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(Size)),
            _ => Poll::Ready(Err(io::Error::new(ErrorKind::InvalidInput, "invalid chunk body LF"))),
        }
    }

    /// Accumulates one trailer field line into the trailer section buffer.
    fn read_trailer(src: &mut BytesMut, trailer_section: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        if trailer_section.len() >= MAX_TRAILER_BYTES {
            return Poll::Ready(Err(io::Error::new(ErrorKind::InvalidInput, "trailer section too large")));
        }
        let byte = try_next_byte!(src);
        trailer_section.extend_from_slice(&[byte]);
        match byte {
            b'\r' => Poll::Ready(Ok(TrailerLf)),
            _ => Poll::Ready(Ok(Trailer)),
        }
    }

    /// LF terminating a trailer field line.
    fn read_trailer_lf(src: &mut BytesMut, trailer_section: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            b'\n' => {
                trailer_section.extend_from_slice(b"\n");
                Poll::Ready(Ok(EndCr))
            }
            _ => Poll::Ready(Err(io::Error::new(ErrorKind::InvalidInput, "invalid trailer end LF"))),
        }
    }

    /// After the final chunk (or a trailer line): CR begins the closing CRLF,
    /// anything else starts another trailer field line.
    fn read_end_cr(src: &mut BytesMut, trailer_section: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(EndLf)),
            byte => {
                trailer_section.extend_from_slice(&[byte]);
                Poll::Ready(Ok(Trailer))
            }
        }
    }

    /// LF completing the chunked message.
    fn read_end_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(End)),
            _ => Poll::Ready(Err(io::Error::new(ErrorKind::InvalidInput, "invalid chunk end LF"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let mut buffer: BytesMut = BytesMut::from(&b"10\r\n1234567890abcdef\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        {
            let item = decoder.decode(&mut buffer).unwrap().unwrap();
            assert!(item.is_chunk());
            assert_eq!(item.as_bytes().unwrap().len(), 16);

            let str = std::str::from_utf8(&item.as_bytes().unwrap()[..]).unwrap();
            assert_eq!(str, "1234567890abcdef");
        }

        {
            let item = decoder.decode(&mut buffer).unwrap().unwrap();
            assert!(item.is_eof());
            assert!(item.trailers().is_none());
        }
    }

    #[test]
    fn test_multiple_chunks() {
        let mut buffer: BytesMut = BytesMut::from(&b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::copy_from_slice(b"hello"));

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::copy_from_slice(b", world"));

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
    }

    #[test]
    fn test_chunks_with_extensions() {
        let mut buffer: BytesMut = BytesMut::from(&b"5;chunk-ext=value\r\nhello\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::copy_from_slice(b"hello"));

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
    }

    #[test]
    fn test_trailer_fields_are_captured() {
        let mut buffer: BytesMut =
            BytesMut::from(&b"5\r\nhello\r\n0\r\nX-Body-Byte-Length: 5\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::copy_from_slice(b"hello"));

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());

        let trailers = eof.trailers().expect("trailer section present");
        assert_eq!(trailers.len(), 1);
        assert_eq!(trailers.get("x-body-byte-length").unwrap(), "5");
    }

    #[test]
    fn test_multiple_trailer_fields() {
        let mut buffer: BytesMut =
            BytesMut::from(&b"3\r\nabc\r\n0\r\nX-Body-Byte-Length: 3\r\nX-Extra: yes\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::copy_from_slice(b"abc"));

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        let trailers = eof.trailers().expect("trailer section present");
        assert_eq!(trailers.len(), 2);
        assert_eq!(trailers.get("x-body-byte-length").unwrap(), "3");
        assert_eq!(trailers.get("x-extra").unwrap(), "yes");
    }

    #[test]
    fn test_no_trailers_before_body_complete() {
        // only the data chunk has arrived; the decoder must not expose any
        // trailer container until the terminator is fully read
        let mut buffer: BytesMut = BytesMut::from(&b"5\r\nhello\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(chunk.is_chunk());
        assert!(chunk.trailers().is_none());

        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"0\r\nX-Body-Byte-Length: 5\r\n\r\n");
        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.trailers().is_some());
    }

    #[test]
    fn test_incomplete_chunk() {
        let mut buffer: BytesMut = BytesMut::from(&b"5\r\nhel"[..]);
        let mut decoder = ChunkedDecoder::new();

        // partial chunk data is surfaced as soon as it arrives
        let chunk = decoder.decode(&mut buffer).unwrap();
        assert!(chunk.is_some());
        assert_eq!(chunk.unwrap().as_bytes().unwrap(), &Bytes::copy_from_slice(b"hel"));

        buffer.extend_from_slice(b"lo\r\n0\r\n\r\n");

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::copy_from_slice(b"lo"));

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
    }

    #[test]
    fn test_invalid_chunk_size() {
        let mut buffer: BytesMut = BytesMut::from(&b"xyz\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let result = decoder.decode(&mut buffer);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_trailer_section() {
        let mut buffer: BytesMut = BytesMut::from(&b"0\r\nbad trailer line\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let result = decoder.decode(&mut buffer);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_crlf() {
        let mut buffer: BytesMut = BytesMut::from(&b"5\r\nhelloBad"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::copy_from_slice(b"hello"));

        let result = decoder.decode(&mut buffer);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_size_chunk() {
        let mut buffer: BytesMut = BytesMut::from(&b"0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
        assert!(eof.trailers().is_none());
    }
}
