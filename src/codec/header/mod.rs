//! Head codecs for both directions of the exchange.
//!
//! - [`RequestHeadDecoder`] / [`ResponseHeadEncoder`]: the server direction,
//!   parsing inbound request heads and serializing outbound response heads.
//! - [`RequestHeadEncoder`] / [`ResponseHeadDecoder`]: the client direction,
//!   serializing outbound request heads and parsing inbound response heads.
//!
//! Decoding uses `httparse`; encoding writes the start line and the header
//! fields, pinning the body framing header (Content-Length or
//! Transfer-Encoding) to the explicitly selected payload size.

mod request_head_decoder;
mod request_head_encoder;
mod response_head_decoder;
mod response_head_encoder;

pub use request_head_decoder::RequestHeadDecoder;
pub use request_head_encoder::RequestHeadEncoder;
pub use response_head_decoder::ResponseHeadDecoder;
pub use response_head_encoder::ResponseHeadEncoder;

/// Maximum number of headers allowed in a message head
pub(crate) const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire head section
pub(crate) const MAX_HEADER_BYTES: usize = 8 * 1024;

pub(crate) mod fast_write {
    use bytes::{BufMut, BytesMut};
    use std::io;

    /// Writer over `BytesMut` that skips the io error paths; space is
    /// reserved by the callers up front.
    pub(crate) struct FastWrite<'a>(pub &'a mut BytesMut);

    impl io::Write for FastWrite<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
