//! Payload codecs for the two body framing modes.
//!
//! - [`ChunkedDecoder`] / [`ChunkedEncoder`]: chunked transfer encoding, the
//!   only framing that can carry trailer fields; the decoder captures the
//!   trailer section after the final chunk, the encoder emits one.
//! - [`LengthDecoder`] / [`LengthEncoder`]: Content-Length framing.
//! - [`PayloadDecoder`] / [`PayloadEncoder`]: dispatch over the two modes plus
//!   the no-body case, driven by [`crate::protocol::PayloadSize`].

mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
