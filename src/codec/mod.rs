//! Streaming HTTP/1.1 codecs built on [`tokio_util::codec`].
//!
//! Each direction pairs a head codec with a payload codec: the head is parsed
//! or written first, and the payload size it declares selects how the
//! following payload items are framed (fixed length, chunked, or empty).

mod body;
mod header;
mod request_decoder;
mod request_encoder;
mod response_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
pub use response_encoder::ResponseEncoder;
