//! Streaming body implementations for both halves of the exchange.
//!
//! Two channel-backed body types with opposite roles:
//!
//! - [`ReqBody`] / [`ReqBodySender`]: the server side. The consumer implements
//!   `http_body::Body` for the request handler while the sender, driven by the
//!   connection, feeds it from the wire. Trailer fields arrive as a trailers
//!   frame only after the final data frame.
//! - [`channel`] → ([`BodyWriter`], [`ChannelBody`]): the client side. An
//!   in-memory pipe that decouples payload generation from HTTP transmission
//!   timing; [`produce`] is the demonstration's body producer task.
//!
//! Both follow single-writer/single-reader discipline, communicate only
//! through their channels, and propagate errors through the stream so a
//! truncated body is distinguishable from a finished one.

mod channel_body;
mod req_body;

pub use channel_body::BodyWriter;
pub use channel_body::ChannelBody;
pub use channel_body::channel;
pub use channel_body::produce;
pub use req_body::ReqBody;
pub use req_body::ReqBodySender;
