//! Core protocol abstractions shared by the client and server halves.
//!
//! # Architecture
//!
//! - **Message framing** ([`message`]): [`Message`] carries either a head or a
//!   payload item through the wire codecs; [`PayloadItem`] carries data chunks
//!   and the end-of-payload marker, which owns the trailer section when one
//!   was transmitted; [`PayloadSize`] is the explicit body framing mode.
//! - **Heads** ([`request`], [`response`]): [`RequestHeader`] wraps a decoded
//!   request head, [`RequestHead`]/[`ResponseHead`] are the bodyless
//!   `http` types moved through the encoders.
//! - **Bodies** ([`body`]): channel-backed streaming bodies for both sides.
//!   The server-side [`body::ReqBody`] surfaces trailer fields as an
//!   `http_body::Frame` only after every data frame has been delivered, which
//!   is the ordering the whole demonstration depends on.
//! - **Errors** ([`error`]): [`ParseError`] for the decode path, [`SendError`]
//!   for the encode path, [`HttpError`] on top.

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHead;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
