//! Response head handling.
//!
//! Uses the standard `http::Response` type with an empty body placeholder for
//! both directions: the server encodes a `ResponseHead` before streaming the
//! response body, and the client decodes one before reading it.

use http::Response;

/// The head of an HTTP response, before the body is attached or read.
pub type ResponseHead = Response<()>;
