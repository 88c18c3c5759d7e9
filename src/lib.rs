//! An HTTP/1.1 trailer metadata exchange over chunked transfer encoding
//!
//! This crate demonstrates, end to end, how metadata that is only known once
//! a request body has been fully produced can still reach the server: the
//! client streams a body of unknown size with chunked transfer encoding,
//! announces the `X-Body-Byte-Length` trailer field up front, and appends the
//! actual byte count to the chunked terminator. The server drains the body,
//! only then reads the trailer section, and verifies the declared length
//! against the byte count it observed.
//!
//! # Features
//!
//! - HTTP/1.1 server and client built on tokio
//! - Streaming request and response bodies
//! - Chunked transfer encoding with trailer fields on both directions
//! - An in-memory body pipe so payload production and transmission overlap
//! - Declared-versus-observed body length verification
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use http::{Request, header};
//! use trailer_exchange::client::Client;
//! use trailer_exchange::handler::LengthTrailerHandler;
//! use trailer_exchange::protocol::PayloadSize;
//! use trailer_exchange::protocol::body::{channel, produce};
//! use trailer_exchange::server::Server;
//! use trailer_exchange::trailer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     tokio::spawn(server.run(Arc::new(LengthTrailerHandler::default())));
//!
//!     let payload = Bytes::from_static(b"abcde");
//!     let (writer, body) = channel();
//!     tokio::spawn(produce(writer, payload.clone(), trailer::length_trailers(payload.len() as u64)));
//!
//!     let mut request = Request::post("/").header(header::HOST, "127.0.0.1:8080").body(body)?;
//!     trailer::announce(request.headers_mut());
//!
//!     let mut client = Client::connect("127.0.0.1:8080").await?;
//!     let response = client.send(request, PayloadSize::new_chunked()).await?;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: Message types, payload framing modes, body channels
//! - [`codec`]: HTTP/1.1 encoding/decoding, including trailer sections
//! - [`connection`]: Server connection lifecycle
//! - [`server`]: TCP accept loop
//! - [`client`]: Streaming request client
//! - [`handler`]: Request handler trait plus the verifying handler
//! - [`trailer`]: The `X-Body-Byte-Length` trailer contract
//! - [`verify`]: Length verdicts and the report sink
//!
//! # Limitations
//!
//! - HTTP/1.1 only
//! - No TLS support
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64
//! - Maximum trailer section size: 8KB, at most 16 trailer fields

pub mod client;
pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod trailer;
pub mod verify;

mod utils;
pub(crate) use utils::ensure;
