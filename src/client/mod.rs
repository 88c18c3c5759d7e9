//! Minimal HTTP/1.1 client for streaming requests with trailer fields.

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use http::{HeaderMap, Request, Response};
use http_body::Body;
use http_body_util::BodyExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{error, info};

use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHead, SendError};

/// A client-side HTTP connection.
///
/// Requests are sent with an explicitly chosen payload mode: a chunked
/// request streams the body frame by frame and appends any trailer frame the
/// body yields to the chunked terminator.
pub struct Client {
    framed_read: FramedRead<OwnedReadHalf, ResponseDecoder>,
    framed_write: FramedWrite<OwnedWriteHalf, RequestEncoder>,
}

impl Client {
    pub async fn connect(address: &str) -> Result<Self, HttpError> {
        let tcp_stream = TcpStream::connect(address).await?;
        let (reader, writer) = tcp_stream.into_split();

        info!(address = address, "connected");

        Ok(Self {
            framed_read: FramedRead::with_capacity(reader, ResponseDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, RequestEncoder::new()),
        })
    }

    /// Sends one request, streaming its body, and reads the full response.
    ///
    /// The body is consumed frame by frame as it becomes available, so a body
    /// backed by an in-memory pipe is transmitted while its producer is still
    /// writing. A trailer frame yielded by the body is held back and written
    /// with the end-of-payload marker, after every data frame is on the wire.
    pub async fn send<B>(&mut self, request: Request<B>, payload_size: PayloadSize) -> Result<Response<Bytes>, HttpError>
    where
        B: Body<Data = Bytes> + Unpin,
        B::Error: Display,
    {
        let (parts, mut body) = request.into_parts();
        let head = RequestHead::from_parts(parts, ());

        self.framed_write.send(Message::<_, Bytes>::Header((head, payload_size))).await.map_err(HttpError::from)?;

        let mut trailers: Option<HeaderMap> = None;
        loop {
            match body.frame().await {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(bytes) => {
                        self.framed_write.send(Message::Payload(PayloadItem::Chunk(bytes))).await.map_err(HttpError::from)?;
                    }
                    Err(frame) => match frame.into_trailers() {
                        Ok(map) => trailers = Some(map),
                        Err(_frame) => {
                            return Err(SendError::invalid_body("request body yielded an unsupported frame").into());
                        }
                    },
                },
                Some(Err(e)) => {
                    error!("request body failed: {}", e);
                    return Err(SendError::invalid_body(format!("request body failed: {e}")).into());
                }
                None => {
                    self.framed_write.send(Message::Payload(PayloadItem::<Bytes>::Eof(trailers))).await.map_err(HttpError::from)?;
                    break;
                }
            }
        }

        self.receive_response().await
    }

    async fn receive_response(&mut self) -> Result<Response<Bytes>, HttpError> {
        let head = match self.framed_read.next().await {
            Some(Ok(Message::Header((head, _payload_size)))) => head,
            Some(Ok(Message::Payload(_))) => {
                return Err(ParseError::invalid_body("expected response head, got payload").into());
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Err(ParseError::invalid_body("connection closed before response head").into()),
        };

        let mut body = BytesMut::new();
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => body.extend_from_slice(&bytes),
                Some(Ok(Message::Payload(PayloadItem::Eof(_trailers)))) => break,
                Some(Ok(Message::Header(_))) => {
                    return Err(ParseError::invalid_body("expected response payload, got head").into());
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ParseError::invalid_body("connection closed during response body").into()),
            }
        }

        let (parts, _) = head.into_parts();
        Ok(Response::from_parts(parts, body.freeze()))
    }
}
