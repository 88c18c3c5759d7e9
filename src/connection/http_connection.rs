use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;

use futures::{SinkExt, StreamExt};
use http::{Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::body::ReqBody;
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, ResponseHead, SendError};

use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{error, info};

/// A server-side HTTP connection.
///
/// `HttpConnection` owns both halves of the stream and drives the full
/// request lifecycle: decoding the request head, streaming the body (and its
/// trailer section) to the handler, and writing the handler's response back.
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    pub async fn process<H>(mut self, mut handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Header((header, _payload_size)))) => {
                    self.do_process(header, &mut handler).await?;
                }

                Some(Ok(Message::Payload(_))) => {
                    error!("received a payload item while expecting a request head");
                    let error_response = build_error_response(StatusCode::BAD_REQUEST);
                    self.do_send_response(error_response).await?;
                    return Err(ParseError::invalid_body("need header while receive body").into());
                }

                Some(Err(e)) => {
                    error!("can't receive next request, cause {}", e);
                    let error_response = build_error_response(StatusCode::BAD_REQUEST);
                    self.do_send_response(error_response).await?;
                    return Err(e.into());
                }

                None => {
                    info!("no more requests, closing connection");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H>(&mut self, header: RequestHeader, handler: &mut Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        let (req_body, mut body_sender) = ReqBody::body_channel(&mut self.framed_read);

        let request = header.body(req_body);

        // The handler and the body streaming run concurrently: the handler may
        // await body data while the sender awaits the socket, so neither side
        // can be driven to completion before the other starts.
        let response_result = {
            tokio::pin! {
                let request_handle_future = handler.call(request);
                let body_sender_future = body_sender.send_body();
            }

            let mut body_sender_done = false;

            #[allow(unused_assignments)]
            let mut result = Option::<Result<_, _>>::None;

            loop {
                select! {
                    // biased: prefer completing the response once it is ready
                    biased;
                    response = &mut request_handle_future => {
                        result = Some(response);
                        break;
                    }
                    _ = &mut body_sender_future, if !body_sender_done => {
                        body_sender_done = true;
                    }
                }
            }
            // result is Some if handler completed
            result.unwrap()
        };

        // drain whatever the handler left unread
        body_sender.skip_body().await;

        self.send_response(response_result).await?;

        Ok(())
    }

    async fn send_response<T, E>(&mut self, response_result: Result<Response<T>, E>) -> Result<(), HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match response_result {
            Ok(response) => self.do_send_response(response).await,
            Err(e) => {
                error!("handle response error, cause: {}", e.into());
                let error_response = build_error_response(StatusCode::INTERNAL_SERVER_ERROR);
                self.do_send_response(error_response).await
            }
        }
    }

    async fn do_send_response<T>(&mut self, response: Response<T>) -> Result<(), HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
    {
        let (header_parts, mut body) = response.into_parts();

        let payload_size = {
            let size_hint = body.size_hint();
            match size_hint.exact() {
                Some(0) => PayloadSize::Empty,
                Some(length) => PayloadSize::Length(length),
                None => PayloadSize::Chunked,
            }
        };

        let header = Message::<_, T::Data>::Header((ResponseHead::from_parts(header_parts, ()), payload_size));
        if !payload_size.is_empty() {
            self.framed_write.feed(header).await?;
        } else {
            // a header-only response must reach the wire now
            self.framed_write.send(header).await?;
        }

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    let payload_item =
                        frame.into_data().map(PayloadItem::Chunk).map_err(|_e| SendError::invalid_body("resolve body response error"))?;

                    self.framed_write
                        .send(Message::Payload(payload_item))
                        .await
                        .map_err(|_e| SendError::invalid_body("can't send response"))?;
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                None => {
                    self.framed_write
                        .send(Message::Payload(PayloadItem::<T::Data>::Eof(None)))
                        .await
                        .map_err(|e| SendError::invalid_body(format!("can't send eof response: {}", e)))?;
                    return Ok(());
                }
            }
        }
    }
}

fn build_error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::<Bytes>::new());
    *response.status_mut() = status_code;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::LengthTrailerHandler;
    use indoc::indoc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex, split};

    #[tokio::test]
    async fn clean_exchange_completes_without_error() {
        let (server_io, mut client_io) = duplex(4096);
        let (reader, writer) = split(server_io);

        let connection = HttpConnection::new(reader, writer);
        let process = tokio::spawn(connection.process(Arc::new(LengthTrailerHandler::default())));

        let request = indoc! {"
            POST /upload HTTP/1.1\r
            host: localhost\r
            transfer-encoding: chunked\r
            trailer: x-body-byte-length\r
            \r
            5\r
            hello\r
            0\r
            x-body-byte-length: 5\r
            \r
        "};
        client_io.write_all(request.as_bytes()).await.unwrap();

        let mut response = Vec::new();
        let mut buf = [0u8; 1024];
        while !response.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = client_io.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before response head");
            response.extend_from_slice(&buf[..n]);
        }
        let text = String::from_utf8(response).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"), "unexpected response: {text}");

        drop(client_io);

        let result = process.await.unwrap();
        assert!(result.is_ok(), "connection ended with error: {:?}", result.err());
    }
}
