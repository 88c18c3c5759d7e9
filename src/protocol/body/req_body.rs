use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;

use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, SinkExt, Stream, StreamExt};

use http_body::{Body, Frame};
use tracing::{error, info};

use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};

/// Consumer side of the request body stream handed to the request handler.
///
/// `ReqBody` implements `http_body::Body` on top of a channel pair: the
/// handler requests one payload item at a time, and [`ReqBodySender`] answers
/// from the connection's payload stream. This keeps the handler and the
/// connection reading the socket concurrently without buffering the payload.
///
/// Trailer fields ride on the end-of-payload marker. The consumer therefore
/// observes them as a `Frame::trailers` strictly after the last data frame;
/// until the body is drained there is no trailer container to look at.
pub struct ReqBody {
    signal: mpsc::Sender<oneshot::Sender<PayloadItem>>,
    receiving: Option<oneshot::Receiver<PayloadItem>>,
    done: bool,
}

impl ReqBody {
    fn new(signal: mpsc::Sender<oneshot::Sender<PayloadItem>>) -> Self {
        Self { signal, receiving: None, done: false }
    }

    /// Creates the consumer/producer pair for streaming one request body.
    ///
    /// The returned `ReqBody` is attached to the request given to the handler,
    /// while the [`ReqBodySender`] stays with the connection and feeds it from
    /// the payload stream.
    pub fn body_channel<S>(payload_stream: &mut S) -> (ReqBody, ReqBodySender<'_, S>)
    where
        S: Stream + Unpin,
    {
        let (tx, receiver) = mpsc::channel(16);

        let req_body = ReqBody::new(tx);

        let body_sender = ReqBodySender { payload_stream, receiver, eof: false };

        (req_body, body_sender)
    }
}

/// Producer side: answers chunk requests from [`ReqBody`] out of the
/// connection's payload stream, and drains whatever the handler left unread.
pub struct ReqBodySender<'conn, S>
where
    S: Stream + Unpin,
{
    payload_stream: &'conn mut S,
    receiver: mpsc::Receiver<oneshot::Sender<PayloadItem>>,
    eof: bool,
}

impl<S> ReqBodySender<'_, S>
where
    S: Stream<Item = Result<Message<(RequestHeader, PayloadSize)>, ParseError>> + Unpin,
{
    /// Streams payload items to the [`ReqBody`] consumer until the payload
    /// reaches end-of-stream or an error occurs.
    pub async fn send_body(&mut self) -> Result<(), ParseError> {
        loop {
            if self.eof {
                return Ok(());
            }

            if let Some(sender) = self.receiver.next().await {
                match self.payload_stream.next().await {
                    Some(Ok(Message::Payload(payload_item))) => {
                        if payload_item.is_eof() {
                            self.eof = true;
                        }
                        if sender.send(payload_item).is_err() {
                            // handler dropped the body; remaining payload is
                            // drained by skip_body
                            return Ok(());
                        }
                    }

                    Some(Ok(Message::Header(_header))) => {
                        error!("received header from receive body phase");
                        return Err(ParseError::invalid_body("received header from receive body phase"));
                    }

                    Some(Err(e)) => {
                        return Err(e);
                    }

                    None => {
                        error!("connection closed before request body completed");
                        return Err(ParseError::invalid_body("connection closed before request body completed"));
                    }
                }
            }
        }
    }

    /// Drains any remaining payload items from the stream.
    ///
    /// Required for protocol correctness when the handler does not read the
    /// complete body and the connection will serve further requests.
    pub async fn skip_body(&mut self) {
        if !self.eof {
            let mut size: usize = 0;
            while let Some(Ok(Message::Payload(payload_item))) = self.payload_stream.next().await {
                if payload_item.is_eof() {
                    self.eof = true;
                    if size > 0 {
                        info!(size = size, "skip request body");
                    }
                    break;
                }

                if let Some(bytes) = payload_item.as_bytes() {
                    size += bytes.len();
                }
            }
        }
    }
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        loop {
            if self.done {
                return Poll::Ready(None);
            }

            if let Some(oneshot_receiver) = &mut self.receiving {
                return match ready!(oneshot_receiver.poll_unpin(cx)) {
                    Ok(PayloadItem::Chunk(bytes)) => {
                        self.receiving.take();
                        Poll::Ready(Some(Ok(Frame::data(bytes))))
                    }
                    Ok(PayloadItem::Eof(trailers)) => {
                        self.receiving.take();
                        self.done = true;
                        match trailers {
                            // trailer fields become visible only here, after
                            // the final data frame
                            Some(map) => Poll::Ready(Some(Ok(Frame::trailers(map)))),
                            None => Poll::Ready(None),
                        }
                    }
                    Err(_) => {
                        self.receiving.take();
                        Poll::Ready(Some(Err(ParseError::invalid_body("parse body canceled"))))
                    }
                };
            }

            match ready!(self.signal.poll_ready_unpin(cx)) {
                Ok(_) => {
                    let (tx, rx) = oneshot::channel();
                    match self.signal.start_send(tx) {
                        Ok(_) => {
                            self.receiving = Some(rx);
                            continue;
                        }
                        Err(e) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
                    }
                }
                Err(e) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
            };
        }
    }
}
