use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::SinkExt;
use futures::channel::mpsc;
use futures::stream::StreamExt;
use http::HeaderMap;
use http_body::{Body, Frame};
use tracing::{debug, error};

use crate::protocol::SendError;

/// Creates an in-memory pipe for streaming a request body of unknown size.
///
/// The [`BodyWriter`] end is owned by the payload producer; the
/// [`ChannelBody`] end implements `http_body::Body` and is attached to the
/// outbound request. The channel is a rendezvous: a write suspends until the
/// transport side consumes the chunk, so payload generation is paced by
/// transmission.
///
/// Single-writer, single-reader; each end is closed exactly once, either
/// cleanly via [`BodyWriter::finish`] or carrying an error via
/// [`BodyWriter::abort`].
pub fn channel() -> (BodyWriter, ChannelBody) {
    let (tx, rx) = mpsc::channel(0);
    (BodyWriter { tx }, ChannelBody { rx })
}

/// Write end of the body pipe.
pub struct BodyWriter {
    tx: mpsc::Sender<Result<Frame<Bytes>, io::Error>>,
}

impl BodyWriter {
    /// Writes one chunk of payload, suspending until the transport consumes it.
    ///
    /// Fails when the read end is gone, which means the request was abandoned.
    pub async fn write(&mut self, bytes: Bytes) -> Result<(), SendError> {
        self.tx
            .send(Ok(Frame::data(bytes)))
            .await
            .map_err(|_| SendError::invalid_body("body consumer dropped before payload completed"))
    }

    /// Closes the write end, optionally appending trailer fields.
    ///
    /// The trailer values must be set here, before the stream closes; they are
    /// transmitted by the client only once the body reaches end-of-stream.
    pub async fn finish(mut self, trailers: Option<HeaderMap>) -> Result<(), SendError> {
        if let Some(map) = trailers {
            self.tx
                .send(Ok(Frame::trailers(map)))
                .await
                .map_err(|_| SendError::invalid_body("body consumer dropped before trailers sent"))?;
        }
        self.tx.close_channel();
        Ok(())
    }

    /// Closes the write end carrying an error, so the reader observes failure
    /// instead of a clean end-of-stream.
    pub async fn abort(mut self, error: io::Error) {
        if self.tx.send(Err(error)).await.is_err() {
            debug!("body consumer already gone while aborting");
        }
        self.tx.close_channel();
    }
}

/// Read end of the body pipe; the streaming body source of an outbound
/// request.
pub struct ChannelBody {
    rx: mpsc::Receiver<Result<Frame<Bytes>, io::Error>>,
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.rx.poll_next_unpin(cx)
    }
}

/// Streams a fixed payload into the write end of the pipe, then closes it
/// with the given trailer fields.
///
/// This is the body producer of the demonstration: it tolerates the empty
/// payload (nothing is written, the stream just ends with its trailers), and
/// on a failed write it closes the pipe carrying the error so the transport
/// distinguishes a truncated body from a legitimately ended one.
pub async fn produce(mut writer: BodyWriter, payload: Bytes, trailers: HeaderMap) {
    if !payload.is_empty() {
        if let Err(e) = writer.write(payload).await {
            error!(cause = %e, "failed to write payload into body pipe");
            writer.abort(io::Error::new(io::ErrorKind::BrokenPipe, e.to_string())).await;
            return;
        }
    }

    debug!("payload fully written, closing body pipe with trailers");
    if let Err(e) = writer.finish(Some(trailers)).await {
        error!(cause = %e, "failed to close body pipe");
    }
}
