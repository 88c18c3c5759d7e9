//! TCP accept loop spawning one connection task per client.

use std::fmt::Display;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info, warn};

use crate::connection::HttpConnection;
use crate::handler::Handler;

/// A listening HTTP server.
///
/// Each accepted connection runs on its own spawned task; the shared handler
/// is cloned into every task through an `Arc`.
pub struct Server {
    tcp_listener: TcpListener,
}

impl Server {
    pub async fn bind<A: ToSocketAddrs>(address: A) -> io::Result<Self> {
        let tcp_listener = TcpListener::bind(address).await?;
        info!("start listening at {:?}", tcp_listener.local_addr()?);
        Ok(Self { tcp_listener })
    }

    /// The address the listener is actually bound to. Useful when binding to
    /// port zero.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp_listener.local_addr()
    }

    pub async fn run<H>(self, handler: Arc<H>)
    where
        H: Handler,
        H::Error: Send,
        H::RespBody: Body<Data = Bytes> + Unpin + Send,
        <H::RespBody as Body>::Error: Display + Send,
    {
        loop {
            let (tcp_stream, _remote_addr) = match self.tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let handler = handler.clone();

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer);
                match connection.process(handler).await {
                    Ok(_) => {
                        info!("finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!("service has error, cause {}, connection shutdown", e);
                    }
                }
            });
        }
    }
}
