use std::sync::Arc;

use bytes::Bytes;
use http::{Request, header};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use trailer_exchange::client::Client;
use trailer_exchange::handler::LengthTrailerHandler;
use trailer_exchange::protocol::PayloadSize;
use trailer_exchange::protocol::body::{channel, produce};
use trailer_exchange::server::Server;
use trailer_exchange::trailer;
use trailer_exchange::verify::ReportSink;

/// Runs the whole exchange in one process: a verifying server, a client that
/// streams a chunked request body through an in-memory pipe, and a producer
/// task that writes the payload and closes the pipe with the
/// `X-Body-Byte-Length` trailer.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let server = Server::bind("127.0.0.1:0").await?;
    let address = server.local_addr()?.to_string();

    let reports = ReportSink::new();
    tokio::spawn(server.run(Arc::new(LengthTrailerHandler::new(reports.clone()))));

    let payload = Bytes::from_static(b"abcde");

    let (writer, body) = channel();
    tokio::spawn(produce(writer, payload.clone(), trailer::length_trailers(payload.len() as u64)));

    let mut request = Request::post("/").header(header::HOST, address.clone()).body(body)?;
    trailer::announce(request.headers_mut());

    let mut client = Client::connect(&address).await?;
    let response = client.send(request, PayloadSize::new_chunked()).await?;

    info!(status = %response.status(), body = %String::from_utf8_lossy(response.body()), "response received");
    for report in reports.take() {
        info!(report = ?report, "verification report");
    }

    Ok(())
}
