use std::convert::Infallible;

use async_trait::async_trait;

use bytes::Bytes;
use http::{Request, Response, StatusCode, header};
use http_body_util::{BodyExt, Full};
use tracing::{error, info, warn};

use crate::handler::Handler;
use crate::protocol::body::ReqBody;
use crate::trailer::{self, BODY_BYTE_LENGTH};
use crate::verify::{ReportSink, VerdictReport, verify};

/// Handler that drains the request body, reads the `X-Body-Byte-Length`
/// trailer, and verifies the declared length against the observed byte count.
///
/// Verification never changes the response status: a mismatch or an absent
/// trailer is logged and recorded, and the client still gets `200 OK`. Only a
/// failure to read the body itself produces `500 Internal Server Error`.
pub struct LengthTrailerHandler {
    reports: ReportSink,
}

impl LengthTrailerHandler {
    pub fn new(reports: ReportSink) -> Self {
        Self { reports }
    }

    pub fn reports(&self) -> ReportSink {
        self.reports.clone()
    }
}

impl Default for LengthTrailerHandler {
    fn default() -> Self {
        Self::new(ReportSink::new())
    }
}

#[async_trait]
impl Handler for LengthTrailerHandler {
    type RespBody = Full<Bytes>;
    type Error = Infallible;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        info!(
            method = %req.method(),
            uri = %req.uri(),
            announced = ?trailer::announced_names(req.headers()),
            headers = ?req.headers(),
            "handling request"
        );

        // Trailer fields are only observable once the body is fully drained,
        // so the whole body is collected before any trailer handling.
        let collected = match req.into_body().collect().await {
            Ok(collected) => collected,
            Err(e) => {
                error!("failed to read request body: {}", e);
                return Ok(text_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to read request body\n"));
            }
        };

        let trailers = collected.trailers().cloned();
        let observed = collected.to_bytes().len() as u64;
        info!(observed = observed, "request body drained");

        let mut declared = None;
        if let Some(trailers) = &trailers {
            for (name, value) in trailers {
                if *name == BODY_BYTE_LENGTH {
                    // first value wins on duplicates
                    if declared.is_none() {
                        match trailer::parse_length(value) {
                            Ok(length) => declared = Some(length),
                            Err(e) => warn!("unparseable {} trailer: {}", BODY_BYTE_LENGTH, e),
                        }
                    } else {
                        warn!(value = ?value, "duplicate {} trailer ignored", BODY_BYTE_LENGTH);
                    }
                } else {
                    warn!(name = %name, value = ?value, "unexpected trailer field ignored");
                }
            }
        }

        let verdict = declared.map(|declared| verify(declared, observed));
        match (declared, verdict) {
            (Some(declared), Some(verdict)) => {
                info!(declared = declared, observed = observed, verdict = %verdict, "length verification complete")
            }
            _ => warn!(observed = observed, "no declared body length, skipping verification"),
        }

        self.reports.push(VerdictReport { observed, declared, verdict });

        Ok(text_response(StatusCode::OK, "body received\n"))
    }
}

fn text_response(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref().parse().unwrap());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};
    use crate::verify::Verdict;
    use futures::Stream;
    use http::{HeaderMap, HeaderValue};

    fn payload_stream(
        items: Vec<Result<Message<(RequestHeader, PayloadSize)>, ParseError>>,
    ) -> impl Stream<Item = Result<Message<(RequestHeader, PayloadSize)>, ParseError>> + Unpin {
        futures::stream::iter(items)
    }

    async fn run_handler(items: Vec<Result<Message<(RequestHeader, PayloadSize)>, ParseError>>) -> (StatusCode, Vec<VerdictReport>) {
        let mut stream = payload_stream(items);
        let (body, mut sender) = ReqBody::body_channel(&mut stream);

        let handler = LengthTrailerHandler::default();
        let reports = handler.reports();

        let request = Request::post("/").body(body).unwrap();
        let call = handler.call(request);

        let (_, response) = tokio::join!(sender.send_body(), call);
        let response = response.unwrap();

        (response.status(), reports.take())
    }

    #[tokio::test]
    async fn matching_length_yields_match_verdict() {
        let (status, reports) = run_handler(vec![
            Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"abcde")))),
            Ok(Message::Payload(PayloadItem::Eof(Some(trailer::length_trailers(5))))),
        ])
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reports, vec![VerdictReport { observed: 5, declared: Some(5), verdict: Some(Verdict::Match) }]);
    }

    #[tokio::test]
    async fn wrong_length_yields_mismatch_but_still_ok() {
        let (status, reports) = run_handler(vec![
            Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"abcde")))),
            Ok(Message::Payload(PayloadItem::Eof(Some(trailer::length_trailers(999))))),
        ])
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reports, vec![VerdictReport { observed: 5, declared: Some(999), verdict: Some(Verdict::Mismatch) }]);
    }

    #[tokio::test]
    async fn missing_trailer_skips_verification() {
        let (status, reports) = run_handler(vec![
            Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"abc")))),
            Ok(Message::Payload(PayloadItem::Eof(None))),
        ])
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reports, vec![VerdictReport { observed: 3, declared: None, verdict: None }]);
    }

    #[tokio::test]
    async fn unparseable_trailer_skips_verification() {
        let mut trailers = HeaderMap::new();
        trailers.insert(BODY_BYTE_LENGTH, HeaderValue::from_static("not-a-number"));

        let (status, reports) = run_handler(vec![
            Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"abc")))),
            Ok(Message::Payload(PayloadItem::Eof(Some(trailers)))),
        ])
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reports, vec![VerdictReport { observed: 3, declared: None, verdict: None }]);
    }

    #[tokio::test]
    async fn body_read_error_responds_internal_server_error() {
        let (status, reports) = run_handler(vec![
            Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"ab")))),
            Err(ParseError::invalid_body("connection reset")),
        ])
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(reports.is_empty());
    }
}
