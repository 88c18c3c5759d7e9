//! Streaming decoder for inbound HTTP responses (client direction).

use crate::codec::body::PayloadDecoder;
use crate::codec::header::ResponseHeadDecoder;
use crate::protocol::{Message, ParseError, PayloadSize, ResponseHead};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A decoder for HTTP responses: the head first, then payload items until the
/// payload decoder reports end of stream.
pub struct ResponseDecoder {
    head_decoder: ResponseHeadDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self { head_decoder: ResponseHeadDecoder, payload_decoder: None }
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHead, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.payload_decoder {
            None => {
                let (head, payload_size) = match self.head_decoder.decode(src)? {
                    Some(result) => result,
                    None => return Ok(None),
                };

                self.payload_decoder = Some(payload_size.into());
                Ok(Some(Message::Header((head, payload_size))))
            }

            Some(payload_decoder) => {
                let payload_item = match payload_decoder.decode(src)? {
                    Some(item) => item,
                    None => return Ok(None),
                };

                if payload_item.is_eof() {
                    self.payload_decoder.take();
                }

                Ok(Some(Message::Payload(payload_item)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use indoc::indoc;

    #[test]
    fn response_with_fixed_length_body() {
        let bytes = indoc! {"
            HTTP/1.1 200 OK\r
            content-type: text/plain; charset=utf-8\r
            content-length: 2\r
            \r
            ok"};

        let mut decoder = ResponseDecoder::new();
        let mut buffer = BytesMut::from(bytes);

        let head = decoder.decode(&mut buffer).unwrap().unwrap();
        let (response, payload_size) = match head {
            Message::Header(header) => header,
            other => panic!("unexpected item: {:?}", other),
        };
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(payload_size, PayloadSize::new_length(2));

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        match chunk {
            Message::Payload(item) => assert_eq!(item.as_bytes().unwrap(), b"ok".as_slice()),
            other => panic!("unexpected item: {:?}", other),
        }

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        match eof {
            Message::Payload(item) => assert!(item.is_eof()),
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn next_response_decodes_after_previous_payload() {
        let bytes = indoc! {"
            HTTP/1.1 500 Internal Server Error\r
            content-length: 0\r
            \r
            HTTP/1.1 200 OK\r
            content-length: 0\r
            \r
            "};

        let mut decoder = ResponseDecoder::new();
        let mut buffer = BytesMut::from(bytes);

        match decoder.decode(&mut buffer).unwrap().unwrap() {
            Message::Header((response, _)) => assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR),
            other => panic!("unexpected item: {:?}", other),
        }
        match decoder.decode(&mut buffer).unwrap().unwrap() {
            Message::Payload(item) => assert!(item.is_eof()),
            other => panic!("unexpected item: {:?}", other),
        }

        match decoder.decode(&mut buffer).unwrap().unwrap() {
            Message::Header((response, _)) => assert_eq!(response.status(), StatusCode::OK),
            other => panic!("unexpected item: {:?}", other),
        }
    }
}
