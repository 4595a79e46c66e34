//! The two-shape message carried in each direction of a rendezvous pipe
//! (§4.F): a payload, or an idempotent close marker.

use agenttrust_proto::{stream_request, stream_response, StreamRequest, StreamResponse};

/// One message flowing through a rendezvous pipe, transport-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A chunk of forwarded bytes.
    Payload(Vec<u8>),
    /// End-of-direction marker. Idempotent: observing it twice is
    /// indistinguishable from observing it once (§8 Property 6).
    Closed,
}

impl From<StreamRequest> for Message {
    fn from(value: StreamRequest) -> Self {
        match value.payload {
            Some(stream_request::Payload::Data(bytes)) => Message::Payload(bytes),
            Some(stream_request::Payload::Closed(_)) | None => Message::Closed,
        }
    }
}

impl From<Message> for StreamResponse {
    fn from(value: Message) -> Self {
        let payload = match value {
            Message::Payload(bytes) => stream_response::Payload::Data(bytes),
            Message::Closed => stream_response::Payload::Closed(true),
        };
        StreamResponse { payload: Some(payload) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_request_becomes_payload() {
        let req = StreamRequest { payload: Some(stream_request::Payload::Data(vec![1, 2, 3])) };
        assert_eq!(Message::from(req), Message::Payload(vec![1, 2, 3]));
    }

    #[test]
    fn closed_request_becomes_closed() {
        let req = StreamRequest { payload: Some(stream_request::Payload::Closed(true)) };
        assert_eq!(Message::from(req), Message::Closed);
    }

    #[test]
    fn missing_payload_is_treated_as_closed() {
        let req = StreamRequest { payload: None };
        assert_eq!(Message::from(req), Message::Closed);
    }

    #[test]
    fn closed_message_round_trips_to_response() {
        let resp: StreamResponse = Message::Closed.into();
        assert_eq!(resp.payload, Some(stream_response::Payload::Closed(true)));
    }
}
