//! Server-Sent Events transport

/// Headers to send with an SSE response. `X-Accel-Buffering: no` keeps
/// reverse proxies from holding frames back.
pub const SSE_HEADERS: &[(&str, &str)] = &[
    ("Content-Type", "text/event-stream"),
    ("Cache-Control", "no-cache"),
    ("Connection", "keep-alive"),
    ("X-Accel-Buffering", "no"),
];

#[cfg(feature = "axum")]
mod axum_response {
    use axum::response::sse::{Event, Sse};
    use axum::response::{IntoResponse, Response};
    use futures::stream::{self, StreamExt};

    use crate::stream::StreamResponse;

    impl StreamResponse {
        /// Serve the remaining events as an axum SSE response
        pub fn into_axum_response(self) -> Response {
            let events = stream::unfold(self, |mut response| async move {
                let event = response.next().await?;
                let frame = Event::default()
                    .id(event.id.clone())
                    .event(event.event_type())
                    .json_data(&event);
                Some((frame, response))
            });

            ([("x-accel-buffering", "no")], Sse::new(events.boxed())).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_headers() {
        let header = |name: &str| {
            SSE_HEADERS
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| *value)
        };
        assert_eq!(header("content-type"), Some("text/event-stream"));
        assert_eq!(header("cache-control"), Some("no-cache"));
        assert_eq!(header("x-accel-buffering"), Some("no"));
    }
}
