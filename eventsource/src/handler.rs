//! Serving a [`Stream`] over HTTP.
//!
//! Each accepted request becomes a [`Client`] whose delivery worker feeds the response
//! body. The response stays open for exactly as long as that worker runs; a supervisor
//! task removes the client from the stream once it stops.

use crate::client::Client;
use crate::stream::Stream;
use crate::writer::{into_body, BodyWriter};
use axum::extract::Request;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use log::*;
use std::sync::Arc;

const EVENT_STREAM: &str = "text/event-stream";

impl Stream {
    /// A `GET` route that registers every connecting client for broadcasts.
    pub fn handler<S>(&self) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.topic_handler(Vec::<String>::new())
    }

    /// A `GET` route that registers connecting clients for broadcasts and subscribes them
    /// to `topics`.
    pub fn topic_handler<S, I, T>(&self, topics: I) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let stream = self.clone();
        let topics: Arc<[String]> = topics.into_iter().map(Into::into).collect();
        get(move |request: Request| async move { stream.accept(request, &topics).await })
    }

    /// Turns one request into a streaming response backed by a new client.
    ///
    /// Answers `406` if the request does not accept `text/event-stream` and `500` if the
    /// client cannot be built. Otherwise the client is registered, subscribed to `topics`,
    /// passed to the connect hook, and the streaming response is returned.
    pub async fn accept(&self, request: Request, topics: &[String]) -> Response {
        let (parts, _body) = request.into_parts();

        if !accepts_event_stream(&parts.headers) {
            debug!("Rejecting {} without an event-stream Accept header", parts.uri);
            return (StatusCode::NOT_ACCEPTABLE, "This is an EventStream endpoint").into_response();
        }

        let (writer, head, frames) = BodyWriter::channel();
        let client = match Client::connect(writer, Some(parts.version)).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to start event stream for {}: {e}", parts.uri);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EventStream not supported for this connection",
                )
                    .into_response();
            }
        };

        self.register_with_topics(&client, topics).await;

        // Nothing may await between registering and spawning the cleanup, or a dropped
        // request would leave the registration behind.
        let stream = self.clone();
        let watched = client.clone();
        tokio::spawn(async move {
            watched.wait().await;
            stream.remove(&watched).await;
        });

        if let Some(hook) = self.connect_hook() {
            hook(&parts, &client);
        }

        let headers = head.await.unwrap_or_default();
        (headers, into_body(frames)).into_response()
    }
}

/// True if any media range in the `Accept` header is `text/event-stream`.
fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|range| range.split(';').next())
        .any(|media| media.trim().eq_ignore_ascii_case(EVENT_STREAM))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientId;
    use crate::event::Event;
    use axum::body::Body;
    use axum::http::HeaderValue;
    use axum::Router;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn event_request(uri: &str) -> Request {
        Request::builder()
            .uri(uri)
            .header(header::ACCEPT, EVENT_STREAM)
            .body(Body::empty())
            .unwrap()
    }

    async fn next_data(body: &mut Body) -> Vec<u8> {
        let frame = tokio::time::timeout(TIMEOUT, body.frame())
            .await
            .expect("timed out waiting for a body frame")
            .unwrap()
            .unwrap();
        frame.into_data().unwrap().to_vec()
    }

    async fn wait_for_clients(stream: &Stream, expected: usize) {
        tokio::time::timeout(TIMEOUT, async {
            while stream.num_clients().await != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("client count never settled");
    }

    #[test]
    fn test_accepts_event_stream_media_ranges() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_event_stream(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        assert!(!accepts_event_stream(&headers));

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html, text/event-stream;q=0.9"),
        );
        assert!(accepts_event_stream(&headers));
    }

    #[tokio::test]
    async fn test_rejects_request_without_event_stream_accept() {
        let stream = Stream::new();
        let app = Router::new().route("/events", stream.handler());

        let request = Request::builder()
            .uri("/events")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(stream.num_clients().await, 0);
    }

    #[tokio::test]
    async fn test_streams_broadcasts_with_sse_headers() {
        let stream = Stream::new();
        let app = Router::new().route("/events", stream.handler());

        let response = app.oneshot(event_request("/events")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], EVENT_STREAM);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(stream.num_clients().await, 1);

        let mut event = Event::new();
        event.set_id("7").set_type("tick").append_data("hello");
        assert_eq!(stream.broadcast(&event).await, 1);

        let mut body = response.into_body();
        assert_eq!(next_data(&mut body).await, b"event: tick\nid: 7\ndata: hello\n\n");
    }

    #[tokio::test]
    async fn test_topic_handler_subscribes_clients() {
        let stream = Stream::new();
        let app = Router::new().route("/events/news", stream.topic_handler(["news"]));

        let response = app.oneshot(event_request("/events/news")).await.unwrap();
        assert_eq!(stream.num_subscribers("news").await, 1);

        assert_eq!(stream.publish("sports", &Event::data_event("no")).await, 0);
        assert_eq!(stream.publish("news", &Event::data_event("yes")).await, 1);

        let mut body = response.into_body();
        assert_eq!(next_data(&mut body).await, b"data: yes\n\n");
    }

    #[tokio::test]
    async fn test_connect_hook_sees_request_and_live_client() {
        let stream = Stream::new();
        let seen: Arc<Mutex<Vec<(String, ClientId)>>> = Arc::default();

        let recorded = Arc::clone(&seen);
        stream.set_connect_hook(move |parts, client| {
            recorded
                .lock()
                .unwrap()
                .push((parts.uri.path().to_string(), client.id()));
        });

        let app = Router::new().route("/events", stream.handler());
        let _response = app.oneshot(event_request("/events")).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "/events");
    }

    #[tokio::test]
    async fn test_dropping_body_removes_client() {
        let stream = Stream::new();
        let app = Router::new().route("/events", stream.handler());

        let response = app.oneshot(event_request("/events")).await.unwrap();
        assert_eq!(stream.num_clients().await, 1);

        drop(response);
        wait_for_clients(&stream, 0).await;
    }

    #[tokio::test]
    async fn test_stream_shutdown_ends_open_bodies() {
        let stream = Stream::new();
        let app = Router::new().route("/events", stream.handler());

        let response = app.oneshot(event_request("/events")).await.unwrap();
        stream.shutdown().await;
        assert_eq!(stream.num_clients().await, 0);

        let mut body = response.into_body();
        let end = tokio::time::timeout(TIMEOUT, body.frame()).await.unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn test_panicking_hook_does_not_leak_registration() {
        let stream = Stream::new();
        stream.set_connect_hook(|_, _| panic!("hook failed"));

        let accepting = stream.clone();
        let topics = vec!["news".to_string()];
        let outcome = tokio::spawn(async move {
            accepting.accept(event_request("/events/news"), &topics).await
        })
        .await;
        assert!(outcome.unwrap_err().is_panic());

        wait_for_clients(&stream, 0).await;
        assert_eq!(stream.num_subscribers("news").await, 0);
    }
}
