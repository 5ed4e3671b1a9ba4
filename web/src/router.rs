use crate::controller::{event_controller, health_check_controller};
use crate::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use log::*;
use std::collections::BTreeSet;
use tower_http::cors::{Any, CorsLayer};

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config.allowed_origins);

    Router::new()
        .merge(health_routes())
        .merge(event_stream_routes(app_state.clone()))
        .merge(event_routes(app_state))
        .layer(cors)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

/// `/events` for broadcasts, plus one `/events/<topic>` endpoint per configured topic.
fn event_stream_routes(app_state: AppState) -> Router {
    let stream = &app_state.stream;
    let topics: BTreeSet<&str> = app_state
        .config
        .topics
        .iter()
        .map(|topic| topic.trim())
        .filter(|topic| {
            let routable = is_routable_topic(topic);
            if !routable {
                warn!("Skipping topic {topic:?}, it cannot be used as a path segment");
            }
            routable
        })
        .collect();

    let mut router = Router::new().route("/events", stream.handler());
    for topic in topics {
        info!("Exposing event stream for topic {topic} at /events/{topic}");
        router = router.route(&format!("/events/{topic}"), stream.topic_handler([topic]));
    }
    router
}

/// Topics become a literal path segment, so they must not contain route syntax.
fn is_routable_topic(topic: &str) -> bool {
    !topic.is_empty() && !topic.contains(['/', ':', '*', '{', '}'])
}

pub(crate) fn event_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/broadcast", post(event_controller::broadcast))
        .route("/topics/:topic", post(event_controller::publish))
        .route("/topics/:topic/close", post(event_controller::close_topic))
        .route("/clients", get(event_controller::clients))
        .with_state(app_state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
