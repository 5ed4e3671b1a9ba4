use crate::controller::ApiResponse;
use crate::params::event::EventParams;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use eventsource::Event;
use serde_json::json;

use log::*;

/// POST an event to every connected client.
pub async fn broadcast(
    State(app_state): State<AppState>,
    Json(params): Json<EventParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Broadcast event: {params:?}");

    let event = Event::try_from(params)?;
    let delivered = app_state.stream.broadcast(&event).await;

    info!("Broadcast delivered to {delivered} client(s)");

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(
            StatusCode::ACCEPTED.into(),
            json!({ "delivered": delivered }),
        )),
    ))
}

/// POST an event to the subscribers of a single topic.
pub async fn publish(
    State(app_state): State<AppState>,
    Path(topic): Path<String>,
    Json(params): Json<EventParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Publish to topic {topic}: {params:?}");

    let event = Event::try_from(params)?;
    let delivered = app_state.stream.publish(&topic, &event).await;

    info!("Published to {delivered} subscriber(s) of {topic}");

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(
            StatusCode::ACCEPTED.into(),
            json!({ "topic": topic, "delivered": delivered }),
        )),
    ))
}

/// POST to drop every subscription to a topic. Clients stay connected.
pub async fn close_topic(
    State(app_state): State<AppState>,
    Path(topic): Path<String>,
) -> impl IntoResponse {
    debug!("POST Close topic: {topic}");

    app_state.stream.close_topic(&topic).await;

    Json(ApiResponse::new(
        StatusCode::OK.into(),
        json!({ "topic": topic }),
    ))
}

/// GET the number of registered clients.
pub async fn clients(State(app_state): State<AppState>) -> impl IntoResponse {
    let clients = app_state.stream.num_clients().await;

    Json(ApiResponse::new(
        StatusCode::OK.into(),
        json!({ "clients": clients }),
    ))
}
