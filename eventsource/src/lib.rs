//! Server-Sent Events for axum services.
//!
//! The crate is built from three pieces:
//!
//! - **Event**: one SSE message with a cached wire-format rendering. Setters invalidate the
//!   cache; reads regenerate it on demand.
//! - **Client**: one connected peer. A dedicated delivery worker owns the response writer
//!   and writes queued events one at a time, stopping on shutdown or peer disconnect.
//! - **Stream**: a registry of clients with broadcast and topic-filtered publish. It also
//!   serves as an axum endpoint that registers each connecting client and removes it when
//!   its worker stops.
//!
//! # Example
//!
//! ```rust,ignore
//! use eventsource::{Event, Stream};
//!
//! let stream = Stream::new();
//! let app = axum::Router::new()
//!     .route("/events", stream.handler())
//!     .route("/events/news", stream.topic_handler(["news"]));
//!
//! let mut event = Event::new();
//! event.set_type("headline").append_data("Rust 2024 ships");
//! stream.publish("news", &event).await;
//! ```
//!
//! # Modules
//!
//! - `event`: the `Event` type and its wire format
//! - `decode`: incremental wire-format decoder
//! - `factory`: id and type stamping helpers
//! - `writer`: the `ResponseWriter` capability trait and the axum body writer
//! - `client`: per-connection delivery worker
//! - `stream`: client registry, broadcast and publish
//! - `handler`: the axum endpoint

pub mod client;
pub mod decode;
pub mod error;
pub mod event;
pub mod factory;
pub mod handler;
pub mod stream;
pub mod writer;

pub use client::{Client, ClientId};
pub use decode::EventDecoder;
pub use error::{Error, Result};
pub use event::Event;
pub use factory::{EventFactory, IdFactory, TypeFactory};
pub use stream::{ConnectHook, Stream};
pub use writer::{BodyWriter, ResponseWriter};
