use crate::error::{Capability, Error, Result};
use crate::event::Event;
use crate::writer::{CloseNotify, ResponseWriter};
use axum::http::{header, HeaderValue, Version};
use log::*;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// Unique identifier for a client (server-generated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One connected event-stream peer.
///
/// Construction starts a delivery worker that owns the response writer. Events handed to
/// [`Client::send`] go through a single-slot queue to that worker, which writes and flushes
/// them one at a time. The worker stops on [`Client::shutdown`] or when the peer
/// disconnects, whichever comes first.
///
/// `Client` is a handle: clones refer to the same connection and compare equal.
#[derive(Clone)]
pub struct Client {
    id: ClientId,
    events: mpsc::Sender<Event>,
    state: Arc<State>,
}

struct State {
    closed: AtomicBool,
    stopping: AtomicBool,
    stop: watch::Sender<bool>,
    done: watch::Receiver<bool>,
}

impl Client {
    /// Wraps `writer` in a client and starts its delivery worker.
    ///
    /// Fails if the writer cannot flush or cannot report disconnects; the caller should
    /// answer the peer with a server error in that case. `version` is the request's
    /// protocol version, used to decide whether to send a `Connection: keep-alive` header.
    pub async fn connect<W>(mut writer: W, version: Option<Version>) -> Result<Self>
    where
        W: ResponseWriter,
    {
        if !writer.can_flush() {
            return Err(Error::missing(Capability::Flush));
        }
        let close = writer
            .close_notify()
            .ok_or_else(|| Error::missing(Capability::CloseNotify))?;

        let headers = writer.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        if version.map_or(true, |v| v < Version::HTTP_2) {
            headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        }

        let id = ClientId::new();
        if let Err(e) = writer.flush().await {
            // The worker's close notification will pick this up.
            debug!("Initial flush for client {id} failed: {e}");
        }

        let (events_tx, events_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);

        let state = Arc::new(State {
            closed: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            stop: stop_tx,
            done: done_rx,
        });

        tokio::spawn(deliver(
            id,
            writer,
            events_rx,
            stop_rx,
            close,
            Arc::clone(&state),
            done_tx,
        ));

        debug!("Started delivery worker for client {id}");

        Ok(Self {
            id,
            events: events_tx,
            state,
        })
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// True once the delivery worker has stopped, or a shutdown has been requested.
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst) || self.state.stopping.load(Ordering::SeqCst)
    }

    /// Queues a copy of `event` for delivery.
    ///
    /// Waits while a previous event is still queued. Fails with a closed error once the
    /// client has terminated; nothing is queued in that case.
    pub async fn send(&self, event: &Event) -> Result<()> {
        if self.is_closed() {
            return Err(Error::closed());
        }
        self.events
            .send(event.clone())
            .await
            .map_err(|_| Error::closed())
    }

    /// Stops the delivery worker and waits for it to exit.
    ///
    /// Events already queued are still delivered unless the peer disconnects first.
    /// Calling this twice returns an already-shutdown error.
    pub async fn shutdown(&self) -> Result<()> {
        if self.state.stopping.swap(true, Ordering::SeqCst) {
            return Err(Error::already_shutdown());
        }
        self.state.stop.send_replace(true);
        self.wait().await;
        Ok(())
    }

    /// Waits until the delivery worker has exited, however that happens.
    pub async fn wait(&self) {
        let mut done = self.state.done.clone();
        // An error means the worker is gone without reporting, which is just as final.
        let _ = done.wait_for(|done| *done).await;
    }
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Client {}

impl Hash for Client {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn deliver<W>(
    id: ClientId,
    mut writer: W,
    mut events: mpsc::Receiver<Event>,
    mut stop: watch::Receiver<bool>,
    mut close: CloseNotify,
    state: Arc<State>,
    done: watch::Sender<bool>,
) where
    W: ResponseWriter,
{
    loop {
        tokio::select! {
            biased;

            _ = &mut close => {
                debug!("Client {id} disconnected");
                break;
            }

            event = events.recv() => match event {
                Some(mut event) => write_event(id, &mut writer, &mut event).await,
                None => {
                    debug!("All handles to client {id} dropped");
                    break;
                }
            },

            // Only ever flips from false to true, so any change is the stop request.
            _ = stop.changed() => {
                debug!("Client {id} shut down");
                break;
            }
        }
    }

    state.closed.store(true, Ordering::SeqCst);
    done.send_replace(true);
}

async fn write_event<W>(id: ClientId, writer: &mut W, event: &mut Event)
where
    W: ResponseWriter,
{
    let mut bytes = Vec::new();
    if let Err(e) = event.read_to_end(&mut bytes) {
        warn!("Failed to render event for client {id}: {e}");
        return;
    }

    if let Err(e) = writer.write_all(&bytes).await {
        warn!("Failed to write event to client {id}: {e}");
        return;
    }

    if let Err(e) = writer.flush().await {
        warn!("Failed to flush event to client {id}: {e}");
    }
}
