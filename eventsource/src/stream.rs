use crate::client::{Client, ClientId};
use crate::event::Event;
use axum::http::request::Parts;
use futures::future::join_all;
use log::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock as HookLock};
use tokio::sync::RwLock;

/// Called once for every client accepted by a [`Stream`] endpoint, with the request head
/// and the live client.
pub type ConnectHook = Arc<dyn Fn(&Parts, &Client) + Send + Sync>;

/// A registered client and the topics it is subscribed to.
struct Registration {
    client: Client,
    topics: HashSet<String>,
}

/// Registry of connected clients with broadcast and topic-filtered publish.
///
/// One reader/writer lock guards the whole map: registration and topic changes take it
/// exclusively, broadcast and publish share it. `Stream` is a handle; clones share the
/// same registry.
#[derive(Clone, Default)]
pub struct Stream {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    clients: RwLock<HashMap<ClientId, Registration>>,
    connect_hook: HookLock<Option<ConnectHook>>,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a client so it receives broadcasts. No effect if it is already registered.
    pub async fn register(&self, client: &Client) {
        let mut clients = self.inner.clients.write().await;
        registration(&mut clients, client);
    }

    /// Subscribes a client to `topic`, registering it first if needed.
    pub async fn subscribe(&self, topic: impl Into<String>, client: &Client) {
        let topic = topic.into();
        let mut clients = self.inner.clients.write().await;
        debug!("Client {} subscribed to {topic}", client.id());
        registration(&mut clients, client).topics.insert(topic);
    }

    /// Registers a client and subscribes it to every topic in one lock acquisition.
    pub(crate) async fn register_with_topics(&self, client: &Client, topics: &[String]) {
        let mut clients = self.inner.clients.write().await;
        let registration = registration(&mut clients, client);
        for topic in topics {
            debug!("Client {} subscribed to {topic}", client.id());
            registration.topics.insert(topic.clone());
        }
    }

    /// Removes a client from `topic`. It stays registered for broadcasts.
    pub async fn unsubscribe(&self, topic: &str, client: &Client) {
        let mut clients = self.inner.clients.write().await;
        if let Some(registration) = clients.get_mut(&client.id()) {
            registration.topics.remove(topic);
        }
    }

    /// Removes a client from the registry without shutting it down.
    pub async fn remove(&self, client: &Client) {
        let mut clients = self.inner.clients.write().await;
        if clients.remove(&client.id()).is_some() {
            info!("Removed event stream client {}", client.id());
        }
    }

    /// Drops `topic` from every client's subscriptions. Clients stay registered.
    pub async fn close_topic(&self, topic: &str) {
        let mut clients = self.inner.clients.write().await;
        for registration in clients.values_mut() {
            registration.topics.remove(topic);
        }
    }

    /// Sends `event` to every registered client. Returns how many accepted it.
    pub async fn broadcast(&self, event: &Event) -> usize {
        let clients = self.inner.clients.read().await;
        fan_out(clients.values().map(|r| &r.client), event).await
    }

    /// Sends `event` to the clients subscribed to `topic`. Returns how many accepted it.
    pub async fn publish(&self, topic: &str, event: &Event) -> usize {
        let clients = self.inner.clients.read().await;
        let subscribers = clients
            .values()
            .filter(|r| r.topics.contains(topic))
            .map(|r| &r.client);
        fan_out(subscribers, event).await
    }

    /// Shuts down and removes every client.
    pub async fn shutdown(&self) {
        let mut clients = self.inner.clients.write().await;
        let count = clients.len();
        join_all(clients.drain().map(|(id, registration)| async move {
            if let Err(e) = registration.client.shutdown().await {
                debug!("Client {id} was already shut down: {e}");
            }
        }))
        .await;
        info!("Shut down {count} event stream client(s)");
    }

    /// Current number of registered clients. Only a snapshot under concurrent changes.
    pub async fn num_clients(&self) -> usize {
        self.inner.clients.read().await.len()
    }

    pub async fn num_subscribers(&self, topic: &str) -> usize {
        let clients = self.inner.clients.read().await;
        clients.values().filter(|r| r.topics.contains(topic)).count()
    }

    pub async fn is_registered(&self, client: &Client) -> bool {
        self.inner.clients.read().await.contains_key(&client.id())
    }

    /// Topics `client` is subscribed to, or `None` if it is not registered.
    pub async fn topics_of(&self, client: &Client) -> Option<HashSet<String>> {
        let clients = self.inner.clients.read().await;
        clients.get(&client.id()).map(|r| r.topics.clone())
    }

    /// Sets the hook run for each client accepted over HTTP, replacing any previous one.
    ///
    /// The hook runs on the accepting task before the response is returned; the client is
    /// already registered and receiving events by then.
    pub fn set_connect_hook<F>(&self, hook: F)
    where
        F: Fn(&Parts, &Client) + Send + Sync + 'static,
    {
        let mut slot = self
            .inner
            .connect_hook
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(hook));
    }

    pub fn clear_connect_hook(&self) {
        let mut slot = self
            .inner
            .connect_hook
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    pub(crate) fn connect_hook(&self) -> Option<ConnectHook> {
        self.inner
            .connect_hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn registration<'a>(
    clients: &'a mut HashMap<ClientId, Registration>,
    client: &Client,
) -> &'a mut Registration {
    clients.entry(client.id()).or_insert_with(|| {
        info!("Registered event stream client {}", client.id());
        Registration {
            client: client.clone(),
            topics: HashSet::new(),
        }
    })
}

// Sends are driven together so one client with a full queue doesn't hold up the others.
async fn fan_out<'a>(clients: impl Iterator<Item = &'a Client>, event: &Event) -> usize {
    let results = join_all(clients.map(|client| async move {
        match client.send(event).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Skipping client {}: {e}", client.id());
                false
            }
        }
    }))
    .await;

    results.into_iter().filter(|sent| *sent).count()
}
