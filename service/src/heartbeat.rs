use eventsource::{EventFactory, IdFactory, Stream, TypeFactory};
use log::*;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const HEARTBEAT_EVENT: &str = "heartbeat";

/// Broadcasts a `heartbeat` event every `interval` until the task is aborted.
///
/// Heartbeats carry sequential ids starting at 1, the current time as data, and `retry_ms`
/// as the reconnection hint. They keep idle connections from being reaped by proxies.
pub fn spawn(stream: Stream, interval: Duration, retry_ms: u64) -> JoinHandle<()> {
    info!("Broadcasting heartbeats every {interval:?}");

    tokio::spawn(async move {
        let mut factory = IdFactory::wrapping(TypeFactory::new(HEARTBEAT_EVENT), 1);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let mut event = factory.new_event();
            event
                .set_retry(retry_ms)
                .set_data(&chrono::Utc::now().to_rfc3339());

            let delivered = stream.broadcast(&event).await;
            trace!("Heartbeat {} delivered to {delivered} client(s)", event.id());
        }
    })
}
