//! Helpers for stamping ids and types onto freshly built events.

use crate::event::Event;

/// Anything that can produce new events.
pub trait EventFactory: Send {
    fn new_event(&mut self) -> Event;
}

impl<F> EventFactory for F
where
    F: FnMut() -> Event + Send,
{
    fn new_event(&mut self) -> Event {
        self()
    }
}

/// Produces events with sequential ids, starting at `next`.
///
/// Events are built by the wrapped factory if there is one, otherwise from scratch.
pub struct IdFactory {
    inner: Option<Box<dyn EventFactory>>,
    next: u64,
}

impl IdFactory {
    pub fn new(next: u64) -> Self {
        Self { inner: None, next }
    }

    pub fn wrapping(inner: impl EventFactory + 'static, next: u64) -> Self {
        Self {
            inner: Some(Box::new(inner)),
            next,
        }
    }

    /// The id the next event will get.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl EventFactory for IdFactory {
    fn new_event(&mut self) -> Event {
        let mut event = match self.inner.as_mut() {
            Some(inner) => inner.new_event(),
            None => Event::new(),
        };
        event.set_id(self.next.to_string());
        self.next = self.next.wrapping_add(1);
        event
    }
}

/// Produces events of one fixed type.
pub struct TypeFactory {
    inner: Option<Box<dyn EventFactory>>,
    event_type: String,
}

impl TypeFactory {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            inner: None,
            event_type: event_type.into(),
        }
    }

    pub fn wrapping(inner: impl EventFactory + 'static, event_type: impl Into<String>) -> Self {
        Self {
            inner: Some(Box::new(inner)),
            event_type: event_type.into(),
        }
    }
}

impl EventFactory for TypeFactory {
    fn new_event(&mut self) -> Event {
        let mut event = match self.inner.as_mut() {
            Some(inner) => inner.new_event(),
            None => Event::new(),
        };
        event.set_type(self.event_type.clone());
        event
    }
}

impl Event {
    /// An event carrying `data`, split into lines.
    pub fn data_event(data: &str) -> Self {
        let mut event = Self::new();
        event.append_data(data);
        event
    }

    /// An event with only its type set.
    pub fn type_event(event_type: impl Into<String>) -> Self {
        let mut event = Self::new();
        event.set_type(event_type);
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_factory_counts_up() {
        let mut factory = IdFactory::new(5);
        assert_eq!(factory.new_event().id(), "5");
        assert_eq!(factory.new_event().id(), "6");
        assert_eq!(factory.peek(), 7);
    }

    #[test]
    fn test_type_factory_stamps_type() {
        let mut factory = TypeFactory::new("status");
        let event = factory.new_event();
        assert_eq!(event.event_type(), "status");
        assert!(event.id().is_empty());
    }

    #[test]
    fn test_factories_compose() {
        let mut factory = IdFactory::wrapping(TypeFactory::new("heartbeat"), 1);
        let mut event = factory.new_event();
        assert_eq!(event.render(), "event: heartbeat\nid: 1\n\n");
    }

    #[test]
    fn test_closure_as_inner_factory() {
        let mut factory = TypeFactory::wrapping(|| Event::data_event("payload"), "msg");
        let mut event = factory.new_event();
        assert_eq!(event.render(), "event: msg\ndata: payload\n\n");
    }

    #[test]
    fn test_type_event_has_no_data() {
        let mut event = Event::type_event("ping");
        assert_eq!(event.render(), "event: ping\n\n");
    }
}
