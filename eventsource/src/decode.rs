//! Incremental decoder for the event-stream wire format.
//!
//! Accumulates bytes and yields complete [`Event`]s:
//! - `event:`, `id:`, `data:` and `retry:` lines fill in the current event
//! - an empty line ends the event
//! - lines starting with `:` are comments (keepalives) and are skipped
//! - CRLF line endings are accepted

use crate::event::Event;
use log::*;

/// Streaming decoder that turns wire bytes back into events.
#[derive(Debug, Default)]
pub struct EventDecoder {
    /// Bytes not yet terminated by a newline
    buffer: Vec<u8>,
    /// Event being built
    current: Event,
    /// Whether any field was seen for `current`
    pending: bool,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every event completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Event> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line[..newline_pos]);
            let line = line.trim_end_matches('\r');

            if line.is_empty() {
                if self.pending {
                    events.push(std::mem::take(&mut self.current));
                    self.pending = false;
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };

            match field {
                "event" => {
                    self.current.set_type(value);
                }
                "id" => {
                    self.current.set_id(value);
                }
                "data" => {
                    self.current.append_data(value);
                }
                "retry" => match value.parse::<u64>() {
                    Ok(retry) => {
                        self.current.set_retry(retry);
                    }
                    Err(_) => {
                        debug!("Ignoring non-numeric retry field: {value}");
                        continue;
                    }
                },
                // Unknown fields are ignored
                _ => continue,
            }
            self.pending = true;
        }

        events
    }

    /// Drop any partially received event.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.current = Event::default();
        self.pending = false;
    }
}
