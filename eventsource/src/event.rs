//! A single server-sent event and its wire-format rendering.
//!
//! The rendered bytes are cached and only regenerated after a mutation, so an event can be
//! read through [`std::io::Read`] in as many partial reads as the caller likes.

use std::fmt;
use std::io::{self, Read, Write};

/// One SSE message.
///
/// Rendering order is fixed: `event`, `id`, one `data` line per entry, `retry`, then the
/// terminating blank line. Nothing is escaped, so data lines must not contain newlines;
/// [`Event::append_data`] splits on them for you.
///
/// An `Event` is not meant to be shared while it is being read. [`Clone`] copies only the
/// structured fields, which is how each client gets its own copy to render.
#[derive(Debug, Default)]
pub struct Event {
    id: String,
    event: String,
    data: Vec<String>,
    retry: u64,
    buf: Vec<u8>,
    pos: usize,
    buf_set: bool,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event
    }

    pub fn data(&self) -> &[String] {
        &self.data
    }

    pub fn retry(&self) -> u64 {
        self.retry
    }

    pub fn set_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = id.into();
        self.invalidate();
        self
    }

    pub fn set_type(&mut self, event_type: impl Into<String>) -> &mut Self {
        self.event = event_type.into();
        self.invalidate();
        self
    }

    /// Sets the reconnection hint in milliseconds. Zero leaves it out of the output.
    pub fn set_retry(&mut self, retry: u64) -> &mut Self {
        self.retry = retry;
        self.invalidate();
        self
    }

    /// Replaces all data lines with the lines of `data`.
    pub fn set_data(&mut self, data: &str) -> &mut Self {
        self.data.clear();
        self.append_data(data)
    }

    /// Appends the lines of `data`. Empty lines are dropped, so `"a\n\nb"` adds two lines.
    pub fn append_data(&mut self, data: &str) -> &mut Self {
        self.data.extend(
            data.split('\n')
                .filter(|line| !line.is_empty())
                .map(str::to_owned),
        );
        self.invalidate();
        self
    }

    /// Appends bytes that are already in wire format and marks the buffer clean.
    ///
    /// Meant for rebuilding an event that was serialized elsewhere. Any structured
    /// mutation afterwards regenerates the buffer and discards what was written here.
    pub fn write_raw(&mut self, raw: &[u8]) -> usize {
        if !self.buf_set {
            self.buf.clear();
            self.pos = 0;
        }
        self.buf.extend_from_slice(raw);
        self.buf_set = true;
        raw.len()
    }

    /// Returns the full wire-format text, regenerating it first if the event changed.
    ///
    /// This does not move the read cursor used by the [`Read`] impl.
    pub fn render(&mut self) -> String {
        self.ensure_rendered();
        String::from_utf8_lossy(&self.buf).into_owned()
    }

    fn invalidate(&mut self) {
        self.buf_set = false;
    }

    fn ensure_rendered(&mut self) {
        if self.buf_set {
            return;
        }
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        encode(self, &mut buf);
        self.buf = buf;
        self.pos = 0;
        self.buf_set = true;
    }
}

fn encode(event: &Event, out: &mut Vec<u8>) {
    if !event.event.is_empty() {
        out.extend_from_slice(b"event: ");
        out.extend_from_slice(event.event.as_bytes());
        out.push(b'\n');
    }

    if !event.id.is_empty() {
        out.extend_from_slice(b"id: ");
        out.extend_from_slice(event.id.as_bytes());
        out.push(b'\n');
    }

    for line in &event.data {
        out.extend_from_slice(b"data: ");
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }

    if event.retry > 0 {
        out.extend_from_slice(b"retry: ");
        out.extend_from_slice(event.retry.to_string().as_bytes());
        out.push(b'\n');
    }

    out.push(b'\n');
}

impl Clone for Event {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            event: self.event.clone(),
            data: self.data.clone(),
            retry: self.retry,
            ..Self::default()
        }
    }
}

impl Read for Event {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.ensure_rendered();
        let remaining = &self.buf[self.pos..];
        let n = remaining.len().min(out.len());
        out[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Each write becomes one or more `data` lines, split on newlines.
impl Write for Event {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append_data(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.buf_set {
            return f.write_str(&String::from_utf8_lossy(&self.buf));
        }
        let mut out = Vec::new();
        encode(self, &mut out);
        f.write_str(&String::from_utf8_lossy(&out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick() -> Event {
        let mut event = Event::new();
        event.set_id("7").set_type("tick").append_data("hello");
        event
    }

    #[test]
    fn test_render_orders_fields() {
        assert_eq!(tick().render(), "event: tick\nid: 7\ndata: hello\n\n");
    }

    #[test]
    fn test_render_includes_retry_last() {
        let mut event = tick();
        event.set_retry(1500);
        assert_eq!(
            event.render(),
            "event: tick\nid: 7\ndata: hello\nretry: 1500\n\n"
        );
    }

    #[test]
    fn test_empty_event_is_a_blank_line() {
        assert_eq!(Event::new().render(), "\n");
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut event = tick();
        let first = event.render();
        let second = event.render();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mutation_discards_cached_bytes() {
        let mut event = tick();
        event.render();

        event.set_id("8");
        assert_eq!(event.render(), "event: tick\nid: 8\ndata: hello\n\n");

        event.set_type("tock");
        assert_eq!(event.render(), "event: tock\nid: 8\ndata: hello\n\n");

        event.set_retry(10);
        assert_eq!(
            event.render(),
            "event: tock\nid: 8\ndata: hello\nretry: 10\n\n"
        );

        event.set_data("bye");
        assert_eq!(
            event.render(),
            "event: tock\nid: 8\ndata: bye\nretry: 10\n\n"
        );

        event.write_all(b"again").unwrap();
        assert_eq!(
            event.render(),
            "event: tock\nid: 8\ndata: bye\ndata: again\nretry: 10\n\n"
        );
    }

    #[test]
    fn test_append_data_drops_empty_lines() {
        let mut event = Event::new();
        event.append_data("a\n\nb");
        assert_eq!(event.data(), &["a".to_string(), "b".to_string()]);
        assert_eq!(event.render(), "data: a\ndata: b\n\n");
    }

    #[test]
    fn test_set_data_replaces_lines() {
        let mut event = Event::new();
        event.append_data("one\ntwo");
        event.set_data("three\n");
        assert_eq!(event.data(), &["three".to_string()]);
    }

    #[test]
    fn test_write_reports_all_bytes_accepted() {
        let mut event = Event::new();
        let written = event.write(b"x\n\ny\n").unwrap();
        assert_eq!(written, 5);
        assert_eq!(event.data().len(), 2);
    }

    #[test]
    fn test_partial_reads_then_end_of_stream() {
        let mut event = tick();
        let expected = b"event: tick\nid: 7\ndata: hello\n\n";

        let mut out = Vec::new();
        let mut chunk = [0u8; 4];
        loop {
            let n = event.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(out, expected);

        // Exhausted until the next mutation.
        assert_eq!(event.read(&mut chunk).unwrap(), 0);

        event.set_id("9");
        let mut again = String::new();
        event.read_to_string(&mut again).unwrap();
        assert_eq!(again, "event: tick\nid: 9\ndata: hello\n\n");
    }

    #[test]
    fn test_render_does_not_consume_reader() {
        let mut event = tick();
        event.render();
        let mut out = String::new();
        event.read_to_string(&mut out).unwrap();
        assert_eq!(out, event.render());
    }

    #[test]
    fn test_write_raw_bypasses_structured_fields() {
        let mut event = Event::new();
        event.write_raw(b"event: raw\n");
        event.write_raw(b"data: copied\n\n");
        assert_eq!(event.render(), "event: raw\ndata: copied\n\n");
        assert!(event.data().is_empty());

        // Structured mutation regenerates from fields and drops the raw bytes.
        event.append_data("fresh");
        assert_eq!(event.render(), "data: fresh\n\n");
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = tick();
        let mut copy = original.clone();

        copy.set_id("99").append_data("more");
        assert_eq!(original.render(), "event: tick\nid: 7\ndata: hello\n\n");

        original.set_type("changed");
        assert_eq!(
            copy.render(),
            "event: tick\nid: 99\ndata: hello\ndata: more\n\n"
        );
    }

    #[test]
    fn test_clone_does_not_copy_read_cursor() {
        let mut original = tick();
        let mut sink = Vec::new();
        original.read_to_end(&mut sink).unwrap();

        let mut copy = original.clone();
        let mut out = String::new();
        copy.read_to_string(&mut out).unwrap();
        assert_eq!(out, "event: tick\nid: 7\ndata: hello\n\n");
    }

    #[test]
    fn test_display_matches_render() {
        let mut event = tick();
        assert_eq!(event.to_string(), event.render());
    }
}
