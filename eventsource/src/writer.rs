//! The transport side of an event stream.
//!
//! A [`ResponseWriter`] is what a [`crate::Client`] needs from one outbound HTTP response:
//! somewhere to put headers, a byte sink, an explicit flush, and a way to learn that the
//! peer went away. [`BodyWriter`] implements it on top of an axum streaming body.

use async_stream::stream;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::HeaderMap;
use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::io;
use tokio::sync::{mpsc, oneshot};

/// Body frames buffered between the delivery worker and hyper.
const FRAME_BUFFER: usize = 8;

/// Resolves once the peer has disconnected.
pub type CloseNotify = BoxFuture<'static, ()>;

#[async_trait]
pub trait ResponseWriter: Send + 'static {
    /// Response headers. Only changes made before the first flush reach the peer.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Whether [`ResponseWriter::flush`] actually pushes buffered output to the peer.
    fn can_flush(&self) -> bool;

    async fn flush(&mut self) -> io::Result<()>;

    /// A future that resolves when the peer disconnects, or `None` if this transport
    /// cannot tell.
    fn close_notify(&mut self) -> Option<CloseNotify>;
}

/// Writer feeding an axum response body through a bounded channel.
///
/// Writes are buffered; each flush sends the buffered bytes as one body frame. The first
/// flush also hands the response headers to whoever is building the response. The body
/// ends once the writer (and every close notification it handed out) is dropped.
pub struct BodyWriter {
    headers: HeaderMap,
    head: Option<oneshot::Sender<HeaderMap>>,
    frames: mpsc::Sender<Bytes>,
    pending: BytesMut,
}

impl BodyWriter {
    /// Returns the writer, the receiver for the response head, and the receiver for body
    /// frames. Turn the latter into a [`Body`] with [`into_body`].
    pub fn channel() -> (Self, oneshot::Receiver<HeaderMap>, mpsc::Receiver<Bytes>) {
        let (head_tx, head_rx) = oneshot::channel();
        let (frames_tx, frames_rx) = mpsc::channel(FRAME_BUFFER);

        let writer = Self {
            headers: HeaderMap::new(),
            head: Some(head_tx),
            frames: frames_tx,
            pending: BytesMut::new(),
        };

        (writer, head_rx, frames_rx)
    }

    fn broken_pipe() -> io::Error {
        io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped")
    }
}

#[async_trait]
impl ResponseWriter for BodyWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.frames.is_closed() {
            return Err(Self::broken_pipe());
        }
        self.pending.extend_from_slice(buf);
        Ok(())
    }

    fn can_flush(&self) -> bool {
        true
    }

    async fn flush(&mut self) -> io::Result<()> {
        if let Some(head) = self.head.take() {
            // Nobody waiting for the head means nobody is serving this response either.
            head.send(self.headers.clone())
                .map_err(|_| Self::broken_pipe())?;
        }

        if self.pending.is_empty() {
            return Ok(());
        }

        let frame = self.pending.split().freeze();
        self.frames
            .send(frame)
            .await
            .map_err(|_| Self::broken_pipe())
    }

    fn close_notify(&mut self) -> Option<CloseNotify> {
        let frames = self.frames.clone();
        Some(Box::pin(async move { frames.closed().await }))
    }
}

/// Streams body frames until every sender is gone.
pub fn into_body(mut frames: mpsc::Receiver<Bytes>) -> Body {
    Body::from_stream(stream! {
        while let Some(frame) = frames.recv().await {
            yield Ok::<_, Infallible>(frame);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[tokio::test]
    async fn test_first_flush_sends_head_without_a_frame() {
        let (mut writer, head, mut frames) = BodyWriter::channel();
        writer.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/event-stream"),
        );
        writer.flush().await.unwrap();

        let head = head.await.unwrap();
        assert_eq!(head[header::CONTENT_TYPE], "text/event-stream");
        assert!(frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_flush_sends_buffered_writes_as_one_frame() {
        let (mut writer, _head, mut frames) = BodyWriter::channel();
        writer.write_all(b"data: a\n").await.unwrap();
        writer.write_all(b"\n").await.unwrap();
        writer.flush().await.unwrap();

        assert_eq!(frames.recv().await.unwrap(), Bytes::from_static(b"data: a\n\n"));
    }

    #[tokio::test]
    async fn test_close_notify_fires_when_body_dropped() {
        let (mut writer, _head, frames) = BodyWriter::channel();
        let notify = writer.close_notify().unwrap();
        drop(frames);

        tokio::time::timeout(std::time::Duration::from_secs(1), notify)
            .await
            .expect("close notification should fire");
        assert!(writer.write_all(b"late").await.is_err());
    }
}
