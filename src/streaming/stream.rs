//! Pull-based stream of decoded frames
//!
//! Wraps any byte stream and yields one `text` array per frame. The inner
//! stream is polled only when no complete frame is buffered, so the
//! consumer's pace gates network reads.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use pin_project_lite::pin_project;

use super::parser::FrameDecoder;
use crate::errors::{ClientError, Result};

pin_project! {
    /// Stream of frames decoded from a NUL-delimited byte stream
    ///
    /// Ends after the first error or after the byte stream is exhausted.
    pub struct FrameStream<S> {
        #[pin]
        inner: S,
        decoder: FrameDecoder,
        frames: usize,
        done: bool,
    }
}

impl<S> FrameStream<S> {
    /// Wrap a byte stream
    pub fn new(inner: S) -> Self {
        Self::with_decoder(inner, FrameDecoder::new())
    }

    /// Wrap a byte stream with a preconfigured decoder
    pub fn with_decoder(inner: S, decoder: FrameDecoder) -> Self {
        Self {
            inner,
            decoder,
            frames: 0,
            done: false,
        }
    }

    /// Number of frames yielded so far
    pub fn frames_received(&self) -> usize {
        self.frames
    }

    /// True once the stream has ended, normally or with an error
    pub fn is_closed(&self) -> bool {
        self.done
    }
}

impl<S, E> Stream for FrameStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<ClientError>,
{
    type Item = Result<Vec<String>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.done {
            return Poll::Ready(None);
        }

        loop {
            match this.decoder.next_frame() {
                Ok(Some(text)) => {
                    *this.frames += 1;
                    return Poll::Ready(Some(Ok(text)));
                }
                Ok(None) => {}
                Err(e) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    if let Err(e) = this.decoder.push(&bytes) {
                        *this.done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
                Poll::Ready(None) => {
                    *this.done = true;
                    return match this.decoder.finish() {
                        Ok(()) => Poll::Ready(None),
                        Err(e) => Poll::Ready(Some(Err(e))),
                    };
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream::{self, StreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn chunks(
        parts: &[&[u8]],
    ) -> impl Stream<Item = std::result::Result<Bytes, ClientError>> + Unpin {
        let owned: Vec<_> = parts.iter().map(|p| Ok(Bytes::copy_from_slice(p))).collect();
        stream::iter(owned)
    }

    #[tokio::test]
    async fn test_frames_across_chunk_boundaries() {
        let source = chunks(&[
            b"{\"text\": [\"He",
            b"llo\"]}\0{\"text\": [\"Hello wo",
            b"rld\"]}",
            b"\0",
        ]);

        let frames: Vec<_> = FrameStream::new(source).collect().await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref().unwrap(), &vec!["Hello".to_string()]);
        assert_eq!(frames[1].as_ref().unwrap(), &vec!["Hello world".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_body_ends_cleanly() {
        let mut frames = FrameStream::new(chunks(&[]));
        assert!(frames.next().await.is_none());
        assert!(frames.is_closed());
        assert_eq!(frames.frames_received(), 0);
    }

    #[tokio::test]
    async fn test_mid_frame_drop_is_error() {
        let mut frames = FrameStream::new(chunks(&[b"{\"text\": [\"a\"]}\0{\"te"]));

        assert!(frames.next().await.unwrap().is_ok());
        assert!(matches!(
            frames.next().await,
            Some(Err(ClientError::TruncatedStream { buffered: 4 }))
        ));
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_frame_stops_stream() {
        let source = chunks(&[b"{\"text\": [\"a\"]}\0not json\0{\"text\": [\"ab\"]}\0"]);
        let results: Vec<_> = FrameStream::new(source).collect().await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ClientError::Decode(_))));
    }

    #[tokio::test]
    async fn test_transport_error_stops_stream() {
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"{\"text\": [\"a\"]}\0")),
            Err(ClientError::Timeout { duration_ms: 10 }),
            Ok(Bytes::from_static(b"{\"text\": [\"ab\"]}\0")),
        ]);
        let results: Vec<_> = FrameStream::new(source).collect().await;

        assert_eq!(results.len(), 2);
        assert!(results[1].as_ref().unwrap_err().is_timeout());
    }

    #[test]
    fn test_partial_frame_waits_for_more_bytes() {
        let source = stream::iter(vec![Ok::<_, ClientError>(Bytes::from_static(
            b"{\"text\": [\"a\"]}",
        ))])
        .chain(stream::pending());
        let mut frames = FrameStream::new(source);

        let mut next = tokio_test::task::spawn(frames.next());
        tokio_test::assert_pending!(next.poll());
        drop(next);

        assert!(!frames.is_closed());
        assert_eq!(frames.frames_received(), 0);
    }

    #[tokio::test]
    async fn test_does_not_read_ahead() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let source = stream::iter(0..10).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            let body = format!("{{\"text\": [\"{}\"]}}\0", i);
            Ok::<_, ClientError>(Bytes::from(body))
        });

        let mut frames = FrameStream::new(source);
        frames.next().await.unwrap().unwrap();
        frames.next().await.unwrap().unwrap();

        assert_eq!(pulled.load(Ordering::SeqCst), 2);
    }
}
