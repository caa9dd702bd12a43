use std::pin::Pin;
use std::task::{Context, Poll};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use tokio::sync::mpsc;

/// 64KB
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

pin_project! {
    /// Request body wrapper that reports every chunk handed to the transport
    pub struct ProgressStream<S> {
        #[pin]
        inner: S,
        progress_tx: mpsc::UnboundedSender<u64>,
    }
}

impl<S> ProgressStream<S> {
    pub fn new(inner: S, progress_tx: mpsc::UnboundedSender<u64>) -> Self {
        Self { inner, progress_tx }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = std::io::Result<Bytes>>,
{
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if !chunk.is_empty() {
                    // The receiver is gone once the transfer settled
                    let _ = this.progress_tx.send(chunk.len() as u64);
                }

                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}

/// Split an in-memory payload into body chunks so it reports progress like a file does
pub fn memory_chunks(data: Bytes, chunk_size: usize) -> impl Stream<Item = std::io::Result<Bytes>> {
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<std::io::Result<Bytes>> = (0..data.len())
        .step_by(chunk_size)
        .map(|start| Ok(data.slice(start..(start + chunk_size).min(data.len()))))
        .collect();

    futures::stream::iter(chunks)
}
