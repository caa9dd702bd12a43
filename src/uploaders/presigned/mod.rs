//! Single-file upload to a presigned URL.
//!
//! [`PresignedUpload::into_stream`] yields one [`UploadState`] per lifecycle
//! event: `ready`, any number of `uploading`, then exactly one of `success`,
//! `error` or `cancelled`. Failures of the transfer itself come out as an
//! `Err` item instead of a snapshot, and end the stream.

use std::pin::Pin;
use std::task::{Context, Poll};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, Fuse, FusedStream};
use futures::{FutureExt, Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Response, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::{FileInfo, HttpMethod, Payload, Result, UploadError, UploadFile, UploadState};
use crate::progress::{memory_chunks, ProgressMeter, ProgressStream, DEFAULT_CHUNK_SIZE};

/// Response stored on a 200 with an empty body
pub const SUCCESS_MARKER: &str = "Success!";

/// One upload, configured but not started
pub struct PresignedUpload {
    client: Client,
    url: String,
    file: UploadFile,
    method: HttpMethod,
    headers: HeaderMap,
    cancel: CancellationToken,
    emit_done_marker: bool,
    chunk_size: usize,
}

impl PresignedUpload {
    pub fn new(client: Client, url: impl Into<String>, file: UploadFile) -> Self {
        Self {
            client,
            url: url.into(),
            file,
            method: HttpMethod::Put,
            headers: HeaderMap::new(),
            cancel: CancellationToken::new(),
            emit_done_marker: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Extra request headers, sent as-is to the storage
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Emit a `done` snapshot right before the final one
    pub fn emit_done_marker(mut self, enabled: bool) -> Self {
        self.emit_done_marker = enabled;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Nothing is sent until the returned stream is first polled.
    pub fn into_stream(self) -> UploadStream {
        UploadStream::from_boxed(stream::unfold(Step::Start(self), next_step).boxed())
    }

    /// Open the payload and build the request. Errors here are startup failures.
    async fn begin(self) -> Result<Transfer> {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();

        let body = match self.file.payload {
            Payload::Memory(data) => {
                Body::wrap_stream(ProgressStream::new(memory_chunks(data, self.chunk_size), progress_tx))
            }
            Payload::Path(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .map_err(|err| UploadError::startup(format!("{}: {}", path.display(), err)))?;
                let reader = ReaderStream::with_capacity(file, self.chunk_size);
                Body::wrap_stream(ProgressStream::new(reader, progress_tx))
            }
        };

        let mut headers = self.headers;
        headers.insert(CONTENT_LENGTH, HeaderValue::from(self.file.info.size));
        if let Some(content_type) = &self.file.info.content_type {
            if !headers.contains_key(CONTENT_TYPE) {
                let value = HeaderValue::from_str(content_type)
                    .map_err(|err| UploadError::startup(err.to_string()))?;
                headers.insert(CONTENT_TYPE, value);
            }
        }

        let request = self
            .client
            .request(self.method.into(), &self.url)
            .headers(headers)
            .body(body)
            .build()
            .map_err(|err| UploadError::startup(err.to_string()))?;

        debug!(url = %strip_query(&self.url), method = ?self.method, size = self.file.info.size, "upload started");

        Ok(Transfer {
            source: strip_query(&self.url).to_string(),
            meter: ProgressMeter::new(self.file.info.size),
            file: self.file.info,
            progress_rx,
            response: self.client.execute(request).boxed(),
            cancel: self.cancel,
            emit_done_marker: self.emit_done_marker,
        })
    }
}

enum Step {
    Start(PresignedUpload),
    Open(PresignedUpload),
    Transfer(Transfer),
    /// Final snapshot queued behind the `done` marker
    Pending(UploadState),
    Finished,
}

type Item = Result<UploadState>;

async fn next_step(step: Step) -> Option<(Item, Step)> {
    match step {
        Step::Start(upload) => {
            let ready = UploadState::ready(upload.file.info.clone());
            Some((Ok(ready), Step::Open(upload)))
        }
        Step::Open(upload) => match upload.begin().await {
            Ok(transfer) => Some(transfer.advance().await),
            Err(err) => {
                warn!(error = %err, "upload could not be started");
                Some((Err(err), Step::Finished))
            }
        },
        Step::Transfer(transfer) => Some(transfer.advance().await),
        Step::Pending(state) => Some((Ok(state), Step::Finished)),
        Step::Finished => None,
    }
}

/// An in-flight transfer
struct Transfer {
    file: FileInfo,
    source: String,
    meter: ProgressMeter,
    progress_rx: mpsc::UnboundedReceiver<u64>,
    response: BoxFuture<'static, reqwest::Result<Response>>,
    cancel: CancellationToken,
    emit_done_marker: bool,
}

impl Transfer {
    /// Wait for the next event worth a snapshot
    async fn advance(mut self) -> (Item, Step) {
        loop {
            tokio::select! {
                // Ticks already queued go out before the completion
                biased;

                Some(bytes) = self.progress_rx.recv() => {
                    if self.cancel.is_cancelled() {
                        return self.cancelled();
                    }
                    if let Some(progress) = self.meter.record(bytes) {
                        let state = UploadState::uploading(self.file.clone(), progress);
                        return (Ok(state), Step::Transfer(self));
                    }
                }
                result = &mut self.response => {
                    return self.complete(result).await;
                }
                _ = self.cancel.cancelled() => {
                    return self.cancelled();
                }
            }
        }
    }

    async fn complete(self, result: reqwest::Result<Response>) -> (Item, Step) {
        let response = match result {
            Ok(response) => response,
            Err(_) if self.cancel.is_cancelled() => return self.cancelled(),
            Err(err) => {
                warn!(error = %err, url = %self.source, "upload transport failed");
                return (Err(UploadError::Transport(err)), Step::Finished);
            }
        };

        let status = response.status();
        let body = tokio::select! {
            biased;

            body = response.text() => body,
            _ = self.cancel.cancelled() => return self.cancelled(),
        };
        let body = match body {
            Ok(body) => body,
            Err(_) if self.cancel.is_cancelled() => return self.cancelled(),
            Err(err) => {
                warn!(error = %err, url = %self.source, "reading upload response failed");
                return (Err(UploadError::Transport(err)), Step::Finished);
            }
        };

        // Cancellation requested before completion wins over the response
        if self.cancel.is_cancelled() {
            return self.cancelled();
        }

        let done = UploadState::done(self.file);
        let outcome = if status == StatusCode::OK {
            let response = if body.is_empty() {
                Value::String(SUCCESS_MARKER.to_string())
            } else {
                parse_body(body)
            };
            info!(url = %self.source, "upload succeeded");
            done.clone().into_success(self.source, response)
        } else {
            info!(url = %self.source, status = status.as_u16(), "storage rejected upload");
            done.clone().into_error(parse_body(body), format!("Storage responded with status {}", status))
        };

        settle(self.emit_done_marker, done, outcome)
    }

    fn cancelled(self) -> (Item, Step) {
        warn!(url = %self.source, bytes = self.meter.bytes_loaded(), "upload cancelled");
        let done = UploadState::done(self.file);
        let cancelled = done.clone().into_cancelled();
        settle(self.emit_done_marker, done, cancelled)
    }
}

fn settle(emit_done_marker: bool, done: UploadState, outcome: UploadState) -> (Item, Step) {
    if emit_done_marker {
        (Ok(done), Step::Pending(outcome))
    } else {
        (Ok(outcome), Step::Finished)
    }
}

/// JSON when it parses, the raw text otherwise
pub fn parse_body(body: String) -> Value {
    serde_json::from_str(&body).unwrap_or_else(|_| Value::String(body))
}

/// Destination without its query string (the signature)
pub fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(source, _)| source)
}

/// Upload with a fresh client. See [`PresignedUpload`] for the knobs.
pub fn upload(url: &str, file: UploadFile, method: HttpMethod, cancel: CancellationToken) -> UploadStream {
    PresignedUpload::new(Client::new(), url, file)
        .method(method)
        .cancel_token(cancel)
        .into_stream()
}

/// Stream of snapshots for one upload attempt
pub struct UploadStream {
    inner: Fuse<BoxStream<'static, Item>>,
}

impl UploadStream {
    pub(crate) fn from_boxed(inner: BoxStream<'static, Item>) -> Self {
        Self { inner: inner.fuse() }
    }
}

impl Stream for UploadStream {
    type Item = Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl FusedStream for UploadStream {
    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}
