use std::sync::Arc;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use crate::config::{Destination, UploaderConfig};
use crate::core::{FileInfo, Result, UploadError, UploadEvent, UploadFile, UploadState, UploadStatus, UrlSource};
use crate::presign::{PresignedUrlFetcher, StaticUrl};
use crate::uploaders::{PresignedUpload, UploadStream};

/// Host-facing uploader: resolves the destination, runs one upload per
/// selected file and keeps the outcome of every finished attempt.
#[derive(Clone)]
pub struct PresignedUploader {
    client: Client,
    config: Arc<UploaderConfig>,
    source: Arc<dyn UrlSource>,
    completed: Arc<Mutex<Vec<UploadState>>>,
    event_tx: broadcast::Sender<UploadEvent>,
}

impl PresignedUploader {
    pub fn new(config: UploaderConfig) -> Result<Self> {
        let destination = config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| UploadError::config(format!("Failed to build http client: {}", err)))?;

        let source: Arc<dyn UrlSource> = match destination {
            Destination::Presigned(url) => Arc::new(StaticUrl::new(url)),
            Destination::Server { endpoint, prefix } => Arc::new(
                PresignedUrlFetcher::new(client.clone(), &endpoint)?
                    .with_headers(config.header_map()?)
                    .with_prefix(prefix),
            ),
        };

        Ok(Self::with_source(client, config, source))
    }

    /// Use a custom destination resolver instead of the one the config describes
    pub fn with_source(client: Client, config: UploaderConfig, source: Arc<dyn UrlSource>) -> Self {
        // Up to 256 buffered events per subscriber
        let (event_tx, _) = broadcast::channel(256);

        Self {
            client,
            config: Arc::new(config),
            source,
            completed: Arc::new(Mutex::new(Vec::new())),
            event_tx,
        }
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.event_tx.subscribe()
    }

    /// Final snapshots of every finished attempt, oldest first
    pub async fn completed(&self) -> Vec<UploadState> {
        self.completed.lock().await.clone()
    }

    /// The `file_types` filter, for selection UIs. Uploads do not enforce it.
    pub fn accepts(&self, file: &FileInfo) -> bool {
        self.config.accepts(file)
    }

    /// Resolve the destination for `file` and return its snapshot stream.
    ///
    /// Every snapshot is also published as [`UploadEvent::State`]; the final
    /// one is appended to [`completed`](Self::completed) and published as
    /// [`UploadEvent::Completed`].
    pub async fn upload(&self, file: UploadFile, cancel: CancellationToken) -> Result<UploadStream> {
        let url = self.source.presigned_url(&file.info).await?;
        debug!(file = %file.info.name, "presigned url resolved");

        let states = PresignedUpload::new(self.client.clone(), url, file)
            .method(self.config.method)
            .cancel_token(cancel)
            .emit_done_marker(self.config.emit_done_marker)
            .into_stream();

        let recorder = self.clone();
        let stream = states.then(move |item| {
            let recorder = recorder.clone();
            async move {
                if let Ok(state) = &item {
                    recorder.record(state).await;
                }
                item
            }
        });

        Ok(UploadStream::from_boxed(stream.boxed()))
    }

    /// Handle a file selection: the first file is uploaded, the rest ignored.
    ///
    /// Returns the last snapshot, or `None` for an empty selection.
    pub async fn select_files(
        &self,
        files: impl IntoIterator<Item = UploadFile>,
        cancel: CancellationToken,
    ) -> Result<Option<UploadState>> {
        let Some(file) = files.into_iter().next() else {
            return Ok(None);
        };

        let mut stream = self.upload(file, cancel).await?;
        let mut last = None;
        while let Some(state) = stream.next().await {
            last = Some(state?);
        }

        Ok(last)
    }

    async fn record(&self, state: &UploadState) {
        let _ = self.event_tx.send(UploadEvent::State(state.clone()));

        // A `done` marker is followed by the real outcome
        if !state.is_terminal() || state.status == UploadStatus::Done {
            return;
        }

        info!(file = %state.file.name, status = %state.status, "upload finished");
        let completed = {
            let mut completed = self.completed.lock().await;
            completed.push(state.clone());
            completed.clone()
        };
        let _ = self.event_tx.send(UploadEvent::Completed(completed));
    }
}
