//! Gallery archive export.
//!
//! [`Exporter::export`] checks the gallery and the caller on the request
//! task, takes one slot from the [`ExportLimiter`] and hands the archive
//! production to a blocking thread. The caller gets the reader end of the
//! pipe right away and streams it while the archive is being built.
//!
//! Outcome of a job, as seen by the consumer:
//! - completed: the stream ends normally after the gzip trailer
//! - failed: the stream's last item is an error
//! - consumer closed: nothing further is sent, nothing is logged as an error
//!
//! The job owns its permit and the writer end, so both are released when the
//! job ends no matter how it ends.

use std::{io, sync::Arc, time::Instant};

use flate2::Compression;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::access::{authorize_export, Principal};
use crate::archive::{self, ArchiveError, ArchiveSummary};
use crate::config::ExportConfig;
use crate::error::{AppError, AppResult, OptionExt};
use crate::metrics::Metrics;
use crate::store::{Gallery, GalleryStore, StoreError};

pub mod images;
pub mod limiter;
pub mod pipe;

pub use images::{collect_gallery_images, display_name, ImageEntry};
pub use limiter::{ExportLimiter, ExportPermit};
pub use pipe::{is_consumer_closed, pipe, ArchiveStream, ConsumerClosed, PipeWriter};

/// Message the consumer sees when a job fails. Details go to the log only.
const FAILURE_MESSAGE: &str = "archive export failed";

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub page_size: u32,
    pub pipe_capacity: usize,
    pub compression: Compression,
    pub retry_after_seconds: u64,
}

impl From<&ExportConfig> for ExportSettings {
    fn from(cfg: &ExportConfig) -> Self {
        Self {
            page_size: cfg.page_size,
            pipe_capacity: cfg.pipe_capacity,
            compression: Compression::new(cfg.compression_level),
            retry_after_seconds: cfg.retry_after_seconds,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

/// Lifecycle of one export job.
///
/// `Running` is the state for as long as the job thread is alive and is
/// never returned; the job's `JoinHandle` resolves to one of the three
/// terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    ImageSourceFailed,
    ConsumerDisconnected,
    CompletedOk,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("listing gallery images failed: {0}")]
    Listing(#[from] StoreError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl ExportError {
    pub fn is_consumer_closed(&self) -> bool {
        matches!(self, ExportError::Archive(ArchiveError::Sink(e)) if is_consumer_closed(e))
    }
}

#[derive(Clone)]
pub struct Exporter {
    store: Arc<dyn GalleryStore>,
    limiter: ExportLimiter,
    metrics: Metrics,
    settings: Arc<ExportSettings>,
}

impl Exporter {
    pub fn new(
        store: Arc<dyn GalleryStore>,
        limiter: ExportLimiter,
        metrics: Metrics,
        settings: ExportSettings,
    ) -> Self {
        Self { store, limiter, metrics, settings: Arc::new(settings) }
    }

    pub fn limiter(&self) -> &ExportLimiter {
        &self.limiter
    }

    /// Starts exporting `gallery_id` and returns the gallery together with
    /// the archive stream.
    ///
    /// Not-found and forbidden are decided before a slot is requested; a
    /// full limiter yields [`AppError::ExportBusy`] without starting work.
    pub async fn export(&self, principal: &Principal, gallery_id: i64) -> AppResult<(Gallery, ArchiveStream)> {
        let (gallery, stream, _job) = self.start(principal, gallery_id).await?;
        Ok((gallery, stream))
    }

    pub(crate) async fn start(
        &self,
        principal: &Principal,
        gallery_id: i64,
    ) -> AppResult<(Gallery, ArchiveStream, JoinHandle<JobState>)> {
        let (gallery, stream, job) = self.prepare(principal, gallery_id).await?;
        let rt = Handle::current();
        let handle = tokio::task::spawn_blocking(move || job.run(&rt));
        Ok((gallery, stream, handle))
    }

    /// Admission and setup; the returned job has not started producing.
    async fn prepare(&self, principal: &Principal, gallery_id: i64) -> AppResult<(Gallery, ArchiveStream, ExportJob)> {
        let gallery = self.store.get_gallery(gallery_id).await?.ok_or_not_found("gallery")?;
        authorize_export(principal, &gallery)?;

        let Some(permit) = self.limiter.try_acquire() else {
            self.metrics.inc_exports_rejected_busy();
            info!(gallery_id, capacity = self.limiter.capacity(), "export rejected: all slots busy");
            return Err(AppError::ExportBusy { retry_after_seconds: self.settings.retry_after_seconds });
        };

        let (writer, stream) = pipe(self.settings.pipe_capacity);
        let job = ExportJob {
            id: Uuid::new_v4(),
            gallery_id,
            store: self.store.clone(),
            settings: self.settings.clone(),
            metrics: self.metrics.clone(),
            writer,
            permit,
        };
        self.metrics.inc_exports_started();
        debug!(job_id = %job.id, gallery_id, "export job starting");
        Ok((gallery, stream, job))
    }
}

struct ExportJob {
    id: Uuid,
    gallery_id: i64,
    store: Arc<dyn GalleryStore>,
    settings: Arc<ExportSettings>,
    metrics: Metrics,
    writer: PipeWriter,
    permit: ExportPermit,
}

impl ExportJob {
    fn run(mut self, rt: &Handle) -> JobState {
        let span = tracing::info_span!("export", job_id = %self.id, gallery_id = self.gallery_id);
        let _enter = span.enter();
        let started = Instant::now();

        let result = self.produce(rt);
        let ExportJob { writer, permit, metrics, .. } = self;
        let bytes = writer.bytes_written();
        metrics.add_bytes(bytes);

        let state = match result {
            Ok(summary) => {
                writer.finish();
                metrics.inc_exports_completed();
                metrics.add_images(summary.entries as u64);
                info!(
                    entries = summary.entries,
                    content_bytes = summary.content_bytes,
                    bytes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "export completed"
                );
                JobState::CompletedOk
            }
            Err(e) if e.is_consumer_closed() => {
                drop(writer);
                metrics.inc_exports_abandoned();
                debug!(bytes, "export stream closed by consumer");
                JobState::ConsumerDisconnected
            }
            Err(e) => {
                error!(error = %e, bytes, "export failed");
                writer.close_with_error(io::Error::other(FAILURE_MESSAGE));
                metrics.inc_exports_failed();
                JobState::ImageSourceFailed
            }
        };

        // Writer end is closed above; the slot goes back last
        drop(permit);
        state
    }

    fn produce(&mut self, rt: &Handle) -> Result<ArchiveSummary, ExportError> {
        let images = rt.block_on(collect_gallery_images(
            self.store.as_ref(),
            self.gallery_id,
            self.settings.page_size,
        ))?;
        debug!(count = images.len(), "gallery images collected");

        let store = &self.store;
        let entries = images.into_iter().map(|image| ImageEntry::new(image, store.clone()));
        let (_, summary) = archive::encode(entries, &mut self.writer, self.settings.compression)?;
        Ok(summary)
    }
}
