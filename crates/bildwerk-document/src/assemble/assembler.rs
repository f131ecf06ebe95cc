// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page assembler — drives one run: transform each image, solve its placement,
// hand the page to the document backend, and report progress.
//
// Runs are strictly sequential. The only suspension point per page is the
// decode/resample/encode step, which runs on tokio's blocking pool.
// Cancellation is checked before each image, so a page that has started is
// always completed before the run stops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::types::{PageSettings, RunEvent, RunOutput, RunStatus, SourceImage, TextAlign};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, instrument, warn};

use crate::image::transform::transform;
use crate::layout::solver::{SafeArea, solve};
use crate::pdf::sink::PageSink;

/// Cooperative cancellation flag shared between an assembler and its callers.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Request cancellation. The run stops before its next page.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates page assembly runs.
///
/// Cheaply cloneable: clones share run state, cancellation, and the event
/// channel, so a second `run` through any clone while one is in progress fails
/// with [`BildwerkError::AlreadyRunning`].
///
/// ```ignore
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// let assembler = PageAssembler::new().with_events(tx);
/// let output = assembler.run(batch.snapshot(), &settings, &mut PdfSink::new()).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct PageAssembler {
    status: Arc<Mutex<RunStatus>>,
    cancel: CancelHandle,
    events: Option<UnboundedSender<RunEvent>>,
}

impl PageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send progress and terminal events to `events`.
    pub fn with_events(mut self, events: UnboundedSender<RunEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn status(&self) -> RunStatus {
        *self.lock_status()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Return a finished assembler to `Idle`. Refused while a run is active.
    pub fn reset(&self) -> Result<()> {
        let mut status = self.lock_status();
        if *status == RunStatus::Running {
            return Err(BildwerkError::AlreadyRunning);
        }
        *status = RunStatus::Idle;
        self.cancel.clear();
        Ok(())
    }

    /// Convert `images` into one document, page `i` from image `i`.
    ///
    /// Taking the images by value freezes the order for the whole run. An
    /// empty list fails with [`BildwerkError::EmptyInput`] before the sink is
    /// touched. Any per-page failure aborts the run with
    /// [`BildwerkError::Processing`] and the sink is never finalized.
    #[instrument(skip_all, fields(page_count = images.len()))]
    pub async fn run<S: PageSink>(
        &self,
        images: Vec<SourceImage>,
        settings: &PageSettings,
        sink: &mut S,
    ) -> Result<RunOutput> {
        if images.is_empty() {
            return Err(BildwerkError::EmptyInput);
        }

        let mut guard = self.start()?;
        let result = self.run_pages(images, settings, sink).await;

        let terminal = match &result {
            Ok(_) => RunStatus::Completed,
            Err(BildwerkError::Cancelled { .. }) => RunStatus::Cancelled,
            Err(_) => RunStatus::Failed,
        };
        match &result {
            Ok(output) => info!(pages = output.page_count, bytes = output.bytes.len(), "Run completed"),
            Err(err) => error!(error = %err, ?terminal, "Run did not complete"),
        }
        guard.finish(terminal);
        self.emit(RunEvent::Finished(terminal));
        result
    }

    async fn run_pages<S: PageSink>(
        &self,
        images: Vec<SourceImage>,
        settings: &PageSettings,
        sink: &mut S,
    ) -> Result<RunOutput> {
        let page_count = images.len();
        let cap = settings.max_dimension_px;
        let quality = settings.jpeg_quality;
        let margin = SafeArea::new(settings.page_width_mm, settings.page_height_mm, settings.margin_mm).margin;

        sink.begin_document(settings)?;

        for (page_index, image) in images.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(completed_pages = page_index, "Run cancelled");
                return Err(BildwerkError::Cancelled {
                    completed_pages: page_index,
                });
            }
            self.emit(RunEvent::Progress {
                page_index,
                page_count,
            });

            let raster = tokio::task::spawn_blocking(move || transform(&image, cap, quality))
                .await
                .map_err(|err| task_failure(page_index, err))?
                .map_err(|err| BildwerkError::at_page(page_index, err))?;

            let placement = solve(
                raster.pixel_width as f32,
                raster.pixel_height as f32,
                settings.page_width_mm,
                settings.page_height_mm,
                settings.margin_mm,
                settings.fit_mode,
            );
            debug!(page = page_index + 1, ?placement, "Placement solved");

            sink.add_page(&raster, &placement, page_index, page_count)
                .map_err(|err| BildwerkError::at_page(page_index, err))?;

            if settings.numbering_enabled {
                let label = format!("{} / {}", page_index + 1, page_count);
                sink.annotate_text(
                    &label,
                    settings.page_width_mm - margin,
                    settings.page_height_mm - margin,
                    TextAlign::Right,
                )
                .map_err(|err| BildwerkError::at_page(page_index, err))?;
            }
        }

        let bytes = sink.finalize()?;
        Ok(RunOutput { bytes, page_count })
    }

    /// Move to `Running`, or refuse if a run is already active.
    fn start(&self) -> Result<RunGuard> {
        let mut status = self.lock_status();
        if *status == RunStatus::Running {
            warn!("Run requested while another is in progress");
            return Err(BildwerkError::AlreadyRunning);
        }
        if status.is_terminal() {
            debug!(previous = ?*status, "Resetting finished assembler");
        }
        *status = RunStatus::Running;
        Ok(RunGuard {
            status: Arc::clone(&self.status),
            cancel: self.cancel.clone(),
            finished: false,
        })
    }

    fn emit(&self, event: RunEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is listening.
            let _ = events.send(event);
        }
    }

    fn lock_status(&self) -> MutexGuard<'_, RunStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A transform task that panicked or was aborted, attributed to its page.
fn task_failure(page_index: usize, err: tokio::task::JoinError) -> BildwerkError {
    let reason = if err.is_panic() { "panicked" } else { "was cancelled" };
    error!(page = page_index + 1, reason, "Transform task failed");
    BildwerkError::at_page(page_index, BildwerkError::Task(format!("transform task {reason}")))
}

/// Leaves the assembler in a terminal state even if the run future is dropped
/// mid-flight.
struct RunGuard {
    status: Arc<Mutex<RunStatus>>,
    cancel: CancelHandle,
    finished: bool,
}

impl RunGuard {
    fn finish(&mut self, terminal: RunStatus) {
        self.set(terminal);
        self.finished = true;
    }

    fn set(&self, terminal: RunStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = terminal;
        self.cancel.clear();
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Run abandoned before completion");
            self.set(RunStatus::Cancelled);
        }
    }
}
