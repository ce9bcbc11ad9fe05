//! Host scheduler: turns invalidations into raster passes.
//!
//! Threads:
//!   The thread calling [`Scheduler::run`] is the interactive thread. It owns
//!   the config, the scroll state, the coordinator protocol and the cache. A
//!   single worker thread (spawned inside `thread::scope`) runs passes.
//!
//! Channels:
//!   Everything inbound arrives on one channel: host invalidations through an
//!   [`Invalidator`], and finished passes from the worker. The engine travels
//!   to the worker inside the job and comes back inside the result, so the
//!   image is never shared.
//!
//! Flow:
//!   invalidation → debounce → snapshot → `RenderCoordinator::request`
//!   → worker `RasterEngine::update` → result → `release` → painter.
//!   A release that reports dirty schedules the follow-up pass immediately.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use log::{debug, error, info, trace, warn};

use crate::cache::MinimapCache;
use crate::config::{Config, RenderConfig};
use crate::coordinator::RenderCoordinator;
use crate::highlight;
use crate::image::MinimapImage;
use crate::raster::{PassOutcome, RasterEngine, RasterError, RenderInput};
use crate::scroll::{ScrollState, Viewport};
use crate::source::{DocumentText, FoldQuery, FoldSet, SoftWraps, TextBuffer, Token};
use crate::theme::Theme;

/// Why the minimap needs attention.
#[derive(Debug, Clone)]
pub enum Invalidation {
    /// Document text changed. Cancels a running pass.
    Edit,
    Resize,
    Fold,
    Caret,
    Bookmark,
    /// Editor scrolled; only the visible window moves.
    Scroll(Viewport),
    ConfigChanged(Box<Config>),
    /// View hidden; the buffer is evicted.
    Deactivated,
    MemoryPressure,
    Shutdown,
}

/// Owned copy of everything a pass reads, taken on the interactive thread.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub text: TextBuffer,
    pub tokens: Vec<Token>,
    pub folds: FoldSet,
    pub soft_wraps: SoftWraps,
}

impl Snapshot {
    /// Highlight `source` with `theme`, optionally wrapping at `wrap_at`
    /// columns and collapsing inclusive line ranges.
    pub fn highlighted(
        source: &str,
        theme: &Theme,
        wrap_at: Option<usize>,
        folded_lines: &[(usize, usize)],
    ) -> Self {
        let text = TextBuffer::new(source);
        let tokens = highlight::tokenize(source, theme);
        let folds = FoldSet::from_line_ranges(&text, folded_lines);
        let mut soft_wraps = match wrap_at {
            Some(cols) => SoftWraps::at_column(&text, cols),
            None => SoftWraps::none(),
        };
        soft_wraps.retain_visible(&folds);
        Self {
            text,
            tokens,
            folds,
            soft_wraps,
        }
    }

    pub fn input(&self) -> RenderInput<'_> {
        RenderInput {
            text: &self.text,
            tokens: &self.tokens,
            folds: &self.folds,
            soft_wraps: &self.soft_wraps,
        }
    }

    /// Lines on screen: source lines plus soft wraps minus folded lines.
    pub fn visual_line_count(&self) -> usize {
        let folded = self.folded_lines_before(usize::MAX);
        (self.text.line_count() + self.soft_wraps.len()).saturating_sub(folded)
    }

    /// Visual line showing the start of source `line`. A line hidden in a
    /// fold maps to the fold's first line.
    pub fn visual_line(&self, line: usize) -> usize {
        let mut offset = self.text.line_start(line);
        if let Some(region) = self.folds.collapsed_region_at(offset) {
            offset = region.start;
        }
        (self.text.line_number(offset) + self.soft_wraps.breaks_before(offset))
            .saturating_sub(self.folded_lines_before(offset))
    }

    /// Source lines hidden by folds that end at or before `offset`.
    fn folded_lines_before(&self, offset: usize) -> usize {
        self.folds
            .regions()
            .iter()
            .take_while(|r| r.end <= offset)
            .map(|r| {
                self.text
                    .line_number(r.end)
                    .saturating_sub(self.text.line_number(r.start))
            })
            .sum()
    }
}

/// Where the scheduler gets document state from.
pub trait DocumentSource {
    fn snapshot(&mut self) -> anyhow::Result<Snapshot>;
}

impl<F> DocumentSource for F
where
    F: FnMut() -> anyhow::Result<Snapshot>,
{
    fn snapshot(&mut self) -> anyhow::Result<Snapshot> {
        self()
    }
}

/// A completed minimap, handed to the painter.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub image: &'a MinimapImage,
    pub scroll: ScrollState,
    pub outcome: PassOutcome,
}

enum Event {
    Invalidation(Invalidation),
    Finished(PassResult),
}

/// Cloneable sending half of the scheduler's inbound channel.
#[derive(Clone)]
pub struct Invalidator {
    tx: mpsc::Sender<Event>,
}

impl Invalidator {
    /// Returns `false` once the scheduler has stopped.
    pub fn send(&self, invalidation: Invalidation) -> bool {
        self.tx.send(Event::Invalidation(invalidation)).is_ok()
    }
}

struct Job {
    engine: RasterEngine,
    snapshot: Snapshot,
    scroll: ScrollState,
    config: RenderConfig,
    cancel: Arc<AtomicBool>,
}

struct PassResult {
    engine: RasterEngine,
    outcome: Result<PassOutcome, RasterError>,
    elapsed_ms: f64,
}

pub struct Scheduler<S: DocumentSource> {
    config: Config,
    source: S,
    coordinator: Arc<RenderCoordinator>,
    cache: MinimapCache,
    viewport: Viewport,
    scroll: ScrollState,
    last_outcome: PassOutcome,
    /// When the next pass should be dispatched.
    pending: Option<Instant>,
    /// Allocation failure backoff.
    retry_at: Option<Instant>,
    /// Cancel flag of the pass on the worker.
    in_flight: Option<Arc<AtomicBool>>,
    passes: u64,
    tx: mpsc::Sender<Event>,
    rx: mpsc::Receiver<Event>,
}

impl<S: DocumentSource> Scheduler<S> {
    pub fn new(config: Config, source: S, viewport: Viewport) -> (Self, Invalidator) {
        let (tx, rx) = mpsc::channel();
        let invalidator = Invalidator { tx: tx.clone() };
        let scheduler = Self {
            config,
            source,
            coordinator: Arc::new(RenderCoordinator::new()),
            cache: MinimapCache::new(),
            viewport,
            scroll: ScrollState::new(),
            last_outcome: PassOutcome::Completed,
            pending: None,
            retry_at: None,
            in_flight: None,
            passes: 0,
            tx,
            rx,
        };
        (scheduler, invalidator)
    }

    /// Shared coordinator, e.g. for a paint path that shows a busy state.
    pub fn coordinator(&self) -> Arc<RenderCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Run until [`Invalidation::Shutdown`]. An initial pass is scheduled
    /// right away. `paint` is called on this thread for every completed pass
    /// and every scroll.
    pub fn run(mut self, mut paint: impl FnMut(Frame<'_>)) -> anyhow::Result<u64> {
        info!("scheduler: started");
        self.pending = Some(Instant::now());

        thread::scope(|s| {
            let (job_tx, job_rx) = mpsc::channel::<Job>();
            let results = self.tx.clone();
            s.spawn(move || worker(job_rx, results));

            loop {
                let deadline = [self.pending, self.retry_at].into_iter().flatten().min();
                let event = match deadline {
                    Some(d) => match self.rx.recv_timeout(d.saturating_duration_since(Instant::now())) {
                        Ok(ev) => Some(ev),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    },
                    // self.tx keeps the channel open, so this only ends on Shutdown.
                    None => match self.rx.recv() {
                        Ok(ev) => Some(ev),
                        Err(_) => break,
                    },
                };

                match event {
                    Some(Event::Invalidation(inv)) => {
                        if self.handle(inv, &mut paint).is_break() {
                            break;
                        }
                    }
                    Some(Event::Finished(result)) => self.finish(result, &mut paint),
                    None => {}
                }

                let now = Instant::now();
                if self.retry_at.is_some_and(|t| t <= now) {
                    self.retry_at = None;
                    self.pending = Some(now);
                }
                if self.pending.is_some_and(|t| t <= now) {
                    self.pending = None;
                    self.dispatch(&job_tx);
                }
            }
            // job_tx drops here; the worker finishes its pass and exits.
        });

        self.coordinator.reset();
        info!("scheduler: stopped after {} passes", self.passes);
        Ok(self.passes)
    }

    /// Debounce a pass request.
    fn schedule(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(Instant::now() + self.config.scheduler.debounce);
        }
    }

    fn handle(&mut self, inv: Invalidation, paint: &mut impl FnMut(Frame<'_>)) -> ControlFlow<()> {
        trace!("scheduler: {inv:?}");
        match inv {
            Invalidation::Edit => {
                self.cancel_in_flight();
                self.schedule();
            }
            Invalidation::Resize
            | Invalidation::Fold
            | Invalidation::Caret
            | Invalidation::Bookmark => self.schedule(),
            Invalidation::Scroll(viewport) => {
                self.viewport = viewport;
                self.scroll.recompute_visible(&viewport);
                self.publish(paint);
            }
            Invalidation::ConfigChanged(config) => {
                let rerender = config.render_config() != self.config.render_config()
                    || config.disabled != self.config.disabled;
                self.config = *config;
                if rerender {
                    self.cancel_in_flight();
                    self.schedule();
                }
            }
            Invalidation::Deactivated | Invalidation::MemoryPressure => {
                if self.cache.evict() {
                    debug!("scheduler: buffer evicted");
                }
            }
            Invalidation::Shutdown => {
                self.cancel_in_flight();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn cancel_in_flight(&self) {
        if let Some(cancel) = &self.in_flight {
            cancel.store(true, Ordering::Relaxed);
        }
    }

    /// Snapshot the document and hand a pass to the worker, or mark the
    /// running pass dirty.
    fn dispatch(&mut self, jobs: &mpsc::Sender<Job>) {
        let snapshot = match self.source.snapshot() {
            Ok(s) => s,
            Err(e) => {
                error!("scheduler: failed to snapshot document: {e:#}");
                return;
            }
        };
        if self.config.is_disabled_for(snapshot.text.len()) {
            debug!(
                "scheduler: minimap disabled ({} chars, limit {})",
                snapshot.text.len(),
                self.config.max_document_chars
            );
            self.cache.evict();
            return;
        }
        if !self.coordinator.request() {
            trace!("scheduler: pass running, marked dirty");
            return;
        }
        let Some(engine) = self.cache.take() else {
            warn!("scheduler: engine already out for a pass");
            self.coordinator.release();
            return;
        };

        let config = self.config.render_config();
        self.scroll.compute_dimensions(snapshot.visual_line_count(), &config);
        self.scroll.recompute_visible(&self.viewport);

        let cancel = Arc::new(AtomicBool::new(false));
        self.in_flight = Some(Arc::clone(&cancel));
        let job = Job {
            engine,
            snapshot,
            scroll: self.scroll,
            config,
            cancel,
        };
        if let Err(mpsc::SendError(job)) = jobs.send(job) {
            error!("scheduler: worker is gone");
            self.cache.restore(job.engine);
            self.in_flight = None;
            self.coordinator.release();
        }
    }

    fn finish(&mut self, result: PassResult, paint: &mut impl FnMut(Frame<'_>)) {
        self.in_flight = None;
        self.cache.restore(result.engine);
        self.passes += 1;

        let again = match result.outcome {
            Ok(PassOutcome::Cancelled) => {
                debug!("scheduler: pass cancelled after {:.1}ms", result.elapsed_ms);
                self.coordinator.release_cancelled()
            }
            Ok(outcome) => {
                debug!("scheduler: pass {outcome:?} in {:.1}ms", result.elapsed_ms);
                self.last_outcome = outcome;
                let again = self.coordinator.release();
                self.publish(paint);
                again
            }
            Err(e @ RasterError::Allocation { .. }) => {
                error!("scheduler: {e}, retrying in {:?}", self.config.scheduler.retry);
                self.retry_at = Some(Instant::now() + self.config.scheduler.retry);
                self.coordinator.release();
                false
            }
            Err(e) => {
                error!("scheduler: {e}");
                self.coordinator.release()
            }
        };
        if again {
            self.pending = Some(Instant::now());
        }
    }

    fn publish(&self, paint: &mut impl FnMut(Frame<'_>)) {
        if let Some(image) = self.cache.image() {
            paint(Frame {
                image,
                scroll: self.scroll,
                outcome: self.last_outcome,
            });
        }
    }
}

fn worker(jobs: mpsc::Receiver<Job>, results: mpsc::Sender<Event>) {
    debug!("scheduler worker: started");
    while let Ok(job) = jobs.recv() {
        let Job {
            mut engine,
            snapshot,
            scroll,
            config,
            cancel,
        } = job;
        let start = Instant::now();
        let outcome = engine.update(&snapshot.input(), &scroll, &config, || {
            cancel.load(Ordering::Relaxed)
        });
        let result = PassResult {
            engine,
            outcome,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        };
        if results.send(Event::Finished(result)).is_err() {
            break;
        }
    }
    debug!("scheduler worker: channel closed, exiting");
}
