// Session orchestrator: owns the worker thread that runs the
// capture -> diff -> OCR -> merge -> style -> translate -> publish cycle.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};
use parking_lot::{Condvar, Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::config::{CaptureMode, PipelineSettings};
use crate::core::errors::{ConfigResult, PipelineError, PipelineResult};
use crate::core::languages;
use crate::core::types::{PipelineEvent, Region, SessionState, TextBlock};
use crate::services::capture::{CaptureBackend, CaptureFactory};
use crate::services::diff::ChangeDetector;
use crate::services::merge::merge_paragraph_lines;
use crate::services::ocr::{filter_lines, OcrBackend};
use crate::services::style::StyleSampler;
use crate::services::translation::{TranslationBackend, TranslationCache};
use crate::utils::stats::{PipelineStats, StatsSnapshot};

/// Floor on the inter-cycle pause so a slow cycle never busy-loops.
const MIN_CYCLE_PAUSE: Duration = Duration::from_millis(50);

/// How long `shutdown` waits for the worker before detaching it.
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(3);

/// The screen-translation session. Cheap to clone; all clones share one
/// worker, one cache and one event channel.
///
/// Lifecycle: `new` -> `initialize` -> `start` -> (`update_settings` /
/// `stop` / `start`)* -> `shutdown`. The engines (capture, OCR, translator,
/// change detector) live on a dedicated OS thread while a session runs,
/// because capture backends are typically bound to the thread that created
/// them. Settings changes never touch the engines directly: callers swap an
/// immutable snapshot and the worker reconciles it at the top of its next
/// cycle.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    settings: RwLock<Arc<PipelineSettings>>,
    state: Mutex<SessionState>,
    running: AtomicBool,
    cache: TranslationCache,
    stats: PipelineStats,
    events: mpsc::UnboundedSender<PipelineEvent>,
    /// Engine bundle, present while no worker owns it.
    engines: Mutex<Option<Engines>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    waiter: Waiter,
}

/// Everything the worker thread needs exclusive access to.
struct Engines {
    capture_factory: CaptureFactory,
    /// Constructed lazily on the worker thread, dropped on mode/monitor
    /// changes so the next cycle rebuilds it.
    capture: Option<Box<dyn CaptureBackend>>,
    ocr: Box<dyn OcrBackend>,
    translator: Box<dyn TranslationBackend>,
    detector: ChangeDetector,
    sampler: StyleSampler,
    /// Blocks from the last non-empty publication, republished on
    /// unchanged frames.
    last_blocks: Vec<TextBlock>,
    /// Most recent successful window-title resolution, reused when the
    /// window manager has nothing for us this cycle.
    last_window_region: Option<Region>,
    /// Consecutive empty grabs, for log rate limiting.
    null_frames: u32,
    /// The settings snapshot the engines currently reflect.
    applied: Arc<PipelineSettings>,
}

impl Pipeline {
    /// Build a pipeline around the given collaborators. Returns the handle
    /// and the receiving end of the event channel.
    pub fn new(
        settings: PipelineSettings,
        capture_factory: CaptureFactory,
        ocr: Box<dyn OcrBackend>,
        translator: Box<dyn TranslationBackend>,
    ) -> ConfigResult<(Self, mpsc::UnboundedReceiver<PipelineEvent>)> {
        settings.validate()?;
        let settings = Arc::new(settings);
        let (events, receiver) = mpsc::unbounded_channel();

        let engines = Engines {
            capture_factory,
            capture: None,
            ocr,
            translator,
            detector: ChangeDetector::new(settings.frame_diff_threshold),
            sampler: StyleSampler::new(),
            last_blocks: Vec::new(),
            last_window_region: None,
            null_frames: 0,
            applied: Arc::clone(&settings),
        };

        let inner = PipelineInner {
            cache: TranslationCache::new(settings.max_cache_size),
            settings: RwLock::new(settings),
            state: Mutex::new(SessionState::Idle),
            running: AtomicBool::new(false),
            stats: PipelineStats::new(),
            events,
            engines: Mutex::new(Some(engines)),
            worker: Mutex::new(None),
            waiter: Waiter::new(),
        };

        Ok((Self { inner: Arc::new(inner) }, receiver))
    }

    /// One-time engine setup: OCR language initialization and translation
    /// model load. Must be called before `start`, never while running.
    pub fn initialize(&self, model_dir: &Path) -> PipelineResult<()> {
        let settings = self.inner.settings.read().clone();
        let mut slot = self.inner.engines.lock();
        let engines = slot.as_mut().ok_or(PipelineError::WorkerActive)?;

        engines
            .ocr
            .initialize(languages::ocr_language_tag(&settings.source_language))
            .map_err(PipelineError::OcrInit)?;
        engines.translator.load(model_dir).map_err(PipelineError::ModelLoad)?;

        info!("pipeline initialized (model dir: {})", model_dir.display());
        Ok(())
    }

    /// Begin a translation session. No-op when one is already running.
    ///
    /// Waits at most [`WORKER_JOIN_TIMEOUT`] for a previous worker to hand
    /// the engines back; an immediate stop-then-start therefore blocks for
    /// the tail of the old worker's in-flight cycle, never indefinitely.
    pub fn start(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state == SessionState::Running {
                debug!("start ignored: session already running");
                return;
            }
            *state = SessionState::Running;
        }

        // A previous worker may still be winding down; wait for it to hand
        // the engines back before re-priming them.
        if let Some(handle) = self.inner.worker.lock().take() {
            let deadline = Instant::now() + WORKER_JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                error!("previous pipeline worker still busy after {WORKER_JOIN_TIMEOUT:?}, start aborted");
                *self.inner.worker.lock() = Some(handle);
                *self.inner.state.lock() = SessionState::Idle;
                return;
            }
        }

        let settings = self.inner.settings.read().clone();
        if let Some(engines) = self.inner.engines.lock().as_mut() {
            if let Some(mut capture) = engines.capture.take() {
                capture.stop();
            }
            engines.detector.reset();
            engines.last_blocks.clear();
            engines.last_window_region = None;
            engines.null_frames = 0;
            engines.applied = Arc::clone(&settings);
        }

        self.inner.running.store(true, Ordering::SeqCst);
        self.inner.waiter.arm();

        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name("screenlate-pipeline".to_string())
            .spawn(move || Self::worker_loop(inner));

        match spawned {
            Ok(handle) => {
                *self.inner.worker.lock() = Some(handle);
                let _ = self
                    .inner
                    .events
                    .send(PipelineEvent::Status("Translation active".to_string()));
                info!(
                    interval_ms = settings.update_interval_ms,
                    monitor = settings.capture_monitor,
                    mode = ?settings.capture_mode,
                    "pipeline started"
                );
            }
            Err(e) => {
                error!("failed to spawn pipeline worker: {e}");
                self.inner.running.store(false, Ordering::SeqCst);
                *self.inner.state.lock() = SessionState::Idle;
            }
        }
    }

    /// End the session: signal the worker, clear the overlay. Returns
    /// immediately; the worker finishes its current cycle in the background.
    pub fn stop(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state != SessionState::Running {
                return;
            }
            *state = SessionState::Idle;
        }

        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.waiter.interrupt();

        let _ = self.inner.events.send(PipelineEvent::Blocks(Vec::new()));
        let _ = self
            .inner
            .events
            .send(PipelineEvent::Status("Translation stopped".to_string()));
        info!("pipeline stopped");
    }

    /// Stop the session and release the capture backend, waiting up to
    /// [`WORKER_JOIN_TIMEOUT`] for the worker to exit.
    pub fn shutdown(&self) {
        self.stop();
        *self.inner.state.lock() = SessionState::Stopping;

        if let Some(handle) = self.inner.worker.lock().take() {
            let deadline = Instant::now() + WORKER_JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!("pipeline worker still busy after {WORKER_JOIN_TIMEOUT:?}, detaching");
            }
        }

        if let Some(engines) = self.inner.engines.lock().as_mut() {
            if let Some(mut capture) = engines.capture.take() {
                capture.stop();
            }
        }

        *self.inner.state.lock() = SessionState::Idle;
        info!("pipeline shut down");
    }

    /// Replace the settings snapshot. Validated here, applied by the worker
    /// at the top of its next cycle; a stopped pipeline picks the new
    /// snapshot up on the next `start`.
    pub fn update_settings(&self, settings: PipelineSettings) -> ConfigResult<()> {
        settings.validate()?;
        *self.inner.settings.write() = Arc::new(settings);
        debug!("settings snapshot swapped");
        Ok(())
    }

    /// The current settings snapshot.
    pub fn settings(&self) -> Arc<PipelineSettings> {
        self.inner.settings.read().clone()
    }

    /// Drop all cached translations. Callers do this when switching language
    /// pairs; keys embed both codes, so this is hygiene rather than a
    /// correctness requirement.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        info!("translation cache cleared");
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Counters for the session so far, including cache effectiveness.
    pub fn stats(&self) -> StatsSnapshot {
        let mut snapshot = self.inner.stats.snapshot();
        snapshot.cache_entries = self.inner.cache.len();
        snapshot.cache_hits = self.inner.cache.hits();
        snapshot.cache_misses = self.inner.cache.misses();
        snapshot.cache_hit_rate = self.inner.cache.hit_rate();
        snapshot
    }

    fn worker_loop(inner: Arc<PipelineInner>) {
        let mut engines = match inner.engines.lock().take() {
            Some(engines) => engines,
            None => {
                error!("pipeline worker started without engines, exiting");
                return;
            }
        };

        while inner.running.load(Ordering::SeqCst) {
            let cycle_start = Instant::now();
            let settings = inner.settings.read().clone();
            Self::apply_settings(&inner, &mut engines, &settings);

            if let Err(e) = Self::run_cycle(&inner, &mut engines, &settings) {
                error!("pipeline cycle failed: {e:#}");
                let _ = inner.events.send(PipelineEvent::Error(format!("{e:#}")));
            }

            let interval = Duration::from_millis(settings.update_interval_ms);
            let pause = interval.saturating_sub(cycle_start.elapsed()).max(MIN_CYCLE_PAUSE);
            inner.waiter.sleep(pause);
        }

        *inner.engines.lock() = Some(engines);
        info!("pipeline worker exited");
    }

    /// Reconcile the engines with the latest settings snapshot. Cheap knobs
    /// are pushed every cycle; structural changes (language, capture target)
    /// only when the snapshot actually changed.
    fn apply_settings(
        inner: &PipelineInner,
        engines: &mut Engines,
        settings: &Arc<PipelineSettings>,
    ) {
        engines.detector.threshold = settings.frame_diff_threshold;
        engines.ocr.set_confidence_floor(settings.ocr_confidence_threshold);
        inner.cache.set_capacity(settings.max_cache_size);

        if Arc::ptr_eq(&engines.applied, settings) {
            return;
        }
        let previous = std::mem::replace(&mut engines.applied, Arc::clone(settings));

        if previous.source_language != settings.source_language
            && settings.source_language != "auto"
        {
            engines.ocr.set_language(&settings.source_language);
        }

        let retarget = previous.capture_monitor != settings.capture_monitor
            || previous.capture_mode != settings.capture_mode;
        if retarget {
            info!(
                monitor = settings.capture_monitor,
                mode = ?settings.capture_mode,
                "capture target changed, rebuilding backend"
            );
            if let Some(mut capture) = engines.capture.take() {
                capture.stop();
            }
            engines.detector.reset();
            engines.last_window_region = None;
        }
    }

    fn run_cycle(
        inner: &PipelineInner,
        engines: &mut Engines,
        settings: &PipelineSettings,
    ) -> Result<()> {
        inner.stats.record_cycle();

        if engines.capture.is_none() {
            let mut backend = (engines.capture_factory)()?;
            backend.start(settings.capture_monitor)?;
            engines.capture = Some(backend);
        }

        // Where to grab, and the offset that maps frame coordinates back to
        // screen coordinates.
        let region = match settings.capture_mode {
            CaptureMode::FullScreen => None,
            CaptureMode::Region => Some(
                settings
                    .capture_region
                    .ok_or_else(|| anyhow!("region capture mode without a region"))?,
            ),
            CaptureMode::Window => {
                let title = settings.capture_window_title.as_deref().unwrap_or("");
                let Some(capture) = engines.capture.as_mut() else {
                    bail!("capture backend missing");
                };
                if let Some(resolved) = capture.resolve_window(title) {
                    engines.last_window_region = Some(resolved);
                }
                // Unresolvable window falls back to the last known position,
                // then to the full screen.
                engines.last_window_region
            }
        };
        let (offset_x, offset_y) = region.map_or((0, 0), |r| (r.x, r.y));

        let Some(capture) = engines.capture.as_mut() else {
            bail!("capture backend missing");
        };
        let grab_mode = if region.is_some() {
            CaptureMode::Region
        } else {
            CaptureMode::FullScreen
        };

        let frame = match capture.grab(grab_mode, region, settings.capture_monitor)? {
            Some(frame) => frame,
            None => {
                engines.null_frames += 1;
                inner.stats.record_null_frame();
                if engines.null_frames <= 3 || engines.null_frames % 20 == 0 {
                    warn!("capture produced no frame ({} in a row)", engines.null_frames);
                }
                return Ok(());
            }
        };
        if engines.null_frames > 0 {
            info!("capture recovered after {} empty grabs", engines.null_frames);
            engines.null_frames = 0;
        }

        if !engines.detector.has_changed(&frame) {
            inner.stats.record_skipped();
            if !engines.last_blocks.is_empty() {
                let _ = inner
                    .events
                    .send(PipelineEvent::Blocks(engines.last_blocks.clone()));
            }
            return Ok(());
        }

        // The screen changed under the overlay; blank it before the slow
        // stages so stale text never sits on top of new content.
        if !engines.last_blocks.is_empty() {
            engines.last_blocks.clear();
            let _ = inner.events.send(PipelineEvent::Blocks(Vec::new()));
        }

        inner.stats.record_ocr_call();
        let lines = engines.ocr.detect(&frame, offset_x, offset_y)?;
        let mut blocks = merge_paragraph_lines(filter_lines(lines));
        if blocks.is_empty() {
            debug!("no translatable text this cycle");
            engines.last_blocks.clear();
            let _ = inner.events.send(PipelineEvent::Blocks(Vec::new()));
            return Ok(());
        }

        // Style sampling works in frame coordinates.
        let mut relative: Vec<TextBlock> =
            blocks.iter().map(|b| b.offset(-offset_x, -offset_y)).collect();
        engines.sampler.extract(&frame, &mut relative);
        for (block, sampled) in blocks.iter_mut().zip(&relative) {
            block.fg_color = sampled.fg_color;
            block.bg_color = sampled.bg_color;
        }

        Self::translate_blocks(inner, engines, settings, &mut blocks)?;

        engines.last_blocks = blocks.clone();
        inner.stats.record_published(blocks.len());
        let _ = inner.events.send(PipelineEvent::Blocks(blocks));
        Ok(())
    }

    /// Fill in `translation` on every block: cache hits directly, misses via
    /// one deduplicated batch call. Repeated text within a frame is requested
    /// once and fanned out to every block that carries it.
    fn translate_blocks(
        inner: &PipelineInner,
        engines: &mut Engines,
        settings: &PipelineSettings,
        blocks: &mut [TextBlock],
    ) -> Result<()> {
        let source = languages::effective_source(&settings.source_language).to_string();
        let target = &settings.target_language;

        let mut pending: Vec<(String, Vec<usize>)> = Vec::new();
        let mut slot_of: HashMap<String, usize> = HashMap::new();

        for (i, block) in blocks.iter_mut().enumerate() {
            if let Some(hit) = inner.cache.get(&block.text, &source, target) {
                block.translation = Some(hit);
            } else {
                match slot_of.get(&block.text) {
                    Some(&slot) => pending[slot].1.push(i),
                    None => {
                        slot_of.insert(block.text.clone(), pending.len());
                        pending.push((block.text.clone(), vec![i]));
                    }
                }
            }
        }

        if pending.is_empty() {
            return Ok(());
        }

        inner.stats.record_translation_call();
        let texts: Vec<String> = pending.iter().map(|(text, _)| text.clone()).collect();
        let translations = engines.translator.translate_batch(&texts, &source, target)?;
        if translations.len() != texts.len() {
            bail!(
                "translator returned {} results for {} texts",
                translations.len(),
                texts.len()
            );
        }

        for ((text, indices), translation) in pending.into_iter().zip(translations) {
            inner.cache.put(&text, &source, target, &translation);
            for i in indices {
                blocks[i].translation = Some(translation.clone());
            }
        }
        Ok(())
    }
}

/// Interruptible inter-cycle sleep, so `stop` never waits out a long
/// interval.
struct Waiter {
    interrupted: Mutex<bool>,
    cv: Condvar,
}

impl Waiter {
    fn new() -> Self {
        Self {
            interrupted: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Clear a previous interruption before a new session.
    fn arm(&self) {
        *self.interrupted.lock() = false;
    }

    fn interrupt(&self) {
        *self.interrupted.lock() = true;
        self.cv.notify_all();
    }

    /// Sleep for `dur` or until interrupted, whichever comes first.
    fn sleep(&self, dur: Duration) {
        let mut interrupted = self.interrupted.lock();
        if !*interrupted {
            self.cv.wait_for(&mut interrupted, dur);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    struct NoopCapture;

    impl CaptureBackend for NoopCapture {
        fn start(&mut self, _monitor: usize) -> Result<()> {
            Ok(())
        }
        fn grab(
            &mut self,
            _mode: CaptureMode,
            _region: Option<Region>,
            _monitor: usize,
        ) -> Result<Option<RgbImage>> {
            Ok(None)
        }
        fn stop(&mut self) {}
    }

    struct NoopOcr;

    impl OcrBackend for NoopOcr {
        fn initialize(&mut self, _bcp47: &str) -> Result<()> {
            Ok(())
        }
        fn set_language(&mut self, _flores_code: &str) {}
        fn set_confidence_floor(&mut self, _threshold: f32) {}
        fn detect(
            &mut self,
            _frame: &RgbImage,
            _offset_x: i32,
            _offset_y: i32,
        ) -> Result<Vec<TextBlock>> {
            Ok(Vec::new())
        }
    }

    struct NoopTranslator;

    impl TranslationBackend for NoopTranslator {
        fn load(&mut self, _model_dir: &Path) -> Result<()> {
            Ok(())
        }
        fn translate_batch(
            &mut self,
            texts: &[String],
            _source_lang: &str,
            _target_lang: &str,
        ) -> Result<Vec<String>> {
            Ok(texts.to_vec())
        }
    }

    fn noop_pipeline() -> (Pipeline, mpsc::UnboundedReceiver<PipelineEvent>) {
        let factory: CaptureFactory =
            Box::new(|| Ok(Box::new(NoopCapture) as Box<dyn CaptureBackend>));
        Pipeline::new(
            PipelineSettings::default(),
            factory,
            Box::new(NoopOcr),
            Box::new(NoopTranslator),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        let factory: CaptureFactory =
            Box::new(|| Ok(Box::new(NoopCapture) as Box<dyn CaptureBackend>));
        let mut settings = PipelineSettings::default();
        settings.update_interval_ms = 10;
        assert!(Pipeline::new(settings, factory, Box::new(NoopOcr), Box::new(NoopTranslator))
            .is_err());
    }

    #[test]
    fn test_update_settings_validates() {
        let (pipeline, _rx) = noop_pipeline();
        let mut bad = PipelineSettings::default();
        bad.max_cache_size = 0;
        assert!(pipeline.update_settings(bad).is_err());

        let mut good = PipelineSettings::default();
        good.target_language = "deu_Latn".to_string();
        assert!(pipeline.update_settings(good).is_ok());
        assert_eq!(pipeline.settings().target_language, "deu_Latn");
    }

    #[test]
    fn test_stop_without_start_is_silent() {
        let (pipeline, mut rx) = noop_pipeline();
        pipeline.stop();
        assert_eq!(pipeline.state(), SessionState::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stats_merge_cache_counters() {
        let (pipeline, _rx) = noop_pipeline();
        pipeline.inner.cache.put("hello there", "eng_Latn", "fra_Latn", "bonjour");
        let _ = pipeline.inner.cache.get("hello there", "eng_Latn", "fra_Latn");

        let snapshot = pipeline.stats();
        assert_eq!(snapshot.cache_entries, 1);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cycles, 0);
    }

    #[test]
    fn test_waiter_interrupt_wakes_sleep() {
        let waiter = Arc::new(Waiter::new());
        waiter.arm();
        let w = Arc::clone(&waiter);
        let t = thread::spawn(move || {
            let start = Instant::now();
            w.sleep(Duration::from_secs(10));
            start.elapsed()
        });
        thread::sleep(Duration::from_millis(50));
        waiter.interrupt();
        let slept = t.join().unwrap();
        assert!(slept < Duration::from_secs(5));
    }
}
