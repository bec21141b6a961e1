//! Time-budgeted FIFO of variant render jobs
//!
//! Jobs are drained one frame at a time from a recurring tick. Each tick gets a
//! time budget: a larger burst budget shortly after the variant selection
//! changed, a small steady budget otherwise. A job captured under an older
//! selection is dropped when it reaches the front of the queue, so it never
//! writes to the cache.

use log::{debug, trace};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use crate::cache::VariantCache;
use crate::compositor::Compositor;
use crate::config::SchedulerConfig;
use crate::cooperative::Clock;
use crate::registry::SpriteItem;
use crate::texture::Texture;
use crate::variant::VariantInfo;

/// The selection every in-flight job is compared against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalSignature {
    pub value: String,
    /// When `value` last changed
    pub changed_at: Option<Instant>,
}

impl GlobalSignature {
    /// Replace the signature if it differs. Returns true on change.
    pub fn update(&mut self, value: &str, now: Instant) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value.to_string();
        self.changed_at = Some(now);
        true
    }
}

/// Renders every frame of one sprite item for one variant.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Cache key of the output
    pub key: String,
    /// Selection signature captured at request time
    pub signature: String,
    /// Registry key of the base item
    pub base_key: String,
    pub variant: VariantInfo,
    pub source_frames: Vec<Texture>,
    pub output_frames: Vec<Texture>,
    /// Next source frame to render
    pub cursor: usize,
    pub is_animation: bool,
    /// Frames the compositor actually produced (the rest fell back to source)
    composited: usize,
}

impl RenderJob {
    pub fn new(
        key: impl Into<String>,
        signature: impl Into<String>,
        base_key: impl Into<String>,
        variant: VariantInfo,
        base: &SpriteItem,
    ) -> Self {
        let source_frames = base.frames().to_vec();
        Self {
            key: key.into(),
            signature: signature.into(),
            base_key: base_key.into(),
            variant,
            output_frames: Vec::with_capacity(source_frames.len()),
            source_frames,
            cursor: 0,
            is_animation: base.is_animation(),
            composited: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.source_frames.len()
    }

    /// Render the next frame, falling back to the source frame on failure.
    fn step(&mut self, compositor: &Compositor<'_>) -> bool {
        let Some(source) = self.source_frames.get(self.cursor) else {
            return false;
        };
        let frame = match compositor.render(source, &self.base_key, &self.variant) {
            Some(frame) => {
                self.composited += 1;
                frame
            }
            None => source.clone(),
        };
        self.output_frames.push(frame);
        self.cursor += 1;
        true
    }
}

/// Counters since the scheduler was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub completed: u64,
    pub stale_dropped: u64,
    pub frames_rendered: u64,
    /// Frames that fell back to the unmodified source
    pub fallback_frames: u64,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub budget: Duration,
    pub frames_rendered: usize,
    pub jobs_completed: usize,
    pub stale_dropped: usize,
}

/// FIFO job queue with a pending-key set.
#[derive(Debug)]
pub struct JobScheduler {
    queue: VecDeque<RenderJob>,
    pending: HashSet<String>,
    config: SchedulerConfig,
    stats: SchedulerStats,
}

impl JobScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self { queue: VecDeque::new(), pending: HashSet::new(), config: config.clone(), stats: SchedulerStats::default() }
    }

    /// Queue a job unless one with the same key is already pending.
    pub fn enqueue(&mut self, job: RenderJob) -> bool {
        if !self.pending.insert(job.key.clone()) {
            trace!("job '{}' already pending", job.key);
            return false;
        }
        debug!("queued job '{}' ({} frame(s))", job.key, job.source_frames.len());
        self.queue.push_back(job);
        true
    }

    /// Move a pending job under `signature` so a selection change to an
    /// equivalent variant does not drop it. Returns false when `key` is not
    /// queued.
    pub fn recapture(&mut self, key: &str, signature: &str) -> bool {
        let Some(job) = self.queue.iter_mut().find(|job| job.key == key) else {
            return false;
        };
        if job.signature != signature {
            trace!("job '{}' recaptured under '{}'", key, signature);
            job.signature = signature.to_string();
        }
        true
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every queued job.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending.clear();
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Budget for a tick starting at `now`.
    pub fn budget(&self, now: Instant, global: &GlobalSignature) -> Duration {
        match global.changed_at {
            Some(at) if now.saturating_duration_since(at) < self.config.burst_window() => self.config.burst_budget(),
            _ => self.config.steady_budget(),
        }
    }

    /// Process queued frames until the budget or the per-tick job cap runs out.
    ///
    /// The budget is checked before every frame except the first, so each tick
    /// makes progress. Completed jobs are written to `cache`, unless every frame
    /// fell back to its source.
    pub fn tick(
        &mut self,
        clock: &dyn Clock,
        global: &GlobalSignature,
        compositor: &Compositor<'_>,
        cache: &mut VariantCache,
    ) -> TickReport {
        let start = clock.now();
        let mut report = TickReport { budget: self.budget(start, global), ..TickReport::default() };
        let mut jobs_touched = 0;
        let mut front_touched = false;

        while let Some(job) = self.queue.front_mut() {
            if job.signature != global.value || job.source_frames.is_empty() {
                if let Some(stale) = self.queue.pop_front() {
                    trace!("dropping stale job '{}'", stale.key);
                    self.pending.remove(&stale.key);
                }
                self.stats.stale_dropped += 1;
                report.stale_dropped += 1;
                front_touched = false;
                continue;
            }
            if report.frames_rendered > 0 && clock.now().saturating_duration_since(start) >= report.budget {
                break;
            }
            if !front_touched {
                if jobs_touched >= self.config.max_jobs_per_tick {
                    break;
                }
                jobs_touched += 1;
                front_touched = true;
            }

            let composited_before = job.composited;
            job.step(compositor);
            report.frames_rendered += 1;
            self.stats.frames_rendered += 1;
            if job.composited == composited_before {
                self.stats.fallback_frames += 1;
            }

            if job.is_done() {
                if let Some(done) = self.queue.pop_front() {
                    self.finish(done, cache);
                }
                report.jobs_completed += 1;
                front_touched = false;
            }
        }
        report
    }

    fn finish(&mut self, job: RenderJob, cache: &mut VariantCache) {
        self.pending.remove(&job.key);
        self.stats.completed += 1;
        if job.composited == 0 {
            debug!("job '{}' produced no composited frames, not caching", job.key);
            return;
        }
        if let Some(entry) = SpriteItem::from_frames(job.output_frames) {
            debug!("job '{}' complete ({} frame(s))", job.key, entry.frame_count());
            cache.set(job.key, entry);
        }
    }
}
