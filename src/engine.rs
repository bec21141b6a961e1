//! Engine facade: shared state plus the public sprite API
//!
//! All mutable state sits in one [`EngineState`] behind a `RefCell`. Request
//! handlers and the scheduler tick borrow it briefly and never hold the borrow
//! across an `.await`.

use futures::join;
use image::RgbaImage;
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::time::Duration;
use thiserror::Error;

use crate::atlas::{AtlasLoader, LoadError, LoadReport};
use crate::cache::{CacheStats, VariantCache};
use crate::category::Category;
use crate::compositor::Compositor;
use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::host::{LocateError, RendererHandle, RendererLocator};
use crate::output::{self, OutputError};
use crate::registry::{SpriteItem, TextureRegistry};
use crate::scheduler::{GlobalSignature, JobScheduler, RenderJob, SchedulerStats, TickReport};
use crate::variant::{VariantBuilder, VariantInfo, VariantMode};

/// Error from the engine API
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("renderer unavailable: {0}")]
    Locate(#[from] LocateError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("no {category} sprite named '{id}'")]
    NotFound { category: Category, id: String },
    #[error("frame {index} out of range ({count} frame(s))")]
    FrameOutOfRange { index: usize, count: usize },
    #[error("failed to composite '{key}'")]
    RenderFailed { key: String },
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// A sprite by category and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpriteRef {
    pub category: Category,
    pub id: String,
}

impl SpriteRef {
    pub fn new(category: Category, id: impl Into<String>) -> Self {
        Self { category, id: id.into() }
    }
}

/// A sprite plus the mutations to apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteRequest {
    pub category: Category,
    pub id: String,
    pub mutations: Vec<String>,
}

impl SpriteRequest {
    pub fn new(category: Category, id: impl Into<String>) -> Self {
        Self { category, id: id.into(), mutations: Vec::new() }
    }

    pub fn with_mutations<I, S>(mut self, mutations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mutations = mutations.into_iter().map(Into::into).collect();
        self
    }

    pub fn sprite(&self) -> SpriteRef {
        SpriteRef::new(self.category, self.id.clone())
    }
}

/// Options for rasterizing a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasOptions {
    /// Animation frame to draw
    pub frame: usize,
    /// Integer nearest-neighbor scale
    pub scale: u32,
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self { frame: 0, scale: 1 }
    }
}

/// Everything the engine mutates.
pub struct EngineState {
    pub registry: TextureRegistry,
    /// Summary of the last atlas load
    pub report: LoadReport,
    pub cache: VariantCache,
    pub scheduler: JobScheduler,
    pub renderer: Option<RendererHandle>,
    pub global: GlobalSignature,
}

impl EngineState {
    fn new(config: &EngineConfig) -> Self {
        Self {
            registry: TextureRegistry::new(),
            report: LoadReport::default(),
            cache: VariantCache::new(&config.cache),
            scheduler: JobScheduler::new(&config.scheduler),
            renderer: None,
            global: GlobalSignature::default(),
        }
    }
}

/// A resolved variant request.
struct Resolved {
    base_key: String,
    base: SpriteItem,
    variant: VariantInfo,
}

impl Resolved {
    fn cache_key(&self) -> String {
        format!("{}|{}", self.base_key, self.variant.signature)
    }
}

/// The sprite variant engine.
pub struct SpriteEngine {
    ctx: EngineContext,
    config: EngineConfig,
    state: RefCell<EngineState>,
    running: Cell<bool>,
}

impl SpriteEngine {
    pub fn new(ctx: EngineContext, config: EngineConfig) -> Self {
        let state = RefCell::new(EngineState::new(&config));
        Self { ctx, config, state, running: Cell::new(false) }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Locate the host renderer and load atlases concurrently.
    ///
    /// A load failure wins over a locate failure. A located renderer and a
    /// loaded registry are kept even when the other half fails, so a retry
    /// only needs [`SpriteEngine::locate_renderer`].
    pub async fn start(&self) -> Result<LoadReport, EngineError> {
        let mut locator = RendererLocator::new(&self.config.locator);
        let loader = AtlasLoader::new(&self.ctx, &self.config.loader);
        let (located, loaded) = join!(locator.locate(&self.ctx), loader.load(&self.config.assets.base_url));

        let mut state = self.state.borrow_mut();
        let locate_error = match located {
            Ok(renderer) => {
                state.renderer = Some(renderer);
                None
            }
            Err(e) => Some(e),
        };
        let outcome = loaded?;
        state.registry = outcome.registry;
        state.report = outcome.report.clone();
        match locate_error {
            None => Ok(outcome.report),
            Some(e) => Err(e.into()),
        }
    }

    /// Like [`SpriteEngine::start`], retrying renderer lookup with exponential
    /// backoff. Load failures are not retried.
    pub async fn start_with_retry(&self, attempts: u32, initial_backoff: Duration) -> Result<LoadReport, EngineError> {
        let mut last = match self.start().await {
            Ok(report) => return Ok(report),
            Err(EngineError::Locate(e)) if e.is_retryable() => e,
            Err(e) => return Err(e),
        };

        let mut backoff = initial_backoff;
        for attempt in 2..=attempts {
            warn!("{}; retrying in {:?}", last, backoff);
            self.ctx.clock().sleep(backoff).await;
            match self.locate_renderer().await {
                Ok(()) => {
                    info!("renderer located on attempt {}", attempt);
                    return Ok(self.state.borrow().report.clone());
                }
                Err(e) if e.is_retryable() => last = e,
                Err(e) => return Err(e.into()),
            }
            backoff = backoff.saturating_mul(2);
        }
        Err(last.into())
    }

    /// Run renderer discovery alone and bind the result.
    pub async fn locate_renderer(&self) -> Result<(), LocateError> {
        let mut locator = RendererLocator::new(&self.config.locator);
        let renderer = locator.locate(&self.ctx).await?;
        self.state.borrow_mut().renderer = Some(renderer);
        Ok(())
    }

    /// Replace the texture registry. Cached variants are discarded.
    pub fn set_registry(&self, registry: TextureRegistry) {
        let mut state = self.state.borrow_mut();
        state.registry = registry;
        state.cache.clear();
        state.scheduler.clear();
    }

    /// Bind a renderer directly, bypassing discovery.
    pub fn set_renderer(&self, renderer: RendererHandle) {
        self.state.borrow_mut().renderer = Some(renderer);
    }

    pub fn has_renderer(&self) -> bool {
        self.state.borrow().renderer.is_some()
    }

    /// Ids in a category, sorted.
    pub fn list(&self, category: Category) -> Vec<String> {
        self.state.borrow().registry.list(category)
    }

    /// The unmodified sprite.
    pub fn get_base_sprite(&self, sprite: &SpriteRef) -> Option<SpriteItem> {
        let state = self.state.borrow();
        state.registry.find(sprite.category, &sprite.id).map(|(_, _, item)| item.clone())
    }

    /// The sprite with mutations, or the base sprite while the variant renders.
    ///
    /// A cache miss queues one job per variant; asking again before it finishes
    /// returns the same base handle without queueing another. A request whose
    /// selection differs from the current one makes it the new current
    /// selection, which cancels jobs queued for the old one.
    pub fn get_sprite_with_mutations(&self, request: &SpriteRequest) -> Option<SpriteItem> {
        let resolved = self.resolve(request)?;
        let now = self.ctx.clock().now();
        let state = &mut *self.state.borrow_mut();
        if state.global.update(&resolved.variant.selection, now) {
            debug!("variant selection is now '{}'", state.global.value);
        }
        if resolved.variant.is_base() {
            return Some(resolved.base);
        }

        let key = resolved.cache_key();
        if let Some(hit) = state.cache.get(&key) {
            return Some(hit.clone());
        }
        if state.scheduler.is_pending(&key) {
            // An equivalent selection may have queued this job; it now renders
            // for the current one.
            state.scheduler.recapture(&key, &state.global.value);
            return Some(resolved.base);
        }
        let Resolved { base_key, base, variant } = resolved;
        let job = RenderJob::new(key, variant.selection.clone(), base_key, variant, &base);
        state.scheduler.enqueue(job);
        Some(base)
    }

    /// Draw one frame of whatever [`SpriteEngine::get_sprite_with_mutations`]
    /// currently returns.
    pub fn render_to_canvas(&self, request: &SpriteRequest, options: &CanvasOptions) -> Result<RgbaImage, EngineError> {
        let item = self.get_sprite_with_mutations(request).ok_or_else(|| not_found(request))?;
        rasterize(&item, options)
    }

    /// Composite the variant right away, yielding between frames.
    ///
    /// The result is cached like a scheduler-rendered variant.
    pub async fn render_variant(&self, request: &SpriteRequest) -> Result<SpriteItem, EngineError> {
        let resolved = self.resolve(request).ok_or_else(|| not_found(request))?;
        if resolved.variant.is_base() {
            return Ok(resolved.base);
        }
        let key = resolved.cache_key();
        if let Some(hit) = self.state.borrow_mut().cache.get(&key) {
            return Ok(hit.clone());
        }

        let mut frames = Vec::with_capacity(resolved.base.frame_count());
        for source in resolved.base.frames() {
            let frame = {
                let state = self.state.borrow();
                let compositor =
                    Compositor::new(state.renderer.as_deref(), &state.registry, &self.config.compositor);
                compositor.render(source, &resolved.base_key, &resolved.variant)
            };
            frames.push(frame.ok_or_else(|| EngineError::RenderFailed { key: key.clone() })?);
            self.ctx.yield_now().await;
        }

        let item = SpriteItem::from_frames(frames).ok_or_else(|| EngineError::RenderFailed { key: key.clone() })?;
        self.state.borrow_mut().cache.set(key, item.clone());
        Ok(item)
    }

    /// Composite immediately and encode one frame as a PNG data URL.
    pub async fn render_to_data_url(
        &self,
        request: &SpriteRequest,
        options: &CanvasOptions,
    ) -> Result<String, EngineError> {
        let item = self.render_variant(request).await?;
        let image = rasterize(&item, options)?;
        Ok(output::encode_data_url(&image)?)
    }

    /// Queue variant jobs for many sprites under one selection.
    ///
    /// Returns how many jobs were queued. Yields after each sprite.
    pub async fn prefetch(&self, sprites: &[SpriteRef], mutations: &[String]) -> usize {
        let mut queued = 0;
        for sprite in sprites {
            let request = SpriteRequest::new(sprite.category, sprite.id.clone()).with_mutations(mutations.iter().cloned());
            let before = self.state.borrow().scheduler.len();
            self.get_sprite_with_mutations(&request);
            if self.state.borrow().scheduler.len() > before {
                queued += 1;
            }
            self.ctx.yield_now().await;
        }
        queued
    }

    /// Drop every cached variant and queued job and forget the current
    /// selection.
    pub fn invalidate(&self) {
        let now = self.ctx.clock().now();
        let mut state = self.state.borrow_mut();
        state.cache.clear();
        state.scheduler.clear();
        state.global = GlobalSignature { value: String::new(), changed_at: Some(now) };
        debug!("variant cache invalidated");
    }

    /// Run one scheduler tick.
    pub fn tick(&self) -> TickReport {
        let state = &mut *self.state.borrow_mut();
        let compositor = Compositor::new(state.renderer.as_deref(), &state.registry, &self.config.compositor);
        state.scheduler.tick(self.ctx.clock(), &state.global, &compositor, &mut state.cache)
    }

    /// Tick on every host frame (or every `frame_interval` without one) until
    /// [`SpriteEngine::stop`] is called.
    pub async fn drive(&self) {
        self.running.set(true);
        while self.running.get() {
            self.tick();
            self.wait_for_frame().await;
        }
    }

    /// Tick until no job is queued. Returns the number of ticks run.
    pub async fn drive_until_idle(&self) -> usize {
        let mut ticks = 0;
        while !self.state.borrow().scheduler.is_empty() {
            self.tick();
            ticks += 1;
            self.wait_for_frame().await;
        }
        ticks
    }

    pub fn stop(&self) {
        self.running.set(false);
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn pending_jobs(&self) -> usize {
        self.state.borrow().scheduler.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.state.borrow().cache.stats()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.state.borrow().scheduler.stats()
    }

    /// Current selection signature.
    pub fn global_signature(&self) -> String {
        self.state.borrow().global.value.clone()
    }

    fn resolve(&self, request: &SpriteRequest) -> Option<Resolved> {
        let state = self.state.borrow();
        let (category, base_key, base) = state.registry.find(request.category, &request.id)?;
        let variant = VariantBuilder::build(&request.mutations, VariantMode::for_category(category));
        Some(Resolved { base_key, base: base.clone(), variant })
    }

    async fn wait_for_frame(&self) {
        let next = self.state.borrow().renderer.as_ref().and_then(|r| r.next_frame());
        match next {
            Some(frame) => frame.await,
            None => self.ctx.clock().sleep(self.config.scheduler.frame_interval()).await,
        }
    }
}

fn not_found(request: &SpriteRequest) -> EngineError {
    EngineError::NotFound { category: request.category, id: request.id.clone() }
}

/// Draw one frame of `item` at the requested scale.
pub fn rasterize(item: &SpriteItem, options: &CanvasOptions) -> Result<RgbaImage, EngineError> {
    let count = item.frame_count();
    let frame = item.frames().get(options.frame).ok_or(EngineError::FrameOutOfRange { index: options.frame, count })?;
    Ok(output::scale_image(frame.to_image(), options.scale))
}
