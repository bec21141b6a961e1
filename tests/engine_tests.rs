//! End-to-end tests: atlas loading, variant requests, scheduling and caching
//!
//! Every test runs against an in-memory asset pack with a headless host and a
//! hand-driven clock, so nothing touches the network or the wall clock.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::executor::block_on;
use image::{ImageOutputFormat, Rgba, RgbaImage};
use serde_json::json;
use std::io::Cursor;
use std::rc::Rc;
use std::time::Duration;

use sprite_variants::atlas::MemoryFetcher;
use sprite_variants::cooperative::{CountingYielder, ManualClock};
use sprite_variants::engine::{CanvasOptions, EngineError, SpriteEngine, SpriteRef, SpriteRequest};
use sprite_variants::host::{
    HeadlessProvider, HostRenderingProvider, LocateError, ReadyCallback, RendererHandle, SoftwareRenderer,
    HEADLESS_GLOBAL,
};
use sprite_variants::{Category, EngineConfig, EngineContext};

const CARROT: Rgba<u8> = Rgba([40, 200, 40, 255]);
const BAMBOO: Rgba<u8> = Rgba([120, 80, 20, 255]);
const WET_ICON: Rgba<u8> = Rgba([0, 0, 255, 255]);
const WET_OVERLAY: Rgba<u8> = Rgba([255, 0, 0, 255]);

fn png(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png).unwrap();
    bytes
}

fn frame(x: u32, y: u32, w: u32, h: u32) -> serde_json::Value {
    json!({ "frame": { "x": x, "y": y, "w": w, "h": h } })
}

/// Two packs: plants in the first, the tall plant and the Wet assets in a
/// second pack only reachable through `related_multi_packs`.
fn asset_pack() -> Rc<MemoryFetcher> {
    let fetcher = Rc::new(MemoryFetcher::new());
    fetcher.insert("assets/manifest.json", json!({ "bundles": [{ "assets": [{ "src": ["atlas/p0.json"] }] }] }).to_string());

    let fern = [Rgba([200, 0, 0, 255]), Rgba([0, 0, 200, 255]), Rgba([200, 200, 0, 255])];
    let p0 = RgbaImage::from_fn(32, 8, |x, _| match x {
        0..=7 => CARROT,
        8..=19 => fern[((x - 8) / 4) as usize],
        _ => Rgba([0, 0, 0, 0]),
    });
    let p0_json = json!({
        "frames": {
            "sprite/plant/Carrot.png": frame(0, 0, 8, 8),
            "sprite/plant/Fern_001.png": frame(8, 0, 4, 4),
            "sprite/plant/Fern_002.png": frame(12, 0, 4, 4),
            "sprite/plant/Fern_003.png": frame(16, 0, 4, 4),
        },
        "meta": { "image": "p0.png", "related_multi_packs": ["p1.json"] }
    });

    // Bamboo is opaque on its left half only
    let p1 = RgbaImage::from_fn(32, 16, |x, y| match (x, y) {
        (0..=3, _) => BAMBOO,
        (8..=11, 0..=3) => WET_ICON,
        (16..=23, 0..=7) => WET_OVERLAY,
        _ => Rgba([0, 0, 0, 0]),
    });
    let p1_json = json!({
        "frames": {
            "sprite/tallplant/Bamboo.png": frame(0, 0, 8, 16),
            "sprite/mutation/Wet.png": frame(8, 0, 4, 4),
            "sprite/mutation-overlay/WetTallPlant.png": frame(16, 0, 8, 8),
        },
        "meta": { "image": "p1.png", "related_multi_packs": ["p0.json"] }
    });

    fetcher.insert("assets/atlas/p0.json", p0_json.to_string());
    fetcher.insert("assets/atlas/p0.png", png(&p0));
    fetcher.insert("assets/atlas/p1.json", p1_json.to_string());
    fetcher.insert("assets/atlas/p1.png", png(&p1));
    fetcher
}

struct Fixture {
    engine: SpriteEngine,
    fetcher: Rc<MemoryFetcher>,
    clock: Rc<ManualClock>,
    yielder: Rc<CountingYielder>,
}

fn fixture_with(config: EngineConfig, provider: Rc<dyn HostRenderingProvider>, clock: Rc<ManualClock>) -> Fixture {
    let fetcher = asset_pack();
    let yielder = Rc::new(CountingYielder::default());
    let ctx = EngineContext::new(provider, fetcher.clone()).with_clock(clock.clone()).with_yielder(yielder.clone());
    Fixture { engine: SpriteEngine::new(ctx, config), fetcher, clock, yielder }
}

fn started(config: EngineConfig) -> Fixture {
    let fixture = fixture_with(config, Rc::new(HeadlessProvider::new()), Rc::new(ManualClock::new()));
    block_on(fixture.engine.start()).expect("engine should start");
    fixture
}

fn request(category: Category, id: &str, mutations: &[&str]) -> SpriteRequest {
    SpriteRequest::new(category, id).with_mutations(mutations.iter().copied())
}

fn first_image(item: &sprite_variants::SpriteItem) -> RgbaImage {
    item.frames()[0].to_image()
}

/// Host that publishes its renderer only once the clock passes `ready_after`.
struct SlowHost {
    clock: Rc<ManualClock>,
    ready_after: Duration,
    renderer: RendererHandle,
}

impl HostRenderingProvider for SlowHost {
    fn on_ready(&self, _callback: ReadyCallback) {}

    fn global(&self, name: &str) -> Option<RendererHandle> {
        (name == HEADLESS_GLOBAL && self.clock.elapsed() >= self.ready_after).then(|| Rc::clone(&self.renderer))
    }
}

fn slow_fixture(ready_after: Duration) -> Fixture {
    let clock = Rc::new(ManualClock::new());
    let host = SlowHost { clock: clock.clone(), ready_after, renderer: Rc::new(SoftwareRenderer::new()) };
    let mut config = EngineConfig::default();
    config.locator.timeout_ms = 1_000;
    config.locator.poll_interval_ms = 250;
    fixture_with(config, Rc::new(host), clock)
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_start_merges_related_packs() {
    let fx = started(EngineConfig::default());
    assert!(fx.engine.has_renderer());
    assert_eq!(fx.engine.list(Category::Plant), vec!["Carrot", "Fern"]);
    assert_eq!(fx.engine.list(Category::TallPlant), vec!["Bamboo"]);
    assert_eq!(fx.engine.list(Category::Mutation), vec!["Wet"]);

    let requests = fx.fetcher.requests();
    assert_eq!(requests.iter().filter(|r| r.ends_with("p0.json")).count(), 1);
    assert_eq!(requests.iter().filter(|r| r.ends_with("p1.json")).count(), 1);
}

#[test]
fn test_indexed_frames_become_animation() {
    let fx = started(EngineConfig::default());
    let fern = fx.engine.get_base_sprite(&SpriteRef::new(Category::Plant, "Fern")).unwrap();
    assert!(fern.is_animation());
    assert_eq!(fern.frame_count(), 3);
    assert_eq!(first_image(&fern).get_pixel(0, 0), &Rgba([200, 0, 0, 255]));
    assert_eq!(fern.frames()[2].to_image().get_pixel(0, 0), &Rgba([200, 200, 0, 255]));
}

#[test]
fn test_any_category_lookup() {
    let fx = started(EngineConfig::default());
    assert!(fx.engine.get_base_sprite(&SpriteRef::new(Category::Any, "Bamboo")).is_some());
    assert!(fx.engine.get_base_sprite(&SpriteRef::new(Category::Plant, "Bamboo")).is_none());
}

#[test]
fn test_missing_manifest_fails_start() {
    let fx = fixture_with(EngineConfig::default(), Rc::new(HeadlessProvider::new()), Rc::new(ManualClock::new()));
    let mut config = EngineConfig::default();
    config.assets.base_url = "elsewhere".to_string();
    let engine = SpriteEngine::new(
        EngineContext::new(Rc::new(HeadlessProvider::new()), fx.fetcher.clone()),
        config,
    );
    assert!(matches!(block_on(engine.start()), Err(EngineError::Load(_))));
    // the renderer located alongside the failed load is still bound
    assert!(engine.has_renderer());
}

// ============================================================================
// Renderer discovery
// ============================================================================

#[test]
fn test_start_with_retry_finds_late_renderer() {
    let fx = slow_fixture(Duration::from_millis(1_500));
    let report = block_on(fx.engine.start_with_retry(3, Duration::from_millis(100))).unwrap();
    assert_eq!(report.descriptors_loaded, 2);
    assert!(fx.engine.has_renderer());
    assert!(fx.clock.elapsed() >= Duration::from_millis(1_500));
}

#[test]
fn test_start_with_retry_gives_up() {
    let fx = slow_fixture(Duration::from_secs(3_600));
    let result = block_on(fx.engine.start_with_retry(2, Duration::from_millis(100)));
    assert!(matches!(result, Err(EngineError::Locate(LocateError::Timeout { .. }))));
    assert!(!fx.engine.has_renderer());
    // the registry loaded even though no renderer turned up
    assert_eq!(fx.engine.list(Category::Plant), vec!["Carrot", "Fern"]);
}

// ============================================================================
// Variant requests and scheduling
// ============================================================================

#[test]
fn test_empty_mutations_return_base_without_job() {
    let fx = started(EngineConfig::default());
    let base = fx.engine.get_base_sprite(&SpriteRef::new(Category::Plant, "Carrot")).unwrap();
    let item = fx.engine.get_sprite_with_mutations(&request(Category::Plant, "Carrot", &[])).unwrap();
    assert_eq!(item, base);
    assert_eq!(fx.engine.pending_jobs(), 0);
}

#[test]
fn test_repeated_request_queues_one_job() {
    let fx = started(EngineConfig::default());
    let base = fx.engine.get_base_sprite(&SpriteRef::new(Category::Plant, "Carrot")).unwrap();
    let wet = request(Category::Plant, "Carrot", &["Wet"]);

    let first = fx.engine.get_sprite_with_mutations(&wet).unwrap();
    let second = fx.engine.get_sprite_with_mutations(&wet).unwrap();
    assert_eq!(first, base);
    assert_eq!(second, base);
    assert_eq!(fx.engine.pending_jobs(), 1);

    // permutations and aliases map to the same job
    let reordered = request(Category::Plant, "Carrot", &["wet", "Wet"]);
    fx.engine.get_sprite_with_mutations(&reordered);
    assert_eq!(fx.engine.pending_jobs(), 1);

    assert!(block_on(fx.engine.drive_until_idle()) >= 1);
    let done = fx.engine.get_sprite_with_mutations(&wet).unwrap();
    assert_ne!(done, base);
    assert_eq!(fx.engine.get_sprite_with_mutations(&wet).unwrap(), done);
    assert_eq!(fx.engine.pending_jobs(), 0);
    assert_eq!(fx.engine.scheduler_stats().completed, 1);
}

#[test]
fn test_wet_variant_tints_and_badges() {
    let fx = started(EngineConfig::default());
    let wet = request(Category::Plant, "Carrot", &["Wet"]);
    let item = block_on(fx.engine.render_variant(&wet)).unwrap();
    let image = first_image(&item);
    assert_eq!(image.dimensions(), (8, 8));

    // tinted away from the badge
    let tinted = image.get_pixel(1, 6);
    assert_eq!(tinted[3], 255);
    assert!(tinted[1] < CARROT[1], "expected the multiply tint to darken green, got {:?}", tinted);

    // badge sits near the top-right corner
    let badge = image.get_pixel(6, 1);
    assert!(badge[2] > badge[1], "expected the blue badge, got {:?}", badge);
}

#[test]
fn test_stale_job_never_reaches_cache() {
    let fx = started(EngineConfig::default());
    fx.engine.get_sprite_with_mutations(&request(Category::Plant, "Carrot", &["Wet"]));
    fx.engine.get_sprite_with_mutations(&request(Category::Plant, "Fern", &["Gold"]));
    assert_eq!(fx.engine.global_signature(), "Gold");
    assert_eq!(fx.engine.pending_jobs(), 2);

    block_on(fx.engine.drive_until_idle());
    let stats = fx.engine.scheduler_stats();
    assert_eq!(stats.stale_dropped, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.frames_rendered, 3);
    assert_eq!(fx.engine.cache_stats().entries, 1);

    let fern = fx.engine.get_sprite_with_mutations(&request(Category::Plant, "Fern", &["Gold"])).unwrap();
    assert!(fern.is_animation());
    assert_eq!(fern.frame_count(), 3);
}

#[test]
fn test_clearing_selection_cancels_queued_jobs() {
    let fx = started(EngineConfig::default());
    fx.engine.get_sprite_with_mutations(&request(Category::Plant, "Fern", &["Wet"]));
    assert_eq!(fx.engine.pending_jobs(), 1);

    let base = fx.engine.get_base_sprite(&SpriteRef::new(Category::Plant, "Fern")).unwrap();
    let plain = fx.engine.get_sprite_with_mutations(&request(Category::Plant, "Fern", &[])).unwrap();
    assert_eq!(plain, base);
    assert_eq!(fx.engine.global_signature(), "base");

    block_on(fx.engine.drive_until_idle());
    let stats = fx.engine.scheduler_stats();
    assert_eq!(stats.stale_dropped, 1);
    assert_eq!(stats.frames_rendered, 0);
    assert_eq!(fx.engine.cache_stats().entries, 0);
}

#[test]
fn test_equivalent_selection_keeps_pending_job() {
    let fx = started(EngineConfig::default());
    let base = fx.engine.get_base_sprite(&SpriteRef::new(Category::Plant, "Carrot")).unwrap();
    let rainbow = request(Category::Plant, "Carrot", &["Rainbow"]);
    let wet_rainbow = request(Category::Plant, "Carrot", &["Wet", "Rainbow"]);

    fx.engine.get_sprite_with_mutations(&rainbow);
    assert_eq!(fx.engine.get_sprite_with_mutations(&wet_rainbow).unwrap(), base);
    assert_eq!(fx.engine.global_signature(), "Rainbow+Wet");
    assert_eq!(fx.engine.pending_jobs(), 1);

    block_on(fx.engine.drive_until_idle());
    let stats = fx.engine.scheduler_stats();
    assert_eq!((stats.completed, stats.stale_dropped), (1, 0));
    assert_eq!(fx.engine.cache_stats().entries, 1);

    let done = fx.engine.get_sprite_with_mutations(&wet_rainbow).unwrap();
    assert_ne!(done, base);
    assert_eq!(fx.engine.pending_jobs(), 0);
}

#[test]
fn test_premium_replaces_standard_in_normal_mode() {
    let fx = started(EngineConfig::default());
    let combined = block_on(fx.engine.render_variant(&request(Category::Plant, "Carrot", &["Wet", "Rainbow"]))).unwrap();
    let rainbow = block_on(fx.engine.render_variant(&request(Category::Plant, "Carrot", &["Rainbow"]))).unwrap();
    assert_eq!(combined, rainbow);
    assert_eq!(fx.engine.cache_stats().entries, 1);
    assert_eq!(fx.engine.cache_stats().hits, 1);
}

#[test]
fn test_tall_overlay_clipped_to_silhouette() {
    let fx = started(EngineConfig::default());
    let item = block_on(fx.engine.render_variant(&request(Category::TallPlant, "Bamboo", &["Wet"]))).unwrap();
    let image = first_image(&item);
    assert_eq!(image.dimensions(), (8, 16));

    let inside = image.get_pixel(1, 6);
    assert_eq!(inside[3], 255);
    assert!(inside[0] > 200 && inside[1] < 60, "expected the red overlay, got {:?}", inside);

    // the base is transparent here, so the overlay must not show
    assert_eq!(image.get_pixel(6, 6)[3], 0);
    // below the overlay the base is untouched
    assert_eq!(image.get_pixel(1, 12), &BAMBOO);
}

#[test]
fn test_render_variant_yields_per_frame() {
    let fx = started(EngineConfig::default());
    let before = fx.yielder.count();
    let item = block_on(fx.engine.render_variant(&request(Category::Plant, "Fern", &["Frozen"]))).unwrap();
    assert_eq!(item.frame_count(), 3);
    assert_eq!(fx.yielder.count() - before, 3);
}

#[test]
fn test_burst_budget_after_selection_change() {
    let mut config = EngineConfig::default();
    config.scheduler.burst_budget_ms = 50;
    config.scheduler.steady_budget_ms = 5;
    config.scheduler.burst_window_ms = 1_000;
    let fx = started(config);

    fx.engine.get_sprite_with_mutations(&request(Category::Plant, "Fern", &["Wet"]));
    let burst = fx.engine.tick();
    assert_eq!(burst.budget, Duration::from_millis(50));

    fx.clock.advance(Duration::from_secs(2));
    fx.engine.get_sprite_with_mutations(&request(Category::Plant, "Carrot", &["Wet"]));
    let steady = fx.engine.tick();
    assert_eq!(steady.budget, Duration::from_millis(5));
}

#[test]
fn test_prefetch_queues_known_sprites() {
    let fx = started(EngineConfig::default());
    let sprites = [
        SpriteRef::new(Category::Plant, "Carrot"),
        SpriteRef::new(Category::Plant, "Fern"),
        SpriteRef::new(Category::Plant, "Nope"),
    ];
    let queued = block_on(fx.engine.prefetch(&sprites, &["Chilled".to_string()]));
    assert_eq!(queued, 2);
    assert_eq!(fx.engine.pending_jobs(), 2);
    assert_eq!(fx.engine.global_signature(), "Chilled");
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn test_cache_bounds_evict_oldest() {
    let mut config = EngineConfig::default();
    config.cache.max_entries = 2;
    let fx = started(config);
    for mutation in ["Wet", "Chilled", "Frozen"] {
        block_on(fx.engine.render_variant(&request(Category::Plant, "Carrot", &[mutation]))).unwrap();
    }
    let stats = fx.engine.cache_stats();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.evictions, 1);
}

#[test]
fn test_cache_cost_counts_frames() {
    let mut config = EngineConfig::default();
    config.cache.max_cost = 4;
    let fx = started(config);
    block_on(fx.engine.render_variant(&request(Category::Plant, "Fern", &["Wet"]))).unwrap();
    block_on(fx.engine.render_variant(&request(Category::Plant, "Carrot", &["Wet"]))).unwrap();
    assert_eq!(fx.engine.cache_stats().total_cost, 4);

    block_on(fx.engine.render_variant(&request(Category::Plant, "Carrot", &["Chilled"]))).unwrap();
    let stats = fx.engine.cache_stats();
    assert!(stats.total_cost <= 4);
    assert_eq!(stats.evictions, 1);
}

#[test]
fn test_disabled_cache_requeues() {
    let mut config = EngineConfig::default();
    config.cache.enabled = false;
    let fx = started(config);
    let wet = request(Category::Plant, "Carrot", &["Wet"]);
    fx.engine.get_sprite_with_mutations(&wet);
    block_on(fx.engine.drive_until_idle());
    assert_eq!(fx.engine.cache_stats().entries, 0);

    let base = fx.engine.get_base_sprite(&wet.sprite()).unwrap();
    assert_eq!(fx.engine.get_sprite_with_mutations(&wet).unwrap(), base);
    assert_eq!(fx.engine.pending_jobs(), 1);
}

#[test]
fn test_invalidate_drops_everything() {
    let fx = started(EngineConfig::default());
    block_on(fx.engine.render_variant(&request(Category::Plant, "Carrot", &["Wet"]))).unwrap();
    fx.engine.get_sprite_with_mutations(&request(Category::Plant, "Fern", &["Wet"]));
    fx.engine.invalidate();
    assert_eq!(fx.engine.cache_stats().entries, 0);
    assert_eq!(fx.engine.pending_jobs(), 0);
    assert_eq!(fx.engine.global_signature(), "");
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_render_to_data_url() {
    let fx = started(EngineConfig::default());
    let options = CanvasOptions { frame: 0, scale: 2 };
    let url = block_on(fx.engine.render_to_data_url(&request(Category::Plant, "Carrot", &["Gold"]), &options)).unwrap();
    let payload = url.strip_prefix("data:image/png;base64,").expect("png data url");
    let decoded = image::load_from_memory(&STANDARD.decode(payload).unwrap()).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (16, 16));
    assert_ne!(decoded.get_pixel(2, 2), &CARROT);
}

#[test]
fn test_render_to_canvas_frames() {
    let fx = started(EngineConfig::default());
    let fern = request(Category::Plant, "Fern", &[]);
    let third = fx.engine.render_to_canvas(&fern, &CanvasOptions { frame: 2, scale: 1 }).unwrap();
    assert_eq!(third.get_pixel(0, 0), &Rgba([200, 200, 0, 255]));

    let result = fx.engine.render_to_canvas(&fern, &CanvasOptions { frame: 3, scale: 1 });
    assert!(matches!(result, Err(EngineError::FrameOutOfRange { index: 3, count: 3 })));
}

#[test]
fn test_unknown_sprite_is_not_found() {
    let fx = started(EngineConfig::default());
    let missing = request(Category::Crop, "Carrot", &["Wet"]);
    assert!(fx.engine.get_sprite_with_mutations(&missing).is_none());
    let result = block_on(fx.engine.render_variant(&missing));
    assert!(matches!(result, Err(EngineError::NotFound { category: Category::Crop, .. })));
}

#[test]
fn test_no_renderer_falls_back_to_base() {
    let fx = slow_fixture(Duration::from_secs(3_600));
    let _ = block_on(fx.engine.start());
    assert!(!fx.engine.has_renderer());

    let wet = request(Category::Plant, "Carrot", &["Wet"]);
    fx.engine.get_sprite_with_mutations(&wet);
    block_on(fx.engine.drive_until_idle());
    assert_eq!(fx.engine.scheduler_stats().fallback_frames, 1);
    assert_eq!(fx.engine.cache_stats().entries, 0);
    assert!(matches!(block_on(fx.engine.render_variant(&wet)), Err(EngineError::RenderFailed { .. })));
}
