//! Manifest-driven atlas loading into a [`TextureRegistry`]

use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

use image::RgbaImage;

use super::fetch::{join_url, parent_url, FetchError};
use super::format::{AtlasDescriptor, FrameEntry, Manifest};
use crate::config::LoaderConfig;
use crate::context::EngineContext;
use crate::registry::{RegistryBuilder, TextureRegistry};
use crate::texture::{Anchor, Rect, Texture};

/// Name of the manifest file under the asset base URL.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Error that fails a whole load.
///
/// Individual descriptors and images never produce this; they are skipped and
/// counted in the [`LoadReport`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("failed to fetch manifest '{url}': {source}")]
    Manifest {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("failed to parse manifest '{url}': {source}")]
    ManifestParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// What a load pass found and skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub descriptors_loaded: usize,
    pub descriptors_failed: usize,
    pub images_decoded: usize,
    pub images_failed: usize,
    pub frames_loaded: usize,
    pub frames_skipped: usize,
}

/// Result of a successful load.
#[derive(Debug)]
pub struct LoadOutcome {
    pub registry: TextureRegistry,
    pub report: LoadReport,
}

/// A descriptor fetched and parsed, with the URL it came from.
struct LoadedDescriptor {
    url: String,
    descriptor: AtlasDescriptor,
}

/// Loads every atlas reachable from a manifest.
pub struct AtlasLoader<'a> {
    ctx: &'a EngineContext,
    config: &'a LoaderConfig,
}

impl<'a> AtlasLoader<'a> {
    pub fn new(ctx: &'a EngineContext, config: &'a LoaderConfig) -> Self {
        Self { ctx, config }
    }

    /// Fetch the manifest under `base_url` and build a registry from all atlases.
    ///
    /// Descriptors listed in the manifest are fetched concurrently, then every
    /// `related_multi_packs` reference is followed wave by wave until no new
    /// descriptor turns up. Images are decoded in batches with a yield after
    /// each decode.
    pub async fn load(&self, base_url: &str) -> Result<LoadOutcome, LoadError> {
        let manifest_url = join_url(base_url, MANIFEST_FILE);
        let bytes = self
            .ctx
            .fetcher()
            .fetch(&manifest_url)
            .await
            .map_err(|source| LoadError::Manifest { url: manifest_url.clone(), source })?;
        let manifest: Manifest = serde_json::from_slice(&bytes)
            .map_err(|source| LoadError::ManifestParse { url: manifest_url.clone(), source })?;

        let mut report = LoadReport::default();
        let seeds: Vec<String> = manifest.atlas_sources().iter().map(|src| join_url(base_url, src)).collect();
        debug!("manifest lists {} atlas descriptor(s)", seeds.len());

        let descriptors = self.fetch_descriptors(seeds, &mut report).await;
        let mut builder = RegistryBuilder::new();
        self.load_images(&descriptors, &mut builder, &mut report).await;

        let registry = builder.build();
        info!(
            "loaded {} atlas(es): {} frames, {} items ({} descriptor(s) and {} image(s) skipped)",
            report.descriptors_loaded,
            registry.texture_count(),
            crate::registry::Registry::len(&registry),
            report.descriptors_failed,
            report.images_failed
        );
        Ok(LoadOutcome { registry, report })
    }

    async fn fetch_descriptors(&self, seeds: Vec<String>, report: &mut LoadReport) -> Vec<LoadedDescriptor> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut wave: Vec<String> = seeds.into_iter().filter(|url| visited.insert(url.clone())).collect();
        let mut loaded = Vec::new();

        while !wave.is_empty() {
            let results = join_all(wave.iter().map(|url| self.fetch_descriptor(url))).await;
            let mut next = Vec::new();
            for (url, result) in wave.into_iter().zip(results) {
                match result {
                    Ok(descriptor) => {
                        let dir = parent_url(&url);
                        for related in &descriptor.meta.related_multi_packs {
                            let related_url = join_url(dir, related);
                            if visited.insert(related_url.clone()) {
                                next.push(related_url);
                            }
                        }
                        report.descriptors_loaded += 1;
                        loaded.push(LoadedDescriptor { url, descriptor });
                    }
                    Err(message) => {
                        warn!("skipping atlas descriptor '{}': {}", url, message);
                        report.descriptors_failed += 1;
                    }
                }
            }
            wave = next;
        }
        loaded
    }

    async fn fetch_descriptor(&self, url: &str) -> Result<AtlasDescriptor, String> {
        let bytes = self.ctx.fetcher().fetch(url).await.map_err(|e| e.to_string())?;
        serde_json::from_slice(&bytes).map_err(|e| e.to_string())
    }

    async fn load_images(&self, descriptors: &[LoadedDescriptor], builder: &mut RegistryBuilder, report: &mut LoadReport) {
        let batch_size = self.config.decode_batch_size.max(1);
        // Several descriptors may share one image
        let mut decoded: HashMap<String, Option<Arc<RgbaImage>>> = HashMap::new();

        for batch in descriptors.chunks(batch_size) {
            let pending: Vec<String> = batch
                .iter()
                .map(image_url)
                .filter(|url| !decoded.contains_key(url))
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            let fetched = join_all(pending.iter().map(|url| self.ctx.fetcher().fetch(url))).await;

            for (url, result) in pending.into_iter().zip(fetched) {
                let image = match result {
                    Ok(bytes) => match image::load_from_memory(&bytes) {
                        Ok(img) => {
                            report.images_decoded += 1;
                            Some(Arc::new(img.to_rgba8()))
                        }
                        Err(e) => {
                            warn!("skipping atlas image '{}': {}", url, e);
                            report.images_failed += 1;
                            None
                        }
                    },
                    Err(e) => {
                        warn!("skipping atlas image '{}': {}", url, e);
                        report.images_failed += 1;
                        None
                    }
                };
                decoded.insert(url, image);
                self.ctx.yield_now().await;
            }

            for loaded in batch {
                if let Some(Some(source)) = decoded.get(&image_url(loaded)) {
                    add_frames(builder, source, &loaded.descriptor, report);
                }
            }
        }
    }
}

fn image_url(loaded: &LoadedDescriptor) -> String {
    join_url(parent_url(&loaded.url), &loaded.descriptor.meta.image)
}

fn add_frames(builder: &mut RegistryBuilder, source: &Arc<RgbaImage>, descriptor: &AtlasDescriptor, report: &mut LoadReport) {
    for (key, entry) in descriptor.frames.iter() {
        match frame_texture(source, entry) {
            Some(texture) => {
                builder.insert(key, texture);
                report.frames_loaded += 1;
            }
            None => {
                warn!("frame '{}' lies outside its atlas image, skipping", key);
                report.frames_skipped += 1;
            }
        }
    }
}

/// Build the texture for one atlas frame.
///
/// A rotated frame is stored turned 90 degrees clockwise, so its region in the
/// source is `h` x `w`. Trim metadata only applies when the frame says it is
/// trimmed and both the placement and the original size are present.
fn frame_texture(source: &Arc<RgbaImage>, entry: &FrameEntry) -> Option<Texture> {
    let frame = entry.frame.to_rect();
    let stored = if entry.rotated { Rect::new(frame.x, frame.y, frame.h, frame.w) } else { frame };
    let texture = Texture::from_region(Arc::clone(source), stored, entry.rotated)?;

    let texture = match (entry.trimmed, entry.sprite_source_size, entry.source_size) {
        (true, Some(placement), Some(orig)) => {
            let placement = placement.to_rect();
            let orig = (orig.w.max(0.0).floor() as u32, orig.h.max(0.0).floor() as u32);
            texture.with_trim(orig, Rect::new(placement.x, placement.y, frame.w, frame.h))
        }
        _ => texture,
    };
    Some(texture.with_anchor(entry.anchor.map(Anchor::from).unwrap_or(Anchor::TOP_LEFT)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::MemoryFetcher;
    use crate::cooperative::CountingYielder;
    use crate::host::HeadlessProvider;
    use futures::executor::block_on;
    use image::{ImageOutputFormat, Rgba};
    use std::io::Cursor;
    use std::rc::Rc;

    fn png(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png).unwrap();
        bytes
    }

    fn context(fetcher: Rc<MemoryFetcher>) -> (EngineContext, Rc<CountingYielder>) {
        let yielder = Rc::new(CountingYielder::default());
        let ctx = EngineContext::new(Rc::new(HeadlessProvider::new()), fetcher).with_yielder(yielder.clone());
        (ctx, yielder)
    }

    #[test]
    fn test_rotated_trimmed_frame() {
        // 3x2 sprite stored rotated as a 2x3 region at (1, 1), trimmed from 5x4
        let source = Arc::new(RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8, y as u8, 0, 255])));
        let entry: FrameEntry = serde_json::from_str(
            r#"{"frame": {"x":1,"y":1,"w":3,"h":2}, "rotated": true, "trimmed": true,
                "spriteSourceSize": {"x":1,"y":1,"w":3,"h":2}, "sourceSize": {"w":5,"h":4}}"#,
        )
        .unwrap();
        let texture = frame_texture(&source, &entry).unwrap();
        assert_eq!((texture.width(), texture.height()), (5, 4));
        assert_eq!(texture.frame(), Rect::new(1, 1, 2, 3));
        let img = texture.to_image();
        assert_eq!(img.dimensions(), (5, 4));
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(1, 1)[3], 255);
    }

    #[test]
    fn test_frame_outside_image_is_none() {
        let source = Arc::new(RgbaImage::new(4, 4));
        let entry: FrameEntry = serde_json::from_str(r#"{"frame": {"x":2,"y":2,"w":4,"h":4}}"#).unwrap();
        assert!(frame_texture(&source, &entry).is_none());
    }

    #[test]
    fn test_missing_manifest_fails() {
        let fetcher = Rc::new(MemoryFetcher::new());
        let (ctx, _) = context(fetcher);
        let config = LoaderConfig::default();
        let result = block_on(AtlasLoader::new(&ctx, &config).load("assets"));
        assert!(matches!(result, Err(LoadError::Manifest { .. })));
    }

    #[test]
    fn test_bad_descriptor_is_skipped() {
        let fetcher = Rc::new(MemoryFetcher::new());
        fetcher.insert("assets/manifest.json", r#"{"bundles":[{"assets":[{"src":["a.json","b.json"]}]}]}"#);
        fetcher.insert("assets/a.json", "not json");
        fetcher.insert(
            "assets/b.json",
            r#"{"frames":{"sprite/item/Pot.png":{"frame":{"x":0,"y":0,"w":2,"h":2}}},"meta":{"image":"b.png"}}"#,
        );
        fetcher.insert("assets/b.png", png(&RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]))));
        let (ctx, yielder) = context(fetcher);
        let config = LoaderConfig::default();

        let outcome = block_on(AtlasLoader::new(&ctx, &config).load("assets")).unwrap();
        assert_eq!(outcome.report.descriptors_failed, 1);
        assert_eq!(outcome.report.descriptors_loaded, 1);
        assert!(outcome.registry.item("sprite/item/Pot").is_some());
        assert_eq!(yielder.count(), 1);
    }

    #[test]
    fn test_related_packs_followed_once() {
        let fetcher = Rc::new(MemoryFetcher::new());
        fetcher.insert("cdn/manifest.json", r#"{"bundles":[{"assets":[{"src":["packs/p0.json"]}]}]}"#);
        let descriptor = |key: &str, image: &str, related: &str| {
            format!(
                r#"{{"frames":{{"{}":{{"frame":{{"x":0,"y":0,"w":1,"h":1}}}}}},"meta":{{"image":"{}","related_multi_packs":[{}]}}}}"#,
                key, image, related
            )
        };
        fetcher.insert("cdn/packs/p0.json", descriptor("sprite/pet/Bee.png", "p0.png", r#""p1.json""#));
        fetcher.insert("cdn/packs/p1.json", descriptor("sprite/pet/Ant.png", "p1.png", r#""p0.json""#));
        let pixel = png(&RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 255])));
        fetcher.insert("cdn/packs/p0.png", pixel.clone());
        fetcher.insert("cdn/packs/p1.png", pixel);
        let (ctx, _) = context(fetcher.clone());
        let config = LoaderConfig::default();

        let outcome = block_on(AtlasLoader::new(&ctx, &config).load("cdn")).unwrap();
        assert_eq!(outcome.registry.list(crate::category::Category::Pet), vec!["Ant", "Bee"]);
        let p0_fetches = fetcher.requests().iter().filter(|u| u.as_str() == "cdn/packs/p0.json").count();
        assert_eq!(p0_fetches, 1);
    }
}
