//! Serde models for the asset manifest and atlas descriptors

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

use crate::texture::{Anchor, Rect};

/// Top-level asset manifest: `{ bundles: [{ assets: [{ src: [...] }] }] }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub bundles: Vec<Bundle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub src: Vec<AssetSrc>,
}

/// An asset source: either a bare path or an object with a `src` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AssetSrc {
    Path(String),
    Entry { src: String },
}

impl AssetSrc {
    pub fn path(&self) -> &str {
        match self {
            AssetSrc::Path(p) => p,
            AssetSrc::Entry { src } => src,
        }
    }
}

impl Manifest {
    /// Sources that look like atlas descriptors, deduplicated in manifest order.
    ///
    /// Any `.json` source qualifies except the manifest itself and audio assets.
    pub fn atlas_sources(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.bundles
            .iter()
            .flat_map(|b| &b.assets)
            .flat_map(|a| &a.src)
            .map(AssetSrc::path)
            .filter(|p| is_atlas_candidate(p))
            .filter(|p| seen.insert(p.to_string()))
            .map(str::to_string)
            .collect()
    }
}

fn is_atlas_candidate(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    path.ends_with(".json") && file_name != "manifest.json" && !path.trim_start_matches("./").starts_with("audio/")
}

/// Atlas descriptor in the TexturePacker JSON layout.
#[derive(Debug, Clone, Deserialize)]
pub struct AtlasDescriptor {
    pub frames: Frames,
    pub meta: Meta,
}

/// Frames are either keyed by name ("hash" layout) or listed with a `filename`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Frames {
    Map(BTreeMap<String, FrameEntry>),
    List(Vec<NamedFrame>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedFrame {
    pub filename: String,
    #[serde(flatten)]
    pub entry: FrameEntry,
}

impl Frames {
    /// Iterate `(frame key, entry)` pairs.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&str, &FrameEntry)> + '_> {
        match self {
            Frames::Map(map) => Box::new(map.iter().map(|(k, v)| (k.as_str(), v))),
            Frames::List(list) => Box::new(list.iter().map(|f| (f.filename.as_str(), &f.entry))),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Frames::Map(map) => map.len(),
            Frames::List(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameEntry {
    pub frame: FrameRect,
    #[serde(default)]
    pub rotated: bool,
    #[serde(default)]
    pub trimmed: bool,
    #[serde(default, rename = "spriteSourceSize")]
    pub sprite_source_size: Option<FrameRect>,
    #[serde(default, rename = "sourceSize")]
    pub source_size: Option<FrameSize>,
    #[serde(default, alias = "pivot")]
    pub anchor: Option<FramePoint>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FrameRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FrameRect {
    /// Whole-pixel rectangle (coordinates are floored, negatives clamp to zero).
    pub fn to_rect(&self) -> Rect {
        let px = |v: f64| v.max(0.0).floor() as u32;
        Rect::new(px(self.x), px(self.y), px(self.w), px(self.h))
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FrameSize {
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FramePoint {
    pub x: f32,
    pub y: f32,
}

impl From<FramePoint> for Anchor {
    fn from(p: FramePoint) -> Self {
        Anchor::new(p.x, p.y)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub image: String,
    #[serde(default)]
    pub related_multi_packs: Vec<String>,
}
