//! Flat texture registry and the sprite items built from it.

mod traits;

pub use traits::Registry;

use log::debug;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use crate::category::Category;
use crate::texture::Texture;

/// File extensions stripped from atlas frame keys.
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".webp", ".jpg", ".jpeg"];

/// A named sprite: one texture or an ordered animation.
#[derive(Debug, Clone, PartialEq)]
pub enum SpriteItem {
    Static(Texture),
    Animated(Vec<Texture>),
}

impl SpriteItem {
    /// Build from rendered frames: one frame is static, more is an animation.
    ///
    /// Returns `None` for an empty frame list.
    pub fn from_frames(mut frames: Vec<Texture>) -> Option<Self> {
        match frames.len() {
            0 => None,
            1 => frames.pop().map(SpriteItem::Static),
            _ => Some(SpriteItem::Animated(frames)),
        }
    }

    pub fn frames(&self) -> &[Texture] {
        match self {
            SpriteItem::Static(t) => std::slice::from_ref(t),
            SpriteItem::Animated(frames) => frames,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames().len()
    }

    pub fn is_animation(&self) -> bool {
        matches!(self, SpriteItem::Animated(_))
    }

    /// First frame, used as the representative texture.
    pub fn first_frame(&self) -> Option<&Texture> {
        self.frames().first()
    }
}

/// Strip a known image extension from an atlas frame key.
pub fn normalize_key(key: &str) -> &str {
    IMAGE_EXTENSIONS.iter().find_map(|ext| key.strip_suffix(ext)).unwrap_or(key)
}

fn animation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?P<base>.+)_(?P<index>\d{3,})$").expect("valid regex"))
}

/// Split `base_NNN` into its base name and frame index.
pub fn split_animation_key(key: &str) -> Option<(&str, u32)> {
    let caps = animation_pattern().captures(key)?;
    let base = caps.name("base")?.as_str();
    let index = caps.name("index")?.as_str().parse().ok()?;
    Some((base, index))
}

/// Collects frame textures while atlases load.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    textures: BTreeMap<String, Texture>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame texture. Later atlases win on key collisions.
    pub fn insert(&mut self, key: &str, texture: Texture) {
        let key = normalize_key(key).to_string();
        if self.textures.insert(key.clone(), texture).is_some() {
            debug!("frame '{}' redefined by a later atlas", key);
        }
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Group indexed frames into animations and freeze the registry.
    ///
    /// Two or more `base_NNN` frames become one animation under `base`, ordered by
    /// index. A lone indexed frame stays a static item under its own key.
    pub fn build(self) -> TextureRegistry {
        let mut groups: BTreeMap<String, Vec<(u32, String)>> = BTreeMap::new();
        for key in self.textures.keys() {
            if let Some((base, index)) = split_animation_key(key) {
                groups.entry(base.to_string()).or_default().push((index, key.clone()));
            }
        }

        let mut items: BTreeMap<String, SpriteItem> = BTreeMap::new();
        let mut grouped: HashSet<String> = HashSet::new();
        for (base, mut members) in groups {
            if members.len() < 2 {
                continue;
            }
            members.sort_by_key(|(index, _)| *index);
            let frames: Vec<Texture> = members.iter().filter_map(|(_, k)| self.textures.get(k).cloned()).collect();
            grouped.extend(members.into_iter().map(|(_, key)| key));
            if self.textures.contains_key(&base) {
                debug!("animation '{}' shadows a static frame of the same name", base);
            }
            items.insert(base, SpriteItem::Animated(frames));
        }

        for (key, texture) in &self.textures {
            if grouped.contains(key) || items.contains_key(key) {
                continue;
            }
            items.insert(key.clone(), SpriteItem::Static(texture.clone()));
        }

        TextureRegistry { textures: self.textures, items }
    }
}

/// All textures and sprite items known to the engine.
///
/// Built once after atlas loading and immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct TextureRegistry {
    textures: BTreeMap<String, Texture>,
    items: BTreeMap<String, SpriteItem>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Individual frame texture by (extension-less) key.
    pub fn texture(&self, key: &str) -> Option<&Texture> {
        self.textures.get(normalize_key(key))
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Sprite item by full key.
    pub fn item(&self, key: &str) -> Option<&SpriteItem> {
        self.items.get(normalize_key(key))
    }

    /// Find an item by category and id, returning its concrete category and key.
    pub fn find(&self, category: Category, id: &str) -> Option<(Category, String, &SpriteItem)> {
        category.search_order().iter().find_map(|c| {
            let key = c.key(id)?;
            let item = self.items.get(&key)?;
            Some((*c, key, item))
        })
    }

    /// Ids of every item in a category, sorted. [`Category::Any`] lists all
    /// categorized items.
    pub fn list(&self, category: Category) -> Vec<String> {
        let mut ids: Vec<String> = self
            .items
            .keys()
            .filter_map(|key| Category::classify(key))
            .filter(|(c, _)| category == Category::Any || *c == category)
            .map(|(_, id)| id.to_string())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Overlay texture for a tall sprite: first `{Mutation}{Base}`, then the
    /// generic `{Mutation}TallPlant`.
    pub fn overlay_texture(&self, mutation: &str, base_name: &str) -> Option<&Texture> {
        let overlay = Category::MutationOverlay;
        [format!("{}{}", mutation, base_name), format!("{}TallPlant", mutation)]
            .iter()
            .filter_map(|id| overlay.key(id))
            .find_map(|key| self.overlay_frame(&key))
    }

    /// Icon badge texture for a mutation.
    pub fn icon_texture(&self, mutation: &str) -> Option<&Texture> {
        let key = Category::Mutation.key(mutation)?;
        self.items.get(&key).and_then(SpriteItem::first_frame)
    }

    fn overlay_frame(&self, key: &str) -> Option<&Texture> {
        self.items.get(key).and_then(SpriteItem::first_frame)
    }
}

impl Registry<SpriteItem> for TextureRegistry {
    fn contains(&self, key: &str) -> bool {
        self.items.contains_key(normalize_key(key))
    }

    fn get(&self, key: &str) -> Option<&SpriteItem> {
        self.item(key)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn keys(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.items.keys().map(String::as_str))
    }
}
