//! Placement of mutation icon badges

use crate::scene::SpriteNode;
use crate::texture::{Anchor, Texture};
use crate::variant::VariantMode;

/// Where the first badge sits, in normalized sprite coordinates.
const DEFAULT_ICON_ANCHOR: (f32, f32) = (0.85, 0.15);

/// Horizontal gap between consecutive badges, as a fraction of badge size.
const ICON_SPACING: f32 = 0.8;

/// Species whose artwork puts the default badge spot somewhere awkward.
const SPECIES_ANCHORS: &[(&str, (f32, f32))] = &[
    ("Bamboo", (0.7, 0.08)),
    ("Cactus", (0.78, 0.22)),
    ("Sunflower", (0.8, 0.1)),
    ("Lily", (0.8, 0.3)),
    ("Mushroom", (0.82, 0.28)),
    ("Coconut", (0.75, 0.12)),
    ("Banana", (0.72, 0.12)),
    ("Starweaver", (0.7, 0.2)),
];

/// Sizing knobs for badges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct IconLayout {
    /// Badge size relative to the smaller sprite edge
    pub scale: f32,
    /// Extra factor for tall sprites
    pub tall_boost: f32,
}

impl IconLayout {
    pub(crate) fn anchor_for(species: &str) -> (f32, f32) {
        SPECIES_ANCHORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(species))
            .map(|(_, anchor)| *anchor)
            .unwrap_or(DEFAULT_ICON_ANCHOR)
    }

    /// Target badge edge in pixels for a sprite of the given size.
    pub(crate) fn badge_size(&self, width: u32, height: u32, mode: VariantMode) -> f32 {
        let footprint = width.min(height) as f32 * self.scale;
        match mode {
            VariantMode::Tall => footprint * self.tall_boost,
            VariantMode::Normal => footprint,
        }
    }

    /// Scene node for the `slot`-th badge over a `width` x `height` sprite.
    ///
    /// Badges are centered on the species anchor and stack leftwards.
    pub(crate) fn place(
        &self,
        icon: &Texture,
        slot: usize,
        species: &str,
        (width, height): (u32, u32),
        mode: VariantMode,
    ) -> Option<SpriteNode> {
        let longest = icon.width().max(icon.height());
        if longest == 0 {
            return None;
        }
        let size = self.badge_size(width, height, mode);
        if size <= 0.0 {
            return None;
        }
        let (ax, ay) = Self::anchor_for(species);
        let x = ax * width as f32 - slot as f32 * size * ICON_SPACING;
        let y = ay * height as f32;
        Some(SpriteNode::new(icon.clone()).anchored(Anchor::CENTER).scaled(size / longest as f32).at(x, y))
    }
}
