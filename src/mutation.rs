//! The table of known sprite mutations
//!
//! Each mutation has a fixed canonical index. Sorting by that index (never by
//! request order) is what makes variant signatures deterministic.

use crate::blend::BlendMode;
use crate::scene::{ColorStop, Fill, LinearGradient};

/// Precedence class among color mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Exclusive full-sprite recolor; lower rank wins
    Premium(u8),
    Standard,
}

/// Seasonal class used for overlay suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Warm,
    Cool,
    Neutral,
}

/// How a mutation recolors the sprite on its scratch surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorEffect {
    /// Flat color over the sprite silhouette
    Tint([u8; 4]),
    /// Linear gradient over the sprite bounds; points are normalized
    Gradient { start: (f32, f32), end: (f32, f32), stops: &'static [ColorStop] },
}

impl ColorEffect {
    pub fn fill(&self) -> Fill {
        match self {
            ColorEffect::Tint(c) => Fill::Solid(image::Rgba(*c)),
            ColorEffect::Gradient { start, end, stops } => {
                Fill::Linear(LinearGradient { start: *start, end: *end, stops: stops.to_vec() })
            }
        }
    }
}

/// A named visual modifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mutation {
    pub name: &'static str,
    /// Canonical sort position
    pub index: u8,
    pub tier: Tier,
    pub season: Season,
    pub effect: ColorEffect,
    /// Blend mode used when the recolored layer is composited over the base
    pub blend: BlendMode,
    pub opacity: f32,
    /// Tall sprites draw an overlay texture for this mutation
    pub tall_overlay: bool,
    /// A badge icon is drawn for this mutation
    pub icon: bool,
}

impl Mutation {
    pub fn is_premium(&self) -> bool {
        matches!(self.tier, Tier::Premium(_))
    }

    /// Premium rank, `None` for standard mutations.
    pub fn rank(&self) -> Option<u8> {
        match self.tier {
            Tier::Premium(rank) => Some(rank),
            Tier::Standard => None,
        }
    }
}

const RAINBOW_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, [255, 64, 64, 255]),
    ColorStop::new(0.2, [255, 165, 0, 255]),
    ColorStop::new(0.4, [255, 235, 59, 255]),
    ColorStop::new(0.6, [76, 217, 100, 255]),
    ColorStop::new(0.8, [64, 156, 255, 255]),
    ColorStop::new(1.0, [170, 90, 255, 255]),
];

const GOLD_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, [255, 246, 170, 255]),
    ColorStop::new(0.5, [255, 204, 51, 255]),
    ColorStop::new(1.0, [212, 150, 20, 255]),
];

const FROZEN_STOPS: &[ColorStop] =
    &[ColorStop::new(0.0, [236, 250, 255, 255]), ColorStop::new(1.0, [150, 210, 255, 255])];

const DAWN_STOPS: &[ColorStop] =
    &[ColorStop::new(0.0, [255, 179, 217, 255]), ColorStop::new(1.0, [180, 140, 255, 255])];

const DAWN_CHARGED_STOPS: &[ColorStop] =
    &[ColorStop::new(0.0, [255, 138, 208, 255]), ColorStop::new(1.0, [138, 108, 255, 255])];

const AMBER_CHARGED_STOPS: &[ColorStop] =
    &[ColorStop::new(0.0, [255, 179, 71, 255]), ColorStop::new(1.0, [255, 106, 0, 255])];

const TOP_DOWN: ((f32, f32), (f32, f32)) = ((0.0, 0.0), (0.0, 1.0));
const DIAGONAL: ((f32, f32), (f32, f32)) = ((0.0, 0.0), (1.0, 1.0));

/// Every known mutation, in canonical order.
pub static MUTATIONS: [Mutation; 9] = [
    Mutation {
        name: "Gold",
        index: 0,
        tier: Tier::Premium(0),
        season: Season::Neutral,
        effect: ColorEffect::Gradient { start: TOP_DOWN.0, end: TOP_DOWN.1, stops: GOLD_STOPS },
        blend: BlendMode::Multiply,
        opacity: 0.9,
        tall_overlay: false,
        icon: false,
    },
    Mutation {
        name: "Rainbow",
        index: 1,
        tier: Tier::Premium(1),
        season: Season::Neutral,
        effect: ColorEffect::Gradient { start: DIAGONAL.0, end: DIAGONAL.1, stops: RAINBOW_STOPS },
        blend: BlendMode::Overlay,
        opacity: 0.8,
        tall_overlay: false,
        icon: false,
    },
    Mutation {
        name: "Wet",
        index: 2,
        tier: Tier::Standard,
        season: Season::Cool,
        effect: ColorEffect::Tint([95, 168, 255, 255]),
        blend: BlendMode::Multiply,
        opacity: 0.5,
        tall_overlay: true,
        icon: true,
    },
    Mutation {
        name: "Chilled",
        index: 3,
        tier: Tier::Standard,
        season: Season::Cool,
        effect: ColorEffect::Tint([180, 230, 255, 255]),
        blend: BlendMode::Screen,
        opacity: 0.45,
        tall_overlay: true,
        icon: true,
    },
    Mutation {
        name: "Frozen",
        index: 4,
        tier: Tier::Standard,
        season: Season::Cool,
        effect: ColorEffect::Gradient { start: TOP_DOWN.0, end: TOP_DOWN.1, stops: FROZEN_STOPS },
        blend: BlendMode::Screen,
        opacity: 0.6,
        tall_overlay: true,
        icon: true,
    },
    Mutation {
        name: "Dawnlit",
        index: 5,
        tier: Tier::Standard,
        season: Season::Warm,
        effect: ColorEffect::Gradient { start: TOP_DOWN.0, end: TOP_DOWN.1, stops: DAWN_STOPS },
        blend: BlendMode::Overlay,
        opacity: 0.5,
        tall_overlay: true,
        icon: true,
    },
    Mutation {
        name: "Ambershine",
        index: 6,
        tier: Tier::Standard,
        season: Season::Warm,
        effect: ColorEffect::Tint([255, 160, 64, 255]),
        blend: BlendMode::Overlay,
        opacity: 0.55,
        tall_overlay: true,
        icon: true,
    },
    Mutation {
        name: "Dawncharged",
        index: 7,
        tier: Tier::Standard,
        season: Season::Warm,
        effect: ColorEffect::Gradient { start: DIAGONAL.0, end: DIAGONAL.1, stops: DAWN_CHARGED_STOPS },
        blend: BlendMode::Screen,
        opacity: 0.55,
        tall_overlay: true,
        icon: true,
    },
    Mutation {
        name: "Ambercharged",
        index: 8,
        tier: Tier::Standard,
        season: Season::Warm,
        effect: ColorEffect::Gradient { start: DIAGONAL.0, end: DIAGONAL.1, stops: AMBER_CHARGED_STOPS },
        blend: BlendMode::Screen,
        opacity: 0.55,
        tall_overlay: true,
        icon: true,
    },
];

/// Find a mutation by name.
///
/// Canonical names match exactly; otherwise matching is case-insensitive and
/// accepts `Amberlit` for `Ambershine`.
pub fn lookup(name: &str) -> Option<&'static Mutation> {
    let name = name.trim();
    if let Some(m) = MUTATIONS.iter().find(|m| m.name == name) {
        return Some(m);
    }
    let name = if name.eq_ignore_ascii_case("amberlit") { "Ambershine" } else { name };
    MUTATIONS.iter().find(|m| m.name.eq_ignore_ascii_case(name))
}

/// Names of every known mutation in canonical order.
pub fn names() -> impl Iterator<Item = &'static str> {
    MUTATIONS.iter().map(|m| m.name)
}
