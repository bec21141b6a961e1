//! Normalizing mutation lists into variant layering plans
//!
//! A [`VariantInfo`] says which mutations become color layers, overlays and
//! icons for one sprite, and carries a signature string that identifies the
//! composited result. Signatures depend only on the normalized mutation sets,
//! never on the order the caller listed them in.

use std::collections::BTreeMap;
use std::fmt;

use crate::category::Category;
use crate::mutation::{self, Mutation, Season};

/// How a sprite takes mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantMode {
    Normal,
    /// Weather mutations are drawn as overlay textures instead of tints
    Tall,
}

impl VariantMode {
    pub fn for_category(category: Category) -> Self {
        if category.is_tall() {
            VariantMode::Tall
        } else {
            VariantMode::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantMode::Normal => "normal",
            VariantMode::Tall => "tall",
        }
    }
}

impl fmt::Display for VariantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layering plan for one variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantInfo {
    pub mode: VariantMode,
    pub color: Vec<&'static Mutation>,
    pub overlay: Vec<&'static Mutation>,
    pub icon: Vec<&'static Mutation>,
    /// Identifies the composited output for this mode
    pub signature: String,
    /// Canonical form of the requested selection, independent of mode
    pub selection: String,
}

impl VariantInfo {
    /// True when nothing would be drawn over the base sprite.
    pub fn is_base(&self) -> bool {
        self.color.is_empty() && self.overlay.is_empty() && self.icon.is_empty()
    }
}

/// Builds [`VariantInfo`] values from raw mutation names.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantBuilder;

impl VariantBuilder {
    /// Normalize `names` for a sprite of the given mode.
    ///
    /// Unknown names are ignored and duplicates collapse. A premium mutation
    /// replaces every other color: the single best-ranked premium is kept. In
    /// normal mode the replaced mutations are dropped entirely, icons included.
    /// In tall mode standard mutations become overlays, where any warm mutation
    /// hides the cool ones, and still contribute icons.
    pub fn build<S: AsRef<str>>(names: &[S], mode: VariantMode) -> VariantInfo {
        let known = canonical(names);
        let premium = known.iter().copied().filter(|m| m.is_premium()).min_by_key(|m| m.rank());
        let standard: Vec<&'static Mutation> = known.iter().copied().filter(|m| !m.is_premium()).collect();

        let (color, overlay, survivors) = match (mode, premium) {
            (VariantMode::Normal, Some(p)) => (vec![p], Vec::new(), vec![p]),
            (VariantMode::Normal, None) => (standard.clone(), Vec::new(), standard),
            (VariantMode::Tall, premium) => {
                let mut overlay: Vec<&'static Mutation> =
                    standard.iter().copied().filter(|m| m.tall_overlay).collect();
                if overlay.iter().any(|m| m.season == Season::Warm) {
                    overlay.retain(|m| m.season != Season::Cool);
                }
                let color: Vec<&'static Mutation> = premium.into_iter().collect();
                let mut survivors = color.clone();
                survivors.extend(standard);
                survivors.sort_by_key(|m| m.index);
                (color, overlay, survivors)
            }
        };
        let icon: Vec<&'static Mutation> = survivors.into_iter().filter(|m| m.icon).collect();

        let signature = signature(mode, &color, &overlay, &icon);
        let selection = selection_of(&known);
        VariantInfo { mode, color, overlay, icon, signature, selection }
    }

    /// Signature only, for callers that do not need the plan.
    pub fn signature<S: AsRef<str>>(names: &[S], mode: VariantMode) -> String {
        Self::build(names, mode).signature
    }
}

/// Known mutations, deduplicated and in canonical order.
fn canonical<S: AsRef<str>>(names: &[S]) -> Vec<&'static Mutation> {
    let by_index: BTreeMap<u8, &'static Mutation> =
        names.iter().filter_map(|n| mutation::lookup(n.as_ref())).map(|m| (m.index, m)).collect();
    by_index.into_values().collect()
}

fn join(group: &[&Mutation]) -> String {
    group.iter().map(|m| m.name).collect::<Vec<_>>().join("+")
}

fn signature(mode: VariantMode, color: &[&Mutation], overlay: &[&Mutation], icon: &[&Mutation]) -> String {
    if color.is_empty() && overlay.is_empty() && icon.is_empty() {
        return format!("{}|base", mode);
    }
    format!("{}|c:{}|o:{}|i:{}", mode, join(color), join(overlay), join(icon))
}

fn selection_of(known: &[&Mutation]) -> String {
    if known.is_empty() {
        "base".to_string()
    } else {
        join(known)
    }
}
