//! Layered compositing of mutation variants
//!
//! One scratch scene per frame, drawn bottom to top:
//!
//! 1. the base sprite
//! 2. one recolored copy of the base per color mutation, blended over it
//! 3. tall sprites only: overlay textures clipped to the base silhouette
//! 4. icon badges
//!
//! The scene is handed to the host renderer and the result becomes a new
//! texture. Source textures are only ever read.

mod effects;
mod icons;

use log::{debug, trace};

use crate::category::Category;
use crate::config::CompositorConfig;
use crate::host::HostRenderer;
use crate::registry::TextureRegistry;
use crate::scene::{Container, Mask, SpriteNode};
use crate::texture::{Anchor, Texture};
use crate::variant::{VariantInfo, VariantMode};

use icons::IconLayout;

/// Composites variants with a host renderer and the loaded registry.
pub struct Compositor<'a> {
    renderer: Option<&'a dyn HostRenderer>,
    registry: &'a TextureRegistry,
    config: &'a CompositorConfig,
}

impl<'a> Compositor<'a> {
    /// `renderer` is `None` until the host renderer has been located; every
    /// render fails until then.
    pub fn new(
        renderer: Option<&'a dyn HostRenderer>,
        registry: &'a TextureRegistry,
        config: &'a CompositorConfig,
    ) -> Self {
        Self { renderer, registry, config }
    }

    /// Render one frame of `item_key` with the variant applied.
    ///
    /// The output has the base's untrimmed size and anchor. Returns `None` when
    /// no renderer is bound or the renderer fails, and, with
    /// `strict_assets`, when an overlay or icon texture is missing.
    pub fn render(&self, base: &Texture, item_key: &str, variant: &VariantInfo) -> Option<Texture> {
        let renderer = self.renderer?;
        let (width, height) = (base.width(), base.height());
        if width == 0 || height == 0 {
            return None;
        }
        let species = Category::classify(item_key).map(|(_, id)| id).unwrap_or(item_key);

        let mut scene = Container::sized(width, height);
        scene.add(SpriteNode::new(base.clone()).anchored(Anchor::TOP_LEFT));

        for mutation in &variant.color {
            let layer = effects::color_layer(renderer, base, mutation)?;
            scene.add(layer);
        }

        if variant.mode == VariantMode::Tall {
            for mutation in &variant.overlay {
                match self.registry.overlay_texture(mutation.name, species) {
                    Some(overlay) => {
                        scene.add(overlay_node(overlay, base));
                    }
                    None if self.config.strict_assets => {
                        debug!("no {} overlay for '{}'", mutation.name, species);
                        return None;
                    }
                    None => trace!("no {} overlay for '{}', skipping", mutation.name, species),
                }
            }
        }

        let layout = IconLayout { scale: self.config.icon_scale, tall_boost: self.config.tall_boost };
        let mut slot = 0;
        for mutation in &variant.icon {
            let Some(icon) = self.registry.icon_texture(mutation.name) else {
                if self.config.strict_assets {
                    debug!("no icon for {}", mutation.name);
                    return None;
                }
                trace!("no icon for {}, skipping", mutation.name);
                continue;
            };
            if let Some(node) = layout.place(icon, slot, species, (width, height), variant.mode) {
                scene.add(node);
                slot += 1;
            }
        }

        let rendered = renderer.render_to_texture(&scene)?;
        Some(rendered.with_anchor(base.anchor()))
    }
}

/// Overlay scaled to the sprite width, hanging from the top center and clipped
/// to the base silhouette.
fn overlay_node(overlay: &Texture, base: &Texture) -> SpriteNode {
    let width = base.width() as f32;
    let scale = if overlay.width() == 0 { 1.0 } else { width / overlay.width() as f32 };
    SpriteNode::new(overlay.clone())
        .anchored(Anchor::new(0.5, 0.0))
        .scaled(scale)
        .at(width / 2.0, 0.0)
        .masked(Mask { texture: base.clone(), position: (0.0, 0.0) })
}
