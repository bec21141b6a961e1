//! Color layers: the sprite silhouette filled with a mutation's tint or gradient

use crate::host::HostRenderer;
use crate::mutation::Mutation;
use crate::scene::{Container, Graphics, Mask, SpriteNode};
use crate::texture::{Anchor, Texture};

/// Build the color layer for one mutation, ready to stack over the base.
///
/// A rectangle covering the sprite is filled with the mutation's color and
/// masked by the base's alpha, so only drawn pixels are recolored. The layer is
/// rendered on its own scratch scene; the base texture is only read.
pub(crate) fn color_layer(renderer: &dyn HostRenderer, base: &Texture, mutation: &Mutation) -> Option<SpriteNode> {
    let (width, height) = (base.width(), base.height());
    let mut scratch = Container::sized(width, height);
    let fill = Graphics::rect(0.0, 0.0, width as f32, height as f32, mutation.effect.fill());
    scratch.add(fill.masked(Mask { texture: base.clone(), position: (0.0, 0.0) }));

    let surface = renderer.render_to_surface(&scratch)?;
    let texture = renderer.create_texture(surface);
    Some(SpriteNode::new(texture).anchored(Anchor::TOP_LEFT).blended(mutation.blend, mutation.opacity))
}
