//! CPU rasterizer implementing [`HostRenderer`] with the `image` crate

use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::warn;

use super::provider::HostRenderer;
use crate::blend::{blend_pixels, blit_blended, AlphaMask, Coverage, Opaque};
use crate::scene::{Container, Graphics, Node, SpriteNode};
use crate::texture::{Anchor, Texture};

/// Largest surface edge the rasterizer will allocate.
pub const MAX_SURFACE_EDGE: u32 = 8192;

/// Reference renderer used headless and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareRenderer;

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Rasterize a scene. Returns the surface and the scene origin's pixel position.
    fn rasterize(&self, scene: &Container) -> Option<(RgbaImage, (f32, f32))> {
        let (x0, y0, x1, y1) = scene.bounds()?;
        let (min_x, min_y) = (x0.floor(), y0.floor());
        let width = (x1.ceil() - min_x).max(0.0) as u32;
        let height = (y1.ceil() - min_y).max(0.0) as u32;
        if width == 0 || height == 0 {
            return None;
        }
        if width > MAX_SURFACE_EDGE || height > MAX_SURFACE_EDGE {
            warn!("refusing to rasterize {}x{} scene", width, height);
            return None;
        }

        let mut canvas = RgbaImage::new(width, height);
        let origin = (-min_x, -min_y);
        for child in &scene.children {
            draw_node(&mut canvas, child, origin);
        }
        Some((canvas, origin))
    }
}

impl HostRenderer for SoftwareRenderer {
    fn label(&self) -> &str {
        "software"
    }

    fn render_to_texture(&self, scene: &Container) -> Option<Texture> {
        let (surface, origin) = self.rasterize(scene)?;
        let (w, h) = surface.dimensions();
        let anchor = Anchor::new(origin.0 / w as f32, origin.1 / h as f32);
        Some(self.create_texture(surface).with_anchor(anchor))
    }

    fn render_to_surface(&self, scene: &Container) -> Option<RgbaImage> {
        self.rasterize(scene).map(|(surface, _)| surface)
    }
}

fn draw_node(canvas: &mut RgbaImage, node: &Node, offset: (f32, f32)) {
    match node {
        Node::Sprite(sprite) => draw_sprite(canvas, sprite, offset),
        Node::Graphics(graphics) => draw_graphics(canvas, graphics, offset),
        Node::Container(container) => {
            let inner = (offset.0 + container.position.0, offset.1 + container.position.1);
            for child in &container.children {
                draw_node(canvas, child, inner);
            }
        }
    }
}

fn draw_sprite(canvas: &mut RgbaImage, sprite: &SpriteNode, offset: (f32, f32)) {
    let mut pixels = sprite.texture.to_image();
    let (w, h) = sprite.size();
    let (w, h) = (w.round().max(0.0) as u32, h.round().max(0.0) as u32);
    if w == 0 || h == 0 {
        return;
    }
    if (w, h) != pixels.dimensions() {
        pixels = imageops::resize(&pixels, w, h, FilterType::Nearest);
    }

    let (left, top) = sprite.top_left();
    let x = (left + offset.0).round() as i64;
    let y = (top + offset.1).round() as i64;

    match &sprite.mask {
        Some(mask) => {
            let mask_pixels = mask.texture.to_image();
            let coverage = AlphaMask {
                image: &mask_pixels,
                x: (mask.position.0 + offset.0).round() as i64,
                y: (mask.position.1 + offset.1).round() as i64,
            };
            blit_blended(canvas, &pixels, x, y, sprite.blend, sprite.alpha, &coverage);
        }
        None => blit_blended(canvas, &pixels, x, y, sprite.blend, sprite.alpha, &Opaque),
    }
}

fn draw_graphics(canvas: &mut RgbaImage, graphics: &Graphics, offset: (f32, f32)) {
    let (_, _, rw, rh) = graphics.rect;
    if rw <= 0.0 || rh <= 0.0 {
        return;
    }
    let mask_pixels = graphics.mask.as_ref().map(|mask| (mask.texture.to_image(), mask.position));
    match &mask_pixels {
        Some((image, position)) => {
            let coverage = AlphaMask {
                image,
                x: (position.0 + offset.0).round() as i64,
                y: (position.1 + offset.1).round() as i64,
            };
            fill_rect(canvas, graphics, offset, &coverage);
        }
        None => fill_rect(canvas, graphics, offset, &Opaque),
    }
}

fn fill_rect(canvas: &mut RgbaImage, graphics: &Graphics, offset: (f32, f32), coverage: &dyn Coverage) {
    let (rx, ry, rw, rh) = graphics.rect;
    let (left, top) = (rx + offset.0, ry + offset.1);
    let x_start = left.round().max(0.0) as u32;
    let y_start = top.round().max(0.0) as u32;
    let x_end = ((left + rw).round().max(0.0) as u32).min(canvas.width());
    let y_end = ((top + rh).round().max(0.0) as u32).min(canvas.height());
    let opacity = graphics.alpha.clamp(0.0, 1.0);

    for py in y_start..y_end {
        for px in x_start..x_end {
            let u = (px as f32 + 0.5 - left) / rw;
            let v = (py as f32 + 0.5 - top) / rh;
            let color = graphics.fill.color_at(u, v);
            let src_alpha = color[3] as f32 / 255.0 * opacity * coverage.alpha_at(px, py);
            if src_alpha <= 0.0 {
                continue;
            }
            let dst = *canvas.get_pixel(px, py);
            canvas.put_pixel(px, py, blend_pixels(&color, &dst, graphics.blend, src_alpha));
        }
    }
}
