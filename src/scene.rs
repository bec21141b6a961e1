//! Scratch scene graph handed to a host renderer
//!
//! The compositor builds a short-lived [`Container`] per rendered frame and asks the
//! host renderer to rasterize it. Nodes only reference textures; dropping the scene
//! never touches the texture sources.

use image::Rgba;

use crate::blend::BlendMode;
use crate::texture::{Anchor, Texture};

/// A color at a normalized position along a gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgba<u8>,
}

impl ColorStop {
    pub const fn new(offset: f32, color: [u8; 4]) -> Self {
        Self { offset, color: Rgba(color) }
    }
}

/// A linear gradient between two points given in normalized (0.0-1.0) units of the
/// filled area.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub start: (f32, f32),
    pub end: (f32, f32),
    pub stops: Vec<ColorStop>,
}

impl LinearGradient {
    /// Sample the gradient at normalized coordinates inside the filled area.
    pub fn sample(&self, u: f32, v: f32) -> Rgba<u8> {
        let (dx, dy) = (self.end.0 - self.start.0, self.end.1 - self.start.1);
        let len_sq = dx * dx + dy * dy;
        let t = if len_sq == 0.0 {
            0.0
        } else {
            (((u - self.start.0) * dx + (v - self.start.1) * dy) / len_sq).clamp(0.0, 1.0)
        };
        sample_stops(&self.stops, t)
    }
}

fn sample_stops(stops: &[ColorStop], t: f32) -> Rgba<u8> {
    let Some(first) = stops.first() else {
        return Rgba([0, 0, 0, 0]);
    };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let k = if span <= 0.0 { 1.0 } else { (t - a.offset) / span };
            let lerp = |i: usize| -> u8 {
                (a.color[i] as f32 + (b.color[i] as f32 - a.color[i] as f32) * k).round() as u8
            };
            return Rgba([lerp(0), lerp(1), lerp(2), lerp(3)]);
        }
    }
    stops[stops.len() - 1].color
}

/// How a [`Graphics`] rectangle is painted.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Rgba<u8>),
    Linear(LinearGradient),
}

impl Fill {
    /// Color at normalized coordinates inside the filled area.
    pub fn color_at(&self, u: f32, v: f32) -> Rgba<u8> {
        match self {
            Fill::Solid(c) => *c,
            Fill::Linear(g) => g.sample(u, v),
        }
    }
}

/// Restricts a node to the silhouette (alpha channel) of a texture.
#[derive(Debug, Clone)]
pub struct Mask {
    pub texture: Texture,
    /// Top-left corner of the mask in container coordinates
    pub position: (f32, f32),
}

/// A textured quad positioned by its anchor.
#[derive(Debug, Clone)]
pub struct SpriteNode {
    pub texture: Texture,
    /// Where the anchor point lands in container coordinates
    pub position: (f32, f32),
    /// Overrides the texture's own anchor
    pub anchor: Option<Anchor>,
    pub scale: (f32, f32),
    pub blend: BlendMode,
    pub alpha: f32,
    pub mask: Option<Mask>,
}

impl SpriteNode {
    pub fn new(texture: Texture) -> Self {
        Self {
            texture,
            position: (0.0, 0.0),
            anchor: None,
            scale: (1.0, 1.0),
            blend: BlendMode::Normal,
            alpha: 1.0,
            mask: None,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = (x, y);
        self
    }

    pub fn anchored(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.scale = (scale, scale);
        self
    }

    pub fn blended(mut self, blend: BlendMode, alpha: f32) -> Self {
        self.blend = blend;
        self.alpha = alpha;
        self
    }

    pub fn masked(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Scaled size in pixels.
    pub fn size(&self) -> (f32, f32) {
        (self.texture.width() as f32 * self.scale.0, self.texture.height() as f32 * self.scale.1)
    }

    /// Top-left corner in container coordinates.
    pub fn top_left(&self) -> (f32, f32) {
        let anchor = self.anchor.unwrap_or_else(|| self.texture.anchor());
        let (w, h) = self.size();
        (self.position.0 - anchor.x * w, self.position.1 - anchor.y * h)
    }
}

/// A filled rectangle.
///
/// With a mask, only pixels inside the mask's silhouette are painted, which is
/// how color layers recolor a sprite without touching its texture.
#[derive(Debug, Clone)]
pub struct Graphics {
    /// x, y, width, height in container coordinates
    pub rect: (f32, f32, f32, f32),
    pub fill: Fill,
    pub blend: BlendMode,
    pub alpha: f32,
    pub mask: Option<Mask>,
}

impl Graphics {
    pub fn rect(x: f32, y: f32, w: f32, h: f32, fill: Fill) -> Self {
        Self { rect: (x, y, w, h), fill, blend: BlendMode::Normal, alpha: 1.0, mask: None }
    }

    pub fn masked(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Sprite(SpriteNode),
    Graphics(Graphics),
    Container(Container),
}

impl Node {
    /// Axis-aligned bounds as (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> Option<(f32, f32, f32, f32)> {
        match self {
            Node::Sprite(s) => {
                let (x, y) = s.top_left();
                let (w, h) = s.size();
                Some((x, y, x + w, y + h))
            }
            Node::Graphics(g) => {
                let (x, y, w, h) = g.rect;
                Some((x, y, x + w, y + h))
            }
            Node::Container(c) => c
                .bounds()
                .map(|(x0, y0, x1, y1)| (x0 + c.position.0, y0 + c.position.1, x1 + c.position.0, y1 + c.position.1)),
        }
    }
}

/// Ordered group of nodes; later children draw on top.
#[derive(Debug, Clone, Default)]
pub struct Container {
    pub children: Vec<Node>,
    pub position: (f32, f32),
    /// Fixed render area starting at the container origin
    pub size: Option<(u32, u32)>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// A container whose render area is pinned to `width` x `height`.
    pub fn sized(width: u32, height: u32) -> Self {
        Self { size: Some((width, height)), ..Self::default() }
    }

    pub fn add(&mut self, node: impl Into<Node>) -> &mut Self {
        self.children.push(node.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Local bounds, either the pinned size or the union of children.
    pub fn bounds(&self) -> Option<(f32, f32, f32, f32)> {
        if let Some((w, h)) = self.size {
            return Some((0.0, 0.0, w as f32, h as f32));
        }
        self.children.iter().filter_map(Node::bounds).reduce(|a, b| {
            (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3))
        })
    }
}

impl From<SpriteNode> for Node {
    fn from(s: SpriteNode) -> Self {
        Node::Sprite(s)
    }
}

impl From<Graphics> for Node {
    fn from(g: Graphics) -> Self {
        Node::Graphics(g)
    }
}

impl From<Container> for Node {
    fn from(c: Container) -> Self {
        Node::Container(c)
    }
}
