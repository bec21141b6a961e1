//! Texture handles - shared pixel sources plus frame and anchor metadata

use image::{imageops, RgbaImage};
use std::fmt;
use std::sync::Arc;

/// An axis-aligned rectangle in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Check whether this rectangle lies entirely inside a `width` x `height` surface.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x.checked_add(self.w).is_some_and(|r| r <= width)
            && self.y.checked_add(self.h).is_some_and(|b| b <= height)
    }
}

/// Normalized pivot point (0.0-1.0 on each axis).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub const TOP_LEFT: Anchor = Anchor { x: 0.0, y: 0.0 };
    pub const CENTER: Anchor = Anchor { x: 0.5, y: 0.5 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A reference to a rectangular region of shared pixel data.
///
/// Cloning a texture is cheap: the pixel source is reference counted and never
/// mutated once a texture has been created from it. Compositing reads sources
/// through [`Texture::to_image`] and always produces a fresh source for its output.
#[derive(Clone)]
pub struct Texture {
    source: Arc<RgbaImage>,
    /// Region of `source` holding the (possibly trimmed, possibly rotated) pixels
    frame: Rect,
    /// Untrimmed sprite size
    orig: (u32, u32),
    /// Placement of the trimmed pixels inside the untrimmed sprite
    trim: Option<Rect>,
    /// Pixels are stored rotated 90 degrees clockwise in the source
    rotated: bool,
    anchor: Anchor,
}

impl Texture {
    /// Wrap a whole image as a texture with a top-left anchor.
    pub fn from_image(image: RgbaImage) -> Self {
        let (w, h) = image.dimensions();
        Self {
            source: Arc::new(image),
            frame: Rect::new(0, 0, w, h),
            orig: (w, h),
            trim: None,
            rotated: false,
            anchor: Anchor::TOP_LEFT,
        }
    }

    /// Reference a region of a shared source image.
    ///
    /// `frame` is the region as stored in the source. When `rotated` is set the
    /// stored region is the sprite turned 90 degrees clockwise, so its width is the
    /// sprite's height. Returns `None` when the region does not fit the source.
    pub fn from_region(source: Arc<RgbaImage>, frame: Rect, rotated: bool) -> Option<Self> {
        if frame.w == 0 || frame.h == 0 || !frame.fits_within(source.width(), source.height()) {
            return None;
        }
        let orig = if rotated { (frame.h, frame.w) } else { (frame.w, frame.h) };
        Some(Self { source, frame, orig, trim: None, rotated, anchor: Anchor::TOP_LEFT })
    }

    /// Set trim metadata: `orig` is the untrimmed size and `trim` places the stored
    /// pixels inside it.
    pub fn with_trim(mut self, orig: (u32, u32), trim: Rect) -> Self {
        self.orig = orig;
        self.trim = Some(trim);
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Untrimmed width.
    pub fn width(&self) -> u32 {
        self.orig.0
    }

    /// Untrimmed height.
    pub fn height(&self) -> u32 {
        self.orig.1
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn trim(&self) -> Option<Rect> {
        self.trim
    }

    pub fn is_rotated(&self) -> bool {
        self.rotated
    }

    /// Check whether two textures are the same handle (same source, same region).
    pub fn same_handle(&self, other: &Texture) -> bool {
        Arc::ptr_eq(&self.source, &other.source) && self.frame == other.frame
    }

    /// Materialize the sprite at its untrimmed size.
    ///
    /// Rotated regions are turned back upright and trimmed pixels are placed at their
    /// offset inside a transparent canvas of the original size.
    pub fn to_image(&self) -> RgbaImage {
        let region =
            imageops::crop_imm(&*self.source, self.frame.x, self.frame.y, self.frame.w, self.frame.h)
                .to_image();
        let upright = if self.rotated { imageops::rotate270(&region) } else { region };

        match self.trim {
            None if upright.dimensions() == self.orig => upright,
            None => {
                let mut canvas = RgbaImage::new(self.orig.0, self.orig.1);
                imageops::replace(&mut canvas, &upright, 0, 0);
                canvas
            }
            Some(trim) => {
                let mut canvas = RgbaImage::new(self.orig.0, self.orig.1);
                imageops::replace(&mut canvas, &upright, trim.x as i64, trim.y as i64);
                canvas
            }
        }
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.same_handle(other)
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("frame", &self.frame)
            .field("orig", &self.orig)
            .field("trim", &self.trim)
            .field("rotated", &self.rotated)
            .field("anchor", &self.anchor)
            .finish()
    }
}
