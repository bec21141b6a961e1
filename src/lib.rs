//! Sprite variant compositing engine
//!
//! Loads texture atlases into a sprite registry, composites mutation variants
//! (color layers, tall-sprite overlays, badge icons) through the host renderer,
//! and caches the results. Expensive variant work is spread across frames by a
//! time-budgeted job scheduler.
//!
//! The engine is single-threaded and cooperative: everything runs on the host's
//! event loop, and long work hands control back through an injected yielder.

pub mod atlas;
pub mod blend;
pub mod cache;
pub mod category;
pub mod cli;
pub mod compositor;
pub mod config;
pub mod context;
pub mod cooperative;
pub mod engine;
pub mod host;
pub mod logging;
pub mod mutation;
pub mod output;
pub mod registry;
pub mod scene;
pub mod scheduler;
pub mod texture;
pub mod variant;

pub use category::Category;
pub use config::EngineConfig;
pub use context::EngineContext;
pub use engine::{CanvasOptions, EngineError, SpriteEngine, SpriteRef, SpriteRequest};
pub use registry::{SpriteItem, TextureRegistry};
pub use texture::Texture;
pub use variant::{VariantBuilder, VariantInfo, VariantMode};
