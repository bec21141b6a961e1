//! Host renderer discovery and the reference software renderer

mod headless;
mod locator;
mod provider;
mod software;
mod strategy;

pub use headless::{HeadlessProvider, HEADLESS_GLOBAL};
pub use locator::{LocateError, RendererLocator};
pub use provider::{HostNode, HostRenderer, HostRenderingProvider, ReadyCallback, RendererHandle};
pub use software::{SoftwareRenderer, MAX_SURFACE_EDGE};
pub use strategy::{
    DetectionStrategy, GlobalProbeStrategy, ReadyHookStrategy, TreeWalkStrategy, DEFAULT_GLOBALS,
};
