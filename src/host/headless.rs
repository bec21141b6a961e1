//! Provider for running without a host page (CLI, tests, offline rendering)

use std::rc::Rc;

use super::provider::{HostRenderingProvider, ReadyCallback, RendererHandle};
use super::software::SoftwareRenderer;

/// Global name under which the headless provider publishes its renderer.
pub const HEADLESS_GLOBAL: &str = "__spv_renderer__";

/// A host that is "already running" with a software renderer published globally.
///
/// The initialization hook never fires, so the locator finds the renderer through
/// its global probe.
pub struct HeadlessProvider {
    renderer: RendererHandle,
}

impl HeadlessProvider {
    pub fn new() -> Self {
        Self::with_renderer(Rc::new(SoftwareRenderer::new()))
    }

    pub fn with_renderer(renderer: RendererHandle) -> Self {
        Self { renderer }
    }
}

impl Default for HeadlessProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRenderingProvider for HeadlessProvider {
    fn on_ready(&self, _callback: ReadyCallback) {}

    fn global(&self, name: &str) -> Option<RendererHandle> {
        (name == HEADLESS_GLOBAL).then(|| Rc::clone(&self.renderer))
    }
}
