//! Contracts between the engine and the host that owns the real renderer.

use futures::future::LocalBoxFuture;
use image::RgbaImage;
use std::rc::Rc;

use crate::scene::Container;
use crate::texture::Texture;

/// A bound host renderer.
///
/// Exposes the two render targets the compositor needs plus the primitive
/// constructors for building scenes. Scene nodes themselves are plain values from
/// [`crate::scene`]; only texture creation goes through the host.
pub trait HostRenderer {
    /// Short label used in log output.
    fn label(&self) -> &str {
        "host"
    }

    /// Render a scene into a new texture. The texture's anchor marks where the
    /// scene origin landed.
    fn render_to_texture(&self, scene: &Container) -> Option<Texture>;

    /// Render a scene into a raster surface that the caller may draw on.
    fn render_to_surface(&self, scene: &Container) -> Option<RgbaImage>;

    /// Turn a raster surface into a texture usable in scenes.
    fn create_texture(&self, surface: RgbaImage) -> Texture {
        Texture::from_image(surface)
    }

    /// The host's own frame/update signal, when it exposes one.
    fn next_frame(&self) -> Option<LocalBoxFuture<'static, ()>> {
        None
    }
}

/// Shared handle to a located renderer.
pub type RendererHandle = Rc<dyn HostRenderer>;

/// Callback fired with the renderer when the host finishes initializing.
pub type ReadyCallback = Box<dyn FnOnce(RendererHandle)>;

/// A node of the host's element/component tree.
pub trait HostNode {
    fn parent(&self) -> Option<Rc<dyn HostNode>>;

    fn children(&self) -> Vec<Rc<dyn HostNode>>;

    /// Renderer reachable from this node, if the node exposes renderer-shaped state.
    fn renderer(&self) -> Option<RendererHandle>;

    fn is_visible(&self) -> bool {
        true
    }
}

/// Injected view of the host environment.
///
/// Every method must be cheap and non-blocking; the locator polls them repeatedly.
pub trait HostRenderingProvider {
    /// Register a callback for the host renderer's initialization. Hosts that are
    /// already running may never call it.
    fn on_ready(&self, callback: ReadyCallback);

    /// Look up a renderer published under a well-known global name.
    fn global(&self, name: &str) -> Option<RendererHandle>;

    /// Check the given global names in order.
    fn poll_existing(&self, names: &[String]) -> Option<RendererHandle> {
        names.iter().find_map(|name| self.global(name))
    }

    /// Canvas nodes currently attached to the host page.
    fn canvases(&self) -> Vec<Rc<dyn HostNode>> {
        Vec::new()
    }
}
