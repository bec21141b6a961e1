//! Independent ways of finding the host renderer

use log::debug;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use super::provider::{HostNode, HostRenderingProvider, RendererHandle};

/// Default global names probed by [`GlobalProbeStrategy`].
pub const DEFAULT_GLOBALS: &[&str] = &["__PIXI_APP__", "__PIXI_RENDERER__", "PIXI_APP", "__spv_renderer__"];

/// One attempt at locating the renderer.
///
/// Strategies are polled repeatedly by the locator in priority order, so `detect`
/// must be cheap and must not block.
pub trait DetectionStrategy {
    fn name(&self) -> &'static str;

    /// Called once before the first poll.
    fn install(&mut self, _provider: &dyn HostRenderingProvider) {}

    fn detect(&mut self, provider: &dyn HostRenderingProvider) -> Option<RendererHandle>;
}

/// Captures the first renderer handed to the host's initialization callback.
#[derive(Default)]
pub struct ReadyHookStrategy {
    captured: Rc<RefCell<Option<RendererHandle>>>,
    installed: bool,
}

impl ReadyHookStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DetectionStrategy for ReadyHookStrategy {
    fn name(&self) -> &'static str {
        "ready-hook"
    }

    fn install(&mut self, provider: &dyn HostRenderingProvider) {
        if self.installed {
            return;
        }
        self.installed = true;
        let slot = Rc::clone(&self.captured);
        provider.on_ready(Box::new(move |renderer| {
            let mut slot = slot.borrow_mut();
            if slot.is_none() {
                *slot = Some(renderer);
            }
        }));
    }

    fn detect(&mut self, _provider: &dyn HostRenderingProvider) -> Option<RendererHandle> {
        self.captured.borrow().clone()
    }
}

/// Probes well-known global names the host may already have populated.
pub struct GlobalProbeStrategy {
    names: Vec<String>,
}

impl GlobalProbeStrategy {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl Default for GlobalProbeStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_GLOBALS.iter().map(|s| s.to_string()).collect())
    }
}

impl DetectionStrategy for GlobalProbeStrategy {
    fn name(&self) -> &'static str {
        "global-probe"
    }

    fn detect(&mut self, provider: &dyn HostRenderingProvider) -> Option<RendererHandle> {
        provider.poll_existing(&self.names)
    }
}

/// Walks the host element tree looking for a node that exposes a renderer.
///
/// From every visible canvas the walk first climbs through the ancestors, then
/// searches breadth-first outward from the topmost ancestor reached.
pub struct TreeWalkStrategy {
    max_nodes: usize,
}

impl TreeWalkStrategy {
    pub fn new(max_nodes: usize) -> Self {
        Self { max_nodes: max_nodes.max(1) }
    }

    fn walk(&self, canvas: Rc<dyn HostNode>, visited: &mut HashSet<usize>) -> Option<RendererHandle> {
        let mut top = canvas;
        loop {
            if let Some(renderer) = top.renderer() {
                return Some(renderer);
            }
            match top.parent() {
                Some(parent) => top = parent,
                None => break,
            }
        }

        let mut queue = VecDeque::from([top]);
        while let Some(node) = queue.pop_front() {
            if visited.len() >= self.max_nodes {
                debug!("tree walk stopped after {} nodes", visited.len());
                return None;
            }
            if !visited.insert(node_id(&node)) {
                continue;
            }
            if let Some(renderer) = node.renderer() {
                return Some(renderer);
            }
            queue.extend(node.children());
        }
        None
    }
}

impl Default for TreeWalkStrategy {
    fn default() -> Self {
        Self::new(5000)
    }
}

impl DetectionStrategy for TreeWalkStrategy {
    fn name(&self) -> &'static str {
        "tree-walk"
    }

    fn detect(&mut self, provider: &dyn HostRenderingProvider) -> Option<RendererHandle> {
        let mut visited = HashSet::new();
        provider
            .canvases()
            .into_iter()
            .filter(|c| c.is_visible())
            .find_map(|canvas| self.walk(canvas, &mut visited))
    }
}

fn node_id(node: &Rc<dyn HostNode>) -> usize {
    Rc::as_ptr(node) as *const () as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::provider::{HostRenderer, ReadyCallback};
    use crate::host::software::SoftwareRenderer;
    use std::cell::Cell;
    use std::rc::Weak;

    struct TreeNode {
        parent: RefCell<Weak<TreeNode>>,
        children: RefCell<Vec<Rc<TreeNode>>>,
        renderer: Option<RendererHandle>,
        visible: bool,
        probes: Cell<usize>,
    }

    impl TreeNode {
        fn new(renderer: Option<RendererHandle>) -> Rc<Self> {
            Rc::new(Self {
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(vec![]),
                renderer,
                visible: true,
                probes: Cell::new(0),
            })
        }

        fn attach(parent: &Rc<TreeNode>, child: Rc<TreeNode>) {
            *child.parent.borrow_mut() = Rc::downgrade(parent);
            parent.children.borrow_mut().push(child);
        }
    }

    impl HostNode for TreeNode {
        fn parent(&self) -> Option<Rc<dyn HostNode>> {
            self.parent.borrow().upgrade().map(|p| p as Rc<dyn HostNode>)
        }

        fn children(&self) -> Vec<Rc<dyn HostNode>> {
            self.children.borrow().iter().map(|c| Rc::clone(c) as Rc<dyn HostNode>).collect()
        }

        fn renderer(&self) -> Option<RendererHandle> {
            self.probes.set(self.probes.get() + 1);
            self.renderer.clone()
        }

        fn is_visible(&self) -> bool {
            self.visible
        }
    }

    #[derive(Default)]
    struct FakeProvider {
        ready: RefCell<Vec<ReadyCallback>>,
        canvases: Vec<Rc<TreeNode>>,
        global: Option<(String, RendererHandle)>,
    }

    impl HostRenderingProvider for FakeProvider {
        fn on_ready(&self, callback: ReadyCallback) {
            self.ready.borrow_mut().push(callback);
        }

        fn global(&self, name: &str) -> Option<RendererHandle> {
            self.global.as_ref().filter(|(n, _)| n == name).map(|(_, r)| Rc::clone(r))
        }

        fn canvases(&self) -> Vec<Rc<dyn HostNode>> {
            self.canvases.iter().map(|c| Rc::clone(c) as Rc<dyn HostNode>).collect()
        }
    }

    fn renderer() -> RendererHandle {
        Rc::new(SoftwareRenderer::new())
    }

    #[test]
    fn test_ready_hook_captures_first_invocation_only() {
        let provider = FakeProvider::default();
        let mut strategy = ReadyHookStrategy::new();
        strategy.install(&provider);
        strategy.install(&provider);
        assert_eq!(provider.ready.borrow().len(), 1);
        assert!(strategy.detect(&provider).is_none());

        let first = renderer();
        let callback = provider.ready.borrow_mut().pop().unwrap();
        callback(Rc::clone(&first));
        let found = strategy.detect(&provider).unwrap();
        assert!(Rc::ptr_eq(&found, &first));
    }

    #[test]
    fn test_global_probe_uses_configured_names() {
        let r = renderer();
        let provider = FakeProvider { global: Some(("__app".to_string(), Rc::clone(&r))), ..Default::default() };
        assert!(GlobalProbeStrategy::default().detect(&provider).is_none());
        let mut strategy = GlobalProbeStrategy::new(vec!["missing".into(), "__app".into()]);
        assert!(Rc::ptr_eq(&strategy.detect(&provider).unwrap(), &r));
    }

    #[test]
    fn test_tree_walk_climbs_ancestors_first() {
        let r = renderer();
        let root = TreeNode::new(None);
        let app = TreeNode::new(Some(Rc::clone(&r)));
        let canvas = TreeNode::new(None);
        let sibling = TreeNode::new(Some(renderer()));
        TreeNode::attach(&root, Rc::clone(&app));
        TreeNode::attach(&root, Rc::clone(&sibling));
        TreeNode::attach(&app, Rc::clone(&canvas));

        let provider = FakeProvider { canvases: vec![canvas], ..Default::default() };
        let found = TreeWalkStrategy::default().detect(&provider).unwrap();
        assert!(Rc::ptr_eq(&found, &r));
        assert_eq!(sibling.probes.get(), 0);
    }

    #[test]
    fn test_tree_walk_searches_outward() {
        let r = renderer();
        let root = TreeNode::new(None);
        let canvas = TreeNode::new(None);
        let branch = TreeNode::new(None);
        let holder = TreeNode::new(Some(Rc::clone(&r)));
        TreeNode::attach(&root, Rc::clone(&canvas));
        TreeNode::attach(&root, Rc::clone(&branch));
        TreeNode::attach(&branch, holder);

        let provider = FakeProvider { canvases: vec![canvas], ..Default::default() };
        let found = TreeWalkStrategy::default().detect(&provider).unwrap();
        assert!(Rc::ptr_eq(&found, &r));
    }

    #[test]
    fn test_tree_walk_respects_node_cap_and_visibility() {
        let root = TreeNode::new(None);
        let canvas = TreeNode::new(None);
        let far = TreeNode::new(Some(renderer()));
        TreeNode::attach(&root, Rc::clone(&canvas));
        TreeNode::attach(&root, far);

        let provider = FakeProvider { canvases: vec![Rc::clone(&canvas)], ..Default::default() };
        assert!(TreeWalkStrategy::new(1).detect(&provider).is_none());

        let hidden = Rc::new(TreeNode {
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(vec![]),
            renderer: Some(renderer()),
            visible: false,
            probes: Cell::new(0),
        });
        let provider = FakeProvider { canvases: vec![hidden], ..Default::default() };
        assert!(TreeWalkStrategy::default().detect(&provider).is_none());
    }

    #[test]
    fn test_software_renderer_is_a_host_renderer() {
        let r: RendererHandle = renderer();
        assert_eq!(r.label(), "software");
    }
}
