//! Explicit environment handed through the engine's call chain

use std::fmt;
use std::rc::Rc;

use crate::atlas::AssetFetcher;
use crate::cooperative::{Clock, SmolYielder, SystemClock, Yielder};
use crate::host::HostRenderingProvider;

/// Everything the engine needs from the outside world.
///
/// There are no ambient globals: the host provider, the asset fetcher, time and
/// yielding are all injected here and passed by reference.
#[derive(Clone)]
pub struct EngineContext {
    provider: Rc<dyn HostRenderingProvider>,
    fetcher: Rc<dyn AssetFetcher>,
    clock: Rc<dyn Clock>,
    yielder: Rc<dyn Yielder>,
}

impl EngineContext {
    /// Context using the wall clock and `smol` yields.
    pub fn new(provider: Rc<dyn HostRenderingProvider>, fetcher: Rc<dyn AssetFetcher>) -> Self {
        Self { provider, fetcher, clock: Rc::new(SystemClock), yielder: Rc::new(SmolYielder) }
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_yielder(mut self, yielder: Rc<dyn Yielder>) -> Self {
        self.yielder = yielder;
        self
    }

    pub fn provider(&self) -> &dyn HostRenderingProvider {
        &*self.provider
    }

    pub fn fetcher(&self) -> &dyn AssetFetcher {
        &*self.fetcher
    }

    pub fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    /// Hand control back to the host.
    pub async fn yield_now(&self) {
        self.yielder.yield_now().await;
    }
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext").finish_non_exhaustive()
    }
}
