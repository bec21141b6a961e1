//! Polls detection strategies until one yields a renderer or the timeout passes

use log::{debug, info};
use std::time::Duration;
use thiserror::Error;

use super::provider::RendererHandle;
use super::strategy::{DetectionStrategy, GlobalProbeStrategy, ReadyHookStrategy, TreeWalkStrategy};
use crate::config::LocatorConfig;
use crate::context::EngineContext;

/// Error when no renderer could be located.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LocateError {
    /// Nothing answered within the timeout; the host may still be loading
    #[error("no host renderer found after {attempts} polls ({waited:?})")]
    Timeout { waited: Duration, attempts: u32 },
    /// The locator was built without any strategies
    #[error("no detection strategies configured")]
    NoStrategies,
}

impl LocateError {
    /// Whether the caller should back off and try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LocateError::Timeout { .. })
    }
}

/// Ordered set of detection strategies plus polling parameters.
pub struct RendererLocator {
    strategies: Vec<Box<dyn DetectionStrategy>>,
    timeout: Duration,
    poll_interval: Duration,
}

impl RendererLocator {
    /// Locator with the standard strategy order: ready hook, global probe, tree walk.
    pub fn new(config: &LocatorConfig) -> Self {
        let strategies: Vec<Box<dyn DetectionStrategy>> = vec![
            Box::new(ReadyHookStrategy::new()),
            Box::new(GlobalProbeStrategy::new(config.globals.clone())),
            Box::new(TreeWalkStrategy::new(config.max_tree_nodes)),
        ];
        Self::with_strategies(strategies, config.timeout(), config.poll_interval())
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn DetectionStrategy>>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self { strategies, timeout, poll_interval: poll_interval.max(Duration::from_millis(1)) }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Poll every strategy in priority order until one succeeds.
    ///
    /// Strategies are installed once up front so hooks are in place before the
    /// host can initialize.
    pub async fn locate(&mut self, ctx: &EngineContext) -> Result<RendererHandle, LocateError> {
        if self.strategies.is_empty() {
            return Err(LocateError::NoStrategies);
        }
        let provider = ctx.provider();
        for strategy in &mut self.strategies {
            strategy.install(provider);
        }

        let start = ctx.clock().now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            for strategy in &mut self.strategies {
                if let Some(renderer) = strategy.detect(provider) {
                    info!(
                        "located '{}' renderer via {} after {} poll(s)",
                        renderer.label(),
                        strategy.name(),
                        attempts
                    );
                    return Ok(renderer);
                }
            }

            let waited = ctx.clock().now().saturating_duration_since(start);
            if waited >= self.timeout {
                debug!("renderer lookup timed out after {:?}", waited);
                return Err(LocateError::Timeout { waited, attempts });
            }
            ctx.clock().sleep(self.poll_interval.min(self.timeout - waited)).await;
        }
    }
}
