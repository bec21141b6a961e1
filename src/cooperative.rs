//! Time and yield primitives for cooperative, single-threaded execution
//!
//! Everything in the engine runs on one logical thread shared with the host. Long
//! operations hand control back through a [`Yielder`] and measure budgets with a
//! [`Clock`]; both are injected so tests can drive time by hand.

use futures::future::{self, LocalBoxFuture};
use std::cell::Cell;
use std::time::{Duration, Instant};

/// Source of time plus a way to wait for it to pass.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Resolve after at least `duration` has elapsed on this clock.
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// Wall clock backed by `smol` timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(async move {
            smol::Timer::after(duration).await;
        })
    }
}

/// Hand-driven clock for tests and deterministic replays.
///
/// `sleep` advances the clock immediately instead of waiting. An optional `step`
/// is added on every `now()` call to simulate work taking time.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Cell<Duration>,
    step: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { origin: Instant::now(), offset: Cell::new(Duration::ZERO), step: Duration::ZERO }
    }

    /// Advance by `step` on every reading.
    pub fn with_step(step: Duration) -> Self {
        Self { step, ..Self::new() }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let now = self.origin + self.offset.get();
        self.advance(self.step);
        now
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        self.advance(duration);
        Box::pin(future::ready(()))
    }
}

/// Hands control back to the host event loop.
pub trait Yielder {
    fn yield_now(&self) -> LocalBoxFuture<'static, ()>;
}

/// Yields once to whichever executor polls the future.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmolYielder;

impl Yielder for SmolYielder {
    fn yield_now(&self) -> LocalBoxFuture<'static, ()> {
        Box::pin(smol::future::yield_now())
    }
}

/// Yielder that counts yield points and never suspends.
#[derive(Debug, Default)]
pub struct CountingYielder {
    count: Cell<usize>,
}

impl CountingYielder {
    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl Yielder for CountingYielder {
    fn yield_now(&self) -> LocalBoxFuture<'static, ()> {
        self.count.set(self.count.get() + 1);
        Box::pin(future::ready(()))
    }
}
