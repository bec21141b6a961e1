//! Configuration schema types for `spv.toml`
//!
//! Every section and field has a default, so an empty file (or no file) is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::host::DEFAULT_GLOBALS;

/// Where assets come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory or URL holding `manifest.json`
    pub base_url: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self { base_url: "assets".to_string() }
    }
}

/// Variant cache bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum number of cached variants
    pub max_entries: usize,
    /// Maximum total frames across all cached variants
    pub max_cost: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, max_entries: 256, max_cost: 2048 }
    }
}

/// Per-tick render budgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Budget right after the variant selection changed
    pub burst_budget_ms: u64,
    /// Budget otherwise
    pub steady_budget_ms: u64,
    /// How long a selection change keeps the burst budget
    pub burst_window_ms: u64,
    /// Distinct jobs touched per tick
    pub max_jobs_per_tick: usize,
    /// Tick interval when the host has no frame signal
    pub frame_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            burst_budget_ms: 12,
            steady_budget_ms: 4,
            burst_window_ms: 5_000,
            max_jobs_per_tick: 8,
            frame_interval_ms: 16,
        }
    }
}

impl SchedulerConfig {
    pub fn burst_budget(&self) -> Duration {
        Duration::from_millis(self.burst_budget_ms)
    }

    pub fn steady_budget(&self) -> Duration {
        Duration::from_millis(self.steady_budget_ms)
    }

    pub fn burst_window(&self) -> Duration {
        Duration::from_millis(self.burst_window_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Host renderer discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Global names probed for an already-running renderer, in order
    pub globals: Vec<String>,
    /// Upper bound on host tree nodes visited per poll
    pub max_tree_nodes: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            poll_interval_ms: 250,
            globals: DEFAULT_GLOBALS.iter().map(|g| g.to_string()).collect(),
            max_tree_nodes: 5_000,
        }
    }
}

impl LocatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Atlas loading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Atlas images fetched and decoded per batch
    pub decode_batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { decode_batch_size: 4 }
    }
}

/// Compositing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Fail a render instead of skipping a missing overlay or icon
    pub strict_assets: bool,
    /// Icon size relative to the smaller sprite edge
    pub icon_scale: f32,
    /// Extra icon scale on tall sprites
    pub tall_boost: f32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self { strict_assets: false, icon_scale: 0.32, tall_boost: 1.6 }
    }
}

/// Root of `spv.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub assets: AssetsConfig,
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
    pub locator: LocatorConfig,
    pub loader: LoaderConfig,
    pub compositor: CompositorConfig,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "cache.max_entries")
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spv.toml: '{}' {}", self.field, self.message)
    }
}

impl EngineConfig {
    /// Validate the configuration and return every problem found
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigValidationError { field: field.to_string(), message: message.to_string() });
            }
        };

        check(!self.assets.base_url.trim().is_empty(), "assets.base_url", "must be a non-empty string");
        check(self.cache.max_entries > 0, "cache.max_entries", "must be a positive integer");
        check(self.cache.max_cost > 0, "cache.max_cost", "must be a positive integer");
        check(self.scheduler.max_jobs_per_tick > 0, "scheduler.max_jobs_per_tick", "must be a positive integer");
        check(self.scheduler.frame_interval_ms > 0, "scheduler.frame_interval_ms", "must be a positive integer");
        check(
            self.scheduler.burst_budget_ms >= self.scheduler.steady_budget_ms,
            "scheduler.burst_budget_ms",
            "must not be smaller than steady_budget_ms",
        );
        check(self.locator.poll_interval_ms > 0, "locator.poll_interval_ms", "must be a positive integer");
        check(self.loader.decode_batch_size > 0, "loader.decode_batch_size", "must be a positive integer");
        check(
            self.compositor.icon_scale > 0.0 && self.compositor.icon_scale <= 1.0,
            "compositor.icon_scale",
            "must be in (0, 1]",
        );
        check(self.compositor.tall_boost >= 1.0, "compositor.tall_boost", "must be at least 1.0");

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
