use std::path::PathBuf;

use crate::constants::MAX_SEARCHED_NODES_PF;

/// Options for configuring a [`PathEstimator`](crate::PathEstimator)
///
/// Default options:
/// ```
/// # use path_estimator::EstimatorConfig;
/// let config = EstimatorConfig::default();
/// assert_eq!(config.max_mem_footprint_mb, 512);
/// assert_eq!(config.thread_count, 0);
/// assert_eq!(config.update_rate, 1.0);
/// assert_eq!(config.squares_to_update, 600);
/// assert_eq!(config.cache_dir, None);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct EstimatorConfig {
	/// Memory ceiling in megabytes for the multithreaded table generator
	/// (defaults to `512`, effective minimum `64`).
	///
	/// Every extra precompute worker owns a private fine-path-finder
	/// instance; the budget divided by one instance's footprint bounds how
	/// many workers get spawned.
	pub max_mem_footprint_mb: u32,
	/// Number of precompute worker threads; `0` (default) uses the number
	/// of logical CPU cores.
	pub thread_count: u32,
	/// Scales how many obsolete blocks each [`update`](crate::PathEstimator::update)
	/// tick may refresh (defaults to `1.0`).
	pub update_rate: f32,
	/// Baseline of fine squares refreshed per tick; divided by the block
	/// area to derive the per-tick block budget (defaults to `600`).
	pub squares_to_update: u32,
	/// Upper bound on blocks a single search may push onto its open set
	/// (defaults to `8192`).
	pub max_searched_blocks: u32,
	/// Node budget handed to the fine path finder; vertex-cost calculations
	/// use a quarter of it (defaults to `65536`).
	pub max_searched_nodes_pf: u32,
	/// Lifetime of completed-search cache entries, in
	/// [`update`](crate::PathEstimator::update) ticks (defaults to `300`).
	pub cache_lifetime: u32,
	/// Directory holding the `paths/` cache subdirectory; `None` (default)
	/// disables persistence entirely.
	pub cache_dir: Option<PathBuf>,
}

impl EstimatorConfig {
	/// The default configuration with persistence enabled under `cache_dir`.
	pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> EstimatorConfig {
		EstimatorConfig {
			cache_dir: Some(cache_dir.into()),
			..Default::default()
		}
	}
}

impl Default for EstimatorConfig {
	fn default() -> EstimatorConfig {
		EstimatorConfig {
			max_mem_footprint_mb: 512,
			thread_count: 0,
			update_rate: 1.0,
			squares_to_update: 600,
			max_searched_blocks: 8192,
			max_searched_nodes_pf: MAX_SEARCHED_NODES_PF,
			cache_lifetime: 300,
			cache_dir: None,
		}
	}
}
