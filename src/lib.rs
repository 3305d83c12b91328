#![warn(
	missing_docs,
	missing_debug_implementations,
	trivial_casts,
	trivial_numeric_casts,
	unsafe_code,
	unused_import_braces,
	unused_qualifications
)]

//! A crate to estimate long-range path costs on a Grid by precomputing the
//! costs of moving between fixed-size blocks of it.
//!
//! ## Introduction
//! Finding long Paths on a fine Grid with plain A* means visiting thousands
//! of squares for a route whose overall shape was never in doubt. This crate
//! implements the classic remedy: partition the Grid into square blocks,
//! pick one representative square per block and movement class, precompute
//! the fine-path cost between the representatives of every pair of adjacent
//! blocks, and answer long-range queries with an A* search over that much
//! smaller block graph.
//!
//! The result is an estimate, not an exact optimum: paths run from
//! representative to representative, so they are slightly worse than the
//! best fine path. That is the intended trade - the block layer exists to
//! hand the fine path finder a good corridor and an admissible cost
//! estimate, quickly.
//!
//! Beyond the search itself, the estimator owns the whole lifecycle of its
//! tables:
//! - **Precomputation** runs once per map revision, parallelized over
//!   worker threads under a memory budget (each worker carries a private
//!   fine-path-finder instance), in two phases separated by a barrier:
//!   representatives first, vertex costs second.
//! - **Incremental updates** keep the tables fresh while the map mutates:
//!   [`map_changed`](PathEstimator::map_changed) marks affected blocks,
//!   [`update`](PathEstimator::update) refreshes a rate-budgeted batch per
//!   tick.
//! - **Persistence** caches the tables on disk keyed by a dataset hash, so
//!   later runs on the same map skip the precomputation entirely.
//! - **Result caches** remember completed coarse searches, separately for
//!   deterministic-simulation and presentation queries.
//!
//! ## Examples
//! The estimator asks for the map through the [`Terrain`] trait and
//! measures block edges with a [`FinePathFinder`] supplied by the caller:
//! ```
//! use path_estimator::prelude::*;
//!
//! struct FlatMap;
//! impl Terrain for FlatMap {
//! 	fn size(&self) -> (u32, u32) {
//! 		(32, 32)
//! 	}
//! 	fn speed_mod(&self, _class: &MoveClass, x: u32, z: u32) -> f32 {
//! 		if x < 32 && z < 32 {
//! 			1.0
//! 		} else {
//! 			0.0
//! 		}
//! 	}
//! 	fn is_blocked(&self, _class: &MoveClass, _x: u32, _z: u32) -> BlockFlags {
//! 		BlockFlags::empty()
//! 	}
//! 	fn checksum(&self) -> u32 {
//! 		0xF1A7
//! 	}
//! }
//!
//! // a stand-in fine path finder that prices every edge by straight-line
//! // distance; a real one would run A* over the fine squares
//! struct Straight;
//! impl FinePathFinder<FlatMap> for Straight {
//! 	fn get_path(
//! 		&mut self,
//! 		_terrain: &FlatMap,
//! 		_class: &MoveClass,
//! 		def: &GoalDef,
//! 		start: (u32, u32),
//! 		path: &mut FoundPath,
//! 		_max_nodes: u32,
//! 	) -> SearchResult {
//! 		let (gx, gz) = def.goal();
//! 		let dx = gx as f32 - start.0 as f32;
//! 		let dz = gz as f32 - start.1 as f32;
//! 		path.cost = (dx * dx + dz * dz).sqrt();
//! 		SearchResult::Ok
//! 	}
//! 	fn mem_footprint(&self) -> usize {
//! 		64
//! 	}
//! }
//!
//! let map = FlatMap;
//! let classes = MoveClassSet::new(vec![MoveClass::new(0, "walker")]);
//!
//! let mut estimator = PathEstimator::new(
//! 	&map,
//! 	classes,
//! 	|| Straight,
//! 	Services::default(),
//! 	EstimatorConfig::default(),
//! 	8, // block size
//! 	"walk",
//! 	"flat",
//! );
//!
//! let goal = GoalDef::new((28, 28), 1.0);
//! let (result, path) = estimator.find_path(&map, 0, (2, 2), &goal, true);
//!
//! assert_eq!(result, SearchResult::Ok);
//! assert!(path.cost > 0.0);
//! assert!(!path.points.is_empty());
//! ```
//!
//! When the map changes, tell the estimator which rectangle was touched and
//! keep calling [`update`](PathEstimator::update) once per tick; it
//! refreshes the affected blocks within a budget instead of stalling the
//! tick that happened to dirty half the map:
//! ```no_run
//! # use path_estimator::prelude::*;
//! # fn demo<T: Terrain + Sync, P: FinePathFinder<T>>(
//! # 	estimator: &mut PathEstimator<T, P>,
//! # 	terrain: &T,
//! # ) {
//! estimator.map_changed(30, 0, 34, 48);
//! loop {
//! 	estimator.update(terrain);
//! 	if estimator.pending_updates() == 0 {
//! 		break;
//! 	}
//! }
//! # }
//! ```

/// Fine-square coordinates, `(x, z)`.
pub type Square = (u32, u32);

/// Block coordinates, `(bx, bz)`.
pub type BlockPos = (u32, u32);

pub mod constants;

mod config;
pub use self::config::EstimatorConfig;

mod dirs;
pub use self::dirs::PathDir;

mod terrain;
pub use self::terrain::{BlockFlags, MoveClass, MoveClassSet, Terrain};

mod finder;
pub use self::finder::{FinePathFinder, FoundPath, SearchResult, WorldPos};

mod goal;
pub use self::goal::{GoalDef, SearchConstraint, SquareRect};

mod services;
pub use self::services::{CostOverlay, FlowField, ProgressSink, Services, StatusChannel};

mod estimator;
pub use self::estimator::{CacheItem, PathEstimator};

/// The most common imports, bundled.
pub mod prelude {
	pub use crate::{
		BlockFlags, BlockPos, CacheItem, CostOverlay, EstimatorConfig, FinePathFinder, FlowField,
		FoundPath, GoalDef, MoveClass, MoveClassSet, PathDir, PathEstimator, ProgressSink,
		SearchConstraint, SearchResult, Services, Square, SquareRect, StatusChannel, Terrain,
		WorldPos,
	};
}
