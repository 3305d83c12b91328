use std::collections::{BinaryHeap, VecDeque};
use std::marker::PhantomData;

use log::info;

use crate::config::EstimatorConfig;
use crate::constants::{PATHCOST_INFINITY, PATH_DIRECTION_VERTICES, PATH_ESTIMATOR_VERSION};
use crate::dirs::{vertex_offset, PathDir};
use crate::finder::{FinePathFinder, FoundPath, SearchResult};
use crate::goal::GoalDef;
use crate::services::Services;
use crate::terrain::{MoveClassSet, Terrain};
use crate::{BlockPos, Square};

mod block_states;
use self::block_states::{BlockStates, NodeMask};

mod precompute;

mod search;
use self::search::OpenBlock;

mod update;

mod file;

mod path_cache;
pub use self::path_cache::CacheItem;
use self::path_cache::ResultCache;

/// A struct to estimate path costs between blocks of a fine grid map.
///
/// The estimator partitions the map into `BLOCK_SIZE x BLOCK_SIZE` blocks,
/// picks one representative square per block and movement class, and
/// precomputes the fine-path cost between the representatives of every pair
/// of neighbouring blocks. Searches then run over the much smaller block
/// graph, incremental updates keep the tables in step with terrain changes,
/// and an on-disk cache spares the precomputation on later runs with the
/// same map, class set and block size.
///
/// The type is generic over the [`Terrain`] it reads and the
/// [`FinePathFinder`] it measures edges with. Like the grid, the terrain is
/// not stored: methods that need it take it as an argument, so the caller
/// remains free to mutate the map between calls (notifying the estimator
/// through [`map_changed`](PathEstimator::map_changed)).
///
/// See the [crate docs](crate) for a complete usage example.
pub struct PathEstimator<T, P> {
	block_size: u32,
	nx: u32,
	ny: u32,
	classes: MoveClassSet,
	config: EstimatorConfig,
	services: Services,
	dataset_hash: u32,

	block_states: BlockStates,
	/// Flat cost table, `path_type * num_blocks * 4 + block_idx * 4 + dir`.
	vertex_costs: Vec<f32>,

	updated_blocks: VecDeque<BlockPos>,
	blocks_to_update: i32,
	block_update_penalty: i32,

	caches: [ResultCache; 2],
	path_finder: P,
	path_checksum: u32,

	// state of the running / last finished search
	open_blocks: BinaryHeap<OpenBlock>,
	dirty_blocks: Vec<usize>,
	open_block_count: u32,
	next_seq: u32,
	start_block_idx: usize,
	goal_block_idx: usize,
	goal_heuristic: f32,
	tested_blocks: u64,
	max_costs: [f32; 2],

	_terrain: PhantomData<fn(&T)>,
}

impl<T: Terrain, P: FinePathFinder<T>> PathEstimator<T, P> {
	/// Creates an estimator for `terrain`, precomputing or loading its
	/// tables.
	///
	/// `make_finder` builds the fine path finders: one primary instance
	/// that the estimator keeps for incremental updates, plus one private
	/// instance per extra precompute worker (the finder is not reentrant,
	/// so workers never share one). `cache_name` and `map_name` key the
	/// on-disk cache file together with the dataset hash; whether
	/// persistence happens at all is decided by
	/// [`EstimatorConfig::cache_dir`].
	///
	/// ## Arguments
	/// - `terrain` - the fine grid to summarize
	/// - `classes` - the movement classes to build tables for
	/// - `make_finder` - factory for fine-path-finder instances
	/// - `services` - progress/status sinks and cost overlays
	/// - `config` - tuning knobs, see [`EstimatorConfig`]
	/// - `block_size` - block side length in fine squares; a power of two
	/// - `cache_name`, `map_name` - name parts of the on-disk cache file
	///
	/// ## Panics
	/// Panics if `block_size` is not a power of two or the class set is
	/// empty.
	#[allow(clippy::too_many_arguments)]
	pub fn new<F>(
		terrain: &T,
		classes: MoveClassSet,
		make_finder: F,
		services: Services,
		config: EstimatorConfig,
		block_size: u32,
		cache_name: &str,
		map_name: &str,
	) -> PathEstimator<T, P>
	where
		T: Sync,
		F: Fn() -> P + Sync,
	{
		assert!(
			block_size.is_power_of_two(),
			"block size {} is not a power of two",
			block_size
		);
		assert!(!classes.is_empty(), "no move classes to estimate for");

		let (width, height) = terrain.size();
		let nx = (width + block_size - 1) / block_size;
		let ny = (height + block_size - 1) / block_size;
		let num_blocks = (nx * ny) as usize;
		let num_classes = classes.len();

		let dataset_hash = terrain
			.checksum()
			.wrapping_add(classes.checksum())
			.wrapping_add(block_size)
			.wrapping_add(PATH_ESTIMATOR_VERSION);

		let blocks_to_update =
			(config.squares_to_update / (block_size * block_size) + 1) as i32;
		let cache_lifetime = config.cache_lifetime;

		let mut estimator = PathEstimator {
			block_size,
			nx,
			ny,
			dataset_hash,
			block_states: BlockStates::new(num_blocks, num_classes),
			vertex_costs: vec![
				PATHCOST_INFINITY;
				num_classes * num_blocks * PATH_DIRECTION_VERTICES
			],
			updated_blocks: VecDeque::new(),
			blocks_to_update,
			block_update_penalty: 0,
			caches: [
				ResultCache::new(cache_lifetime),
				ResultCache::new(cache_lifetime),
			],
			path_finder: make_finder(),
			path_checksum: 0,
			open_blocks: BinaryHeap::new(),
			dirty_blocks: Vec::new(),
			open_block_count: 0,
			next_seq: 0,
			start_block_idx: 0,
			goal_block_idx: 0,
			goal_heuristic: PATHCOST_INFINITY,
			tested_blocks: 0,
			max_costs: [0.0, 0.0],
			classes,
			config,
			services,
			_terrain: PhantomData,
		};

		info!(
			"[path_estimator] block size {}: dataset hash {}",
			block_size, dataset_hash
		);

		if !estimator.read_file(cache_name, map_name) {
			precompute::run(
				terrain,
				&estimator.classes,
				&estimator.services,
				&estimator.config,
				estimator.block_size,
				(estimator.nx, estimator.ny),
				&mut estimator.path_finder,
				&make_finder,
				&mut estimator.block_states.offsets,
				&mut estimator.vertex_costs,
			);
			estimator.write_file(cache_name, map_name);
		}

		estimator
	}

	/// Searches the block graph and reconstructs the path in one call,
	/// consulting the result cache on the way in and feeding it on the way
	/// out.
	pub fn find_path(
		&mut self,
		terrain: &T,
		path_type: u32,
		start: Square,
		def: &GoalDef,
		synced: bool,
	) -> (SearchResult, FoundPath) {
		let block_size = self.block_size;
		let start_block = (start.0 / block_size, start.1 / block_size);
		let goal = def.goal();
		let goal_block = (goal.0 / block_size, goal.1 / block_size);

		if let Some(item) =
			self.get_cache(start_block, goal_block, def.goal_radius(), path_type, synced)
		{
			return (item.result, item.path.clone());
		}

		if def.is_goal(start.0, start.1) {
			return (SearchResult::CantGetCloser, FoundPath::default());
		}

		let result = self.do_search(path_type, def, start, synced);
		let mut path = FoundPath::default();
		self.finish_search(terrain, path_type, &mut path);

		if result == SearchResult::Ok {
			self.add_cache(
				&path,
				result,
				start_block,
				goal_block,
				def.goal_radius(),
				path_type,
				synced,
			);
		}

		(result, path)
	}

	/// Looks up a completed search in the result cache for the given
	/// synchronisation domain.
	pub fn get_cache(
		&mut self,
		start_block: BlockPos,
		goal_block: BlockPos,
		goal_radius: f32,
		path_type: u32,
		synced: bool,
	) -> Option<&CacheItem> {
		self.caches[synced as usize].get(start_block, goal_block, goal_radius, path_type)
	}

	/// Stores a completed search in the result cache for the given
	/// synchronisation domain.
	#[allow(clippy::too_many_arguments)]
	pub fn add_cache(
		&mut self,
		path: &FoundPath,
		result: SearchResult,
		start_block: BlockPos,
		goal_block: BlockPos,
		goal_radius: f32,
		path_type: u32,
		synced: bool,
	) {
		self.caches[synced as usize].add(
			path.clone(),
			result,
			start_block,
			goal_block,
			goal_radius,
			path_type,
		);
	}

	/// Recomputes the four stored vertex costs of `block` for one class,
	/// using the primary fine path finder.
	fn calculate_vertices(&mut self, terrain: &T, path_type: u32, block: BlockPos) {
		for dir in PathDir::stored() {
			self.calculate_vertex(terrain, path_type, block, dir);
		}
	}

	fn calculate_vertex(&mut self, terrain: &T, path_type: u32, parent: BlockPos, dir: PathDir) {
		let parent_idx = self.block_idx(parent);
		let slot = path_type as usize * self.block_states.len() * PATH_DIRECTION_VERTICES
			+ parent_idx * PATH_DIRECTION_VERTICES
			+ dir.num();

		let (dx, dz) = dir.vector();
		let cx = parent.0 as i64 + dx as i64;
		let cz = parent.1 as i64 + dz as i64;
		if cx < 0 || cz < 0 || cx >= self.nx as i64 || cz >= self.ny as i64 {
			self.vertex_costs[slot] = PATHCOST_INFINITY;
			return;
		}
		let child_idx = self.block_idx((cx as u32, cz as u32));

		let start = self.block_states.offset(parent_idx, path_type as usize);
		let goal = self.block_states.offset(child_idx, path_type as usize);

		self.vertex_costs[slot] = precompute::calc_vertex_cost(
			terrain,
			self.classes.get(path_type),
			self.block_size,
			self.config.max_searched_nodes_pf,
			start,
			goal,
			&mut self.path_finder,
		);
	}

	pub(crate) fn block_idx(&self, (bx, bz): BlockPos) -> usize {
		(bz * self.nx + bx) as usize
	}

	/// Side length of a block in fine squares.
	pub fn block_size(&self) -> u32 {
		self.block_size
	}

	/// Number of blocks along each map axis, `(nx, ny)`.
	pub fn blocks(&self) -> (u32, u32) {
		(self.nx, self.ny)
	}

	/// The movement classes this estimator serves.
	pub fn classes(&self) -> &MoveClassSet {
		&self.classes
	}

	/// CRC-32 of the precomputed tables as stored on disk; `0` when
	/// persistence is disabled. Peers of a deterministic session compare
	/// this to verify they simulate on identical tables.
	pub fn path_checksum(&self) -> u32 {
		self.path_checksum
	}

	/// The representative square of a block for a class.
	pub fn offset(&self, path_type: u32, block: BlockPos) -> Square {
		self.block_states
			.offset(self.block_idx(block), path_type as usize)
	}

	/// The precomputed cost of leaving `block` in `dir`, in any of the
	/// eight directions. Out-of-map edges are infinite.
	pub fn vertex_cost(&self, path_type: u32, block: BlockPos, dir: PathDir) -> f32 {
		let (dx, dz) = dir.vector();
		let cx = block.0 as i64 + dx as i64;
		let cz = block.1 as i64 + dz as i64;
		if cx < 0 || cz < 0 || cx >= self.nx as i64 || cz >= self.ny as i64 {
			return PATHCOST_INFINITY;
		}

		let slot = path_type as usize * self.block_states.len() * PATH_DIRECTION_VERTICES
			+ self.block_idx(block) * PATH_DIRECTION_VERTICES
			+ vertex_offset(dir, self.nx);
		self.vertex_costs[slot]
	}

	/// `true` while a block awaits an incremental refresh.
	pub fn is_obsolete(&self, block: BlockPos) -> bool {
		self.block_states.node_mask[self.block_idx(block)].contains(NodeMask::OBSOLETE)
	}

	/// Number of blocks currently queued for refresh.
	pub fn pending_updates(&self) -> usize {
		self.updated_blocks.len()
	}

	/// Budget debt carried into the next [`update`](PathEstimator::update)
	/// tick.
	pub fn update_penalty(&self) -> i32 {
		self.block_update_penalty
	}

	/// The goal candidate of the last search: the goal block itself after
	/// [`SearchResult::Ok`], otherwise the block with the best heuristic
	/// seen.
	pub fn goal_block_pos(&self) -> BlockPos {
		let idx = self.goal_block_idx as u32;
		(idx % self.nx, idx / self.nx)
	}

	/// Total neighbour tests across all searches; a load statistic.
	pub fn tested_blocks(&self) -> u64 {
		self.tested_blocks
	}

	/// Highest `(f, g)` cost recorded during the last search; useful for
	/// debug overlays.
	pub fn max_search_costs(&self) -> (f32, f32) {
		(self.max_costs[0], self.max_costs[1])
	}
}

impl<T, P> std::fmt::Debug for PathEstimator<T, P> {
	fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
		fmt.debug_struct("PathEstimator")
			.field("block_size", &self.block_size)
			.field("blocks", &(self.nx, self.ny))
			.field("classes", &self.classes.len())
			.field("dataset_hash", &self.dataset_hash)
			.field("pending_updates", &self.updated_blocks.len())
			.finish()
	}
}
