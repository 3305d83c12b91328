//! Table precomputation: the representative-square ("offset") finder, the
//! vertex-cost calculator, and the parallel two-phase driver that fills both
//! tables at construction time.

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Barrier;
use std::thread;

use crate::config::EstimatorConfig;
use crate::constants::{PATHCOST_INFINITY, PATH_DIRECTION_VERTICES, SQUARE_SIZE};
use crate::dirs::PathDir;
use crate::finder::{FinePathFinder, FoundPath, SearchResult};
use crate::goal::GoalDef;
use crate::services::Services;
use crate::terrain::{square_impassable, BlockFlags, MoveClass, MoveClassSet, Terrain};
use crate::{BlockPos, Square};

/// Picks the square of block `(bx, bz)` that represents it in inter-block
/// queries for `class`.
///
/// Every traversable square is scored by its squared distance from the block
/// centre plus a mobility penalty; the cheapest square wins, with ties
/// resolved by scan order (row-major). If nothing in the block is
/// traversable the centre is returned, and the adjacent vertex costs will
/// come out infinite.
///
/// This is a pure function of the map and the class, so recomputing it for
/// the same inputs is always safe, including concurrently.
pub(crate) fn find_offset<T: Terrain>(
	terrain: &T,
	class: &MoveClass,
	block_size: u32,
	bx: u32,
	bz: u32,
) -> Square {
	let lower_x = bx * block_size;
	let lower_z = bz * block_size;
	let block_area = (block_size * block_size) as f32 / SQUARE_SIZE as f32;
	let centre = (block_size - 1) as f32 / 2.0;

	let mut best = (block_size >> 1, block_size >> 1);
	let mut best_cost = f32::MAX;

	for z in 0..block_size {
		for x in 0..block_size {
			if square_impassable(terrain, class, (lower_x + x, lower_z + z)) {
				continue;
			}

			let speed_mod = terrain.speed_mod(class, lower_x + x, lower_z + z);
			let dx = x as f32 - centre;
			let dz = z as f32 - centre;
			let cost = dx * dx + dz * dz + block_area / (0.001 + speed_mod);

			if cost < best_cost {
				best_cost = cost;
				best = (x, z);
			}
		}
	}

	(lower_x + best.0, lower_z + best.1)
}

/// Cost of moving between the representative squares of two neighbouring
/// blocks, measured by a fine search confined to those two blocks.
///
/// Blocked endpoints are early-outs: the estimator must never report an edge
/// the fine planner would refuse to start or finish on.
pub(crate) fn calc_vertex_cost<T, P>(
	terrain: &T,
	class: &MoveClass,
	block_size: u32,
	max_nodes: u32,
	start: Square,
	goal: Square,
	finder: &mut P,
) -> f32
where
	T: Terrain,
	P: FinePathFinder<T>,
{
	if terrain
		.is_blocked(class, start.0, start.1)
		.contains(BlockFlags::STRUCTURE)
	{
		return PATHCOST_INFINITY;
	}

	let def = GoalDef::rectangular(start, goal, block_size);
	if def.goal_is_blocked(terrain, class, BlockFlags::STRUCTURE) {
		return PATHCOST_INFINITY;
	}

	let mut path = FoundPath::default();
	match finder.get_path(terrain, class, &def, start, &mut path, max_nodes / 4) {
		SearchResult::Ok => path.cost,
		_ => PATHCOST_INFINITY,
	}
}

/// Everything the precompute workers share. Work is claimed by atomically
/// decrementing the phase counters; the staging tables are written through
/// atomic slots so the crate stays free of `unsafe`.
struct WorkerCtx<'a, T> {
	terrain: &'a T,
	classes: &'a MoveClassSet,
	block_size: u32,
	nx: u32,
	ny: u32,
	num_blocks: usize,
	max_nodes: u32,
	offset_remaining: AtomicI64,
	cost_remaining: AtomicI64,
	barrier: Barrier,
	offsets: Vec<AtomicU64>,
	costs: Vec<AtomicU32>,
}

fn encode_square((x, z): Square) -> u64 {
	(x as u64) << 32 | z as u64
}

fn decode_square(bits: u64) -> Square {
	((bits >> 32) as u32, bits as u32)
}

/// Fills the offset and vertex-cost tables.
///
/// Spawns up to `thread_count - 1` extra workers, bounded so that the
/// combined footprint of their private fine-path-finder instances stays
/// within the configured memory budget. The calling thread doubles as
/// worker zero and owns all progress output.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run<T, P, F>(
	terrain: &T,
	classes: &MoveClassSet,
	services: &Services,
	config: &EstimatorConfig,
	block_size: u32,
	(nx, ny): (u32, u32),
	path_finder: &mut P,
	make_finder: &F,
	offsets: &mut Vec<Square>,
	vertex_costs: &mut Vec<f32>,
) where
	T: Terrain + Sync,
	P: FinePathFinder<T>,
	F: Fn() -> P + Sync,
{
	let num_blocks = (nx * ny) as usize;
	let num_threads = match config.thread_count {
		0 => thread::available_parallelism().map_or(1, |n| n.get()),
		n => n as usize,
	};

	// every extra worker pays for one private fine path finder
	let per_worker = std::mem::size_of::<P>() + path_finder.mem_footprint();
	let max_bytes = config.max_mem_footprint_mb.max(64) as usize * 1024 * 1024;
	let extra_workers = (max_bytes / per_worker.max(1))
		.saturating_sub(1)
		.min(num_threads.saturating_sub(1));
	let required_mb = per_worker * (extra_workers + 1) / (1024 * 1024);

	services.load_message(
		&format!(
			"path costs: filling block-size {} tables with {} searcher(s) ({} MB)",
			block_size,
			extra_workers + 1,
			required_mb
		),
		false,
	);

	let ctx = WorkerCtx {
		terrain,
		classes,
		block_size,
		nx,
		ny,
		num_blocks,
		max_nodes: config.max_searched_nodes_pf,
		offset_remaining: AtomicI64::new(num_blocks as i64),
		cost_remaining: AtomicI64::new(num_blocks as i64),
		barrier: Barrier::new(extra_workers + 1),
		offsets: (0..num_blocks * classes.len())
			.map(|_| AtomicU64::new(encode_square((0, 0))))
			.collect(),
		costs: (0..classes.len() * num_blocks * PATH_DIRECTION_VERTICES)
			.map(|_| AtomicU32::new(PATHCOST_INFINITY.to_bits()))
			.collect(),
	};

	thread::scope(|scope| {
		for worker_id in 1..=extra_workers {
			let ctx = &ctx;
			thread::Builder::new()
				.name(format!("pathhelper{}", worker_id))
				.spawn_scoped(scope, move || {
					let mut finder = make_finder();
					fill_tables(ctx, &mut finder, None);
				})
				.expect("failed to spawn path helper thread");
		}

		fill_tables(&ctx, path_finder, Some(services));
	});

	*offsets = ctx
		.offsets
		.into_iter()
		.map(|slot| decode_square(slot.into_inner()))
		.collect();
	*vertex_costs = ctx
		.costs
		.into_iter()
		.map(|slot| f32::from_bits(slot.into_inner()))
		.collect();
}

/// One worker's life: claim blocks for the offset phase, rendezvous at the
/// barrier, claim blocks for the vertex phase.
///
/// The barrier is load-bearing: vertex costs read the representative squares
/// of *both* endpoints of every edge, so the offset table must be globally
/// complete before any vertex is computed. `services` is `Some` only for
/// worker zero, which publishes progress; the other workers stay silent.
fn fill_tables<T, P>(ctx: &WorkerCtx<'_, T>, finder: &mut P, services: Option<&Services>)
where
	T: Terrain,
	P: FinePathFinder<T>,
{
	let num_classes = ctx.classes.len();

	let mut next_message = 0;
	loop {
		let remaining = ctx.offset_remaining.fetch_sub(1, Ordering::AcqRel);
		if remaining <= 0 {
			break;
		}
		let block_idx = ctx.num_blocks - remaining as usize;

		if let Some(services) = services {
			if block_idx >= next_message {
				next_message = block_idx + ctx.num_blocks / 16;
				services.publish_status((block_idx as u32) << 8 | ctx.block_size);
			}
		}

		let (bx, bz) = (block_idx as u32 % ctx.nx, block_idx as u32 / ctx.nx);
		for class in ctx.classes.iter().filter(|c| c.ref_count > 0) {
			let square = find_offset(ctx.terrain, class, ctx.block_size, bx, bz);
			ctx.offsets[block_idx * num_classes + class.path_type as usize]
				.store(encode_square(square), Ordering::Relaxed);
		}
	}

	ctx.barrier.wait();

	let mut next_message = 0;
	loop {
		let remaining = ctx.cost_remaining.fetch_sub(1, Ordering::AcqRel);
		if remaining <= 0 {
			break;
		}
		let block_idx = ctx.num_blocks - remaining as usize;

		if let Some(services) = services {
			if block_idx >= next_message {
				next_message = block_idx + ctx.num_blocks / 16;
				services.load_message(
					&format!(
						"path costs: precached {} of {} blocks",
						block_idx, ctx.num_blocks
					),
					block_idx != 0,
				);
				services.publish_status(0x1 | (block_idx as u32) << 8 | ctx.block_size);
			}
		}

		let block = (block_idx as u32 % ctx.nx, block_idx as u32 / ctx.nx);
		for class in ctx.classes.iter().filter(|c| c.ref_count > 0) {
			for dir in PathDir::stored() {
				fill_vertex(ctx, finder, class, block, block_idx, dir);
			}
		}
	}
}

fn fill_vertex<T, P>(
	ctx: &WorkerCtx<'_, T>,
	finder: &mut P,
	class: &MoveClass,
	parent: BlockPos,
	parent_idx: usize,
	dir: PathDir,
) where
	T: Terrain,
	P: FinePathFinder<T>,
{
	let num_classes = ctx.classes.len();
	let path_type = class.path_type as usize;
	let slot = path_type * ctx.num_blocks * PATH_DIRECTION_VERTICES
		+ parent_idx * PATH_DIRECTION_VERTICES
		+ dir.num();

	let (dx, dz) = dir.vector();
	let cx = parent.0 as i64 + dx as i64;
	let cz = parent.1 as i64 + dz as i64;
	if cx < 0 || cz < 0 || cx >= ctx.nx as i64 || cz >= ctx.ny as i64 {
		ctx.costs[slot].store(PATHCOST_INFINITY.to_bits(), Ordering::Relaxed);
		return;
	}
	let child_idx = cz as usize * ctx.nx as usize + cx as usize;

	let start = decode_square(ctx.offsets[parent_idx * num_classes + path_type].load(Ordering::Relaxed));
	let goal = decode_square(ctx.offsets[child_idx * num_classes + path_type].load(Ordering::Relaxed));

	let cost = calc_vertex_cost(
		ctx.terrain,
		class,
		ctx.block_size,
		ctx.max_nodes,
		start,
		goal,
		finder,
	);
	ctx.costs[slot].store(cost.to_bits(), Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn square_encoding_round_trips() {
		for square in [(0, 0), (7, 23), (u32::MAX, 0), (1234, u32::MAX)] {
			assert_eq!(decode_square(encode_square(square)), square);
		}
	}
}
