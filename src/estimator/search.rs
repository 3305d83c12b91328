//! The A* search over the block graph, reusing the precomputed vertex costs
//! and representative squares.

use std::cmp::Ordering;

use log::error;

use crate::constants::{MAX_SEARCHED_BLOCKS, PATHCOST_INFINITY, PATH_DIRECTION_VERTICES, SQUARE_SIZE};
use crate::dirs::{vertex_offset, PathDir};
use crate::finder::{FinePathFinder, FoundPath, SearchResult, WorldPos};
use crate::goal::GoalDef;
use crate::terrain::Terrain;
use crate::BlockPos;

use super::block_states::NodeMask;
use super::PathEstimator;

/// A block sitting in the open set.
#[derive(Clone, Copy, Debug)]
pub(crate) struct OpenBlock {
	pub f_cost: f32,
	pub g_cost: f32,
	pub pos: BlockPos,
	pub idx: usize,
	/// Insertion sequence number; breaks cost ties first-in-first-out so
	/// expansions are reproducible.
	pub seq: u32,
}

impl PartialEq for OpenBlock {
	fn eq(&self, other: &OpenBlock) -> bool {
		self.f_cost == other.f_cost && self.seq == other.seq
	}
}

impl Eq for OpenBlock {}

impl Ord for OpenBlock {
	fn cmp(&self, other: &OpenBlock) -> Ordering {
		// BinaryHeap pops the maximum, so compare the other way around:
		// lowest f cost first, earliest insertion on ties
		match other.f_cost.partial_cmp(&self.f_cost) {
			Some(Ordering::Equal) | None => other.seq.cmp(&self.seq),
			Some(ordering) => ordering,
		}
	}
}

impl PartialOrd for OpenBlock {
	fn partial_cmp(&self, other: &OpenBlock) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<T: Terrain, P: FinePathFinder<T>> PathEstimator<T, P> {
	/// Runs an A* search over the block graph from the block containing
	/// `start` towards `def`'s goal.
	///
	/// On [`SearchResult::GoalOutOfRange`] the internal goal candidate is
	/// left pointing at the block with the best heuristic seen, so
	/// [`finish_search`](PathEstimator::finish_search) still produces the
	/// most promising partial path for the fine planner to work from.
	pub fn do_search(
		&mut self,
		path_type: u32,
		def: &GoalDef,
		start: crate::Square,
		synced: bool,
	) -> SearchResult {
		self.reset_search();

		let block_size = self.block_size;
		let start_block = (start.0 / block_size, start.1 / block_size);
		let start_idx = self.block_idx(start_block);

		self.start_block_idx = start_idx;
		self.goal_block_idx = start_idx;
		self.goal_heuristic = def.heuristic(start.0, start.1);

		self.block_states.node_mask[start_idx].insert(NodeMask::OPEN);
		self.block_states.f_cost[start_idx] = 0.0;
		self.block_states.g_cost[start_idx] = 0.0;
		self.dirty_blocks.push(start_idx);

		self.open_block_count = 1;
		self.next_seq = 0;
		self.open_blocks.push(OpenBlock {
			f_cost: self.goal_heuristic,
			g_cost: 0.0,
			pos: start_block,
			idx: start_idx,
			seq: 0,
		});

		let max_blocks = self
			.config
			.max_searched_blocks
			.min(MAX_SEARCHED_BLOCKS - 8);
		let goal_offset = def.goal_square_offset(block_size);

		let mut found_goal = false;
		while self.open_block_count < max_blocks {
			let Some(open_block) = self.open_blocks.pop() else {
				break;
			};

			// the block may have been ruled out while it sat in the queue
			if self.block_states.node_mask[open_block.idx]
				.intersects(NodeMask::BLOCKED | NodeMask::CLOSED)
			{
				continue;
			}

			// goal test on both the representative square and the
			// goal-offset square of the block
			let (rep_x, rep_z) = self.block_states.offset(open_block.idx, path_type as usize);
			let goal_x = open_block.pos.0 * block_size + goal_offset.0;
			let goal_z = open_block.pos.1 * block_size + goal_offset.1;

			if def.is_goal(rep_x, rep_z) || def.is_goal(goal_x, goal_z) {
				self.goal_block_idx = open_block.idx;
				self.goal_heuristic = 0.0;
				found_goal = true;
				break;
			}

			for dir in PathDir::all() {
				self.test_block(path_type, def, &open_block, dir, synced);
			}

			self.block_states.node_mask[open_block.idx].insert(NodeMask::CLOSED);
		}

		if found_goal {
			return SearchResult::Ok;
		}
		if self.open_block_count >= max_blocks {
			return SearchResult::GoalOutOfRange;
		}
		if self.open_blocks.is_empty() {
			return SearchResult::GoalOutOfRange;
		}

		// not reachable: the loop only exits through the conditions above
		error!("do_search: unhandled end of search");
		SearchResult::Error
	}

	/// Tests one neighbour of an expanded block and, if it improves on what
	/// the open set already holds, records it there.
	fn test_block(
		&mut self,
		path_type: u32,
		def: &GoalDef,
		parent: &OpenBlock,
		dir: PathDir,
		synced: bool,
	) -> bool {
		self.tested_blocks += 1;

		let (dx, dz) = dir.vector();
		let bx = parent.pos.0 as i64 + dx as i64;
		let bz = parent.pos.1 as i64 + dz as i64;
		if bx < 0 || bz < 0 || bx >= self.nx as i64 || bz >= self.ny as i64 {
			return false;
		}
		let block = (bx as u32, bz as u32);
		let block_idx = self.block_idx(block);

		if self.block_states.node_mask[block_idx].intersects(NodeMask::BLOCKED | NodeMask::CLOSED) {
			return false;
		}

		let vertex_idx = path_type as usize * self.block_states.len() * PATH_DIRECTION_VERTICES
			+ parent.idx * PATH_DIRECTION_VERTICES
			+ vertex_offset(dir, self.nx);
		debug_assert!(vertex_idx < self.vertex_costs.len());
		let vertex_cost = self.vertex_costs[vertex_idx];
		if vertex_cost >= PATHCOST_INFINITY {
			return false;
		}

		let (square_x, square_z) = self.block_states.offset(block_idx, path_type as usize);
		if !def.within_constraints(square_x, square_z) {
			self.block_states.node_mask[block_idx].insert(NodeMask::BLOCKED);
			self.dirty_blocks.push(block_idx);
			return false;
		}

		// dynamic cost layers are sampled at the child's representative
		let class = self.classes.get(path_type);
		let flow_cost = self.services.flow_cost(square_x, square_z, class, dir);
		let extra_cost = self.services.extra_cost(square_x, square_z, synced);
		let node_cost = vertex_cost + flow_cost + extra_cost;

		let g_cost = parent.g_cost + node_cost;
		let h_cost = def.heuristic(square_x, square_z);
		let f_cost = g_cost + h_cost;

		if self.block_states.node_mask[block_idx].contains(NodeMask::OPEN) {
			if self.block_states.f_cost[block_idx] <= f_cost {
				return true;
			}
			self.block_states.node_mask[block_idx].remove(NodeMask::DIR_MASK);
		}

		if h_cost < self.goal_heuristic {
			self.goal_block_idx = block_idx;
			self.goal_heuristic = h_cost;
		}

		self.open_block_count += 1;
		debug_assert!(self.open_block_count < MAX_SEARCHED_BLOCKS);
		self.next_seq += 1;
		self.open_blocks.push(OpenBlock {
			f_cost,
			g_cost,
			pos: block,
			idx: block_idx,
			seq: self.next_seq,
		});

		self.max_costs[0] = self.max_costs[0].max(f_cost);
		self.max_costs[1] = self.max_costs[1].max(g_cost);

		self.block_states.f_cost[block_idx] = f_cost;
		self.block_states.g_cost[block_idx] = g_cost;
		self.block_states.node_mask[block_idx].insert(NodeMask::from_dir(dir) | NodeMask::OPEN);
		self.block_states.parent_pos[block_idx] = parent.pos;

		self.dirty_blocks.push(block_idx);
		true
	}

	/// Walks the parent chain of the last search back from its goal
	/// candidate, emitting one world-space waypoint per block.
	///
	/// The waypoints are the blocks' representative squares projected to
	/// world coordinates, ordered goal-first; the start block itself is not
	/// emitted. The path cost is the goal candidate's `g` cost.
	pub fn finish_search(&self, terrain: &T, path_type: u32, path: &mut FoundPath) {
		let mut block_idx = self.goal_block_idx;

		while block_idx != self.start_block_idx {
			let (square_x, square_z) = self.block_states.offset(block_idx, path_type as usize);
			path.points.push(WorldPos {
				x: (square_x * SQUARE_SIZE) as f32,
				y: terrain.y_level(square_x, square_z),
				z: (square_z * SQUARE_SIZE) as f32,
			});

			block_idx = self.block_idx(self.block_states.parent_pos[block_idx]);
		}

		if let Some(&front) = path.points.first() {
			path.goal = front;
		}
		path.cost = self.block_states.f_cost[self.goal_block_idx] - self.goal_heuristic;
	}

	/// Restores the state bits touched by the previous search, in
	/// O(touched) rather than O(blocks).
	fn reset_search(&mut self) {
		while let Some(block_idx) = self.dirty_blocks.pop() {
			self.block_states.node_mask[block_idx] &= NodeMask::OBSOLETE;
			self.block_states.f_cost[block_idx] = 0.0;
			self.block_states.g_cost[block_idx] = 0.0;
		}
		self.open_blocks.clear();
		self.open_block_count = 0;
		self.next_seq = 0;
		self.max_costs = [0.0, 0.0];
	}
}
