//! Incremental refresh of the precomputed tables after terrain changes.

use rayon::prelude::*;

use crate::finder::FinePathFinder;
use crate::terrain::Terrain;

use super::block_states::NodeMask;
use super::{precompute, PathEstimator};

impl<T: Terrain, P: FinePathFinder<T>> PathEstimator<T, P> {
	/// Marks every block overlapping the fine-square rectangle
	/// `(x1, z1)`-`(x2, z2)` as obsolete and queues it for refresh.
	///
	/// Blocks already queued are not queued again. The rectangle is walked
	/// from its upper corner downwards so that refreshes touch the storing
	/// block of every affected bi-directional vertex.
	pub fn map_changed(&mut self, x1: u32, z1: u32, x2: u32, z2: u32) {
		let block_size = self.block_size;
		let lower_x = (x1.min(x2) / block_size).min(self.nx - 1);
		let upper_x = (x1.max(x2) / block_size).min(self.nx - 1);
		let lower_z = (z1.min(z2) / block_size).min(self.ny - 1);
		let upper_z = (z1.max(z2) / block_size).min(self.ny - 1);

		for bz in (lower_z..=upper_z).rev() {
			for bx in (lower_x..=upper_x).rev() {
				let block_idx = self.block_idx((bx, bz));
				if self.block_states.node_mask[block_idx].contains(NodeMask::OBSOLETE) {
					continue;
				}

				self.updated_blocks.push_back((bx, bz));
				self.block_states.node_mask[block_idx].insert(NodeMask::OBSOLETE);
			}
		}
	}

	/// Refreshes a rate-budgeted batch of obsolete blocks. Call once per
	/// simulation tick.
	///
	/// The budget is a linear function of the queue depth, clamped to a
	/// band around the per-tick block baseline; a penalty carried between
	/// ticks smooths bursts over several calls. Offsets of the consumed
	/// batch are recomputed in parallel (the offset finder is a pure
	/// function), vertex costs serially, because the fine path finder is
	/// not reentrant.
	pub fn update(&mut self, terrain: &T)
	where
		T: Sync,
	{
		self.caches[0].update();
		self.caches[1].update();

		let num_classes = self.classes.len() as i32;

		// smaller blocks mean cheaper refreshes, so they get a discount
		let discount = if self.block_size >= 16 { 1.0 } else { 0.6 };
		let progressive = (self.updated_blocks.len() as f32
			* num_classes as f32
			* discount
			* self.config.update_rate) as i32;
		let min_blocks = (self.blocks_to_update >> 1).max(4);
		let max_blocks = (self.blocks_to_update << 1).max(min_blocks);
		let mut blocks_to_update = progressive.clamp(min_blocks, max_blocks);

		self.block_update_penalty = (self.block_update_penalty - blocks_to_update).max(0);
		if self.block_update_penalty > 0 {
			blocks_to_update = (blocks_to_update - self.block_update_penalty).max(0);
		}

		// the obsolete bit is per block, not per class, so blocks are
		// consumed in whole multiples of the class count
		let consumed_budget = if progressive != 0 {
			(blocks_to_update as f32 / num_classes as f32).ceil() as i32 * num_classes
		} else {
			0
		};
		self.block_update_penalty += consumed_budget;

		if blocks_to_update == 0 || self.updated_blocks.is_empty() {
			return;
		}

		// drain the queue front into a flat (block, class) work list
		let mut consumed = Vec::with_capacity(consumed_budget.max(0) as usize);
		while let Some(&block) = self.updated_blocks.front() {
			let block_idx = self.block_idx(block);

			if !self.block_states.node_mask[block_idx].contains(NodeMask::OBSOLETE) {
				self.updated_blocks.pop_front();
				continue;
			}
			if consumed.len() >= blocks_to_update as usize {
				break;
			}

			for class in self.classes.iter().filter(|c| c.ref_count > 0) {
				consumed.push((block, class.path_type));
			}
			self.updated_blocks.pop_front();
		}

		// refresh representatives first; duplicate work would be harmless
		// since find_offset is deterministic, but every entry here is unique
		let classes = &self.classes;
		let block_size = self.block_size;
		let refreshed: Vec<crate::Square> = consumed
			.par_iter()
			.map(|&((bx, bz), path_type)| {
				precompute::find_offset(terrain, classes.get(path_type), block_size, bx, bz)
			})
			.collect();

		for (&(block, path_type), &square) in consumed.iter().zip(refreshed.iter()) {
			let block_idx = self.block_idx(block);
			self.block_states
				.set_offset(block_idx, path_type as usize, square);
		}

		// then the vertices, in list order; every map_changed call appends
		// at most one run of ascending path types per block, so a
		// non-increasing path type marks the end of a block's run
		for n in 0..consumed.len() {
			let (block, path_type) = consumed[n];
			self.calculate_vertices(terrain, path_type, block);

			let last_of_block = match consumed.get(n + 1) {
				Some(&(_, next_type)) => next_type <= path_type,
				None => true,
			};
			if last_of_block {
				let block_idx = self.block_idx(block);
				self.block_states.node_mask[block_idx].remove(NodeMask::OBSOLETE);
			}
		}
	}
}
