use bitflags::bitflags;

use crate::dirs::PathDir;
use crate::{BlockPos, Square};

bitflags! {
	/// Per-block bookkeeping bits.
	///
	/// The low three bits encode the arrival direction of the best known
	/// path into the block (a [`PathDir`] index); the remaining bits track
	/// search and refresh state.
	#[derive(Clone, Copy, Debug, PartialEq, Eq)]
	pub(crate) struct NodeMask: u16 {
		/// Arrival-direction bits.
		const DIR_MASK = 0b0000_0111;
		/// The block sits in the open set of the running search.
		const OPEN = 1 << 3;
		/// The block has been expanded by the running search.
		const CLOSED = 1 << 4;
		/// The block was ruled out by the running search's constraints.
		const BLOCKED = 1 << 5;
		/// The block's tables are stale and queued for refresh. Unlike the
		/// other bits this one survives between searches.
		const OBSOLETE = 1 << 6;
	}
}

impl NodeMask {
	pub fn from_dir(dir: PathDir) -> NodeMask {
		NodeMask::from_bits_retain(dir.num() as u16)
	}

	#[allow(dead_code)]
	pub fn dir_bits(self) -> u16 {
		(self & NodeMask::DIR_MASK).bits()
	}
}

/// One record per block: search state, scalar costs, parent link and the
/// per-class representative squares.
///
/// Everything is allocated once at construction and sized from the map and
/// the move-class set.
#[derive(Clone, Debug)]
pub(crate) struct BlockStates {
	num_classes: usize,
	pub node_mask: Vec<NodeMask>,
	pub f_cost: Vec<f32>,
	pub g_cost: Vec<f32>,
	pub parent_pos: Vec<BlockPos>,
	/// Representative squares, `block_idx * num_classes + path_type`.
	pub offsets: Vec<Square>,
}

impl BlockStates {
	pub fn new(num_blocks: usize, num_classes: usize) -> BlockStates {
		BlockStates {
			num_classes,
			node_mask: vec![NodeMask::empty(); num_blocks],
			f_cost: vec![0.0; num_blocks],
			g_cost: vec![0.0; num_blocks],
			parent_pos: vec![(0, 0); num_blocks],
			offsets: vec![(0, 0); num_blocks * num_classes],
		}
	}

	pub fn len(&self) -> usize {
		self.node_mask.len()
	}

	pub fn offset(&self, block_idx: usize, path_type: usize) -> Square {
		self.offsets[block_idx * self.num_classes + path_type]
	}

	pub fn set_offset(&mut self, block_idx: usize, path_type: usize, square: Square) {
		self.offsets[block_idx * self.num_classes + path_type] = square;
	}
}
