//! The eight movement directions between neighbouring blocks, and the
//! four-stored / eight-read layout of the vertex-cost table.

use crate::constants::PATH_DIRECTION_VERTICES;

/// A direction from a block to one of its eight neighbours.
///
/// Only the first four directions (`Left`, `LeftUp`, `Up`, `RightUp`) have
/// slots in the vertex-cost table. A cost read in one of the other four
/// directions is served by the neighbouring block's slot for the opposite
/// direction, so both endpoints of an undirected edge always observe the
/// same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PathDir {
	/// `(-1, 0)`
	Left = 0,
	/// `(-1, -1)`
	LeftUp = 1,
	/// `(0, -1)`
	Up = 2,
	/// `(1, -1)`
	RightUp = 3,
	/// `(1, 0)`
	Right = 4,
	/// `(1, 1)`
	RightDown = 5,
	/// `(0, 1)`
	Down = 6,
	/// `(-1, 1)`
	LeftDown = 7,
}

use self::PathDir::*;

/// Block-coordinate deltas, indexed by [`PathDir::num`].
const DIRECTION_VECTORS: [(i32, i32); 8] = [
	(-1, 0),
	(-1, -1),
	(0, -1),
	(1, -1),
	(1, 0),
	(1, 1),
	(0, 1),
	(-1, 1),
];

impl PathDir {
	/// All eight directions, in table order.
	pub fn all() -> std::iter::Copied<std::slice::Iter<'static, PathDir>> {
		[Left, LeftUp, Up, RightUp, Right, RightDown, Down, LeftDown]
			.iter()
			.copied()
	}

	/// The four directions that own a slot in the vertex-cost table.
	pub fn stored() -> std::iter::Copied<std::slice::Iter<'static, PathDir>> {
		[Left, LeftUp, Up, RightUp].iter().copied()
	}

	/// The direction pointing the other way.
	pub fn opposite(self) -> PathDir {
		match self {
			Left => Right,
			LeftUp => RightDown,
			Up => Down,
			RightUp => LeftDown,
			Right => Left,
			RightDown => LeftUp,
			Down => Up,
			LeftDown => RightUp,
		}
	}

	/// The `(dx, dz)` step this direction takes in block coordinates.
	pub fn vector(self) -> (i32, i32) {
		DIRECTION_VECTORS[self.num()]
	}

	/// The table index of this direction.
	pub fn num(self) -> usize {
		self as usize
	}
}

/// Offset from `parent_block_idx * PATH_DIRECTION_VERTICES` to the slot
/// holding the cost of leaving the parent block in `dir`, for a block row
/// length of `nx`.
///
/// For the four stored directions this is the direction index itself. For
/// the mirrored four it jumps to the neighbouring block (which, for these
/// directions, is always the block the edge leads into) and substitutes the
/// opposite direction. Callers must have bounds-checked the neighbouring
/// block already.
pub(crate) fn vertex_offset(dir: PathDir, nx: u32) -> usize {
	let nx = nx as usize;
	match dir {
		Left | LeftUp | Up | RightUp => dir.num(),
		Right => PATH_DIRECTION_VERTICES + Left.num(),
		RightDown => (nx + 1) * PATH_DIRECTION_VERTICES + LeftUp.num(),
		Down => nx * PATH_DIRECTION_VERTICES + Up.num(),
		LeftDown => (nx - 1) * PATH_DIRECTION_VERTICES + RightUp.num(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn opposite_round_trips() {
		for dir in PathDir::all() {
			assert_eq!(dir.opposite().opposite(), dir);
			let (dx, dz) = dir.vector();
			let (ox, oz) = dir.opposite().vector();
			assert_eq!((dx + ox, dz + oz), (0, 0));
		}
	}

	#[test]
	fn mirrored_reads_land_on_the_storing_block() {
		// on a 4-wide block row, the slot reached from the parent must be the
		// neighbour's slot for the opposite direction
		let nx = 4u32;
		let parent = (1u32, 1u32);
		let parent_idx = (parent.1 * nx + parent.0) as usize;

		for dir in [Right, RightDown, Down, LeftDown] {
			let (dx, dz) = dir.vector();
			let child = (
				(parent.0 as i32 + dx) as u32,
				(parent.1 as i32 + dz) as u32,
			);
			let child_idx = (child.1 * nx + child.0) as usize;

			assert_eq!(
				parent_idx * PATH_DIRECTION_VERTICES + vertex_offset(dir, nx),
				child_idx * PATH_DIRECTION_VERTICES + dir.opposite().num(),
			);
		}
	}

	#[test]
	fn stored_reads_stay_on_the_parent() {
		let nx = 4u32;
		for dir in PathDir::stored() {
			assert_eq!(vertex_offset(dir, nx), dir.num());
		}
	}
}
