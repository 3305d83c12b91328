//! The terrain interface consumed by the estimator, and the registry of
//! movement classes it precomputes tables for.

use bitflags::bitflags;

use crate::Square;

bitflags! {
	/// What occupies a fine map square, as reported by [`Terrain::is_blocked`].
	#[derive(Clone, Copy, Debug, PartialEq, Eq)]
	pub struct BlockFlags: u8 {
		/// A unit that is currently moving.
		const MOVING = 1 << 0;
		/// An idle unit that could move out of the way.
		const MOBILE = 1 << 1;
		/// A unit that can move but is busy with something else.
		const BUSY_MOBILE = 1 << 2;
		/// An immovable structure. Squares carrying this flag never serve as
		/// vertex endpoints.
		const STRUCTURE = 1 << 3;
	}
}

/// One movement class: a parameter set describing how a family of units
/// traverses the map.
///
/// The interesting parameters (slopes, crush strength, ...) live with the
/// terrain implementation; the estimator only needs a stable index, a name
/// for checksumming and the number of unit types referencing the class.
#[derive(Clone, Debug)]
pub struct MoveClass {
	/// Index of this class in its [`MoveClassSet`]; also the row index in
	/// the precomputed tables.
	pub path_type: u32,
	/// Human-readable identifier; participates in the dataset hash.
	pub name: String,
	/// Number of unit types using this class. Classes with a zero count are
	/// skipped during precomputation and updates.
	pub ref_count: u32,
}

impl MoveClass {
	/// Creates a class with a reference count of one.
	pub fn new(path_type: u32, name: &str) -> MoveClass {
		MoveClass {
			path_type,
			name: name.to_string(),
			ref_count: 1,
		}
	}
}

/// The fixed set of movement classes an estimator serves.
///
/// The set is sealed at construction: tables are sized from it and the
/// dataset hash covers it, so classes cannot be added later.
#[derive(Clone, Debug)]
pub struct MoveClassSet {
	classes: Vec<MoveClass>,
}

impl MoveClassSet {
	/// Creates a set from classes ordered by `path_type`.
	///
	/// ## Panics
	/// Panics if any class's `path_type` differs from its position.
	pub fn new(classes: Vec<MoveClass>) -> MoveClassSet {
		for (i, class) in classes.iter().enumerate() {
			assert!(
				class.path_type as usize == i,
				"move class {:?} is out of order (expected path type {})",
				class.name,
				i
			);
		}
		MoveClassSet { classes }
	}

	/// Number of classes in the set.
	pub fn len(&self) -> usize {
		self.classes.len()
	}

	/// `true` if the set holds no classes.
	pub fn is_empty(&self) -> bool {
		self.classes.is_empty()
	}

	/// The class with the given path type.
	pub fn get(&self, path_type: u32) -> &MoveClass {
		&self.classes[path_type as usize]
	}

	/// Iterates over all classes in path-type order.
	pub fn iter(&self) -> std::slice::Iter<'_, MoveClass> {
		self.classes.iter()
	}

	/// CRC-32 over the class descriptors; feeds the dataset hash.
	pub fn checksum(&self) -> u32 {
		let mut hasher = crc32fast::Hasher::new();
		for class in &self.classes {
			hasher.update(&class.path_type.to_le_bytes());
			hasher.update(class.name.as_bytes());
			hasher.update(&[0]);
		}
		hasher.finalize()
	}
}

/// Read access to the fine grid the estimator summarizes.
///
/// Implementations must be pure with respect to a given map revision: two
/// queries for the same square between the same pair of
/// [`map_changed`](crate::PathEstimator::map_changed) notifications must
/// agree, or the precomputed tables lose their meaning.
///
/// Coordinates outside [`size`](Terrain::size) must report a speed modifier
/// of `0.0`; partial blocks on the map edge rely on this.
pub trait Terrain {
	/// Map extent in fine squares, `(width, height)`.
	fn size(&self) -> (u32, u32);

	/// Mobility multiplier of `class` on the square; `0.0` means the square
	/// cannot be traversed at all.
	fn speed_mod(&self, class: &MoveClass, x: u32, z: u32) -> f32;

	/// What currently occupies the square.
	fn is_blocked(&self, class: &MoveClass, x: u32, z: u32) -> BlockFlags;

	/// Height of the square, used when projecting block waypoints into world
	/// space.
	fn y_level(&self, _x: u32, _z: u32) -> f32 {
		0.0
	}

	/// Checksum of the map revision; feeds the dataset hash.
	fn checksum(&self) -> u32;
}

/// Convenience passthrough so `&T` can be handed around where a terrain is
/// expected.
impl<T: Terrain + ?Sized> Terrain for &T {
	fn size(&self) -> (u32, u32) {
		(**self).size()
	}
	fn speed_mod(&self, class: &MoveClass, x: u32, z: u32) -> f32 {
		(**self).speed_mod(class, x, z)
	}
	fn is_blocked(&self, class: &MoveClass, x: u32, z: u32) -> BlockFlags {
		(**self).is_blocked(class, x, z)
	}
	fn y_level(&self, x: u32, z: u32) -> f32 {
		(**self).y_level(x, z)
	}
	fn checksum(&self) -> u32 {
		(**self).checksum()
	}
}

/// `true` if `class` can neither stand on nor pass through the square.
pub(crate) fn square_impassable<T: Terrain>(terrain: &T, class: &MoveClass, square: Square) -> bool {
	terrain.speed_mod(class, square.0, square.1) == 0.0
		|| terrain
			.is_blocked(class, square.0, square.1)
			.contains(BlockFlags::STRUCTURE)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn class_set_checksum_is_order_sensitive() {
		let a = MoveClassSet::new(vec![MoveClass::new(0, "walker"), MoveClass::new(1, "hover")]);
		let b = MoveClassSet::new(vec![MoveClass::new(0, "hover"), MoveClass::new(1, "walker")]);
		assert_ne!(a.checksum(), b.checksum());
		assert_eq!(a.checksum(), a.checksum());
	}

	#[test]
	#[should_panic]
	fn class_set_rejects_misnumbered_classes() {
		MoveClassSet::new(vec![MoveClass::new(1, "walker")]);
	}
}
