//! Numeric constants shared between the estimator, its collaborators and the
//! on-disk cache format.

/// World units per fine map square.
pub const SQUARE_SIZE: u32 = 8;

/// Cost sentinel for edges that cannot be traversed.
///
/// Precomputed infinities are expected values, not errors: they record that
/// no path joins the representative squares of two neighbouring blocks.
pub const PATHCOST_INFINITY: f32 = f32::INFINITY;

/// Upper bound on the number of squares a single fine-grained search may
/// visit. Vertex-cost calculations use a quarter of this.
pub const MAX_SEARCHED_NODES_PF: u32 = 65536;

/// Hard upper bound on the number of blocks a single estimator search may
/// push onto its open set.
pub const MAX_SEARCHED_BLOCKS: u32 = 65536;

/// Outgoing directions stored per block in the vertex-cost table. The
/// remaining four directions are read through the mirror rule (see
/// [`PathDir`](crate::PathDir)).
pub const PATH_DIRECTION_VERTICES: usize = 4;

/// Version tag of the precomputed tables. Participates in the dataset hash,
/// so bumping it invalidates every existing on-disk cache.
pub const PATH_ESTIMATOR_VERSION: u32 = 5;
