//! Shared test collaborators: a mutable grid terrain and a reference fine
//! path finder.
#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use path_estimator::prelude::*;

pub const SQRT_2: f32 = std::f32::consts::SQRT_2;

/// A grid map with per-square speed modifiers and a set of structure
/// squares. Mutable through `&self` so tests can change the map under a
/// live estimator, the way a game world would.
pub struct GridTerrain {
    width: u32,
    height: u32,
    speed: RwLock<Vec<f32>>,
    structures: RwLock<HashSet<(u32, u32)>>,
    checksum: u32,
}

impl GridTerrain {
    pub fn uniform(width: u32, height: u32) -> GridTerrain {
        GridTerrain {
            width,
            height,
            speed: RwLock::new(vec![1.0; (width * height) as usize]),
            structures: RwLock::new(HashSet::new()),
            checksum: 0xBEEF,
        }
    }

    pub fn with_checksum(mut self, checksum: u32) -> GridTerrain {
        self.checksum = checksum;
        self
    }

    pub fn set_speed(&self, x: u32, z: u32, value: f32) {
        self.speed.write().unwrap()[(z * self.width + x) as usize] = value;
    }

    /// Sets the speed of every square in the inclusive rectangle.
    pub fn fill_speed_rect(&self, x1: u32, z1: u32, x2: u32, z2: u32, value: f32) {
        for z in z1..=z2 {
            for x in x1..=x2 {
                self.set_speed(x, z, value);
            }
        }
    }

    pub fn add_structure(&self, x: u32, z: u32) {
        self.structures.write().unwrap().insert((x, z));
    }

    /// Fills the inclusive rectangle with structures.
    pub fn fill_structure_rect(&self, x1: u32, z1: u32, x2: u32, z2: u32) {
        for z in z1..=z2 {
            for x in x1..=x2 {
                self.add_structure(x, z);
            }
        }
    }
}

impl Terrain for GridTerrain {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn speed_mod(&self, _class: &MoveClass, x: u32, z: u32) -> f32 {
        if x >= self.width || z >= self.height {
            return 0.0;
        }
        self.speed.read().unwrap()[(z * self.width + x) as usize]
    }

    fn is_blocked(&self, _class: &MoveClass, x: u32, z: u32) -> BlockFlags {
        if self.structures.read().unwrap().contains(&(x, z)) {
            BlockFlags::STRUCTURE
        } else {
            BlockFlags::empty()
        }
    }

    fn checksum(&self) -> u32 {
        self.checksum
    }
}

#[derive(Clone, Copy, Debug)]
struct FineNode {
    f_cost: f32,
    g_cost: f32,
    pos: (u32, u32),
    seq: u32,
}

impl PartialEq for FineNode {
    fn eq(&self, other: &FineNode) -> bool {
        self.f_cost == other.f_cost && self.seq == other.seq
    }
}

impl Eq for FineNode {}

impl Ord for FineNode {
    fn cmp(&self, other: &FineNode) -> Ordering {
        match other.f_cost.partial_cmp(&self.f_cost) {
            Some(Ordering::Equal) | None => other.seq.cmp(&self.seq),
            Some(ordering) => ordering,
        }
    }
}

impl PartialOrd for FineNode {
    fn partial_cmp(&self, other: &FineNode) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A straightforward fine A* over single squares with the eight movement
/// directions. Step cost is distance over the target square's speed
/// modifier. Tracks how often it was invoked so tests can tell whether a
/// precomputation ran.
pub struct GridPathFinder {
    pub calls: Arc<AtomicUsize>,
}

impl GridPathFinder {
    pub fn new() -> GridPathFinder {
        GridPathFinder {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_counter(calls: Arc<AtomicUsize>) -> GridPathFinder {
        GridPathFinder { calls }
    }
}

const FINE_STEPS: [(i32, i32); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

impl FinePathFinder<GridTerrain> for GridPathFinder {
    fn get_path(
        &mut self,
        terrain: &GridTerrain,
        class: &MoveClass,
        def: &GoalDef,
        start: Square,
        path: &mut FoundPath,
        max_nodes: u32,
    ) -> SearchResult {
        self.calls.fetch_add(1, AtomicOrdering::Relaxed);

        if terrain.speed_mod(class, start.0, start.1) == 0.0 {
            return SearchResult::Error;
        }
        if def.is_goal(start.0, start.1) {
            path.cost = 0.0;
            return SearchResult::CantGetCloser;
        }

        let (width, height) = terrain.size();
        let mut best_g: HashMap<(u32, u32), f32> = HashMap::new();
        let mut open: BinaryHeap<FineNode> = BinaryHeap::new();
        let mut seq = 0;
        let mut visited = 0;

        best_g.insert(start, 0.0);
        open.push(FineNode {
            f_cost: def.heuristic(start.0, start.1),
            g_cost: 0.0,
            pos: start,
            seq,
        });

        while let Some(node) = open.pop() {
            // a better entry for this square may have superseded this one
            if node.g_cost > best_g[&node.pos] {
                continue;
            }

            if def.is_goal(node.pos.0, node.pos.1) {
                path.cost = node.g_cost;
                path.goal = WorldPos {
                    x: node.pos.0 as f32,
                    y: 0.0,
                    z: node.pos.1 as f32,
                };
                return SearchResult::Ok;
            }

            visited += 1;
            if visited >= max_nodes {
                return SearchResult::GoalOutOfRange;
            }

            for (dx, dz) in FINE_STEPS {
                let nx = node.pos.0 as i64 + dx as i64;
                let nz = node.pos.1 as i64 + dz as i64;
                if nx < 0 || nz < 0 || nx >= width as i64 || nz >= height as i64 {
                    continue;
                }
                let next = (nx as u32, nz as u32);

                if !def.within_constraints(next.0, next.1) {
                    continue;
                }
                let speed = terrain.speed_mod(class, next.0, next.1);
                if speed == 0.0 {
                    continue;
                }
                if terrain
                    .is_blocked(class, next.0, next.1)
                    .contains(BlockFlags::STRUCTURE)
                {
                    continue;
                }

                let dist = if dx != 0 && dz != 0 { SQRT_2 } else { 1.0 };
                let g_cost = node.g_cost + dist / speed;

                if best_g.get(&next).map_or(true, |&old| g_cost < old) {
                    best_g.insert(next, g_cost);
                    seq += 1;
                    open.push(FineNode {
                        f_cost: g_cost + def.heuristic(next.0, next.1),
                        g_cost,
                        pos: next,
                        seq,
                    });
                }
            }
        }

        SearchResult::GoalOutOfRange
    }

    fn mem_footprint(&self) -> usize {
        1 << 20
    }
}

pub fn walker_classes() -> MoveClassSet {
    MoveClassSet::new(vec![MoveClass::new(0, "walker")])
}

/// An estimator over `terrain` with a 16-square block size and the given
/// config.
pub fn make_estimator(
    terrain: &GridTerrain,
    config: EstimatorConfig,
) -> PathEstimator<GridTerrain, GridPathFinder> {
    PathEstimator::new(
        terrain,
        walker_classes(),
        GridPathFinder::new,
        Services::default(),
        config,
        16,
        "walk",
        "test",
    )
}

/// Cost of one straight inter-block edge on a uniform map with a 16-square
/// block size: 15 unit steps from representative to the square adjacent to
/// the neighbouring representative (the vertex goal radius is one square).
pub const STRAIGHT_EDGE: f32 = 15.0;

/// Cost of one diagonal inter-block edge on the same map: 15 diagonal steps
/// plus one straight step into the goal radius.
pub fn diagonal_edge() -> f32 {
    15.0 * SQRT_2 + 1.0
}
