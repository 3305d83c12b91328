use criterion::{criterion_group, criterion_main, Criterion};
use env_logger::Env;
use log::warn;
use oorandom::Rand32;

use path_estimator::prelude::*;

struct Map {
    width: u32,
    height: u32,
    speed: Vec<f32>,
}

impl Map {
    /// A map with patches of swamp and scattered walls.
    fn generate(width: u32, height: u32, seed: u64) -> Map {
        let mut rng = Rand32::new(seed);
        let speed = (0..width * height)
            .map(|_| match rng.rand_range(0..10) {
                0 => 0.0,
                1 | 2 => 0.25,
                _ => 1.0,
            })
            .collect();
        Map {
            width,
            height,
            speed,
        }
    }
}

impl Terrain for Map {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
    fn speed_mod(&self, _class: &MoveClass, x: u32, z: u32) -> f32 {
        if x >= self.width || z >= self.height {
            return 0.0;
        }
        self.speed[(z * self.width + x) as usize]
    }
    fn is_blocked(&self, _class: &MoveClass, _x: u32, _z: u32) -> BlockFlags {
        BlockFlags::empty()
    }
    fn checksum(&self) -> u32 {
        0xB33F
    }
}

/// Prices an edge by straight-line distance; the benchmarks target the
/// estimator machinery, not a particular fine search.
struct StraightFinder;

impl FinePathFinder<Map> for StraightFinder {
    fn get_path(
        &mut self,
        terrain: &Map,
        class: &MoveClass,
        def: &GoalDef,
        start: Square,
        path: &mut FoundPath,
        _max_nodes: u32,
    ) -> SearchResult {
        let (gx, gz) = def.goal();
        if terrain.speed_mod(class, gx, gz) == 0.0 {
            return SearchResult::GoalOutOfRange;
        }
        let dx = gx as f32 - start.0 as f32;
        let dz = gz as f32 - start.1 as f32;
        path.cost = (dx * dx + dz * dz).sqrt();
        SearchResult::Ok
    }
    fn mem_footprint(&self) -> usize {
        1 << 16
    }
}

fn build(map: &Map, thread_count: u32) -> PathEstimator<Map, StraightFinder> {
    PathEstimator::new(
        map,
        MoveClassSet::new(vec![MoveClass::new(0, "walker")]),
        || StraightFinder,
        Services::default(),
        EstimatorConfig {
            thread_count,
            ..EstimatorConfig::default()
        },
        16,
        "bench",
        "random",
    )
}

fn precompute_benchmark(c: &mut Criterion) {
    let map = Map::generate(256, 256, 0xDECAF);

    c.bench_function("precompute 256x256 serial", |b| {
        b.iter(|| build(&map, 1))
    });
    c.bench_function("precompute 256x256 parallel", |b| {
        b.iter(|| build(&map, 0))
    });
}

fn search_benchmark(c: &mut Criterion) {
    let map = Map::generate(256, 256, 0xDECAF);
    let mut estimator = build(&map, 0);

    let goal = GoalDef::new((250, 250), 8.0);
    let (result, _) = estimator.find_path(&map, 0, (2, 2), &goal, true);
    if result != SearchResult::Ok {
        warn!("benchmark goal unreachable on this seed, measuring the failure path");
    }

    c.bench_function("search corner to corner", |b| {
        b.iter(|| {
            let result = estimator.do_search(0, &goal, (2, 2), true);
            let mut path = FoundPath::default();
            estimator.finish_search(&map, 0, &mut path);
            (result, path)
        })
    });
}

fn bench(c: &mut Criterion) {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .try_init()
        .ok();

    precompute_benchmark(c);
    search_benchmark(c);
}

criterion_group!(benches, bench);
criterion_main!(benches);
