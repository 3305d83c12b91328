mod common;

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::*;
use path_estimator::prelude::*;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "path_estimator_{}_{}",
        std::process::id(),
        name
    ));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn counted_estimator(
    terrain: &GridTerrain,
    cache_dir: PathBuf,
) -> (
    PathEstimator<GridTerrain, GridPathFinder>,
    Arc<AtomicUsize>,
) {
    let calls = Arc::new(AtomicUsize::new(0));
    let factory_calls = calls.clone();

    let estimator = PathEstimator::new(
        terrain,
        walker_classes(),
        move || GridPathFinder::with_counter(factory_calls.clone()),
        Services::default(),
        EstimatorConfig::with_cache_dir(cache_dir),
        16,
        "walk",
        "test",
    );

    (estimator, calls)
}

/// The second construction over the same dataset must come entirely from
/// disk: identical tables, identical checksum, and not a single fine
/// search.
#[test]
fn tables_round_trip_through_the_cache_file() {
    let dir = scratch_dir("round_trip");
    let terrain = GridTerrain::uniform(64, 64);
    terrain.fill_speed_rect(10, 20, 50, 24, 0.5);

    let (first, first_calls) = counted_estimator(&terrain, dir.clone());
    assert!(first_calls.load(Ordering::Relaxed) > 0);
    assert_ne!(first.path_checksum(), 0);

    let (second, second_calls) = counted_estimator(&terrain, dir.clone());
    assert_eq!(second_calls.load(Ordering::Relaxed), 0);
    assert_eq!(second.path_checksum(), first.path_checksum());

    for bz in 0..4 {
        for bx in 0..4 {
            assert_eq!(first.offset(0, (bx, bz)), second.offset(0, (bx, bz)));
            for dir in PathDir::all() {
                assert_eq!(
                    first.vertex_cost(0, (bx, bz), dir).to_bits(),
                    second.vertex_cost(0, (bx, bz), dir).to_bits()
                );
            }
        }
    }

    let _ = fs::remove_dir_all(&dir);
}

/// A different map checksum keys a different cache file, so nothing stale
/// is picked up and a new precomputation runs.
#[test]
fn changed_dataset_hash_recomputes() {
    let dir = scratch_dir("hash_change");

    let terrain = GridTerrain::uniform(64, 64);
    let (_, first_calls) = counted_estimator(&terrain, dir.clone());
    assert!(first_calls.load(Ordering::Relaxed) > 0);

    let changed = GridTerrain::uniform(64, 64).with_checksum(0xD00D);
    let (_, second_calls) = counted_estimator(&changed, dir.clone());
    assert!(second_calls.load(Ordering::Relaxed) > 0);

    let _ = fs::remove_dir_all(&dir);
}

/// A damaged cache file reads as a miss and gets rebuilt.
#[test]
fn corrupt_cache_file_recomputes() {
    let dir = scratch_dir("corrupt");
    let terrain = GridTerrain::uniform(64, 64);

    let (first, _) = counted_estimator(&terrain, dir.clone());

    let paths_dir = dir.join("paths");
    let mut cache_files: Vec<_> = fs::read_dir(&paths_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(cache_files.len(), 1);
    fs::write(cache_files.pop().unwrap(), b"not a cache file").unwrap();

    let (second, second_calls) = counted_estimator(&terrain, dir.clone());
    assert!(second_calls.load(Ordering::Relaxed) > 0);
    assert_eq!(second.path_checksum(), first.path_checksum());

    let _ = fs::remove_dir_all(&dir);
}

/// An unwritable cache location must not break the estimator; it just
/// works without persistence.
#[test]
fn unwritable_cache_dir_is_tolerated() {
    let blocker = scratch_dir("unwritable");
    fs::write(&blocker, b"a file where a directory should be").unwrap();

    let terrain = GridTerrain::uniform(64, 64);
    let (mut estimator, calls) = counted_estimator(&terrain, blocker.join("sub"));

    assert!(calls.load(Ordering::Relaxed) > 0);
    assert_eq!(estimator.path_checksum(), 0);

    let goal = GoalDef::new((55, 55), 0.0);
    let (result, _) = estimator.find_path(&terrain, 0, (7, 7), &goal, true);
    assert_eq!(result, SearchResult::Ok);

    let _ = fs::remove_file(&blocker);
}
