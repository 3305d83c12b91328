//! The in-memory cache of completed coarse searches.
//!
//! One instance exists per synchronisation domain (deterministic simulation
//! queries and presentation queries never share entries). Entries age out a
//! fixed number of ticks after insertion; [`ResultCache::update`] is called
//! once per tick to advance the clock and drop what has expired.

use std::collections::VecDeque;

use log::debug;
use rustc_hash::FxHashMap;

use crate::finder::{FoundPath, SearchResult};
use crate::BlockPos;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
	start: BlockPos,
	goal: BlockPos,
	radius_bits: u32,
	path_type: u32,
}

/// A completed search held by the cache.
#[derive(Clone, Debug)]
pub struct CacheItem {
	/// The reconstructed path.
	pub path: FoundPath,
	/// The result the search produced.
	pub result: SearchResult,
	expires: u32,
}

pub(crate) struct ResultCache {
	items: FxHashMap<CacheKey, CacheItem>,
	expiry: VecDeque<(u32, CacheKey)>,
	lifetime: u32,
	tick: u32,
	hits: u64,
	misses: u64,
}

impl ResultCache {
	pub fn new(lifetime: u32) -> ResultCache {
		ResultCache {
			items: FxHashMap::default(),
			expiry: VecDeque::new(),
			lifetime,
			tick: 0,
			hits: 0,
			misses: 0,
		}
	}

	/// Advances the cache clock by one tick and drops expired entries.
	pub fn update(&mut self) {
		self.tick += 1;

		while let Some(&(expires, key)) = self.expiry.front() {
			if expires > self.tick {
				break;
			}
			self.expiry.pop_front();

			// the entry may have been refreshed since this expiry record
			// was queued; only drop it if it really is due
			if self
				.items
				.get(&key)
				.map_or(false, |item| item.expires <= self.tick)
			{
				self.items.remove(&key);
			}
		}
	}

	pub fn get(
		&mut self,
		start: BlockPos,
		goal: BlockPos,
		goal_radius: f32,
		path_type: u32,
	) -> Option<&CacheItem> {
		let key = CacheKey {
			start,
			goal,
			radius_bits: goal_radius.to_bits(),
			path_type,
		};

		if self.items.contains_key(&key) {
			self.hits += 1;
			self.items.get(&key)
		} else {
			self.misses += 1;
			None
		}
	}

	pub fn add(
		&mut self,
		path: FoundPath,
		result: SearchResult,
		start: BlockPos,
		goal: BlockPos,
		goal_radius: f32,
		path_type: u32,
	) {
		let key = CacheKey {
			start,
			goal,
			radius_bits: goal_radius.to_bits(),
			path_type,
		};
		let expires = self.tick + self.lifetime;

		self.items.insert(
			key,
			CacheItem {
				path,
				result,
				expires,
			},
		);
		self.expiry.push_back((expires, key));
	}

	#[allow(dead_code)]
	pub fn len(&self) -> usize {
		self.items.len()
	}
}

impl Drop for ResultCache {
	fn drop(&mut self) {
		if self.hits + self.misses > 0 {
			debug!(
				"[path_estimator] result cache: {} hits, {} misses",
				self.hits, self.misses
			);
		}
	}
}
