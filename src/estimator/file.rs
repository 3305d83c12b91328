//! Persistence of the precomputed tables.
//!
//! The cache file is a minimal single-member container: a magic word, the
//! member's CRC-32, its decompressed length, and one DEFLATE-compressed
//! member holding the dataset hash, the offset table and the vertex-cost
//! table, all little-endian. A mismatch anywhere reads as a cache miss, not
//! an error: the estimator silently recomputes.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use log::{debug, info, warn};

use crate::constants::PATH_DIRECTION_VERTICES;
use crate::finder::FinePathFinder;
use crate::terrain::Terrain;
use crate::Square;

use super::PathEstimator;

const CACHE_MAGIC: u32 = u32::from_le_bytes(*b"pec1");

struct Tables {
	checksum: u32,
	offsets: Vec<Square>,
	vertex_costs: Vec<f32>,
}

impl<T: Terrain, P: FinePathFinder<T>> PathEstimator<T, P> {
	fn cache_file(&self, cache_name: &str, map_name: &str) -> Option<PathBuf> {
		let cache_dir = self.config.cache_dir.as_ref()?;
		Some(cache_dir.join("paths").join(format!(
			"{}{}.{}.cache",
			map_name, self.dataset_hash, cache_name
		)))
	}

	/// Tries to load both tables from the cache file. Returns `false` on
	/// any miss: missing directory or file, bad magic, bad member checksum,
	/// short member, or a dataset hash that no longer matches.
	pub(crate) fn read_file(&mut self, cache_name: &str, map_name: &str) -> bool {
		let Some(path) = self.cache_file(cache_name, map_name) else {
			return false;
		};
		if !path.exists() {
			return false;
		}

		match read_tables(
			&path,
			self.dataset_hash,
			self.classes.len(),
			self.block_states.len(),
		) {
			Ok(tables) => {
				self.block_states.offsets = tables.offsets;
				self.vertex_costs = tables.vertex_costs;
				self.path_checksum = tables.checksum;
				info!(
					"[path_estimator] loaded block-size {} tables from {} (checksum {})",
					self.block_size,
					path.display(),
					self.path_checksum
				);
				true
			}
			Err(err) => {
				debug!(
					"[path_estimator] cache miss at {}: {:#}",
					path.display(),
					err
				);
				false
			}
		}
	}

	/// Writes both tables to the cache file, then reads the member back to
	/// record its CRC-32 as the estimator's path checksum. Failures are
	/// logged and swallowed: the estimator works without persistence.
	pub(crate) fn write_file(&mut self, cache_name: &str, map_name: &str) {
		let Some(path) = self.cache_file(cache_name, map_name) else {
			return;
		};
		if let Some(parent) = path.parent() {
			if fs::create_dir_all(parent).is_err() {
				return;
			}
		}

		let written = write_tables(
			&path,
			self.dataset_hash,
			&self.block_states.offsets,
			&self.vertex_costs,
		)
		.and_then(|()| {
			read_tables(
				&path,
				self.dataset_hash,
				self.classes.len(),
				self.block_states.len(),
			)
		});

		match written {
			Ok(tables) => {
				self.path_checksum = tables.checksum;
				info!(
					"[path_estimator] wrote block-size {} tables to {} (checksum {})",
					self.block_size,
					path.display(),
					self.path_checksum
				);
			}
			Err(err) => {
				warn!(
					"[path_estimator] failed to write {}: {:#}",
					path.display(),
					err
				);
			}
		}
	}
}

fn read_tables(
	path: &Path,
	expected_hash: u32,
	num_classes: usize,
	num_blocks: usize,
) -> Result<Tables> {
	let mut file = BufReader::new(File::open(path).context("open cache file")?);

	let magic = file.read_u32::<LittleEndian>().context("read magic")?;
	if magic != CACHE_MAGIC {
		bail!("bad magic {:#010x}", magic);
	}
	let stored_checksum = file.read_u32::<LittleEndian>().context("read checksum")?;
	let member_len = file.read_u64::<LittleEndian>().context("read length")? as usize;

	let mut member = Vec::with_capacity(member_len);
	DeflateDecoder::new(file)
		.read_to_end(&mut member)
		.context("inflate member")?;
	if member.len() != member_len {
		bail!("short member: {} of {} bytes", member.len(), member_len);
	}
	let checksum = crc32fast::hash(&member);
	if checksum != stored_checksum {
		bail!("member checksum mismatch");
	}

	let mut member = &member[..];
	let hash = member.read_u32::<LittleEndian>()?;
	if hash != expected_hash {
		bail!("dataset hash {} does not match {}", hash, expected_hash);
	}

	let mut offsets = Vec::with_capacity(num_blocks * num_classes);
	for _ in 0..num_blocks * num_classes {
		let x = member.read_i32::<LittleEndian>()?;
		let z = member.read_i32::<LittleEndian>()?;
		offsets.push((x as u32, z as u32));
	}

	let vertex_count = num_classes * num_blocks * PATH_DIRECTION_VERTICES;
	let mut vertex_costs = Vec::with_capacity(vertex_count);
	for _ in 0..vertex_count {
		vertex_costs.push(member.read_f32::<LittleEndian>()?);
	}

	Ok(Tables {
		checksum,
		offsets,
		vertex_costs,
	})
}

fn write_tables(path: &Path, hash: u32, offsets: &[Square], vertex_costs: &[f32]) -> Result<()> {
	let mut member = Vec::new();
	member.write_u32::<LittleEndian>(hash)?;
	for &(x, z) in offsets {
		member.write_i32::<LittleEndian>(x as i32)?;
		member.write_i32::<LittleEndian>(z as i32)?;
	}
	for &cost in vertex_costs {
		member.write_f32::<LittleEndian>(cost)?;
	}
	let checksum = crc32fast::hash(&member);

	let mut file = BufWriter::new(File::create(path).context("create cache file")?);
	file.write_u32::<LittleEndian>(CACHE_MAGIC)?;
	file.write_u32::<LittleEndian>(checksum)?;
	file.write_u64::<LittleEndian>(member.len() as u64)?;

	let mut encoder = DeflateEncoder::new(file, Compression::best());
	encoder.write_all(&member)?;
	encoder
		.finish()
		.context("finish deflate stream")?
		.flush()
		.context("flush cache file")?;

	Ok(())
}
