//! Coordinate and direction primitives shared by all of the field types
//!

use bevy::prelude::*;

/// Number of tile rows in a chunk field array
pub const FIELD_RES_R: usize = 64;
/// Number of tile columns in a chunk field array
pub const FIELD_RES_C: usize = 64;

/// Component of a diagonal unit vector
const DIAG: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// ID of a tile within a chunk field, `(row, column)` with both in
/// `0..FIELD_RES_R`/`0..FIELD_RES_C`
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct Coord((u8, u8));

impl Coord {
	/// Create a new instance of [Coord]
	pub fn new(row: u8, column: u8) -> Self {
		Coord((row, column))
	}
	/// Get the `(row, column)` tuple
	pub fn get_row_column(&self) -> (usize, usize) {
		(self.0 .0 as usize, self.0 .1 as usize)
	}
	/// Get the tile row
	pub fn get_row(&self) -> usize {
		self.0 .0 as usize
	}
	/// Get the tile column
	pub fn get_column(&self) -> usize {
		self.0 .1 as usize
	}
	/// Based on a tile's position find its orthogonal neighbours within the
	/// field bounds (up to 4), ordered north, west, east, south
	pub fn orthogonal_neighbours(&self) -> Vec<Coord> {
		let (r, c) = self.get_row_column();
		let mut neighbours = Vec::with_capacity(4);
		if r > 0 {
			neighbours.push(Coord::new(r as u8 - 1, c as u8));
		}
		if c > 0 {
			neighbours.push(Coord::new(r as u8, c as u8 - 1));
		}
		if c < FIELD_RES_C - 1 {
			neighbours.push(Coord::new(r as u8, c as u8 + 1));
		}
		if r < FIELD_RES_R - 1 {
			neighbours.push(Coord::new(r as u8 + 1, c as u8));
		}
		neighbours
	}
}

/// ID of a chunk within the map, `(row, column)`
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct ChunkCoord((u8, u8));

impl ChunkCoord {
	/// Create a new instance of [ChunkCoord]
	pub fn new(row: u8, column: u8) -> Self {
		ChunkCoord((row, column))
	}
	/// Get the `(row, column)` tuple
	pub fn get_row_column(&self) -> (usize, usize) {
		(self.0 .0 as usize, self.0 .1 as usize)
	}
	/// Get the chunk row
	pub fn get_row(&self) -> usize {
		self.0 .0 as usize
	}
	/// Get the chunk column
	pub fn get_column(&self) -> usize {
		self.0 .1 as usize
	}
}

/// The 8 directions of movement a tile of a
/// [crate::prelude::FlowField] can point in, plus [FlowDir::None] for seeds
/// and unreachable tiles. Encoded as indices `0..=8`
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Reflect)]
#[repr(u8)]
pub enum FlowDir {
	#[default]
	None = 0,
	North = 1,
	NorthEast = 2,
	East = 3,
	SouthEast = 4,
	South = 5,
	SouthWest = 6,
	West = 7,
	NorthWest = 8,
}

impl FlowDir {
	/// Get the direction encoded as an index `0..=8`
	pub fn get_index(&self) -> u8 {
		*self as u8
	}
	/// Unit vector of movement across the world XZ plane. World X decreases
	/// as the column index grows, so easterly directions carry a negative X
	/// component. North is towards negative Z
	pub fn get_vector(&self) -> Vec2 {
		match self {
			FlowDir::None => Vec2::new(0.0, 0.0),
			FlowDir::North => Vec2::new(0.0, -1.0),
			FlowDir::NorthEast => Vec2::new(-DIAG, -DIAG),
			FlowDir::East => Vec2::new(-1.0, 0.0),
			FlowDir::SouthEast => Vec2::new(-DIAG, DIAG),
			FlowDir::South => Vec2::new(0.0, 1.0),
			FlowDir::SouthWest => Vec2::new(DIAG, DIAG),
			FlowDir::West => Vec2::new(1.0, 0.0),
			FlowDir::NorthWest => Vec2::new(DIAG, -DIAG),
		}
	}
}

/// Manhattan distance between two tiles of the same chunk
pub fn manhattan_dist(a: Coord, b: Coord) -> i32 {
	let dr = (a.get_row() as i32 - b.get_row() as i32).abs();
	let dc = (a.get_column() as i32 - b.get_column() as i32).abs();
	dr + dc
}
