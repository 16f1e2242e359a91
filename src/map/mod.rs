//! World-space geometry of the map the navigation chunks overlay. The map
//! origin sits at the corner of chunk `(0, 0)` and world X *decreases* as
//! tile columns grow while world Z grows with tile rows. Every consumer of
//! tile or chunk bounds relies on that convention, including the
//! line-of-sight shadow walk
//!

use bevy::prelude::*;

use crate::prelude::*;

/// World-space X span of one tile
pub const TILE_X_DIM: f32 = 4.0;
/// World-space Z span of one tile
pub const TILE_Z_DIM: f32 = 4.0;

/// Global tile address: the chunk it lives in and the tile within that chunk
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Reflect)]
pub struct TileDesc {
	chunk: ChunkCoord,
	tile: Coord,
}

impl TileDesc {
	/// Create a new instance of [TileDesc]
	pub fn new(chunk: ChunkCoord, tile: Coord) -> Self {
		TileDesc { chunk, tile }
	}
	/// Get the chunk the tile lives in
	pub fn get_chunk(&self) -> ChunkCoord {
		self.chunk
	}
	/// Get the tile within the chunk
	pub fn get_tile(&self) -> Coord {
		self.tile
	}
}

/// Axis-aligned bounds on the world XZ plane
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct BoxXZ {
	pub x_min: f32,
	pub x_max: f32,
	pub z_min: f32,
	pub z_max: f32,
}

impl BoxXZ {
	/// Centre of the bounds
	pub fn center(&self) -> Vec2 {
		Vec2::new(
			(self.x_min + self.x_max) / 2.0,
			(self.z_min + self.z_max) / 2.0,
		)
	}
	/// Grow the bounds by `amount` on every side
	pub fn inflated(&self, amount: f32) -> BoxXZ {
		BoxXZ {
			x_min: self.x_min - amount,
			x_max: self.x_max + amount,
			z_min: self.z_min - amount,
			z_max: self.z_max + amount,
		}
	}
	/// Whether a point lies within the bounds
	pub fn contains(&self, point: Vec2) -> bool {
		point.x >= self.x_min && point.x <= self.x_max && point.y >= self.z_min && point.y <= self.z_max
	}
}

/// An oriented box footprint on the world XZ plane, used for building
/// placement and entity bounds
#[derive(Clone, Copy, Debug)]
pub struct Obb {
	/// World-space centre, Y carried through untouched
	center: Vec3,
	/// Half-lengths along the local X and Z axes
	half_lengths: Vec2,
	/// Rotation about the world Y axis in radians
	yaw: f32,
}

impl Obb {
	/// Create a new instance of [Obb]
	pub fn new(center: Vec3, half_lengths: Vec2, yaw: f32) -> Self {
		Obb {
			center,
			half_lengths,
			yaw,
		}
	}
	/// Get the world-space centre
	pub fn get_center(&self) -> Vec3 {
		self.center
	}
	/// The four XZ corners of the box
	pub fn corners(&self) -> [Vec2; 4] {
		let (sin, cos) = self.yaw.sin_cos();
		let axis_x = Vec2::new(cos, sin);
		let axis_z = Vec2::new(-sin, cos);
		let centre = Vec2::new(self.center.x, self.center.z);
		let ex = axis_x * self.half_lengths.x;
		let ez = axis_z * self.half_lengths.y;
		[
			centre + ex + ez,
			centre - ex + ez,
			centre - ex - ez,
			centre + ex - ez,
		]
	}
}

/// Whether a point lies inside a circle on the XZ plane
pub fn point_in_circle(point: Vec2, center: Vec2, radius: f32) -> bool {
	point.distance_squared(center) <= radius * radius
}

/// Whether a circle and an axis-aligned box overlap on the XZ plane
pub fn circle_intersects_box(center: Vec2, radius: f32, bounds: &BoxXZ) -> bool {
	let closest = Vec2::new(
		center.x.clamp(bounds.x_min, bounds.x_max),
		center.y.clamp(bounds.z_min, bounds.z_max),
	);
	point_in_circle(closest, center, radius)
}

/// Whether two axis-aligned boxes overlap on the XZ plane
pub fn boxes_intersect(a: &BoxXZ, b: &BoxXZ) -> bool {
	a.x_min <= b.x_max && a.x_max >= b.x_min && a.z_min <= b.z_max && a.z_max >= b.z_min
}

/// Whether an oriented box and an axis-aligned box overlap, by separating
/// axis over the two world axes and the two box axes
pub fn obb_intersects_box(obb: &Obb, bounds: &BoxXZ) -> bool {
	let obb_corners = obb.corners();
	let box_corners = [
		Vec2::new(bounds.x_min, bounds.z_min),
		Vec2::new(bounds.x_max, bounds.z_min),
		Vec2::new(bounds.x_max, bounds.z_max),
		Vec2::new(bounds.x_min, bounds.z_max),
	];
	let (sin, cos) = obb.yaw.sin_cos();
	let axes = [
		Vec2::new(1.0, 0.0),
		Vec2::new(0.0, 1.0),
		Vec2::new(cos, sin),
		Vec2::new(-sin, cos),
	];
	for axis in axes {
		let project = |corners: &[Vec2; 4]| {
			let mut min = f32::INFINITY;
			let mut max = f32::NEG_INFINITY;
			for corner in corners {
				let d = corner.dot(axis);
				min = min.min(d);
				max = max.max(d);
			}
			(min, max)
		};
		let (a_min, a_max) = project(&obb_corners);
		let (b_min, b_max) = project(&box_corners);
		if a_max < b_min || b_max < a_min {
			return false;
		}
	}
	true
}

/// Placement and resolution of the map on the world XZ plane
#[derive(Clone, Copy, Debug)]
pub struct MapGeometry {
	/// World position of the map origin, the corner of chunk `(0, 0)`
	pos: Vec3,
	/// Number of chunk columns
	chunk_width: usize,
	/// Number of chunk rows
	chunk_height: usize,
}

impl MapGeometry {
	/// Create a new instance of [MapGeometry]
	pub fn new(pos: Vec3, chunk_width: usize, chunk_height: usize) -> Self {
		assert!(chunk_width > 0 && chunk_height > 0);
		assert!(chunk_width <= u8::MAX as usize && chunk_height <= u8::MAX as usize);
		MapGeometry {
			pos,
			chunk_width,
			chunk_height,
		}
	}
	/// Get the world position of the map origin
	pub fn get_pos(&self) -> Vec3 {
		self.pos
	}
	/// Get the number of chunk columns
	pub fn get_chunk_width(&self) -> usize {
		self.chunk_width
	}
	/// Get the number of chunk rows
	pub fn get_chunk_height(&self) -> usize {
		self.chunk_height
	}

	/// World bounds of a chunk. The X offset runs negative with the chunk
	/// column
	pub fn chunk_bounds(&self, chunk: ChunkCoord) -> BoxXZ {
		let chunk_x_dim = FIELD_RES_C as f32 * TILE_X_DIM;
		let chunk_z_dim = FIELD_RES_R as f32 * TILE_Z_DIM;
		let x_offset = -(chunk.get_column() as f32 * chunk_x_dim);
		let z_offset = chunk.get_row() as f32 * chunk_z_dim;
		let x_max = self.pos.x + x_offset;
		let z_min = self.pos.z + z_offset;
		BoxXZ {
			x_min: x_max - chunk_x_dim,
			x_max,
			z_min,
			z_max: z_min + chunk_z_dim,
		}
	}

	/// World bounds of a single tile
	pub fn tile_bounds(&self, desc: TileDesc) -> BoxXZ {
		let chunk = self.chunk_bounds(desc.get_chunk());
		let x_max = chunk.x_max - desc.get_tile().get_column() as f32 * TILE_X_DIM;
		let z_min = chunk.z_min + desc.get_tile().get_row() as f32 * TILE_Z_DIM;
		BoxXZ {
			x_min: x_max - TILE_X_DIM,
			x_max,
			z_min,
			z_max: z_min + TILE_Z_DIM,
		}
	}

	/// The tile containing a world XZ point, or [None] when the point lies
	/// off the map
	pub fn tile_desc_for_point(&self, point: Vec2) -> Option<TileDesc> {
		let global_c = ((self.pos.x - point.x) / TILE_X_DIM).floor();
		let global_r = ((point.y - self.pos.z) / TILE_Z_DIM).floor();
		if global_c < 0.0 || global_r < 0.0 {
			return None;
		}
		let (global_c, global_r) = (global_c as usize, global_r as usize);
		if global_c >= self.chunk_width * FIELD_RES_C || global_r >= self.chunk_height * FIELD_RES_R {
			return None;
		}
		Some(self.desc_from_global(global_r, global_c))
	}

	/// Every tile whose bounds overlap a disc
	pub fn tiles_under_circle(&self, center: Vec2, radius: f32) -> Vec<TileDesc> {
		let aabb = BoxXZ {
			x_min: center.x - radius,
			x_max: center.x + radius,
			z_min: center.y - radius,
			z_max: center.y + radius,
		};
		self.tiles_in_aabb(&aabb)
			.into_iter()
			.filter(|desc| circle_intersects_box(center, radius, &self.tile_bounds(*desc)))
			.collect()
	}

	/// Every tile whose bounds overlap an oriented box
	pub fn tiles_under_obb(&self, obb: &Obb) -> Vec<TileDesc> {
		let corners = obb.corners();
		let mut aabb = BoxXZ {
			x_min: f32::INFINITY,
			x_max: f32::NEG_INFINITY,
			z_min: f32::INFINITY,
			z_max: f32::NEG_INFINITY,
		};
		for corner in corners {
			aabb.x_min = aabb.x_min.min(corner.x);
			aabb.x_max = aabb.x_max.max(corner.x);
			aabb.z_min = aabb.z_min.min(corner.y);
			aabb.z_max = aabb.z_max.max(corner.y);
		}
		self.tiles_in_aabb(&aabb)
			.into_iter()
			.filter(|desc| obb_intersects_box(obb, &self.tile_bounds(*desc)))
			.collect()
	}

	/// Row-major tiles overlapping an axis-aligned box, clamped to the map
	fn tiles_in_aabb(&self, aabb: &BoxXZ) -> Vec<TileDesc> {
		let max_c = (self.chunk_width * FIELD_RES_C - 1) as f32;
		let max_r = (self.chunk_height * FIELD_RES_R - 1) as f32;
		let c_lo = ((self.pos.x - aabb.x_max) / TILE_X_DIM).floor().clamp(0.0, max_c) as usize;
		let c_hi = ((self.pos.x - aabb.x_min) / TILE_X_DIM).floor().clamp(0.0, max_c) as usize;
		let r_lo = ((aabb.z_min - self.pos.z) / TILE_Z_DIM).floor().clamp(0.0, max_r) as usize;
		let r_hi = ((aabb.z_max - self.pos.z) / TILE_Z_DIM).floor().clamp(0.0, max_r) as usize;
		let mut out = Vec::new();
		for r in r_lo..=r_hi {
			for c in c_lo..=c_hi {
				out.push(self.desc_from_global(r, c));
			}
		}
		out
	}

	fn desc_from_global(&self, global_r: usize, global_c: usize) -> TileDesc {
		TileDesc::new(
			ChunkCoord::new(
				(global_r / FIELD_RES_R) as u8,
				(global_c / FIELD_RES_C) as u8,
			),
			Coord::new((global_r % FIELD_RES_R) as u8, (global_c % FIELD_RES_C) as u8),
		)
	}
}
