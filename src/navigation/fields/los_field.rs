//! A [LosField] marks which tiles of a chunk can see the destination of a
//! path. A wavefront grows out of the target tile and stops against blocked
//! tiles; wherever it laps the end of a wall, a shadow line is cast from the
//! wall end away from the target and every tile on the line is flagged
//! `wavefront_blocked`:
//!
//! ```text
//!  . . . . . . . .
//!  # . . . . . . .      # wavefront blocked
//!  . # . . . . . .      X wall
//!  . . # X . . . .      T target
//!  . . . X . . . .
//!  . . . X . . T .
//!  . . . . . . . .
//! ```
//!
//! Actors on a visible tile can steer straight at the destination and skip
//! flow-field following entirely. For the chunks an actor crosses before the
//! destination chunk, visibility is stitched across the border by copying
//! the shared edge of the previously computed neighbour field and growing
//! the wavefront from the copied visible tiles
//!

use bevy::prelude::*;

use crate::prelude::*;

/// Visibility flags of a single tile
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct LosCell {
	visible: bool,
	wavefront_blocked: bool,
}

impl LosCell {
	/// Whether the destination can be seen from this tile
	pub fn is_visible(&self) -> bool {
		self.visible
	}
	/// Whether this tile lies in the shadow cast off a wall end
	pub fn is_wavefront_blocked(&self) -> bool {
		self.wavefront_blocked
	}
}

/// Per-tile visibility of one chunk towards one destination
#[derive(Clone)]
pub struct LosField {
	/// The chunk this field was built for
	chunk: ChunkCoord,
	field: [[LosCell; FIELD_RES_C]; FIELD_RES_R],
}

impl Field<LosCell> for LosField {
	/// Get a reference to the field array
	fn get(&self) -> &[[LosCell; FIELD_RES_C]; FIELD_RES_R] {
		&self.field
	}
	/// Retrieve a field cell value
	fn get_field_cell_value(&self, cell: Coord) -> LosCell {
		self.field[cell.get_row()][cell.get_column()]
	}
	/// Set a field cell to a value
	fn set_field_cell_value(&mut self, value: LosCell, cell: Coord) {
		self.field[cell.get_row()][cell.get_column()] = value;
	}
}

impl LosField {
	/// Create a field for a chunk with every flag cleared
	pub fn new(chunk: ChunkCoord) -> Self {
		LosField {
			chunk,
			field: [[LosCell::default(); FIELD_RES_C]; FIELD_RES_R],
		}
	}
	/// Get the chunk this field was built for
	pub fn get_chunk(&self) -> ChunkCoord {
		self.chunk
	}

	/// Compute visibility of `target` within this chunk. For the
	/// destination chunk itself `prev_los` is [None] and the wavefront is
	/// seeded at the target tile. For every later chunk on the path the
	/// shared edge of the predecessor's field is copied across: its visible
	/// tiles become seeds and its shadowed tiles re-cast their shadow lines,
	/// keeping the visibility seamless over chunk borders
	pub fn calculate(
		&mut self,
		dest: DestId,
		target: TileDesc,
		world: &NavigationWorld,
		prev_los: Option<&LosField>,
	) {
		let chunk = world.get_nav().get_chunk(dest.get_layer(), self.chunk);
		let map = world.get_map();
		let enemies = dest
			.get_faction_id()
			.map(|id| world.get_factions().enemy_factions(id));
		self.field = [[LosCell::default(); FIELD_RES_C]; FIELD_RES_R];

		let mut frontier = PriorityQueue::new();
		let mut integration = IntegrationField::default();

		if self.chunk == target.get_chunk() {
			assert!(prev_los.is_none());
			let seed = target.get_tile();
			frontier.push(0.0, seed);
			integration.set_field_cell_value(0.0, seed);
		} else {
			let prev = prev_los.expect("non-destination chunks require the predecessor's field");
			self.inherit_shared_edge(prev, target, map, &mut frontier, &mut integration);
		}

		while let Some(curr) = frontier.pop() {
			for (neighbour, step_cost) in self.los_neighbours(chunk, curr, enemies) {
				if step_cost == COST_IMPASSABLE {
					if !chunk.is_los_corner(neighbour) {
						continue;
					}
					let corner = TileDesc::new(self.chunk, neighbour);
					self.create_wavefront_blocked_line(target, corner, map);
				} else {
					let new_cost = integration.get_field_cell_value(curr) + 1.0;
					let (nr, nc) = neighbour.get_row_column();
					self.field[nr][nc].visible = true;
					if new_cost < integration.get_field_cell_value(neighbour) {
						integration.set_field_cell_value(new_cost, neighbour);
						if !frontier.contains(|a, b| a == b, neighbour) {
							frontier.push(new_cost, neighbour);
						}
					}
				}
			}
		}

		self.pad_wavefront();
	}

	/// Copy the flags along the edge shared with the predecessor chunk,
	/// re-casting shadow lines from copied shadow tiles and seeding the
	/// wavefront at copied visible tiles
	fn inherit_shared_edge(
		&mut self,
		prev: &LosField,
		target: TileDesc,
		map: &MapGeometry,
		frontier: &mut PriorityQueue<Coord>,
		integration: &mut IntegrationField,
	) {
		let prev_chunk = prev.get_chunk();
		let (horizontal, own_edge, prev_edge) = if prev_chunk.get_row() < self.chunk.get_row() {
			(false, 0, FIELD_RES_R - 1)
		} else if prev_chunk.get_row() > self.chunk.get_row() {
			(false, FIELD_RES_R - 1, 0)
		} else if prev_chunk.get_column() < self.chunk.get_column() {
			(true, 0, FIELD_RES_C - 1)
		} else if prev_chunk.get_column() > self.chunk.get_column() {
			(true, FIELD_RES_C - 1, 0)
		} else {
			panic!(
				"chunk {:?} is not adjacent to predecessor {:?}",
				self.chunk, prev_chunk
			);
		};

		let edge_len = if horizontal { FIELD_RES_R } else { FIELD_RES_C };
		for i in 0..edge_len {
			let (own, far) = if horizontal {
				(
					Coord::new(i as u8, own_edge as u8),
					Coord::new(i as u8, prev_edge as u8),
				)
			} else {
				(
					Coord::new(own_edge as u8, i as u8),
					Coord::new(prev_edge as u8, i as u8),
				)
			};
			let copied = prev.get_field_cell_value(far);
			self.set_field_cell_value(copied, own);
			if copied.wavefront_blocked {
				let corner = TileDesc::new(self.chunk, own);
				self.create_wavefront_blocked_line(target, corner, map);
			}
			if copied.visible {
				frontier.push(0.0, own);
				integration.set_field_cell_value(0.0, own);
			}
		}
	}

	/// Orthogonal neighbours of a tile with their step costs, skipping
	/// tiles already shadowed. Blocked tiles carry the impassable sentinel
	/// cost so the expansion turns them into shadow casters
	fn los_neighbours(
		&self,
		chunk: &NavChunk,
		coord: Coord,
		enemies: Option<u16>,
	) -> Vec<(Coord, u8)> {
		let mut neighbours = Vec::with_capacity(4);
		let (r, c) = (coord.get_row() as i32, coord.get_column() as i32);
		for (dr, dc) in [(-1, 0), (0, -1), (0, 1), (1, 0)] {
			let (nr, nc) = (r + dr, c + dc);
			if nr < 0 || nr >= FIELD_RES_R as i32 {
				continue;
			}
			if nc < 0 || nc >= FIELD_RES_C as i32 {
				continue;
			}
			if self.field[nr as usize][nc as usize].wavefront_blocked {
				continue;
			}
			let neighbour = Coord::new(nr as u8, nc as u8);
			let mut cost = chunk.get_cost(neighbour);
			if !chunk.tile_passable_for(neighbour, enemies) {
				cost = COST_IMPASSABLE;
			}
			neighbours.push((neighbour, cost));
		}
		neighbours
	}

	/// Walk a Bresenham line from a wall-end corner away from the target,
	/// flagging every visited tile until the cursor leaves the chunk. The
	/// slope runs corner-to-target in world space; because world X is
	/// inverted against columns and rows grow with +Z, stepping with the
	/// raw X sign and the negated Z sign moves the cursor away from the
	/// target
	fn create_wavefront_blocked_line(
		&mut self,
		target: TileDesc,
		corner: TileDesc,
		map: &MapGeometry,
	) {
		let target_centre = map.tile_bounds(target).center();
		let corner_centre = map.tile_bounds(corner).center();
		let slope = (target_centre - corner_centre).normalize_or_zero();
		if slope == Vec2::ZERO {
			return;
		}

		// quantized to integer deltas keeping 3 digits of precision
		let dx = (slope.x.abs() * 1000.0) as i32;
		let dy = -((slope.y.abs() * 1000.0) as i32);
		let sx: i32 = if slope.x > 0.0 { 1 } else { -1 };
		let sy: i32 = if slope.y < 0.0 { 1 } else { -1 };
		let mut err = dx + dy;

		let mut r = corner.get_tile().get_row() as i32;
		let mut c = corner.get_tile().get_column() as i32;
		loop {
			self.field[r as usize][c as usize].wavefront_blocked = true;
			let e2 = 2 * err;
			if e2 >= dy {
				err += dy;
				c += sx;
			}
			if e2 <= dx {
				err += dx;
				r += sy;
			}
			if r < 0 || r >= FIELD_RES_R as i32 || c < 0 || c >= FIELD_RES_C as i32 {
				break;
			}
		}
	}

	/// Clear visibility in the 3x3 neighbourhood of every shadowed tile.
	/// The padding keeps a tile marked visible only when a ray from
	/// anywhere within it can reach the destination without crossing
	/// blocked terrain, which the movement code depends on
	fn pad_wavefront(&mut self) {
		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				if !self.field[r][c].wavefront_blocked {
					continue;
				}
				for rr in r.saturating_sub(1)..=(r + 1).min(FIELD_RES_R - 1) {
					for cc in c.saturating_sub(1)..=(c + 1).min(FIELD_RES_C - 1) {
						self.field[rr][cc].visible = false;
					}
				}
			}
		}
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	use bevy::prelude::*;

	fn world() -> NavigationWorld {
		NavigationWorld::new(MapGeometry::new(Vec3::ZERO, 2, 2))
	}
	fn dest(target: TileDesc) -> DestId {
		DestId::new(NavLayer::Ground, None, target)
	}
	#[test]
	fn open_chunk_is_fully_visible() {
		let world = world();
		let target = TileDesc::new(ChunkCoord::new(0, 0), Coord::new(7, 7));
		let mut los = LosField::new(ChunkCoord::new(0, 0));
		los.calculate(dest(target), target, &world, None);
		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				let cell = los.get_field_cell_value(Coord::new(r as u8, c as u8));
				if Coord::new(r as u8, c as u8) == target.get_tile() {
					continue;
				}
				assert!(cell.is_visible(), "tile ({}, {}) not visible", r, c);
				assert!(!cell.is_wavefront_blocked());
			}
		}
	}
	#[test]
	fn wall_end_casts_a_diagonal_shadow() {
		let mut world = world();
		{
			let chunk = world
				.get_nav_mut()
				.get_chunk_mut(NavLayer::Ground, ChunkCoord::new(0, 0));
			// two-tile wall whose northern end at (4,4) is a corner
			chunk.set_cost(Coord::new(4, 4), COST_IMPASSABLE);
			chunk.set_cost(Coord::new(5, 4), COST_IMPASSABLE);
		}
		let target = TileDesc::new(ChunkCoord::new(0, 0), Coord::new(7, 7));
		let mut los = LosField::new(ChunkCoord::new(0, 0));
		los.calculate(dest(target), target, &world, None);
		// the shadow runs diagonally from the corner away from the target
		for coord in [
			Coord::new(4, 4),
			Coord::new(3, 3),
			Coord::new(2, 2),
			Coord::new(1, 1),
			Coord::new(0, 0),
		] {
			assert!(
				los.get_field_cell_value(coord).is_wavefront_blocked(),
				"{:?} not in shadow",
				coord
			);
		}
		// padding forces the whole 3x3 neighbourhood of the shadow invisible
		for coord in [
			Coord::new(2, 2),
			Coord::new(1, 2),
			Coord::new(2, 1),
			Coord::new(3, 2),
			Coord::new(2, 3),
		] {
			assert!(!los.get_field_cell_value(coord).is_visible());
		}
		// tiles far from the wall and its shadow stay visible
		assert!(los.get_field_cell_value(Coord::new(7, 0)).is_visible());
		assert!(los.get_field_cell_value(Coord::new(0, 7)).is_visible());
		assert!(los.get_field_cell_value(Coord::new(40, 40)).is_visible());
	}
	#[test]
	fn isolated_blocker_casts_no_shadow() {
		let mut world = world();
		world
			.get_nav_mut()
			.get_chunk_mut(NavLayer::Ground, ChunkCoord::new(0, 0))
			.set_cost(Coord::new(4, 4), COST_IMPASSABLE);
		let target = TileDesc::new(ChunkCoord::new(0, 0), Coord::new(7, 7));
		let mut los = LosField::new(ChunkCoord::new(0, 0));
		los.calculate(dest(target), target, &world, None);
		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				let cell = los.get_field_cell_value(Coord::new(r as u8, c as u8));
				assert!(!cell.is_wavefront_blocked());
			}
		}
		assert!(!los.get_field_cell_value(Coord::new(4, 4)).is_visible());
		assert!(los.get_field_cell_value(Coord::new(0, 0)).is_visible());
	}
	#[test]
	fn padding_never_leaves_a_visible_shadow_neighbour() {
		let mut world = world();
		{
			let chunk = world
				.get_nav_mut()
				.get_chunk_mut(NavLayer::Ground, ChunkCoord::new(0, 0));
			for r in 10..=20u8 {
				chunk.set_cost(Coord::new(r, 30), COST_IMPASSABLE);
			}
		}
		let target = TileDesc::new(ChunkCoord::new(0, 0), Coord::new(15, 45));
		let mut los = LosField::new(ChunkCoord::new(0, 0));
		los.calculate(dest(target), target, &world, None);
		for r in 0..FIELD_RES_R as i32 {
			for c in 0..FIELD_RES_C as i32 {
				if !los
					.get_field_cell_value(Coord::new(r as u8, c as u8))
					.is_wavefront_blocked()
				{
					continue;
				}
				for rr in (r - 1).max(0)..=(r + 1).min(FIELD_RES_R as i32 - 1) {
					for cc in (c - 1).max(0)..=(c + 1).min(FIELD_RES_C as i32 - 1) {
						assert!(
							!los
								.get_field_cell_value(Coord::new(rr as u8, cc as u8))
								.is_visible()
						);
					}
				}
			}
		}
	}
	#[test]
	fn visibility_stitches_across_the_shared_edge() {
		let world = world();
		// destination in the eastern chunk, propagate into the western one
		let target = TileDesc::new(ChunkCoord::new(0, 1), Coord::new(32, 32));
		let mut dest_los = LosField::new(ChunkCoord::new(0, 1));
		dest_los.calculate(dest(target), target, &world, None);
		let mut next_los = LosField::new(ChunkCoord::new(0, 0));
		next_los.calculate(dest(target), target, &world, Some(&dest_los));
		// the whole open neighbour chunk inherits visibility
		assert!(next_los.get_field_cell_value(Coord::new(0, 0)).is_visible());
		assert!(next_los.get_field_cell_value(Coord::new(63, 0)).is_visible());
	}
	#[test]
	fn inherited_shadow_tiles_recast_their_lines() {
		let mut world = world();
		{
			let chunk = world
				.get_nav_mut()
				.get_chunk_mut(NavLayer::Ground, ChunkCoord::new(0, 1));
			// wall against the shared edge of chunks (0,1) and (0,0) so its
			// shadow crosses the border; chunk (0,0) is the eastern
			// neighbour in world space but holds higher column tiles
			chunk.set_cost(Coord::new(30, 1), COST_IMPASSABLE);
			chunk.set_cost(Coord::new(31, 1), COST_IMPASSABLE);
		}
		let target = TileDesc::new(ChunkCoord::new(0, 1), Coord::new(40, 20));
		let mut dest_los = LosField::new(ChunkCoord::new(0, 1));
		dest_los.calculate(dest(target), target, &world, None);
		// the shadow from the wall end reaches column zero of the chunk
		let mut on_edge = false;
		for r in 0..FIELD_RES_R {
			if dest_los
				.get_field_cell_value(Coord::new(r as u8, 0))
				.is_wavefront_blocked()
			{
				on_edge = true;
			}
		}
		assert!(on_edge);
		let mut next_los = LosField::new(ChunkCoord::new(0, 0));
		next_los.calculate(dest(target), target, &world, Some(&dest_los));
		// the recast line continues into the neighbour chunk
		let mut continued = false;
		for r in 0..FIELD_RES_R {
			for c in 1..FIELD_RES_C {
				if next_los
					.get_field_cell_value(Coord::new(r as u8, c as u8))
					.is_wavefront_blocked()
				{
					continued = true;
				}
			}
		}
		assert!(continued);
	}
	#[test]
	#[should_panic]
	fn non_adjacent_predecessor_panics() {
		let world = world();
		let target = TileDesc::new(ChunkCoord::new(0, 0), Coord::new(7, 7));
		let prev = LosField::new(ChunkCoord::new(0, 0));
		let mut los = LosField::new(ChunkCoord::new(0, 0));
		// same chunk coordinate for field and predecessor is not a valid
		// adjacency
		los.calculate(dest(target), target, &world, Some(&prev));
	}
}
