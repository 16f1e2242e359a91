//! A [FlowField] stores one movement direction per tile of a chunk,
//! derived from an [IntegrationField] so that every tile points at its
//! cheapest neighbour. Reading the direction under an actor each tick is all
//! the steering a crowd needs, which is what makes the technique scale to
//! thousands of actors sharing one field.
//!
//! Diagonal directions are only handed out when both cardinal tiles sharing
//! the corner are reachable, i.e
//!
//! ```text
//!   X ~ <- never point diagonally at ~ from o
//!   o X
//! ```
//!
//! so a flow vector can never squeeze an actor between two blocked tiles
//! from a passable region into an impassable one
//!

use crate::prelude::*;

/// Per-tile movement directions of one chunk towards one target
#[derive(Clone)]
pub struct FlowField {
	/// The chunk this field was built for
	chunk: ChunkCoord,
	/// The target of the most recent update
	target: Option<FieldTarget>,
	field: [[FlowDir; FIELD_RES_C]; FIELD_RES_R],
}

impl Field<FlowDir> for FlowField {
	/// Get a reference to the field array
	fn get(&self) -> &[[FlowDir; FIELD_RES_C]; FIELD_RES_R] {
		&self.field
	}
	/// Retrieve a field cell value
	fn get_field_cell_value(&self, cell: Coord) -> FlowDir {
		self.field[cell.get_row()][cell.get_column()]
	}
	/// Set a field cell to a value
	fn set_field_cell_value(&mut self, value: FlowDir, cell: Coord) {
		self.field[cell.get_row()][cell.get_column()] = value;
	}
}

impl FlowField {
	/// Create a field for a chunk with every tile at [FlowDir::None].
	/// Fields must be recreated or re-initialised between unrelated targets,
	/// updates only overwrite the tiles their wavefront reaches
	pub fn new(chunk: ChunkCoord) -> Self {
		FlowField {
			chunk,
			target: None,
			field: [[FlowDir::None; FIELD_RES_C]; FIELD_RES_R],
		}
	}
	/// Get the chunk this field was built for
	pub fn get_chunk(&self) -> ChunkCoord {
		self.chunk
	}
	/// Get the target of the most recent update
	pub fn get_target(&self) -> Option<FieldTarget> {
		self.target
	}

	/// Build the field towards `target`: resolve the seed tiles, integrate,
	/// derive directions and re-point portal seeds across the chunk border
	pub fn update(
		&mut self,
		world: &NavigationWorld,
		layer: NavLayer,
		faction_id: Option<u8>,
		target: FieldTarget,
	) {
		let chunk = world.get_nav().get_chunk(layer, self.chunk);
		let enemies = faction_id.map(|id| world.get_factions().enemy_factions(id));
		let seeds = target.initial_frontier(chunk, world, false, faction_id);

		let mut integration = IntegrationField::new(&seeds);
		integration.calculate(&seeds, chunk, enemies);

		self.target = Some(target);
		self.build_from_integration(&integration);
		self.fixup(&target, &integration, chunk);
	}

	/// Fallback for an actor stuck on an impassable tile: seed the walkable
	/// perimeter of the blocked island around `start` and flow the blocked
	/// tiles outwards onto it. In a chunk with no walkable perimeter at all
	/// nothing is reachable and the field is left untouched
	pub fn update_to_nearest_pathable(&mut self, chunk: &NavChunk, start: Coord) {
		let seeds = chunk.passable_frontier(start);
		let mut integration = IntegrationField::new(&seeds);
		integration.calculate_nonpass(&seeds, chunk);

		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				let cell = Coord::new(r as u8, c as u8);
				let value = integration.get_field_cell_value(cell);
				if value == f32::INFINITY || value == 0.0 {
					continue;
				}
				self.set_field_cell_value(flow_dir(&integration, cell), cell);
			}
		}
	}

	/// Fallback for a target whose natural seeds sit outside the caller's
	/// chunk-local island: re-seed onto the closest tiles of that island and
	/// rebuild. A target that is completely walled off re-resolves with
	/// blockers ignored
	pub fn update_island_to_nearest(
		&mut self,
		world: &NavigationWorld,
		layer: NavLayer,
		local_island_id: u16,
		faction_id: Option<u8>,
	) {
		let chunk = world.get_nav().get_chunk(layer, self.chunk);
		let enemies = faction_id.map(|id| world.get_factions().enemy_factions(id));
		let target = self
			.target
			.expect("island fallback requires a previous update to have set the target");

		let mut seeds = target.initial_frontier(chunk, world, false, faction_id);
		if seeds.is_empty() {
			seeds = target.initial_frontier(chunk, world, true, faction_id);
		}

		// re-seed each natural seed onto the nearest tiles of the caller's
		// island, keeping only the batches at the overall minimum distance
		let mut min_mh_dist = i32::MAX;
		let mut reseeded: Vec<Coord> = Vec::new();
		for seed in seeds {
			if chunk.get_local_island(seed) == local_island_id {
				if min_mh_dist > 0 {
					reseeded.clear();
				}
				min_mh_dist = 0;
				reseeded.push(seed);
				continue;
			}
			let global_iid = chunk.get_island(seed);
			let closest = chunk.closest_tiles_local(seed, local_island_id, global_iid);
			let Some(first) = closest.first() else {
				continue;
			};
			let mh_dist = manhattan_dist(*first, seed);
			if mh_dist < min_mh_dist {
				min_mh_dist = mh_dist;
				reseeded.clear();
			}
			if mh_dist > min_mh_dist {
				continue;
			}
			reseeded.extend(closest);
		}

		let mut integration = IntegrationField::new(&reseeded);
		integration.calculate(&reseeded, chunk, enemies);
		self.build_from_integration(&integration);
		self.fixup(&target, &integration, chunk);
	}

	/// Write a direction for every tile the wavefront reached. Unreachable
	/// tiles are left alone, they may belong to other islands of the chunk
	/// that an earlier pass already populated
	fn build_from_integration(&mut self, integration: &IntegrationField) {
		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				let cell = Coord::new(r as u8, c as u8);
				let value = integration.get_field_cell_value(cell);
				if value == f32::INFINITY {
					continue;
				}
				if value == 0.0 {
					self.set_field_cell_value(FlowDir::None, cell);
					continue;
				}
				self.set_field_cell_value(flow_dir(integration, cell), cell);
			}
		}
	}

	/// Re-point every seed tile of a portal target across the chunk border
	/// so an actor reaching the portal keeps moving into the next chunk
	/// instead of stopping on the boundary
	fn fixup(&mut self, target: &FieldTarget, integration: &IntegrationField, chunk: &NavChunk) {
		match target {
			FieldTarget::Portal(portal) => {
				self.fixup_portal_edges(integration, portal);
			}
			FieldTarget::PortalMask(mask) => {
				for (i, portal) in chunk.get_portals().iter().enumerate() {
					if mask & (1 << i) == 0 {
						continue;
					}
					self.fixup_portal_edges(integration, portal);
				}
			}
			_ => {}
		}
	}

	fn fixup_portal_edges(&mut self, integration: &IntegrationField, portal: &Portal) {
		let own = portal.get_chunk();
		let far = portal.get_connected_chunk();
		let up = far.get_row() < own.get_row();
		let down = far.get_row() > own.get_row();
		let left = far.get_column() < own.get_column();
		let right = far.get_column() > own.get_column();
		assert!(
			u8::from(up) + u8::from(down) + u8::from(left) + u8::from(right) == 1,
			"portal chunks {:?} and {:?} are not orthogonally adjacent",
			own,
			far
		);
		let dir = if up {
			FlowDir::North
		} else if down {
			FlowDir::South
		} else if left {
			FlowDir::West
		} else {
			FlowDir::East
		};
		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				let cell = Coord::new(r as u8, c as u8);
				if integration.get_field_cell_value(cell) == 0.0 {
					self.set_field_cell_value(dir, cell);
				}
			}
		}
	}
}

/// Pick the 8-neighbour with the smallest integration value. Cardinal
/// directions win ties over diagonals, and a diagonal is only eligible when
/// both cardinal tiles sharing its corner are reachable
pub(crate) fn flow_dir(integration: &IntegrationField, cell: Coord) -> FlowDir {
	let field = integration.get();
	let (r, c) = cell.get_row_column();
	let mut min_cost = f32::INFINITY;

	if r > 0 {
		min_cost = min_cost.min(field[r - 1][c]);
	}
	if r < FIELD_RES_R - 1 {
		min_cost = min_cost.min(field[r + 1][c]);
	}
	if c > 0 {
		min_cost = min_cost.min(field[r][c - 1]);
	}
	if c < FIELD_RES_C - 1 {
		min_cost = min_cost.min(field[r][c + 1]);
	}

	if r > 0 && c > 0 && field[r - 1][c] < f32::INFINITY && field[r][c - 1] < f32::INFINITY {
		min_cost = min_cost.min(field[r - 1][c - 1]);
	}
	if r > 0
		&& c < FIELD_RES_C - 1
		&& field[r - 1][c] < f32::INFINITY
		&& field[r][c + 1] < f32::INFINITY
	{
		min_cost = min_cost.min(field[r - 1][c + 1]);
	}
	if r < FIELD_RES_R - 1 && c > 0 && field[r + 1][c] < f32::INFINITY && field[r][c - 1] < f32::INFINITY
	{
		min_cost = min_cost.min(field[r + 1][c - 1]);
	}
	if r < FIELD_RES_R - 1
		&& c < FIELD_RES_C - 1
		&& field[r + 1][c] < f32::INFINITY
		&& field[r][c + 1] < f32::INFINITY
	{
		min_cost = min_cost.min(field[r + 1][c + 1]);
	}

	assert!(min_cost < f32::INFINITY);

	if r > 0 && field[r - 1][c] == min_cost {
		FlowDir::North
	} else if r < FIELD_RES_R - 1 && field[r + 1][c] == min_cost {
		FlowDir::South
	} else if c < FIELD_RES_C - 1 && field[r][c + 1] == min_cost {
		FlowDir::East
	} else if c > 0 && field[r][c - 1] == min_cost {
		FlowDir::West
	} else if r > 0 && c > 0 && field[r - 1][c - 1] == min_cost {
		FlowDir::NorthWest
	} else if r > 0 && c < FIELD_RES_C - 1 && field[r - 1][c + 1] == min_cost {
		FlowDir::NorthEast
	} else if r < FIELD_RES_R - 1 && c > 0 && field[r + 1][c - 1] == min_cost {
		FlowDir::SouthWest
	} else if r < FIELD_RES_R - 1 && c < FIELD_RES_C - 1 && field[r + 1][c + 1] == min_cost {
		FlowDir::SouthEast
	} else {
		unreachable!("minimum integration neighbour vanished between scans")
	}
}
