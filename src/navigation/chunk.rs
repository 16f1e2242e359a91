//! Per-chunk static navigation data. A [NavChunk] holds the terrain cost
//! grid, dynamic blocker reference counts, per-faction occupancy masks,
//! island connectivity labels and the outgoing [Portal]s of one chunk on one
//! navigation layer.
//!
//! A tile is passable when its base cost is not the impassable sentinel and
//! no dynamic blocker holds a reference on it. When pathing on behalf of a
//! faction, a tile occupied exclusively by enemy factions counts as passable
//! regardless of blockers so that attack-move orders can path onto enemies.
//!

use std::collections::VecDeque;

use bevy::prelude::*;

use crate::prelude::*;

/// Sentinel cost of a tile that can never be traversed
pub const COST_IMPASSABLE: u8 = 255;
/// Sentinel island label of tiles that belong to no island
pub const ISLAND_NONE: u16 = u16::MAX;
/// Upper bound of distinct factions, the width of an occupancy bitmask
pub const MAX_FACTIONS: usize = 16;
/// Upper bound of outgoing portals per chunk, the width of a portal mask
pub const MAX_PORTALS_PER_CHUNK: usize = 64;

/// A pathable window of tiles along one chunk edge, linked to a mirrored
/// portal in the orthogonally adjacent chunk
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Reflect)]
pub struct Portal {
	/// The chunk this portal belongs to
	chunk: ChunkCoord,
	/// Inclusive first and last tile of the axis-aligned run along the edge
	endpoints: [Coord; 2],
	/// The chunk on the far side of the shared edge
	connected_chunk: ChunkCoord,
}

impl Portal {
	/// Create a new instance of [Portal]
	pub fn new(chunk: ChunkCoord, endpoints: [Coord; 2], connected_chunk: ChunkCoord) -> Self {
		Portal {
			chunk,
			endpoints,
			connected_chunk,
		}
	}
	/// Get the chunk this portal belongs to
	pub fn get_chunk(&self) -> ChunkCoord {
		self.chunk
	}
	/// Get the inclusive endpoints of the portal run
	pub fn get_endpoints(&self) -> [Coord; 2] {
		self.endpoints
	}
	/// Get the chunk on the far side of the shared edge
	pub fn get_connected_chunk(&self) -> ChunkCoord {
		self.connected_chunk
	}
}

/// Static navigation data of one chunk on one layer
pub struct NavChunk {
	/// Terrain traversal cost per tile, `1..=254`, or [COST_IMPASSABLE]
	cost_base: [[u8; FIELD_RES_C]; FIELD_RES_R],
	/// Reference count of dynamic obstructions per tile
	blockers: [[u16; FIELD_RES_C]; FIELD_RES_R],
	/// Bitmask of factions occupying each tile
	factions: [[u16; FIELD_RES_C]; FIELD_RES_R],
	/// Map-wide connectivity label per tile
	islands: [[u16; FIELD_RES_C]; FIELD_RES_R],
	/// Chunk-local connectivity label per tile
	local_islands: [[u16; FIELD_RES_C]; FIELD_RES_R],
	/// Outgoing portals, at most [MAX_PORTALS_PER_CHUNK]
	portals: Vec<Portal>,
}

impl Default for NavChunk {
	fn default() -> Self {
		NavChunk {
			cost_base: [[1; FIELD_RES_C]; FIELD_RES_R],
			blockers: [[0; FIELD_RES_C]; FIELD_RES_R],
			factions: [[0; FIELD_RES_C]; FIELD_RES_R],
			islands: [[ISLAND_NONE; FIELD_RES_C]; FIELD_RES_R],
			local_islands: [[ISLAND_NONE; FIELD_RES_C]; FIELD_RES_R],
			portals: Vec::new(),
		}
	}
}

impl NavChunk {
	/// Get the base cost of a tile
	pub fn get_cost(&self, tile: Coord) -> u8 {
		self.cost_base[tile.get_row()][tile.get_column()]
	}
	/// Set the base cost of a tile
	pub fn set_cost(&mut self, tile: Coord, cost: u8) {
		self.cost_base[tile.get_row()][tile.get_column()] = cost;
	}
	/// Get the dynamic blocker reference count of a tile
	pub fn get_blockers(&self, tile: Coord) -> u16 {
		self.blockers[tile.get_row()][tile.get_column()]
	}
	/// Take a dynamic blocker reference on a tile
	pub fn add_blocker(&mut self, tile: Coord) {
		self.blockers[tile.get_row()][tile.get_column()] += 1;
	}
	/// Release a dynamic blocker reference on a tile
	pub fn remove_blocker(&mut self, tile: Coord) {
		let count = &mut self.blockers[tile.get_row()][tile.get_column()];
		assert!(*count > 0, "blocker refcount underflow at {:?}", tile);
		*count -= 1;
	}
	/// Get the occupancy bitmask of a tile
	pub fn get_faction_mask(&self, tile: Coord) -> u16 {
		self.factions[tile.get_row()][tile.get_column()]
	}
	/// Mark or clear occupancy of a tile by a faction
	pub fn set_faction_occupancy(&mut self, tile: Coord, faction_id: u8, occupied: bool) {
		assert!((faction_id as usize) < MAX_FACTIONS);
		let mask = &mut self.factions[tile.get_row()][tile.get_column()];
		if occupied {
			*mask |= 1 << faction_id;
		} else {
			*mask &= !(1 << faction_id);
		}
	}
	/// Get the map-wide island label of a tile
	pub fn get_island(&self, tile: Coord) -> u16 {
		self.islands[tile.get_row()][tile.get_column()]
	}
	/// Set the map-wide island label of a tile
	pub fn set_island(&mut self, tile: Coord, island: u16) {
		self.islands[tile.get_row()][tile.get_column()] = island;
	}
	/// Get the chunk-local island label of a tile
	pub fn get_local_island(&self, tile: Coord) -> u16 {
		self.local_islands[tile.get_row()][tile.get_column()]
	}
	/// Get the outgoing portals of the chunk
	pub fn get_portals(&self) -> &Vec<Portal> {
		&self.portals
	}
	pub(crate) fn set_portals(&mut self, portals: Vec<Portal>) {
		assert!(portals.len() <= MAX_PORTALS_PER_CHUNK);
		self.portals = portals;
	}

	/// Whether a tile can be traversed, ignoring faction occupancy
	pub fn tile_passable(&self, tile: Coord) -> bool {
		if self.get_cost(tile) == COST_IMPASSABLE {
			return false;
		}
		if self.get_blockers(tile) > 0 {
			return false;
		}
		true
	}
	/// Whether a tile can be traversed on behalf of a faction whose enemies
	/// are `enemies`. A tile occupied only by enemy factions is passable
	/// regardless of blockers
	pub fn tile_passable_for_faction(&self, tile: Coord, enemies: u16) -> bool {
		if self.get_cost(tile) == COST_IMPASSABLE {
			return false;
		}
		if self.get_faction_mask(tile) & !enemies == 0 {
			return true;
		}
		self.get_blockers(tile) == 0
	}
	/// Dispatch between the factionless and the faction-aware passability
	/// test based on whether an enemy mask is supplied
	pub fn tile_passable_for(&self, tile: Coord, enemies: Option<u16>) -> bool {
		match enemies {
			None => self.tile_passable(tile),
			Some(mask) => self.tile_passable_for_faction(tile, mask),
		}
	}

	/// Orthogonal neighbours of a tile together with their step costs. Tiles
	/// under a dynamic blocker carry the [COST_IMPASSABLE] step cost even
	/// when the enemy-occupancy rule leaves them traversable. With
	/// `only_passable` set, neighbours failing the passability test are
	/// omitted entirely
	pub fn grid_neighbours(
		&self,
		coord: Coord,
		only_passable: bool,
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
			let neighbour = Coord::new(nr as u8, nc as u8);
			if only_passable && !self.tile_passable_for(neighbour, enemies) {
				continue;
			}
			let mut cost = self.get_cost(neighbour);
			if self.get_blockers(neighbour) > 0 {
				cost = COST_IMPASSABLE;
			}
			neighbours.push((neighbour, cost));
		}
		neighbours
	}

	/// Whether an impassable tile sits at the end of a wall: exactly one of
	/// its vertical neighbours, or exactly one of its horizontal neighbours,
	/// is blocked. Such tiles are the sources of line-of-sight shadow lines
	pub fn is_los_corner(&self, tile: Coord) -> bool {
		let (r, c) = tile.get_row_column();
		let blocked = |r: usize, c: usize| {
			self.cost_base[r][c] == COST_IMPASSABLE || self.blockers[r][c] > 0
		};
		if r > 0 && r < FIELD_RES_R - 1 && (blocked(r - 1, c) ^ blocked(r + 1, c)) {
			return true;
		}
		if c > 0 && c < FIELD_RES_C - 1 && (blocked(r, c - 1) ^ blocked(r, c + 1)) {
			return true;
		}
		false
	}

	/// All passable tiles lining the impassable island that `start` is part
	/// of. The walk floods outwards through blocked tiles and collects, but
	/// does not expand, the first passable tiles it reaches
	pub fn passable_frontier(&self, start: Coord) -> Vec<Coord> {
		assert!(!self.tile_passable(start));
		let mut out = Vec::new();
		let mut visited = [[false; FIELD_RES_C]; FIELD_RES_R];
		let mut frontier = VecDeque::new();
		frontier.push_back(start);
		visited[start.get_row()][start.get_column()] = true;

		while let Some(curr) = frontier.pop_front() {
			if self.tile_passable(curr) {
				out.push(curr);
				continue;
			}
			for neighbour in curr.orthogonal_neighbours() {
				let (nr, nc) = neighbour.get_row_column();
				if visited[nr][nc] {
					continue;
				}
				visited[nr][nc] = true;
				frontier.push_back(neighbour);
			}
		}
		out
	}

	/// The passable tiles nearest to `target` that carry the requested local
	/// and map-wide island labels. Manhattan distance from `target` is
	/// strictly increasing per BFS shell, so the walk stops at the first
	/// shell past a match and every returned tile shares one distance
	pub fn closest_tiles_local(&self, target: Coord, local_iid: u16, global_iid: u16) -> Vec<Coord> {
		let mut out = Vec::new();
		let mut visited = [[false; FIELD_RES_C]; FIELD_RES_R];
		let mut frontier = VecDeque::new();
		let mut first_mh_dist = -1;
		frontier.push_back(target);
		visited[target.get_row()][target.get_column()] = true;

		while let Some(curr) = frontier.pop_front() {
			for neighbour in curr.orthogonal_neighbours() {
				let (nr, nc) = neighbour.get_row_column();
				if visited[nr][nc] {
					continue;
				}
				visited[nr][nc] = true;
				frontier.push_back(neighbour);
			}
			let mh_dist = manhattan_dist(target, curr);
			if first_mh_dist > -1 && mh_dist > first_mh_dist {
				break;
			}
			if !self.tile_passable(curr) {
				continue;
			}
			if global_iid != ISLAND_NONE && self.get_island(curr) != global_iid {
				continue;
			}
			if local_iid != ISLAND_NONE && self.get_local_island(curr) != local_iid {
				continue;
			}
			if first_mh_dist == -1 {
				first_mh_dist = mh_dist;
			}
			out.push(curr);
		}
		out
	}

	/// Relabel the chunk-local islands by flooding connected passable tiles.
	/// Impassable tiles are assigned [ISLAND_NONE]. Labels are dense from
	/// zero and stable for an unchanged chunk
	pub fn recalculate_local_islands(&mut self) {
		let mut labels = [[ISLAND_NONE; FIELD_RES_C]; FIELD_RES_R];
		let mut next_label: u16 = 0;
		for r in 0..FIELD_RES_R {
			for c in 0..FIELD_RES_C {
				let tile = Coord::new(r as u8, c as u8);
				if labels[r][c] != ISLAND_NONE || !self.tile_passable(tile) {
					continue;
				}
				let mut frontier = VecDeque::new();
				labels[r][c] = next_label;
				frontier.push_back(tile);
				while let Some(curr) = frontier.pop_front() {
					for neighbour in curr.orthogonal_neighbours() {
						let (nr, nc) = neighbour.get_row_column();
						if labels[nr][nc] != ISLAND_NONE || !self.tile_passable(neighbour) {
							continue;
						}
						labels[nr][nc] = next_label;
						frontier.push_back(neighbour);
					}
				}
				next_label += 1;
			}
		}
		self.local_islands = labels;
	}
}
