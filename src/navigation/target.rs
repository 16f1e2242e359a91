//! What a flow field points at. A [FieldTarget] is resolved into the initial
//! frontier of seed tiles that the integration wavefront grows from
//!

use bevy::prelude::*;

use crate::prelude::*;

/// World-unit inflation applied around a chunk when querying the entity
/// index for enemies, so that large entities straddling the chunk border are
/// not missed
pub const SEARCH_BUFFER: f32 = 64.0;

/// Parameters of the enemies-in-chunk target
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct EnemiesDesc {
	/// The chunk enemies are gathered in
	chunk: ChunkCoord,
	/// World position of the map origin
	map_pos: Vec3,
	/// The faction asking, enemies are judged relative to it
	faction_id: u8,
}

impl EnemiesDesc {
	/// Create a new instance of [EnemiesDesc]
	pub fn new(chunk: ChunkCoord, map_pos: Vec3, faction_id: u8) -> Self {
		EnemiesDesc {
			chunk,
			map_pos,
			faction_id,
		}
	}
	/// Get the chunk enemies are gathered in
	pub fn get_chunk(&self) -> ChunkCoord {
		self.chunk
	}
	/// Get the world position of the map origin
	pub fn get_map_pos(&self) -> Vec3 {
		self.map_pos
	}
	/// Get the asking faction
	pub fn get_faction_id(&self) -> u8 {
		self.faction_id
	}
}

/// The destination a field update steers towards
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FieldTarget {
	/// A single tile of the chunk
	Tile(Coord),
	/// One portal of the chunk, seeded across its whole run
	Portal(Portal),
	/// A union of the chunk's portals selected by bit index
	PortalMask(u64),
	/// Every tile under a visible enemy of the asking faction
	Enemies(EnemiesDesc),
}

impl FieldTarget {
	/// Stable tag of the target kind used by field identities
	pub(crate) fn tag(&self) -> u64 {
		match self {
			FieldTarget::Tile(_) => 0,
			FieldTarget::Portal(_) => 1,
			FieldTarget::PortalMask(_) => 2,
			FieldTarget::Enemies(_) => 3,
		}
	}

	/// Resolve the target into seed tiles within `chunk`. With
	/// `ignore_block` set, blocked seeds are emitted anyway, which is the
	/// retry path for fully walled-off targets
	pub fn initial_frontier(
		&self,
		chunk: &NavChunk,
		world: &NavigationWorld,
		ignore_block: bool,
		faction_id: Option<u8>,
	) -> Vec<Coord> {
		let enemies = faction_id.map(|id| world.get_factions().enemy_factions(id));
		match self {
			FieldTarget::Tile(tile) => tile_initial_frontier(*tile, chunk, ignore_block, enemies),
			FieldTarget::Portal(portal) => {
				portal_initial_frontier(portal, chunk, ignore_block, enemies)
			}
			FieldTarget::PortalMask(mask) => {
				let mut out = Vec::new();
				for (i, portal) in chunk.get_portals().iter().enumerate() {
					if mask & (1 << i) == 0 {
						continue;
					}
					out.extend(portal_initial_frontier(portal, chunk, ignore_block, enemies));
				}
				out
			}
			FieldTarget::Enemies(desc) => enemies_initial_frontier(desc, world),
		}
	}
}

fn tile_initial_frontier(
	tile: Coord,
	chunk: &NavChunk,
	ignore_block: bool,
	enemies: Option<u16>,
) -> Vec<Coord> {
	if ignore_block || chunk.tile_passable_for(tile, enemies) {
		return vec![tile];
	}
	Vec::new()
}

fn portal_initial_frontier(
	portal: &Portal,
	chunk: &NavChunk,
	ignore_block: bool,
	enemies: Option<u16>,
) -> Vec<Coord> {
	let [first, last] = portal.get_endpoints();
	let mut out = Vec::new();
	for r in first.get_row()..=last.get_row() {
		for c in first.get_column()..=last.get_column() {
			let tile = Coord::new(r as u8, c as u8);
			assert!(
				chunk.get_cost(tile) != COST_IMPASSABLE,
				"portal tile {:?} has impassable base cost",
				tile
			);
			if !ignore_block && !chunk.tile_passable_for(tile, enemies) {
				continue;
			}
			out.push(tile);
		}
	}
	out
}

/// Whether an entity is a valid enemy target for `faction_id`: hostile,
/// combat capable and visible to the player factions through the fog
fn enemy_ent(world: &NavigationWorld, faction_id: u8, entity: &GameEntity) -> bool {
	if entity.get_faction_id() == faction_id {
		return false;
	}
	if entity.get_flags() & ENTITY_FLAG_COMBATABLE == 0 {
		return false;
	}
	let standing = world
		.get_factions()
		.get_diplomacy_state(faction_id, entity.get_faction_id());
	if standing != DiplomacyState::War {
		return false;
	}
	let pmask = world.get_factions().player_controlled_mask();
	if !world
		.get_fog()
		.obj_visible(pmask, world.get_map(), &entity.current_obb())
	{
		return false;
	}
	true
}

fn enemies_initial_frontier(desc: &EnemiesDesc, world: &NavigationWorld) -> Vec<Coord> {
	let bounds = world
		.get_map()
		.chunk_bounds(desc.get_chunk())
		.inflated(SEARCH_BUFFER);
	let uids = world.get_entities().ents_in_rect(
		Vec2::new(bounds.x_min, bounds.z_min),
		Vec2::new(bounds.x_max, bounds.z_max),
	);

	let mut has_enemy = [[false; FIELD_RES_C]; FIELD_RES_R];
	for uid in uids {
		let Some(entity) = world.get_entities().get(uid) else {
			continue;
		};
		if !enemy_ent(world, desc.get_faction_id(), entity) {
			continue;
		}
		let descs = if entity.get_flags() & ENTITY_FLAG_BUILDING != 0 {
			world.get_map().tiles_under_obb(&entity.current_obb())
		} else {
			world
				.get_map()
				.tiles_under_circle(entity.get_pos(), entity.get_selection_radius())
		};
		for tile_desc in descs {
			if tile_desc.get_chunk() != desc.get_chunk() {
				continue;
			}
			let tile = tile_desc.get_tile();
			has_enemy[tile.get_row()][tile.get_column()] = true;
		}
	}

	let mut out = Vec::new();
	for r in 0..FIELD_RES_R {
		for c in 0..FIELD_RES_C {
			if has_enemy[r][c] {
				out.push(Coord::new(r as u8, c as u8));
			}
		}
	}
	out
}
