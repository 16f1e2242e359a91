//! Chunked flow-field navigation for crowds of actors.
//!
//! [Crowd Pathfinding and Steering Using Flow Field Tiles](https://www.gameaipro.com/GameAIPro/GameAIPro_Chapter23_Crowd_Pathfinding_and_Steering_Using_Flow_Field_Tiles.pdf)
//!
//! [leifnode](https://leifnode.com/2013/12/flow-field-pathfinding/)
//!
//! The map is divided into a grid of chunks and each chunk exists once per
//! navigation layer. A chunk carries a `FIELD_RES_R x FIELD_RES_C` tile grid
//! of static costs, dynamic blocker counts, faction occupancy and island
//! labels, plus the portals that window into its neighbours.
//!
//! ```text
//!  _____________________________
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! ```
//!
//! Producing movement for one chunk is a three step pipeline:
//!
//! 1. a [crate::prelude::FieldTarget] is resolved into seed tiles
//! 2. a Dijkstra wavefront fills an [crate::prelude::IntegrationField] with
//!    the accumulated cost of reaching the seeds
//! 3. a [crate::prelude::FlowField] picks, per tile, the neighbour with the
//!    cheapest integration, giving every actor standing anywhere in the
//!    chunk a direction towards the target
//!
//! A separate [crate::prelude::LosField] wavefront marks the tiles that can
//! see a destination, casting shadow lines off the ends of walls so that
//! actors with line of sight can skip flow following entirely
//!

use bevy::prelude::*;

use crate::game::entities::EntityIndex;
use crate::game::factions::{FactionTable, FogOfWar};
use crate::map::MapGeometry;
use crate::prelude::*;

pub mod chunk;
pub mod fields;
pub mod queue;
pub mod target;
pub mod utilities;

/// The movement layers chunks are duplicated across
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Reflect)]
#[repr(usize)]
pub enum NavLayer {
	#[default]
	Ground = 0,
	Air = 1,
}

/// Number of [NavLayer] variants
pub const NAV_LAYER_COUNT: usize = 2;

impl NavLayer {
	/// Get the layer as an array index
	pub fn get_index(&self) -> usize {
		*self as usize
	}
	/// Recover a layer from an array index
	pub fn from_index(index: usize) -> NavLayer {
		match index {
			0 => NavLayer::Ground,
			1 => NavLayer::Air,
			_ => panic!("unknown navigation layer index {}", index),
		}
	}
}

/// Per-layer storage of every [NavChunk] of the map
pub struct NavData {
	/// Number of chunk columns
	width: usize,
	/// Number of chunk rows
	height: usize,
	/// Chunk grids indexed `[layer][row * width + column]`
	chunks: Vec<Vec<NavChunk>>,
}

impl NavData {
	/// Create chunk storage for a map of `width` x `height` chunks with
	/// every tile open
	pub fn new(width: usize, height: usize) -> Self {
		assert!(width > 0 && height > 0);
		let mut chunks = Vec::with_capacity(NAV_LAYER_COUNT);
		for _ in 0..NAV_LAYER_COUNT {
			let mut layer = Vec::with_capacity(width * height);
			layer.resize_with(width * height, NavChunk::default);
			chunks.push(layer);
		}
		NavData {
			width,
			height,
			chunks,
		}
	}
	/// Get the number of chunk columns
	pub fn get_width(&self) -> usize {
		self.width
	}
	/// Get the number of chunk rows
	pub fn get_height(&self) -> usize {
		self.height
	}
	fn index_of(&self, coord: ChunkCoord) -> usize {
		assert!(
			coord.get_row() < self.height && coord.get_column() < self.width,
			"chunk {:?} out of range",
			coord
		);
		coord.get_row() * self.width + coord.get_column()
	}
	/// Get a chunk of a layer
	pub fn get_chunk(&self, layer: NavLayer, coord: ChunkCoord) -> &NavChunk {
		let idx = self.index_of(coord);
		&self.chunks[layer.get_index()][idx]
	}
	/// Get a mutable chunk of a layer
	pub fn get_chunk_mut(&mut self, layer: NavLayer, coord: ChunkCoord) -> &mut NavChunk {
		let idx = self.index_of(coord);
		&mut self.chunks[layer.get_index()][idx]
	}

	/// Rediscover the portals of every chunk of a layer. Each orthogonally
	/// adjacent chunk pair is scanned along its shared edge for maximal runs
	/// of tiles whose base cost is passable on both sides, and each run
	/// becomes a mirrored portal pair
	pub fn rebuild_portals(&mut self, layer: NavLayer) {
		let mut portals: Vec<Vec<Portal>> = vec![Vec::new(); self.width * self.height];
		for r in 0..self.height {
			for c in 0..self.width {
				let here = ChunkCoord::new(r as u8, c as u8);
				if c + 1 < self.width {
					let east = ChunkCoord::new(r as u8, c as u8 + 1);
					for (own, far) in self.edge_runs_vertical(layer, here, east) {
						portals[r * self.width + c].push(own);
						portals[r * self.width + c + 1].push(far);
					}
				}
				if r + 1 < self.height {
					let south = ChunkCoord::new(r as u8 + 1, c as u8);
					for (own, far) in self.edge_runs_horizontal(layer, here, south) {
						portals[r * self.width + c].push(own);
						portals[(r + 1) * self.width + c].push(far);
					}
				}
			}
		}
		for (idx, chunk_portals) in portals.into_iter().enumerate() {
			self.chunks[layer.get_index()][idx].set_portals(chunk_portals);
		}
	}

	/// Portal pairs along the vertical edge between a chunk and its eastern
	/// neighbour
	fn edge_runs_vertical(
		&self,
		layer: NavLayer,
		west: ChunkCoord,
		east: ChunkCoord,
	) -> Vec<(Portal, Portal)> {
		let west_chunk = self.get_chunk(layer, west);
		let east_chunk = self.get_chunk(layer, east);
		let open = |r: usize| {
			west_chunk.get_cost(Coord::new(r as u8, (FIELD_RES_C - 1) as u8)) != COST_IMPASSABLE
				&& east_chunk.get_cost(Coord::new(r as u8, 0)) != COST_IMPASSABLE
		};
		runs(FIELD_RES_R, open)
			.into_iter()
			.map(|(first, last)| {
				(
					Portal::new(
						west,
						[
							Coord::new(first as u8, (FIELD_RES_C - 1) as u8),
							Coord::new(last as u8, (FIELD_RES_C - 1) as u8),
						],
						east,
					),
					Portal::new(
						east,
						[Coord::new(first as u8, 0), Coord::new(last as u8, 0)],
						west,
					),
				)
			})
			.collect()
	}

	/// Portal pairs along the horizontal edge between a chunk and its
	/// southern neighbour
	fn edge_runs_horizontal(
		&self,
		layer: NavLayer,
		north: ChunkCoord,
		south: ChunkCoord,
	) -> Vec<(Portal, Portal)> {
		let north_chunk = self.get_chunk(layer, north);
		let south_chunk = self.get_chunk(layer, south);
		let open = |c: usize| {
			north_chunk.get_cost(Coord::new((FIELD_RES_R - 1) as u8, c as u8)) != COST_IMPASSABLE
				&& south_chunk.get_cost(Coord::new(0, c as u8)) != COST_IMPASSABLE
		};
		runs(FIELD_RES_C, open)
			.into_iter()
			.map(|(first, last)| {
				(
					Portal::new(
						north,
						[
							Coord::new((FIELD_RES_R - 1) as u8, first as u8),
							Coord::new((FIELD_RES_R - 1) as u8, last as u8),
						],
						south,
					),
					Portal::new(
						south,
						[Coord::new(0, first as u8), Coord::new(0, last as u8)],
						north,
					),
				)
			})
			.collect()
	}
}

/// Maximal runs of consecutive indices satisfying `open`
fn runs(len: usize, open: impl Fn(usize) -> bool) -> Vec<(usize, usize)> {
	let mut out = Vec::new();
	let mut start = None;
	for i in 0..len {
		match (open(i), start) {
			(true, None) => start = Some(i),
			(false, Some(s)) => {
				out.push((s, i - 1));
				start = None;
			}
			_ => {}
		}
	}
	if let Some(s) = start {
		out.push((s, len - 1));
	}
	out
}

/// The context every navigation pass reads from: chunk data per layer plus
/// the collaborator state (map geometry, entity index, diplomacy, fog).
/// Owning it all in one resource keeps the core free of global state
#[derive(Resource)]
pub struct NavigationWorld {
	map: MapGeometry,
	nav: NavData,
	entities: EntityIndex,
	factions: FactionTable,
	fog: FogOfWar,
}

impl NavigationWorld {
	/// Create a world sized from the map, with open chunks, no entities and
	/// everything at peace
	pub fn new(map: MapGeometry) -> Self {
		let nav = NavData::new(map.get_chunk_width(), map.get_chunk_height());
		NavigationWorld {
			map,
			nav,
			entities: EntityIndex::default(),
			factions: FactionTable::default(),
			fog: FogOfWar::default(),
		}
	}
	/// Get the map geometry
	pub fn get_map(&self) -> &MapGeometry {
		&self.map
	}
	/// Get the chunk store
	pub fn get_nav(&self) -> &NavData {
		&self.nav
	}
	/// Get a mutable reference to the chunk store
	pub fn get_nav_mut(&mut self) -> &mut NavData {
		&mut self.nav
	}
	/// Get the entity index
	pub fn get_entities(&self) -> &EntityIndex {
		&self.entities
	}
	/// Get a mutable reference to the entity index
	pub fn get_entities_mut(&mut self) -> &mut EntityIndex {
		&mut self.entities
	}
	/// Get the faction table
	pub fn get_factions(&self) -> &FactionTable {
		&self.factions
	}
	/// Get a mutable reference to the faction table
	pub fn get_factions_mut(&mut self) -> &mut FactionTable {
		&mut self.factions
	}
	/// Get the fog of war
	pub fn get_fog(&self) -> &FogOfWar {
		&self.fog
	}
	/// Get a mutable reference to the fog of war
	pub fn get_fog_mut(&mut self) -> &mut FogOfWar {
		&mut self.fog
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn chunk_lookup_round_trips() {
		let mut nav = NavData::new(3, 2);
		let coord = ChunkCoord::new(1, 2);
		nav.get_chunk_mut(NavLayer::Ground, coord)
			.set_cost(Coord::new(5, 5), 42);
		assert_eq!(42, nav.get_chunk(NavLayer::Ground, coord).get_cost(Coord::new(5, 5)));
		// layers are independent
		assert_eq!(1, nav.get_chunk(NavLayer::Air, coord).get_cost(Coord::new(5, 5)));
	}
	#[test]
	#[should_panic]
	fn out_of_range_chunk_panics() {
		let nav = NavData::new(2, 2);
		nav.get_chunk(NavLayer::Ground, ChunkCoord::new(2, 0));
	}
	#[test]
	fn open_edge_yields_one_spanning_portal() {
		let mut nav = NavData::new(2, 1);
		nav.rebuild_portals(NavLayer::Ground);
		let west = nav.get_chunk(NavLayer::Ground, ChunkCoord::new(0, 0));
		assert_eq!(1, west.get_portals().len());
		let portal = west.get_portals()[0];
		assert_eq!(ChunkCoord::new(0, 1), portal.get_connected_chunk());
		assert_eq!(
			[
				Coord::new(0, (FIELD_RES_C - 1) as u8),
				Coord::new((FIELD_RES_R - 1) as u8, (FIELD_RES_C - 1) as u8)
			],
			portal.get_endpoints()
		);
		let east = nav.get_chunk(NavLayer::Ground, ChunkCoord::new(0, 1));
		assert_eq!(1, east.get_portals().len());
		assert_eq!(ChunkCoord::new(0, 0), east.get_portals()[0].get_connected_chunk());
	}
	#[test]
	fn wall_on_the_edge_splits_the_portal() {
		let mut nav = NavData::new(2, 1);
		// block a band of the shared edge on the western side
		for r in 20..30u8 {
			nav.get_chunk_mut(NavLayer::Ground, ChunkCoord::new(0, 0))
				.set_cost(Coord::new(r, (FIELD_RES_C - 1) as u8), COST_IMPASSABLE);
		}
		nav.rebuild_portals(NavLayer::Ground);
		let west = nav.get_chunk(NavLayer::Ground, ChunkCoord::new(0, 0));
		assert_eq!(2, west.get_portals().len());
		let first = west.get_portals()[0].get_endpoints();
		let second = west.get_portals()[1].get_endpoints();
		assert_eq!(19, first[1].get_row());
		assert_eq!(30, second[0].get_row());
	}
	#[test]
	fn vertical_neighbours_get_mirrored_portals() {
		let mut nav = NavData::new(1, 2);
		nav.rebuild_portals(NavLayer::Ground);
		let north = nav.get_chunk(NavLayer::Ground, ChunkCoord::new(0, 0));
		let south = nav.get_chunk(NavLayer::Ground, ChunkCoord::new(1, 0));
		assert_eq!(1, north.get_portals().len());
		assert_eq!(1, south.get_portals().len());
		assert_eq!(
			(FIELD_RES_R - 1),
			north.get_portals()[0].get_endpoints()[0].get_row()
		);
		assert_eq!(0, south.get_portals()[0].get_endpoints()[0].get_row());
	}
}
