//! The field arrays computed per chunk and the identities they are cached
//! under
//!

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::prelude::*;

pub mod flow_field;
pub mod integration_field;
pub mod los_field;

/// Defines required access to field arrays
pub trait Field<T> {
	/// Get a reference to the field array
	fn get(&self) -> &[[T; FIELD_RES_C]; FIELD_RES_R];
	/// Retrieve a field cell value
	fn get_field_cell_value(&self, cell: Coord) -> T;
	/// Set a field cell to a value
	fn set_field_cell_value(&mut self, value: T, cell: Coord);
}

/// Stable 64-bit identity of a `(chunk, target, layer)` triple, the cache
/// key for generated [FlowField]s. Layout from the top: 4 bits of layer,
/// 4 bits of target tag, then per-target payload, with the chunk row and
/// column in the lowest two bytes
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct FlowFieldId(u64);

impl FlowFieldId {
	/// Compose the identity of a field. Portal-mask targets select a
	/// transient set of portals and have no stable identity, asking for one
	/// is a programmer error
	pub fn new(chunk: ChunkCoord, target: &FieldTarget, layer: NavLayer) -> Self {
		let base = ((layer.get_index() as u64) << 60)
			| (target.tag() << 56)
			| ((chunk.get_row() as u64) << 8)
			| (chunk.get_column() as u64);
		let id = match target {
			FieldTarget::Tile(tile) => {
				base | ((tile.get_row() as u64) << 24) | ((tile.get_column() as u64) << 16)
			}
			FieldTarget::Portal(portal) => {
				let [first, last] = portal.get_endpoints();
				base | ((first.get_row() as u64) << 40)
					| ((first.get_column() as u64) << 32)
					| ((last.get_row() as u64) << 24)
					| ((last.get_column() as u64) << 16)
			}
			FieldTarget::Enemies(desc) => base | ((desc.get_faction_id() as u64) << 24),
			FieldTarget::PortalMask(_) => {
				panic!("portal-mask targets have no flow field identity")
			}
		};
		FlowFieldId(id)
	}
	/// Get the raw identity value
	pub fn get(&self) -> u64 {
		self.0
	}
	/// Recover the layer the field was built for
	pub fn get_layer(&self) -> NavLayer {
		NavLayer::from_index((self.0 >> 60) as usize)
	}
}

/// Identity of a path destination, carrying the layer and asking faction
/// that line-of-sight fields are generated under
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct DestId(u64);

/// Faction byte of a [DestId] with no faction
const DEST_FACTION_NONE: u64 = 0xFF;

impl DestId {
	/// Compose a destination identity from the layer, the asking faction
	/// and the global target tile
	pub fn new(layer: NavLayer, faction_id: Option<u8>, target: TileDesc) -> Self {
		let faction = match faction_id {
			Some(id) => id as u64,
			None => DEST_FACTION_NONE,
		};
		DestId(
			((layer.get_index() as u64) << 60)
				| (faction << 52)
				| ((target.get_chunk().get_row() as u64) << 24)
				| ((target.get_chunk().get_column() as u64) << 16)
				| ((target.get_tile().get_row() as u64) << 8)
				| (target.get_tile().get_column() as u64),
		)
	}
	/// Get the raw identity value
	pub fn get(&self) -> u64 {
		self.0
	}
	/// Recover the layer
	pub fn get_layer(&self) -> NavLayer {
		NavLayer::from_index((self.0 >> 60) as usize)
	}
	/// Recover the asking faction
	pub fn get_faction_id(&self) -> Option<u8> {
		let faction = (self.0 >> 52) & 0xFF;
		if faction == DEST_FACTION_NONE {
			None
		} else {
			Some(faction as u8)
		}
	}
}

/// Each generated [FlowField] is placed into this cache so that multiple
/// actors pathing to the same place read from the same dataset
#[derive(Resource, Default)]
pub struct FlowFieldCache(BTreeMap<FlowFieldId, FlowField>);

impl FlowFieldCache {
	/// Get the map of [FlowField]s
	pub fn get(&self) -> &BTreeMap<FlowFieldId, FlowField> {
		&self.0
	}
	/// Get a mutable reference to the map of [FlowField]s
	pub fn get_mut(&mut self) -> &mut BTreeMap<FlowFieldId, FlowField> {
		&mut self.0
	}
	/// Get a [FlowField] by identity. Returns [None] if the cache doesn't
	/// contain a record
	pub fn get_field(&self, id: FlowFieldId) -> Option<&FlowField> {
		self.0.get(&id)
	}
	/// Insert a [FlowField] under its identity
	pub fn insert_field(&mut self, id: FlowFieldId, field: FlowField) {
		self.0.insert(id, field);
	}
	/// Remove a [FlowField] (when its chunk data changed and it needs
	/// regenerating)
	pub fn remove_field(&mut self, id: FlowFieldId) {
		self.0.remove(&id);
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn tile_ids_differ_by_tile_chunk_and_layer() {
		let chunk = ChunkCoord::new(3, 4);
		let a = FlowFieldId::new(chunk, &FieldTarget::Tile(Coord::new(1, 2)), NavLayer::Ground);
		let b = FlowFieldId::new(chunk, &FieldTarget::Tile(Coord::new(2, 1)), NavLayer::Ground);
		let c = FlowFieldId::new(
			ChunkCoord::new(4, 3),
			&FieldTarget::Tile(Coord::new(1, 2)),
			NavLayer::Ground,
		);
		let d = FlowFieldId::new(chunk, &FieldTarget::Tile(Coord::new(1, 2)), NavLayer::Air);
		assert_ne!(a, b);
		assert_ne!(a, c);
		assert_ne!(a, d);
	}
	#[test]
	fn portal_and_tile_ids_never_collide() {
		let chunk = ChunkCoord::new(0, 0);
		let portal = Portal::new(
			chunk,
			[Coord::new(0, 3), Coord::new(0, 5)],
			ChunkCoord::new(0, 1),
		);
		let a = FlowFieldId::new(chunk, &FieldTarget::Tile(Coord::new(0, 3)), NavLayer::Ground);
		let b = FlowFieldId::new(chunk, &FieldTarget::Portal(portal), NavLayer::Ground);
		assert_ne!(a, b);
	}
	#[test]
	fn layer_recovers_from_id() {
		let id = FlowFieldId::new(
			ChunkCoord::new(1, 1),
			&FieldTarget::Tile(Coord::new(0, 0)),
			NavLayer::Air,
		);
		assert_eq!(NavLayer::Air, id.get_layer());
	}
	#[test]
	#[should_panic]
	fn portal_mask_identity_panics() {
		FlowFieldId::new(
			ChunkCoord::new(0, 0),
			&FieldTarget::PortalMask(0b1),
			NavLayer::Ground,
		);
	}
	#[test]
	fn dest_id_round_trips_layer_and_faction() {
		let target = TileDesc::new(ChunkCoord::new(2, 5), Coord::new(7, 7));
		let id = DestId::new(NavLayer::Air, Some(11), target);
		assert_eq!(NavLayer::Air, id.get_layer());
		assert_eq!(Some(11), id.get_faction_id());
		let id = DestId::new(NavLayer::Ground, None, target);
		assert_eq!(None, id.get_faction_id());
	}
	#[test]
	fn cache_inserts_and_evicts() {
		let mut cache = FlowFieldCache::default();
		let id = FlowFieldId::new(
			ChunkCoord::new(0, 0),
			&FieldTarget::Tile(Coord::new(4, 4)),
			NavLayer::Ground,
		);
		assert!(cache.get_field(id).is_none());
		cache.insert_field(id, FlowField::new(ChunkCoord::new(0, 0)));
		assert!(cache.get_field(id).is_some());
		cache.remove_field(id);
		assert!(cache.get_field(id).is_none());
	}
}
