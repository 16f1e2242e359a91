//! The entity position index consumed by the enemies target and the region
//! subsystem. Entities live in sparse world-space buckets so rectangle and
//! circle queries only touch the buckets they overlap
//!

use std::collections::HashMap;

use bevy::prelude::*;

use crate::prelude::*;

/// The entity can be attacked and attacks back
pub const ENTITY_FLAG_COMBATABLE: u32 = 1 << 0;
/// The entity is a static structure with an oriented-box footprint
pub const ENTITY_FLAG_BUILDING: u32 = 1 << 1;
/// The entity is despawning and should be ignored by queries over gameplay
pub const ENTITY_FLAG_ZOMBIE: u32 = 1 << 2;
/// The entity is a decorative marker with no gameplay presence
pub const ENTITY_FLAG_MARKER: u32 = 1 << 3;

/// World-space side length of one index bucket
const BUCKET_DIM: f32 = 32.0;

/// A queryable game entity as the navigation core sees it
#[derive(Clone, Debug)]
pub struct GameEntity {
	uid: u32,
	/// Position on the world XZ plane
	pos: Vec2,
	/// Radius of the selection disc, doubling as the unit footprint
	selection_radius: f32,
	faction_id: u8,
	flags: u32,
	/// Half-lengths of the building footprint along its local axes
	half_lengths: Vec2,
	/// Rotation about the world Y axis in radians
	yaw: f32,
}

impl GameEntity {
	/// Create a new instance of [GameEntity]
	pub fn new(
		uid: u32,
		pos: Vec2,
		selection_radius: f32,
		faction_id: u8,
		flags: u32,
		half_lengths: Vec2,
		yaw: f32,
	) -> Self {
		GameEntity {
			uid,
			pos,
			selection_radius,
			faction_id,
			flags,
			half_lengths,
			yaw,
		}
	}
	/// Get the unique ID
	pub fn get_uid(&self) -> u32 {
		self.uid
	}
	/// Get the XZ position
	pub fn get_pos(&self) -> Vec2 {
		self.pos
	}
	/// Get the selection disc radius
	pub fn get_selection_radius(&self) -> f32 {
		self.selection_radius
	}
	/// Get the owning faction
	pub fn get_faction_id(&self) -> u8 {
		self.faction_id
	}
	/// Get the flag bits
	pub fn get_flags(&self) -> u32 {
		self.flags
	}
	/// The entity's current oriented bounding box on the XZ plane
	pub fn current_obb(&self) -> Obb {
		Obb::new(
			Vec3::new(self.pos.x, 0.0, self.pos.y),
			self.half_lengths,
			self.yaw,
		)
	}
}

/// Spatially bucketed index over every live [GameEntity]
#[derive(Default)]
pub struct EntityIndex {
	entities: HashMap<u32, GameEntity>,
	buckets: HashMap<(i32, i32), Vec<u32>>,
}

impl EntityIndex {
	fn bucket_of(pos: Vec2) -> (i32, i32) {
		(
			(pos.x / BUCKET_DIM).floor() as i32,
			(pos.y / BUCKET_DIM).floor() as i32,
		)
	}

	/// Add an entity to the index, replacing any previous record under the
	/// same uid
	pub fn insert(&mut self, entity: GameEntity) {
		self.remove(entity.get_uid());
		self.buckets
			.entry(Self::bucket_of(entity.get_pos()))
			.or_default()
			.push(entity.get_uid());
		self.entities.insert(entity.get_uid(), entity);
	}
	/// Drop an entity from the index
	pub fn remove(&mut self, uid: u32) {
		if let Some(old) = self.entities.remove(&uid) {
			let key = Self::bucket_of(old.get_pos());
			if let Some(bucket) = self.buckets.get_mut(&key) {
				bucket.retain(|queued| *queued != uid);
				if bucket.is_empty() {
					self.buckets.remove(&key);
				}
			}
		}
	}
	/// Move an entity, returns false for an unknown uid
	pub fn set_pos(&mut self, uid: u32, pos: Vec2) -> bool {
		let Some(mut entity) = self.entities.remove(&uid) else {
			return false;
		};
		let old_key = Self::bucket_of(entity.get_pos());
		let new_key = Self::bucket_of(pos);
		if old_key != new_key {
			if let Some(bucket) = self.buckets.get_mut(&old_key) {
				bucket.retain(|queued| *queued != uid);
				if bucket.is_empty() {
					self.buckets.remove(&old_key);
				}
			}
			self.buckets.entry(new_key).or_default().push(uid);
		}
		entity.pos = pos;
		self.entities.insert(uid, entity);
		true
	}
	/// Look up an entity record
	pub fn get(&self, uid: u32) -> Option<&GameEntity> {
		self.entities.get(&uid)
	}
	/// Look up an entity's XZ position
	pub fn get_xz(&self, uid: u32) -> Option<Vec2> {
		self.entities.get(&uid).map(|entity| entity.get_pos())
	}

	/// Uids of every entity positioned within an axis-aligned rectangle,
	/// sorted for deterministic iteration
	pub fn ents_in_rect(&self, xz_min: Vec2, xz_max: Vec2) -> Vec<u32> {
		let (bx_min, bz_min) = Self::bucket_of(xz_min);
		let (bx_max, bz_max) = Self::bucket_of(xz_max);
		let mut out = Vec::new();
		for bx in bx_min..=bx_max {
			for bz in bz_min..=bz_max {
				let Some(bucket) = self.buckets.get(&(bx, bz)) else {
					continue;
				};
				for uid in bucket {
					let pos = self.entities[uid].get_pos();
					if pos.x >= xz_min.x && pos.x <= xz_max.x && pos.y >= xz_min.y && pos.y <= xz_max.y
					{
						out.push(*uid);
					}
				}
			}
		}
		out.sort_unstable();
		out
	}

	/// Uids of every entity positioned within a disc, sorted for
	/// deterministic iteration
	pub fn ents_in_circle(&self, center: Vec2, radius: f32) -> Vec<u32> {
		let mut out = self.ents_in_rect(
			center - Vec2::splat(radius),
			center + Vec2::splat(radius),
		);
		out.retain(|uid| point_in_circle(self.entities[uid].get_pos(), center, radius));
		out
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	fn unit(uid: u32, pos: Vec2) -> GameEntity {
		GameEntity::new(uid, pos, 1.0, 0, ENTITY_FLAG_COMBATABLE, Vec2::splat(1.0), 0.0)
	}
	#[test]
	fn rect_query_returns_contained_entities() {
		let mut index = EntityIndex::default();
		index.insert(unit(1, Vec2::new(-10.0, 10.0)));
		index.insert(unit(2, Vec2::new(-200.0, 10.0)));
		index.insert(unit(3, Vec2::new(-12.0, 14.0)));
		let result = index.ents_in_rect(Vec2::new(-20.0, 0.0), Vec2::new(0.0, 20.0));
		let actual = vec![1, 3];
		assert_eq!(actual, result);
	}
	#[test]
	fn circle_query_trims_corners() {
		let mut index = EntityIndex::default();
		index.insert(unit(1, Vec2::new(0.0, 0.0)));
		index.insert(unit(2, Vec2::new(9.0, 9.0)));
		let result = index.ents_in_circle(Vec2::ZERO, 10.0);
		let actual = vec![1];
		assert_eq!(actual, result);
	}
	#[test]
	fn set_pos_moves_between_buckets() {
		let mut index = EntityIndex::default();
		index.insert(unit(7, Vec2::new(0.0, 0.0)));
		assert!(index.set_pos(7, Vec2::new(-100.0, 100.0)));
		let result = index.ents_in_rect(Vec2::new(-110.0, 90.0), Vec2::new(-90.0, 110.0));
		assert_eq!(vec![7], result);
		assert!(index.ents_in_rect(Vec2::new(-5.0, -5.0), Vec2::new(5.0, 5.0)).is_empty());
		assert!(!index.set_pos(99, Vec2::ZERO));
	}
	#[test]
	fn remove_clears_queries() {
		let mut index = EntityIndex::default();
		index.insert(unit(4, Vec2::new(1.0, 1.0)));
		index.remove(4);
		assert!(index.get(4).is_none());
		assert!(index.ents_in_rect(Vec2::splat(-5.0), Vec2::splat(5.0)).is_empty());
	}
}
