//! Named 2D areas of the map that track which entities stand inside them
//! and report entries and exits once per simulation tick. Membership diffs
//! are computed as the symmetric difference of the sorted previous and
//! current uid sets, so each crossing produces exactly one event.
//!
//! Regions are bucketed per chunk so point queries only inspect the regions
//! actually overlapping the chunk under the point
//!

use std::collections::{BTreeSet, HashMap};

use bevy::prelude::*;

use crate::game::entities::{EntityIndex, ENTITY_FLAG_MARKER, ENTITY_FLAG_ZOMBIE};
use crate::prelude::*;

/// Region shapes are centred on their position
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum RegionShape {
	Circle { radius: f32 },
	Rectangle { xlen: f32, zlen: f32 },
}

/// A membership change reported by [RegionRegistry::update]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegionEventKind {
	Entered,
	Exited,
}

/// An entity crossed a region boundary. The payload owns its region name so
/// handlers can hold onto events beyond the registry's own lifetime
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RegionEvent {
	pub kind: RegionEventKind,
	pub uid: u32,
	pub region: String,
}

struct Region {
	shape: RegionShape,
	pos: Vec2,
	curr_ents: Vec<u32>,
	prev_ents: Vec<u32>,
}

impl Region {
	fn contains(&self, point: Vec2) -> bool {
		match self.shape {
			RegionShape::Circle { radius } => point_in_circle(point, self.pos, radius),
			RegionShape::Rectangle { xlen, zlen } => self.bounds_rect(xlen, zlen).contains(point),
		}
	}
	fn bounds_rect(&self, xlen: f32, zlen: f32) -> BoxXZ {
		BoxXZ {
			x_min: self.pos.x - xlen / 2.0,
			x_max: self.pos.x + xlen / 2.0,
			z_min: self.pos.y - zlen / 2.0,
			z_max: self.pos.y + zlen / 2.0,
		}
	}
	fn intersects(&self, bounds: &BoxXZ) -> bool {
		match self.shape {
			RegionShape::Circle { radius } => circle_intersects_box(self.pos, radius, bounds),
			RegionShape::Rectangle { xlen, zlen } => {
				boxes_intersect(&self.bounds_rect(xlen, zlen), bounds)
			}
		}
	}
}

/// Positions closer than this are treated as unmoved
const EPSILON: f32 = 1.0 / 1024.0;

/// Owned registry of every region, with per-chunk intersection lists and the
/// event queue of the current tick
#[derive(Resource)]
pub struct RegionRegistry {
	regions: HashMap<String, Region>,
	/// Region names intersecting each chunk, indexed `row * width + column`
	intersecting: Vec<Vec<String>>,
	chunk_width: usize,
	chunk_height: usize,
	dirty: BTreeSet<String>,
	events: Vec<RegionEvent>,
}

impl RegionRegistry {
	/// Create a registry bucketed over the map's chunks
	pub fn new(map: &MapGeometry) -> Self {
		let chunk_width = map.get_chunk_width();
		let chunk_height = map.get_chunk_height();
		RegionRegistry {
			regions: HashMap::new(),
			intersecting: vec![Vec::new(); chunk_width * chunk_height],
			chunk_width,
			chunk_height,
			dirty: BTreeSet::new(),
			events: Vec::new(),
		}
	}

	/// Add a circular region. Returns false when the name is taken
	pub fn add_circle(
		&mut self,
		name: &str,
		pos: Vec2,
		radius: f32,
		entities: &EntityIndex,
		map: &MapGeometry,
	) -> bool {
		self.add(name, RegionShape::Circle { radius }, pos, entities, map)
	}
	/// Add a rectangular region. Returns false when the name is taken
	pub fn add_rectangle(
		&mut self,
		name: &str,
		pos: Vec2,
		xlen: f32,
		zlen: f32,
		entities: &EntityIndex,
		map: &MapGeometry,
	) -> bool {
		self.add(name, RegionShape::Rectangle { xlen, zlen }, pos, entities, map)
	}

	fn add(
		&mut self,
		name: &str,
		shape: RegionShape,
		pos: Vec2,
		entities: &EntityIndex,
		map: &MapGeometry,
	) -> bool {
		if self.regions.contains_key(name) {
			return false;
		}
		let region = Region {
			shape,
			pos,
			curr_ents: Vec::new(),
			prev_ents: Vec::new(),
		};
		self.update_intersecting_add(name, &region, map);
		self.regions.insert(name.to_string(), region);
		self.refresh_membership(name, entities);
		true
	}

	/// Remove a region, reporting an exit for every entity still inside it
	pub fn remove(&mut self, name: &str, map: &MapGeometry) {
		let Some(region) = self.regions.remove(name) else {
			return;
		};
		for uid in &region.curr_ents {
			self.events.push(RegionEvent {
				kind: RegionEventKind::Exited,
				uid: *uid,
				region: name.to_string(),
			});
		}
		self.update_intersecting_remove(name, &region, map);
		self.dirty.remove(name);
	}

	/// Move a region. Returns false for an unknown name
	pub fn set_pos(
		&mut self,
		name: &str,
		pos: Vec2,
		entities: &EntityIndex,
		map: &MapGeometry,
	) -> bool {
		let Some(region) = self.regions.get(name) else {
			return false;
		};
		if region.pos.distance(pos) <= EPSILON {
			return true;
		}
		let region = self.regions.remove(name).unwrap();
		self.update_intersecting_remove(name, &region, map);
		let moved = Region { pos, ..region };
		self.update_intersecting_add(name, &moved, map);
		self.regions.insert(name.to_string(), moved);
		self.refresh_membership(name, entities);
		true
	}

	/// Get a region's position
	pub fn get_pos(&self, name: &str) -> Option<Vec2> {
		self.regions.get(name).map(|region| region.pos)
	}
	/// Uids of the entities currently inside a region, empty for an unknown
	/// name
	pub fn get_ents(&self, name: &str) -> Vec<u32> {
		self.regions
			.get(name)
			.map(|region| region.curr_ents.clone())
			.unwrap_or_default()
	}
	/// Whether an entity is currently inside a region
	pub fn contains_ent(&self, name: &str, uid: u32) -> bool {
		self.regions
			.get(name)
			.map(|region| region.curr_ents.contains(&uid))
			.unwrap_or(false)
	}
	/// Whether a region is queued for event emission
	pub fn is_dirty(&self, name: &str) -> bool {
		self.dirty.contains(name)
	}
	/// Region names whose shape overlaps a chunk
	pub fn intersecting_regions(&self, chunk: ChunkCoord) -> &[String] {
		&self.intersecting[chunk.get_row() * self.chunk_width + chunk.get_column()]
	}
	/// The membership events of the current tick. Cleared when the next
	/// update begins
	pub fn get_events(&self) -> &[RegionEvent] {
		&self.events
	}

	/// Track an entity arriving at `pos`, for callers moving entities
	/// between ticks
	pub fn add_ref(&mut self, uid: u32, pos: Vec2, entities: &EntityIndex, map: &MapGeometry) {
		let Some(entity) = entities.get(uid) else {
			return;
		};
		if entity.get_flags() & (ENTITY_FLAG_ZOMBIE | ENTITY_FLAG_MARKER) != 0 {
			return;
		}
		for name in self.region_names_at_point(pos, map) {
			let region = self.regions.get_mut(&name).unwrap();
			if !region.curr_ents.contains(&uid) {
				region.curr_ents.push(uid);
				self.dirty.insert(name);
			}
		}
	}
	/// Track an entity leaving `pos`
	pub fn remove_ref(&mut self, uid: u32, pos: Vec2, map: &MapGeometry) {
		for name in self.region_names_at_point(pos, map) {
			let region = self.regions.get_mut(&name).unwrap();
			if let Some(idx) = region.curr_ents.iter().position(|queued| *queued == uid) {
				region.curr_ents.remove(idx);
				self.dirty.insert(name);
			}
		}
	}

	/// Refresh every region's membership through the entity index, then
	/// report entries and exits for the regions that changed. Events of the
	/// previous tick are dropped first
	pub fn update(&mut self, entities: &EntityIndex) {
		self.events.clear();
		let names: Vec<String> = self.regions.keys().cloned().collect();
		for name in names {
			self.refresh_membership(&name, entities);
		}
		let dirty: Vec<String> = self.dirty.iter().cloned().collect();
		self.dirty.clear();
		for name in dirty {
			let Some(region) = self.regions.get_mut(&name) else {
				continue;
			};
			region.curr_ents.sort_unstable();
			region.prev_ents.sort_unstable();
			notify_changed(&mut self.events, &name, &region.curr_ents, &region.prev_ents);
			region.prev_ents = region.curr_ents.clone();
		}
	}

	/// Re-derive a region's current membership, marking it dirty when the
	/// set changed
	fn refresh_membership(&mut self, name: &str, entities: &EntityIndex) {
		let Some(region) = self.regions.get_mut(name) else {
			return;
		};
		let mut uids = match region.shape {
			RegionShape::Circle { radius } => entities.ents_in_circle(region.pos, radius),
			RegionShape::Rectangle { xlen, zlen } => {
				let bounds = region.bounds_rect(xlen, zlen);
				entities.ents_in_rect(
					Vec2::new(bounds.x_min, bounds.z_min),
					Vec2::new(bounds.x_max, bounds.z_max),
				)
			}
		};
		uids.retain(|uid| {
			let entity = entities.get(*uid).unwrap();
			entity.get_flags() & (ENTITY_FLAG_ZOMBIE | ENTITY_FLAG_MARKER) == 0
		});
		if uids != region.curr_ents {
			region.curr_ents = uids;
			self.dirty.insert(name.to_string());
		}
	}

	fn region_names_at_point(&self, point: Vec2, map: &MapGeometry) -> Vec<String> {
		let Some(desc) = map.tile_desc_for_point(point) else {
			return Vec::new();
		};
		self.intersecting_regions(desc.get_chunk())
			.iter()
			.filter(|name| self.regions[*name].contains(point))
			.cloned()
			.collect()
	}

	fn update_intersecting_add(&mut self, name: &str, region: &Region, map: &MapGeometry) {
		for r in 0..self.chunk_height {
			for c in 0..self.chunk_width {
				let chunk = ChunkCoord::new(r as u8, c as u8);
				if region.intersects(&map.chunk_bounds(chunk)) {
					self.intersecting[r * self.chunk_width + c].push(name.to_string());
				}
			}
		}
	}
	fn update_intersecting_remove(&mut self, name: &str, region: &Region, map: &MapGeometry) {
		for r in 0..self.chunk_height {
			for c in 0..self.chunk_width {
				let chunk = ChunkCoord::new(r as u8, c as u8);
				if region.intersects(&map.chunk_bounds(chunk)) {
					self.intersecting[r * self.chunk_width + c].retain(|queued| queued != name);
				}
			}
		}
	}
}

/// Emit one event per uid present in exactly one of the two sorted sets
fn notify_changed(events: &mut Vec<RegionEvent>, name: &str, curr: &[u32], prev: &[u32]) {
	let mut i = 0;
	let mut j = 0;
	while i < curr.len() && j < prev.len() {
		if curr[i] < prev[j] {
			events.push(RegionEvent {
				kind: RegionEventKind::Entered,
				uid: curr[i],
				region: name.to_string(),
			});
			i += 1;
		} else if prev[j] < curr[i] {
			events.push(RegionEvent {
				kind: RegionEventKind::Exited,
				uid: prev[j],
				region: name.to_string(),
			});
			j += 1;
		} else {
			i += 1;
			j += 1;
		}
	}
	while i < curr.len() {
		events.push(RegionEvent {
			kind: RegionEventKind::Entered,
			uid: curr[i],
			region: name.to_string(),
		});
		i += 1;
	}
	while j < prev.len() {
		events.push(RegionEvent {
			kind: RegionEventKind::Exited,
			uid: prev[j],
			region: name.to_string(),
		});
		j += 1;
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	use crate::game::entities::{GameEntity, ENTITY_FLAG_COMBATABLE};

	fn setup() -> (RegionRegistry, EntityIndex, MapGeometry) {
		let map = MapGeometry::new(Vec3::ZERO, 2, 2);
		(RegionRegistry::new(&map), EntityIndex::default(), map)
	}
	fn unit(uid: u32, pos: Vec2) -> GameEntity {
		GameEntity::new(uid, pos, 1.0, 0, ENTITY_FLAG_COMBATABLE, Vec2::splat(1.0), 0.0)
	}
	#[test]
	fn name_collisions_are_rejected() {
		let (mut registry, entities, map) = setup();
		assert!(registry.add_circle("camp", Vec2::new(-10.0, 10.0), 5.0, &entities, &map));
		assert!(!registry.add_circle("camp", Vec2::new(-50.0, 50.0), 5.0, &entities, &map));
		assert!(!registry.add_rectangle("camp", Vec2::new(-50.0, 50.0), 4.0, 4.0, &entities, &map));
	}
	#[test]
	fn unknown_names_answer_empty() {
		let (registry, _, _) = setup();
		assert_eq!(None, registry.get_pos("ghost"));
		assert!(registry.get_ents("ghost").is_empty());
		assert!(!registry.contains_ent("ghost", 1));
	}
	#[test]
	fn membership_enters_and_exits_once_per_crossing() {
		let (mut registry, mut entities, map) = setup();
		entities.insert(unit(1, Vec2::new(-100.0, 100.0)));
		registry.add_circle("camp", Vec2::new(-10.0, 10.0), 8.0, &entities, &map);
		registry.update(&entities);
		assert!(registry.get_events().is_empty());

		entities.set_pos(1, Vec2::new(-10.0, 10.0));
		registry.update(&entities);
		let actual = vec![RegionEvent {
			kind: RegionEventKind::Entered,
			uid: 1,
			region: "camp".to_string(),
		}];
		assert_eq!(actual, registry.get_events());
		assert!(registry.contains_ent("camp", 1));

		// staying put reports nothing and clears the previous events
		registry.update(&entities);
		assert!(registry.get_events().is_empty());

		entities.set_pos(1, Vec2::new(-100.0, 100.0));
		registry.update(&entities);
		let actual = vec![RegionEvent {
			kind: RegionEventKind::Exited,
			uid: 1,
			region: "camp".to_string(),
		}];
		assert_eq!(actual, registry.get_events());
	}
	#[test]
	fn zombies_and_markers_never_join() {
		let (mut registry, mut entities, map) = setup();
		entities.insert(GameEntity::new(
			1,
			Vec2::new(-10.0, 10.0),
			1.0,
			0,
			ENTITY_FLAG_ZOMBIE,
			Vec2::splat(1.0),
			0.0,
		));
		entities.insert(GameEntity::new(
			2,
			Vec2::new(-10.0, 10.0),
			1.0,
			0,
			ENTITY_FLAG_MARKER,
			Vec2::splat(1.0),
			0.0,
		));
		registry.add_circle("camp", Vec2::new(-10.0, 10.0), 8.0, &entities, &map);
		registry.update(&entities);
		assert!(registry.get_ents("camp").is_empty());
	}
	#[test]
	fn removal_reports_exits_and_clears_bookkeeping() {
		let (mut registry, mut entities, map) = setup();
		entities.insert(unit(1, Vec2::new(-10.0, 10.0)));
		registry.add_circle("camp", Vec2::new(-10.0, 10.0), 8.0, &entities, &map);
		registry.update(&entities);
		registry.remove("camp", &map);
		let result = registry.get_events();
		assert!(result.contains(&RegionEvent {
			kind: RegionEventKind::Exited,
			uid: 1,
			region: "camp".to_string(),
		}));
		assert!(!registry.is_dirty("camp"));
		for r in 0..2u8 {
			for c in 0..2u8 {
				assert!(registry
					.intersecting_regions(ChunkCoord::new(r, c))
					.is_empty());
			}
		}
	}
	#[test]
	fn set_pos_requeries_membership() {
		let (mut registry, mut entities, map) = setup();
		entities.insert(unit(1, Vec2::new(-100.0, 100.0)));
		registry.add_circle("camp", Vec2::new(-10.0, 10.0), 8.0, &entities, &map);
		assert!(registry.set_pos("camp", Vec2::new(-100.0, 100.0), &entities, &map));
		assert!(registry.contains_ent("camp", 1));
		assert_eq!(Some(Vec2::new(-100.0, 100.0)), registry.get_pos("camp"));
		assert!(!registry.set_pos("ghost", Vec2::ZERO, &entities, &map));
	}
	#[test]
	fn intersection_lists_bucket_by_chunk() {
		let (mut registry, entities, map) = setup();
		// chunk (0,0) spans x in [-256, 0], z in [0, 256]
		registry.add_circle("small", Vec2::new(-10.0, 10.0), 5.0, &entities, &map);
		assert_eq!(
			vec!["small".to_string()],
			registry.intersecting_regions(ChunkCoord::new(0, 0))
		);
		assert!(registry
			.intersecting_regions(ChunkCoord::new(1, 1))
			.is_empty());
		// a rectangle straddling the vertical chunk border
		registry.add_rectangle("wide", Vec2::new(-256.0, 10.0), 40.0, 10.0, &entities, &map);
		assert!(registry
			.intersecting_regions(ChunkCoord::new(0, 0))
			.contains(&"wide".to_string()));
		assert!(registry
			.intersecting_regions(ChunkCoord::new(0, 1))
			.contains(&"wide".to_string()));
	}
	#[test]
	fn incremental_refs_track_between_ticks() {
		let (mut registry, mut entities, map) = setup();
		entities.insert(unit(1, Vec2::new(-100.0, 100.0)));
		registry.add_circle("camp", Vec2::new(-10.0, 10.0), 8.0, &entities, &map);
		entities.set_pos(1, Vec2::new(-10.0, 10.0));
		registry.add_ref(1, Vec2::new(-10.0, 10.0), &entities, &map);
		// visible immediately, before any update ran
		assert!(registry.contains_ent("camp", 1));
		registry.remove_ref(1, Vec2::new(-10.0, 10.0), &map);
		assert!(!registry.contains_ent("camp", 1));
	}
}
