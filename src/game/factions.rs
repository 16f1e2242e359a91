//! Diplomacy between factions and the fog-of-war query the enemies target
//! filters through. Fog is tracked at chunk granularity, the navigation core
//! only ever asks a yes/no question about an object's bounds
//!

use std::collections::HashSet;

use bevy::prelude::*;

use crate::prelude::*;

/// Diplomatic standing between two factions
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DiplomacyState {
	#[default]
	Peace,
	Neutral,
	War,
}

/// Symmetric diplomacy matrix plus the mask of player-controlled factions
pub struct FactionTable {
	diplomacy: [[DiplomacyState; MAX_FACTIONS]; MAX_FACTIONS],
	player_controlled: u16,
}

impl Default for FactionTable {
	fn default() -> Self {
		FactionTable {
			diplomacy: [[DiplomacyState::Peace; MAX_FACTIONS]; MAX_FACTIONS],
			player_controlled: 0,
		}
	}
}

impl FactionTable {
	/// Get the diplomatic standing between two factions
	pub fn get_diplomacy_state(&self, a: u8, b: u8) -> DiplomacyState {
		self.diplomacy[a as usize][b as usize]
	}
	/// Set the diplomatic standing between two factions, symmetrically
	pub fn set_diplomacy_state(&mut self, a: u8, b: u8, state: DiplomacyState) {
		assert!((a as usize) < MAX_FACTIONS && (b as usize) < MAX_FACTIONS);
		self.diplomacy[a as usize][b as usize] = state;
		self.diplomacy[b as usize][a as usize] = state;
	}
	/// Bitmask of every faction at war with `faction_id`
	pub fn enemy_factions(&self, faction_id: u8) -> u16 {
		let mut mask = 0;
		for other in 0..MAX_FACTIONS {
			if self.diplomacy[faction_id as usize][other] == DiplomacyState::War {
				mask |= 1 << other;
			}
		}
		mask
	}
	/// Mark or clear a faction as player controlled
	pub fn set_player_controlled(&mut self, faction_id: u8, controlled: bool) {
		assert!((faction_id as usize) < MAX_FACTIONS);
		if controlled {
			self.player_controlled |= 1 << faction_id;
		} else {
			self.player_controlled &= !(1 << faction_id);
		}
	}
	/// Bitmask of the player-controlled factions
	pub fn player_controlled_mask(&self) -> u16 {
		self.player_controlled
	}
}

/// Chunk-granular visibility per faction. While disabled every object is
/// visible, which is the default for headless simulation and tests
pub struct FogOfWar {
	enabled: bool,
	revealed: Vec<HashSet<ChunkCoord>>,
}

impl Default for FogOfWar {
	fn default() -> Self {
		FogOfWar {
			enabled: false,
			revealed: vec![HashSet::new(); MAX_FACTIONS],
		}
	}
}

impl FogOfWar {
	/// Turn fog tracking on or off
	pub fn set_enabled(&mut self, enabled: bool) {
		self.enabled = enabled;
	}
	/// Reveal a chunk to a faction
	pub fn reveal_chunk(&mut self, faction_id: u8, chunk: ChunkCoord) {
		self.revealed[faction_id as usize].insert(chunk);
	}
	/// Hide a chunk from a faction again
	pub fn conceal_chunk(&mut self, faction_id: u8, chunk: ChunkCoord) {
		self.revealed[faction_id as usize].remove(&chunk);
	}
	/// Whether an object is visible to any faction of `mask`, judged by the
	/// chunk under the object's centre
	pub fn obj_visible(&self, mask: u16, map: &MapGeometry, obb: &Obb) -> bool {
		if !self.enabled {
			return true;
		}
		let centre = obb.get_center();
		let Some(desc) = map.tile_desc_for_point(Vec2::new(centre.x, centre.z)) else {
			return false;
		};
		for faction in 0..MAX_FACTIONS {
			if mask & (1 << faction) == 0 {
				continue;
			}
			if self.revealed[faction].contains(&desc.get_chunk()) {
				return true;
			}
		}
		false
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	use bevy::prelude::*;
	#[test]
	fn enemy_mask_from_war_declarations() {
		let mut table = FactionTable::default();
		table.set_diplomacy_state(0, 2, DiplomacyState::War);
		table.set_diplomacy_state(0, 5, DiplomacyState::War);
		table.set_diplomacy_state(0, 1, DiplomacyState::Neutral);
		let result = table.enemy_factions(0);
		let actual = (1 << 2) | (1 << 5);
		assert_eq!(actual, result);
		// war is symmetric
		assert_eq!(1 << 0, table.enemy_factions(2));
	}
	#[test]
	fn fog_disabled_sees_everything() {
		let fog = FogOfWar::default();
		let map = MapGeometry::new(Vec3::ZERO, 1, 1);
		let obb = Obb::new(Vec3::new(-8.0, 0.0, 8.0), Vec2::splat(1.0), 0.0);
		assert!(fog.obj_visible(0, &map, &obb));
	}
	#[test]
	fn fog_enabled_requires_a_revealed_chunk() {
		let mut fog = FogOfWar::default();
		fog.set_enabled(true);
		let map = MapGeometry::new(Vec3::ZERO, 1, 1);
		let obb = Obb::new(Vec3::new(-8.0, 0.0, 8.0), Vec2::splat(1.0), 0.0);
		assert!(!fog.obj_visible(1 << 3, &map, &obb));
		fog.reveal_chunk(3, ChunkCoord::new(0, 0));
		assert!(fog.obj_visible(1 << 3, &map, &obb));
		assert!(!fog.obj_visible(1 << 4, &map, &obb));
	}
}
