//! Logic for mutating chunk cost data and keeping the derived structures
//! (local islands, portals) in step
//!

use crate::prelude::*;
use bevy::prelude::*;

/// A request to change the base cost of one tile
#[derive(Event)]
pub struct EventUpdateTileCost {
	/// Layer the change applies to
	layer: NavLayer,
	/// Global address of the tile
	tile: TileDesc,
	/// New base cost, `1..=254` or [COST_IMPASSABLE]
	cost: u8,
}

impl EventUpdateTileCost {
	pub fn new(layer: NavLayer, tile: TileDesc, cost: u8) -> Self {
		EventUpdateTileCost { layer, tile, cost }
	}
}

/// A request to rediscover the portals of a layer after cost changes
#[derive(Event)]
pub struct EventRebuildPortals {
	layer: NavLayer,
}

impl EventRebuildPortals {
	pub fn new(layer: NavLayer) -> Self {
		EventRebuildPortals { layer }
	}
}

/// Apply queued cost changes, relabel the local islands of each touched
/// chunk and queue a portal rebuild per touched layer
pub fn process_cost_updates(
	mut events: EventReader<EventUpdateTileCost>,
	mut world: ResMut<NavigationWorld>,
	mut rebuilds: EventWriter<EventRebuildPortals>,
) {
	let mut touched: Vec<(NavLayer, ChunkCoord)> = Vec::new();
	for event in events.read() {
		let chunk = world
			.get_nav_mut()
			.get_chunk_mut(event.layer, event.tile.get_chunk());
		chunk.set_cost(event.tile.get_tile(), event.cost);
		if !touched.contains(&(event.layer, event.tile.get_chunk())) {
			touched.push((event.layer, event.tile.get_chunk()));
		}
	}
	let mut layers: Vec<NavLayer> = Vec::new();
	for (layer, chunk_coord) in touched {
		world
			.get_nav_mut()
			.get_chunk_mut(layer, chunk_coord)
			.recalculate_local_islands();
		if !layers.contains(&layer) {
			layers.push(layer);
		}
	}
	for layer in layers {
		rebuilds.send(EventRebuildPortals::new(layer));
	}
}

/// Rediscover portals for each layer with pending cost changes
pub fn rebuild_portals(
	mut events: EventReader<EventRebuildPortals>,
	mut world: ResMut<NavigationWorld>,
) {
	let mut done: Vec<NavLayer> = Vec::new();
	for event in events.read() {
		if done.contains(&event.layer) {
			continue;
		}
		world.get_nav_mut().rebuild_portals(event.layer);
		done.push(event.layer);
	}
}
