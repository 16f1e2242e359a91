//! Per-tick region maintenance, re-emitting the registry's membership
//! events through the Bevy event bus
//!

use crate::game::regions::{RegionEventKind, RegionRegistry};
use crate::prelude::*;
use bevy::prelude::*;

/// An entity crossed into a region this tick
#[derive(Event, Clone, PartialEq, Eq, Debug)]
pub struct EventEnteredRegion {
	pub uid: u32,
	pub region: String,
}

/// An entity crossed out of a region this tick
#[derive(Event, Clone, PartialEq, Eq, Debug)]
pub struct EventExitedRegion {
	pub uid: u32,
	pub region: String,
}

/// Refresh region membership against the entity index and publish the
/// resulting enter/exit events
pub fn update_regions(
	mut registry: ResMut<RegionRegistry>,
	world: Res<NavigationWorld>,
	mut entered: EventWriter<EventEnteredRegion>,
	mut exited: EventWriter<EventExitedRegion>,
) {
	registry.update(world.get_entities());
	for event in registry.get_events() {
		match event.kind {
			RegionEventKind::Entered => {
				entered.send(EventEnteredRegion {
					uid: event.uid,
					region: event.region.clone(),
				});
			}
			RegionEventKind::Exited => {
				exited.send(EventExitedRegion {
					uid: event.uid,
					region: event.region.clone(),
				});
			}
		}
	}
}
