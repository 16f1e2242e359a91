//! Defines the Bevy [Plugin] wiring the navigation systems together. The
//! [crate::prelude::NavigationWorld] and
//! [crate::prelude::RegionRegistry] resources are inserted by the app once
//! the map is known, the plugin only registers events and systems
//!

use bevy::prelude::*;

use crate::prelude::FlowFieldCache;

pub mod cost_layer;
pub mod flow_layer;
pub mod region_layer;

pub struct ChunkNavPlugin;

impl Plugin for ChunkNavPlugin {
	fn build(&self, app: &mut App) {
		app.init_resource::<FlowFieldCache>()
			.add_event::<cost_layer::EventUpdateTileCost>()
			.add_event::<cost_layer::EventRebuildPortals>()
			.add_event::<flow_layer::EventFlowFieldRequest>()
			.add_event::<region_layer::EventEnteredRegion>()
			.add_event::<region_layer::EventExitedRegion>()
			.add_systems(
				Update,
				(
					cost_layer::process_cost_updates,
					cost_layer::rebuild_portals,
					flow_layer::generate_flow_fields,
				)
					.chain(),
			)
			.add_systems(Update, region_layer::update_regions);
	}
}
