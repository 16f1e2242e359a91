//! Logic relating to [FlowField] generation
//!

use crate::prelude::*;
use bevy::prelude::*;

/// A request to generate the [FlowField] of one chunk towards a target
#[derive(Event)]
pub struct EventFlowFieldRequest {
	/// The chunk to generate for
	chunk: ChunkCoord,
	/// The layer the requesting actor moves on
	layer: NavLayer,
	/// The requesting faction, [None] for faction-agnostic fields
	faction_id: Option<u8>,
	/// What the field should steer towards
	target: FieldTarget,
}

impl EventFlowFieldRequest {
	pub fn new(
		chunk: ChunkCoord,
		layer: NavLayer,
		faction_id: Option<u8>,
		target: FieldTarget,
	) -> Self {
		EventFlowFieldRequest {
			chunk,
			layer,
			faction_id,
			target,
		}
	}
}

/// Service queued requests, generating each missing [FlowField] into the
/// [FlowFieldCache]. Portal-mask targets have no cache identity and are
/// skipped, callers wanting one drive [FlowField::update] directly
pub fn generate_flow_fields(
	mut events: EventReader<EventFlowFieldRequest>,
	world: Res<NavigationWorld>,
	mut cache: ResMut<FlowFieldCache>,
) {
	for event in events.read() {
		if matches!(event.target, FieldTarget::PortalMask(_)) {
			warn!(
				"dropping uncacheable portal-mask flow field request for chunk {:?}",
				event.chunk
			);
			continue;
		}
		let id = FlowFieldId::new(event.chunk, &event.target, event.layer);
		if cache.get_field(id).is_some() {
			continue;
		}
		let mut field = FlowField::new(event.chunk);
		field.update(&world, event.layer, event.faction_id, event.target);
		cache.insert_field(id, field);
	}
}
