//! `use bevy_chunk_nav_plugin::prelude::*;` to import common structures and
//! methods
//!

#[doc(hidden)]
pub use crate::navigation::{
	chunk::*,
	fields::{flow_field::*, integration_field::*, los_field::*, *},
	queue::*,
	target::*,
	utilities::*,
	*,
};

#[doc(hidden)]
pub use crate::{
	game::{entities::*, factions::*, regions::*},
	map::*,
	plugin::{cost_layer::*, flow_layer::*, region_layer::*, *},
};
