//! Chunked flow-field pathfinding with line-of-sight fields, built for
//! real-time strategy crowds where thousands of units share destinations
//!

pub mod game;
pub mod map;
pub mod navigation;
pub mod plugin;

pub mod prelude;
