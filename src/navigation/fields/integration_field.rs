//! The [IntegrationField] holds the accumulated cost of reaching the seed
//! tiles of a field update. Seeds start at `0.0` and a Dijkstra wavefront
//! relaxes outwards over the 4 orthogonal neighbours of each tile, so with a
//! uniform cost grid the values form a diamond pattern around the seeds:
//!
//! ```text
//!  _______________________
//! |     |     |     |     |
//! |  3  |  2  |  3  |  4  |
//! |_____|_____|_____|_____|
//! |     |     |     |     |
//! |  2  |  1  |  2  |  3  |
//! |_____|_____|_____|_____|
//! |     |     |     |     |
//! |  1  |  0  |  1  |  2  |
//! |_____|_____|_____|_____|
//! |     |     |     |     |
//! |  2  |  1  |  2  |  3  |
//! |_____|_____|_____|_____|
//! ```
//!
//! Tiles the wavefront never reaches keep an infinite value and read as
//! unreachable. Diagonal movement is reconsidered only later when flow
//! directions are derived.
//!
//! A second mode relaxes only impassable tiles, producing the distance from
//! the nearest walkable tile that the fallback builders use to route stuck
//! actors out of dynamic blockers
//!

use crate::prelude::*;

#[derive(Clone)]
pub struct IntegrationField([[f32; FIELD_RES_C]; FIELD_RES_R]);

impl Default for IntegrationField {
	fn default() -> Self {
		IntegrationField([[f32::INFINITY; FIELD_RES_C]; FIELD_RES_R])
	}
}

impl Field<f32> for IntegrationField {
	/// Get a reference to the field array
	fn get(&self) -> &[[f32; FIELD_RES_C]; FIELD_RES_R] {
		&self.0
	}
	/// Retrieve a field cell value
	fn get_field_cell_value(&self, cell: Coord) -> f32 {
		self.0[cell.get_row()][cell.get_column()]
	}
	/// Set a field cell to a value
	fn set_field_cell_value(&mut self, value: f32, cell: Coord) {
		self.0[cell.get_row()][cell.get_column()] = value;
	}
}

impl IntegrationField {
	/// Creates a new [IntegrationField] where all cells are unreachable
	/// apart from the `seeds` which are set to `0.0`
	pub fn new(seeds: &[Coord]) -> Self {
		let mut field = IntegrationField::default();
		for seed in seeds {
			field.set_field_cell_value(0.0, *seed);
		}
		field
	}

	/// Expand the wavefront from the `seeds` over passable tiles,
	/// accumulating step costs from the chunk's cost grid. Tiles under a
	/// dynamic blocker that remain traversable through the enemy-occupancy
	/// rule are stepped onto at the impassable sentinel cost
	pub fn calculate(&mut self, seeds: &[Coord], chunk: &NavChunk, enemies: Option<u16>) {
		let mut frontier = PriorityQueue::new();
		for seed in seeds {
			self.set_field_cell_value(0.0, *seed);
			frontier.push(0.0, *seed);
		}
		while let Some(curr) = frontier.pop() {
			for (neighbour, step_cost) in chunk.grid_neighbours(curr, true, enemies) {
				let total = self.get_field_cell_value(curr) + step_cost as f32;
				if total < self.get_field_cell_value(neighbour) {
					self.set_field_cell_value(total, neighbour);
					if !frontier.contains(|a, b| a == b, neighbour) {
						frontier.push(total, neighbour);
					}
				}
			}
		}
	}

	/// Expand the wavefront from the `seeds` but relax only impassable
	/// tiles, producing each blocked tile's distance from the nearest
	/// walkable perimeter
	pub fn calculate_nonpass(&mut self, seeds: &[Coord], chunk: &NavChunk) {
		let mut frontier = PriorityQueue::new();
		for seed in seeds {
			self.set_field_cell_value(0.0, *seed);
			frontier.push(0.0, *seed);
		}
		while let Some(curr) = frontier.pop() {
			for (neighbour, step_cost) in chunk.grid_neighbours(curr, false, None) {
				if chunk.tile_passable(neighbour) {
					continue;
				}
				let total = self.get_field_cell_value(curr) + step_cost as f32;
				if total < self.get_field_cell_value(neighbour) {
					self.set_field_cell_value(total, neighbour);
					if !frontier.contains(|a, b| a == b, neighbour) {
						frontier.push(total, neighbour);
					}
				}
			}
		}
	}
}
