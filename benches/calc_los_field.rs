//! Measure LosField generation for a destination chunk and the stitched
//! propagation into a neighbour
//!

use bevy::prelude::*;
use bevy_chunk_nav_plugin::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn prepare_world() -> NavigationWorld {
	let mut world = NavigationWorld::new(MapGeometry::new(Vec3::ZERO, 4, 4));
	let chunk = world
		.get_nav_mut()
		.get_chunk_mut(NavLayer::Ground, ChunkCoord::new(0, 0));
	// scattered wall segments so corners cast shadow lines
	for base in [(10u8, 10u8), (20, 40), (45, 25), (50, 50)] {
		for step in 0..6u8 {
			chunk.set_cost(Coord::new(base.0 + step, base.1), COST_IMPASSABLE);
		}
	}
	world
}

fn los_pair(world: &NavigationWorld) {
	let target = TileDesc::new(ChunkCoord::new(0, 0), Coord::new(32, 32));
	let dest = DestId::new(NavLayer::Ground, None, target);
	let mut dest_los = LosField::new(ChunkCoord::new(0, 0));
	dest_los.calculate(dest, target, world, None);
	let mut next_los = LosField::new(ChunkCoord::new(0, 1));
	next_los.calculate(dest, target, world, Some(&dest_los));
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("algorithm_use");
	group.significance_level(0.05).sample_size(100);
	let world = prepare_world();
	group.bench_function("calc_los_pair", |b| {
		b.iter(|| los_pair(black_box(&world)))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
