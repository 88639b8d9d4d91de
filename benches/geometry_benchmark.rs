// benches/geometry_benchmark.rs
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use procedural_scenes::rendering_lib::generator::{blade_field, plane, point_cloud_shell, PlaneSpec};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn geometry_benchmark_fn(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xf1ef);

    let mut group = c.benchmark_group("GeometryGeneration");

    group.bench_function("point_cloud_shell_500", |b| {
        b.iter(|| point_cloud_shell(black_box(500), black_box(0.5), black_box(0.8), &mut rng))
    });

    group.bench_function("blade_field_500", |b| {
        b.iter(|| blade_field(black_box(500), black_box(0.4), &mut rng))
    });

    let floor = PlaneSpec { width: 10.0, height: 10.0, width_segments: 32, height_segments: 32 };
    group.bench_function("plane_32x32", |b| b.iter(|| plane(black_box(floor))));

    group.finish();
}

criterion_group!(benches, geometry_benchmark_fn);
criterion_main!(benches);
