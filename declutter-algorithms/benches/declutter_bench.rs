use criterion::{criterion_group, criterion_main, Criterion};
use declutter_algorithms::{
    buffers::remove_clutter_from_buffer, config::DeclutterConfig, pipeline::remove_clutter,
};
use pasture_core::{
    containers::{BorrowedMutBuffer, VectorBuffer},
    layout::PointType,
    nalgebra::Vector3,
};
use pasture_derive::PointType;
use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};

#[derive(PointType, Default, Clone, Copy, bytemuck::AnyBitPattern, bytemuck::NoUninit)]
#[repr(C, packed)]
struct CustomPointTypeSmall {
    #[pasture(BUILTIN_POSITION_3D)]
    pub position: Vector3<f64>,
    #[pasture(BUILTIN_CLASSIFICATION)]
    pub classification: u8,
}

const NUM_POINTS_SMALL: usize = 10000;
const NUM_POINTS_MEDIUM: usize = 100000;
const NUM_POINTS_BIG: usize = 1000000;

const EXTENT: f64 = 100.0;

/// Noisy ground with a few raised cables running along x
fn random_scene<R: Rng + ?Sized>(rng: &mut R, num_points: usize) -> Vec<Vector3<f64>> {
    let coordinate = Uniform::new(0.0, EXTENT);
    let noise = Uniform::new(-0.05, 0.05);
    let num_cable_points = num_points / 20;
    let mut positions = (0..num_points - num_cable_points)
        .map(|_| Vector3::new(rng.sample(coordinate), rng.sample(coordinate), rng.sample(noise)))
        .collect::<Vec<_>>();
    for index in 0..num_cable_points {
        let cable = (index % 4) as f64;
        positions.push(Vector3::new(
            rng.sample(coordinate),
            EXTENT * (cable + 1.0) / 5.0 + rng.sample(noise),
            1.5 + rng.sample(noise),
        ));
    }
    positions
}

fn get_dummy_points_interleaved(positions: &[Vector3<f64>]) -> VectorBuffer {
    let mut buffer = VectorBuffer::with_capacity(positions.len(), CustomPointTypeSmall::layout());
    for position in positions {
        buffer.view_mut().push_point(CustomPointTypeSmall {
            position: *position,
            classification: 2,
        });
    }
    buffer
}

fn bench(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let default_config = DeclutterConfig::default();
    let hough_config = DeclutterConfig {
        use_hough: true,
        ..Default::default()
    };
    for (testname, num_points) in [
        ("small", NUM_POINTS_SMALL),
        ("medium", NUM_POINTS_MEDIUM),
        ("big", NUM_POINTS_BIG),
    ] {
        let positions = random_scene(&mut rng, num_points);
        let buffer = get_dummy_points_interleaved(&positions);

        c.bench_function(&format!("declutter_positions_{}", testname), |b| {
            b.iter(|| remove_clutter(&positions, &default_config))
        });
        c.bench_function(&format!("declutter_positions_hough_{}", testname), |b| {
            b.iter(|| remove_clutter(&positions, &hough_config))
        });
        c.bench_function(&format!("declutter_interleaved_buffer_{}", testname), |b| {
            b.iter(|| remove_clutter_from_buffer(&buffer, &default_config))
        });
    }
}

criterion_group! {
    name = declutter;
    config = Criterion::default().sample_size(20);
    targets = bench
}
criterion_main!(declutter);
