use pasture_core::nalgebra::Vector3;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Points scattered uniformly over `[0, extent]^2` with a height noise of `+-noise` around zero
pub fn flat_ground(count: usize, extent: f64, noise: f64, seed: u64) -> Vec<Vector3<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            Vector3::new(
                rng.gen_range(0.0..extent),
                rng.gen_range(0.0..extent),
                rng.gen_range(-noise..noise),
            )
        })
        .collect()
}

/// Regular lattice of ground points with the given spacing over `[0, extent]^2` at height zero
pub fn ground_lattice(extent: f64, spacing: f64) -> Vec<Vector3<f64>> {
    let steps = (extent / spacing).round() as usize;
    (0..=steps)
        .flat_map(|i| {
            (0..=steps).map(move |j| Vector3::new(i as f64 * spacing, j as f64 * spacing, 0.0))
        })
        .collect()
}

/// `count` evenly spaced points along x, starting at `start`, spanning `length` in x and `width` in y,
/// at height `z`
pub fn raised_line(
    count: usize,
    start: (f64, f64),
    length: f64,
    width: f64,
    z: f64,
) -> Vec<Vector3<f64>> {
    (0..count)
        .map(|i| {
            let x = start.0 + length * i as f64 / (count - 1) as f64;
            let y = start.1 + width * (i % 5) as f64 / 4.0;
            Vector3::new(x, y, z)
        })
        .collect()
}

/// Dense lattice of points with the given spacing covering the rectangle `min..max` at height `z`
pub fn raised_band(
    min: (f64, f64),
    max: (f64, f64),
    spacing: f64,
    z: f64,
) -> Vec<Vector3<f64>> {
    let cols = ((max.0 - min.0) / spacing).round() as usize;
    let rows = ((max.1 - min.1) / spacing).round() as usize;
    (0..=cols)
        .flat_map(|i| {
            (0..=rows).map(move |j| {
                Vector3::new(min.0 + i as f64 * spacing, min.1 + j as f64 * spacing, z)
            })
        })
        .collect()
}
