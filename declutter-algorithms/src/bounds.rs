use pasture_core::{
    math::AABB,
    nalgebra::{Point3, Vector3},
};

/// Returns `true` if all three coordinates of `position` are finite
pub fn is_finite(position: &Vector3<f64>) -> bool {
    position.x.is_finite() && position.y.is_finite() && position.z.is_finite()
}

/// Calculate the bounding box of the given `positions`. Positions with non-finite coordinates
/// are skipped. Returns `None` if there are no finite positions
pub fn calculate_bounds(positions: &[Vector3<f64>]) -> Option<AABB<f64>> {
    let mut pos_min = Point3::new(f64::MAX, f64::MAX, f64::MAX);
    let mut pos_max = Point3::new(f64::MIN, f64::MIN, f64::MIN);
    let mut any_finite = false;
    for pos in positions.iter().filter(|pos| is_finite(pos)) {
        any_finite = true;
        if pos.x < pos_min.x {
            pos_min.x = pos.x;
        }
        if pos.y < pos_min.y {
            pos_min.y = pos.y;
        }
        if pos.z < pos_min.z {
            pos_min.z = pos.z;
        }
        if pos.x > pos_max.x {
            pos_max.x = pos.x;
        }
        if pos.y > pos_max.y {
            pos_max.y = pos.y;
        }
        if pos.z > pos_max.z {
            pos_max.z = pos.z;
        }
    }
    if !any_finite {
        return None;
    }
    Some(AABB::from_min_max(pos_min, pos_max))
}
