use glam::Vec3;

/// Refract a unit `direction` at a surface with unit `normal`, where `n` is the
/// ratio of the refractive index (or propagation speed) of the incoming medium
/// over the outgoing medium.
///
/// `normal` must point against `direction` (towards the incoming side); callers
/// flip it beforehand if needed. Returns `None` past the critical angle, where
/// no refracted ray exists (total internal reflection).
#[inline]
pub fn refract(direction: Vec3, normal: Vec3, n: f32) -> Option<Vec3> {
    let cross = normal.cross(direction);
    let discriminant = 1.0 - n * n * cross.dot(cross);

    if discriminant < 0.0 {
        return None;
    }

    Some(n * normal.cross(-cross) - normal * discriminant.sqrt())
}

/// Signed distance from `point` to the plane through `plane_co` with unit
/// normal `plane_normal`. Positive on the side the normal points to.
#[inline]
pub fn distance_point_to_plane(point: Vec3, plane_co: Vec3, plane_normal: Vec3) -> f32 {
    (point - plane_co).dot(plane_normal)
}

/// `steps` evenly spaced samples over `[start, end]`, both endpoints included.
pub fn linspace(start: f32, end: f32, steps: usize) -> Vec<f32> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let delta = (end - start) / (steps - 1) as f32;
            (0..steps).map(|i| start + delta * i as f32).collect()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn refract_normal_incidence_goes_straight_through() {
        let direction = glam::vec3(0., 0., -1.);
        let normal = glam::vec3(0., 0., 1.);

        let refracted = refract(direction, normal, 1.0 / 1.5).unwrap();
        assert_relative_eq!(refracted.x, direction.x);
        assert_relative_eq!(refracted.y, direction.y);
        assert_relative_eq!(refracted.z, direction.z);
    }

    #[test]
    fn refract_bends_towards_normal_entering_denser_medium() {
        let direction = glam::vec3(1., 0., -1.).normalize();
        let normal = glam::vec3(0., 0., 1.);

        let refracted = refract(direction, normal, 1.0 / 1.5).unwrap();

        let expected = (45f32.to_radians().sin() / 1.5).asin();
        let angle = (-refracted.z).acos();
        assert_abs_diff_eq!(angle, expected, epsilon = 1e-6);
    }

    #[test]
    fn refract_beyond_critical_angle_has_no_solution() {
        // Glass to air at 80 degrees, well past the ~41.8 degree critical angle.
        let theta = 80f32.to_radians();
        let direction = glam::vec3(theta.sin(), 0., -theta.cos());
        let normal = glam::vec3(0., 0., 1.);

        assert!(refract(direction, normal, 1.5).is_none());
    }

    #[test]
    fn plane_distance_is_signed() {
        let co = glam::vec3(0., 0., 5.);
        let normal = glam::vec3(0., 0., 1.);

        assert_relative_eq!(
            distance_point_to_plane(glam::vec3(3., 4., 7.), co, normal),
            2.
        );
        assert_relative_eq!(
            distance_point_to_plane(glam::vec3(3., 4., 1.), co, normal),
            -4.
        );
    }

    #[test]
    fn linspace_includes_both_endpoints() {
        let samples = linspace(-45., 45., 91);
        assert_eq!(samples.len(), 91);
        assert_relative_eq!(samples[0], -45.);
        assert_relative_eq!(samples[45], 0.);
        assert_relative_eq!(samples[90], 45.);

        assert_eq!(linspace(1., 2., 1), vec![1.]);
        assert!(linspace(1., 2., 0).is_empty());
    }
}
