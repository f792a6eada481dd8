//! Cartesian to spherical parameterisation.

use std::f64::consts::FRAC_PI_2;

use glam::{DVec2, DVec3};

/// `(radius, inclination, azimuth)` of a point.
///
/// Inclination is measured from +z in `[0, π]`, azimuth from +x in `(-π, π]`.
pub fn to_spherical(p: DVec3) -> DVec3 {
    let xy = p.x * p.x + p.y * p.y;
    DVec3::new((xy + p.z * p.z).sqrt(), xy.sqrt().atan2(p.z), p.y.atan2(p.x))
}

/// Per-vertex `(latitude, longitude)` with latitude centred on the equator.
///
/// Radius is dropped (unit sphere assumed) and inclination shifted by -π/2,
/// so the north pole maps to `-π/2` and the equator to `0`.
pub fn spherical_coords(coords: &[DVec3]) -> Vec<DVec2> {
    coords
        .iter()
        .map(|&p| {
            let s = to_spherical(p);
            DVec2::new(s.y - FRAC_PI_2, s.z)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn poles_and_equator() {
        let out = spherical_coords(&[DVec3::Z, -DVec3::Z, DVec3::X, DVec3::Y]);
        assert!(close(out[0].x, -FRAC_PI_2));
        assert!(close(out[1].x, FRAC_PI_2));
        assert!(close(out[2].x, 0.0) && close(out[2].y, 0.0));
        assert!(close(out[3].x, 0.0) && close(out[3].y, FRAC_PI_2));
    }

    #[test]
    fn azimuth_of_negative_x_is_pi() {
        let s = to_spherical(DVec3::new(-1.0, 0.0, 0.0));
        assert!(close(s.z, PI));
    }

    #[test]
    fn radius_is_kept_by_to_spherical() {
        let s = to_spherical(DVec3::new(0.0, 3.0, 4.0));
        assert!(close(s.x, 5.0));
    }

    proptest::proptest! {
        #[test]
        fn spherical_inverts_to_the_same_direction(
            x in -1.0f64..1.0, y in -1.0f64..1.0, z in -1.0f64..1.0
        ) {
            let p = DVec3::new(x, y, z);
            proptest::prop_assume!(p.length() > 1e-3);
            let s = to_spherical(p);
            let back = DVec3::new(
                s.x * s.y.sin() * s.z.cos(),
                s.x * s.y.sin() * s.z.sin(),
                s.x * s.y.cos(),
            );
            proptest::prop_assert!((back - p).length() < 1e-9);
        }
    }
}
