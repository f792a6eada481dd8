//! Icosphere generation by recursive midpoint subdivision.
//!
//! Level 0 is the regular icosahedron (12 vertices, 20 faces). Each further
//! level splits every triangle into four and pushes the new midpoints onto
//! the unit sphere, so level `L` has `10·4^L + 2` vertices and `20·4^L`
//! faces. All faces wind counter-clockwise seen from outside the sphere, and
//! the original vertices keep their indices at every level.

use std::collections::HashMap;

use glam::DVec3;

use crate::surface::{Face, Surface};

/// Vertices of a level-`level` icosphere.
pub const fn vertex_count(level: u32) -> usize {
    10 * 4usize.pow(level) + 2
}

/// Faces of a level-`level` icosphere.
pub const fn face_count(level: u32) -> usize {
    20 * 4usize.pow(level)
}

const ICOSAHEDRON_FACES: [Face; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// The unit icosahedron.
pub fn icosahedron() -> Surface {
    let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let coords = [
        (-1.0, phi, 0.0),
        (1.0, phi, 0.0),
        (-1.0, -phi, 0.0),
        (1.0, -phi, 0.0),
        (0.0, -1.0, phi),
        (0.0, 1.0, phi),
        (0.0, -1.0, -phi),
        (0.0, 1.0, -phi),
        (phi, 0.0, -1.0),
        (phi, 0.0, 1.0),
        (-phi, 0.0, -1.0),
        (-phi, 0.0, 1.0),
    ]
    .into_iter()
    .map(|(x, y, z)| DVec3::new(x, y, z).normalize())
    .collect();

    Surface {
        coords,
        faces: ICOSAHEDRON_FACES.to_vec(),
    }
}

/// Icosphere at the given subdivision level.
pub fn icosphere(level: u32) -> Surface {
    (0..level).fold(icosahedron(), |surface, _| subdivide(&surface))
}

/// Split every triangle into four, projecting new vertices onto the unit sphere.
pub fn subdivide(surface: &Surface) -> Surface {
    let mut coords = surface.coords.clone();
    let mut faces = Vec::with_capacity(surface.faces.len() * 4);
    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::with_capacity(surface.faces.len() * 3 / 2);

    let mut midpoint = |a: u32, b: u32, coords: &mut Vec<DVec3>| -> u32 {
        let key = if a < b { (a, b) } else { (b, a) };
        *midpoints.entry(key).or_insert_with(|| {
            let mid = (coords[a as usize] + coords[b as usize]).normalize();
            coords.push(mid);
            (coords.len() - 1) as u32
        })
    };

    for &[v0, v1, v2] in &surface.faces {
        let m01 = midpoint(v0, v1, &mut coords);
        let m12 = midpoint(v1, v2, &mut coords);
        let m20 = midpoint(v2, v0, &mut coords);

        faces.push([v0, m01, m20]);
        faces.push([v1, m12, m01]);
        faces.push([v2, m20, m12]);
        faces.push([m01, m12, m20]);
    }

    Surface { coords, faces }
}
