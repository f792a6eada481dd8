//! Edge lists and per-edge geometric attributes.
//!
//! Every vertex contributes a self-loop followed by one edge per ring
//! neighbour, in ring order; vertices are visited in index order. Graph
//! convolutions index attributes positionally against this edge list, so the
//! ordering is part of the contract.

use std::f64::consts::{PI, TAU};

use glam::{DVec2, DVec3};

use crate::neighbours::NeighbourRings;

/// Stand-in for a zero attribute, so no edge ever carries a true zero.
pub const EPSILON: f64 = 1e-15;

/// `(source, target)` vertex pair.
pub type Edge = [u32; 2];

/// Two-component edge descriptor.
pub type EdgeAttr = [f64; 2];

/// Which edge descriptor a convolution consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Normalised fan angle and Euclidean distance.
    #[default]
    Exact,
    /// Latitude/longitude difference, longitude wrapped into `[0, 2π)`.
    Pseudo,
}

impl EdgeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            EdgeMode::Exact => "exact",
            EdgeMode::Pseudo => "pseudo",
        }
    }
}

impl std::fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EdgeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(EdgeMode::Exact),
            "pseudo" => Ok(EdgeMode::Pseudo),
            other => Err(format!("unknown distance type {:?} (expected exact or pseudo)", other)),
        }
    }
}

/// Edges and their exact attributes, kept as two parallel arrays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeTable {
    pub edges: Vec<Edge>,
    pub attrs: Vec<EdgeAttr>,
}

impl EdgeTable {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Single-array form `[source, target, angle, distance]` used on disk.
    pub fn to_rows(&self) -> Vec<[f64; 4]> {
        self.edges
            .iter()
            .zip(&self.attrs)
            .map(|(&[s, t], &[a, d])| [f64::from(s), f64::from(t), a, d])
            .collect()
    }

    /// Split the single-array form back into edges and attributes.
    pub fn from_rows(rows: &[[f64; 4]]) -> Result<Self, String> {
        let mut edges = Vec::with_capacity(rows.len());
        let mut attrs = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let index = |x: f64| -> Result<u32, String> {
                if x.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&x) {
                    Ok(x as u32)
                } else {
                    Err(format!("row {} has non-index vertex {}", i, x))
                }
            };
            edges.push([index(row[0])?, index(row[1])?]);
            attrs.push([row[2], row[3]]);
        }
        Ok(Self { edges, attrs })
    }
}

/// Normalised angular position and distance of each ring neighbour.
///
/// `angle[i]` is the angle at `center` between neighbour `i` and its
/// successor `i + 1` (cyclically). Positions are the running sum of those
/// angles rescaled so the last one is exactly 2π, whatever the real fan
/// total is. Distances are to neighbour `i`.
pub fn fan_positions(center: DVec3, ring: &[DVec3]) -> (Vec<f64>, Vec<f64>) {
    let k = ring.len();
    let mut cumulative = Vec::with_capacity(k);
    let mut dists = Vec::with_capacity(k);
    let mut total = 0.0;
    for i in 0..k {
        let v1 = ring[i] - center;
        let v2 = ring[(i + 1) % k] - center;
        let cos = v1.dot(v2) / (v1.length() * v2.length());
        total += cos.clamp(-1.0, 1.0).acos();
        cumulative.push(total);
        dists.push(v1.length());
    }
    let positions = cumulative.into_iter().map(|c| TAU * c / total).collect();
    (positions, dists)
}

/// Exact edge list and attributes for a whole level.
pub fn exact_edge_attrs(coords: &[DVec3], rings: &NeighbourRings) -> EdgeTable {
    let n_edges = rings.total_degree() + rings.vertex_count();
    let mut table = EdgeTable {
        edges: Vec::with_capacity(n_edges),
        attrs: Vec::with_capacity(n_edges),
    };
    let mut ring_coords = Vec::new();

    for (v, ring) in rings.iter().enumerate() {
        let vertex = v as u32;
        table.edges.push([vertex, vertex]);
        table.attrs.push([EPSILON, EPSILON]);

        ring_coords.clear();
        ring_coords.extend(ring.iter().map(|&n| coords[n as usize]));
        let (positions, dists) = fan_positions(coords[v], &ring_coords);

        for ((&n, angle), dist) in ring.iter().zip(positions).zip(dists) {
            table.edges.push([vertex, n]);
            table.attrs.push([angle, dist]);
        }
    }
    table
}

/// Wrap a longitude difference into `[0, 2π)` without ever returning zero.
///
/// Zero becomes [`EPSILON`] before wrapping and negative differences are
/// shifted by π first. A difference of exactly -π would land on zero after
/// wrapping and is nudged to [`EPSILON`] as well.
pub fn wrap_longitude(alpha: f64) -> f64 {
    let shifted = if alpha == 0.0 {
        EPSILON
    } else if alpha < 0.0 {
        PI + alpha
    } else {
        alpha
    };
    let wrapped = (TAU + shifted) % TAU;
    if wrapped == 0.0 {
        EPSILON
    } else {
        wrapped
    }
}

/// Pseudo attributes: `spherical[source] - spherical[target]` per edge.
pub fn pseudo_edge_attrs(edges: &[Edge], spherical: &[DVec2]) -> Vec<EdgeAttr> {
    edges
        .iter()
        .map(|&[col, row]| {
            let d = spherical[col as usize] - spherical[row as usize];
            [d.x, wrap_longitude(d.y)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbours::extract_neighbours;
    use crate::spherical::spherical_coords;
    use meld_mesh::{icosahedron, icosphere, Surface};

    fn table(surface: &Surface) -> (NeighbourRings, EdgeTable) {
        let rings = extract_neighbours(&surface.faces, surface.vertex_count()).unwrap();
        let table = exact_edge_attrs(&surface.coords, &rings);
        (rings, table)
    }

    #[test]
    fn icosahedron_has_72_edges() {
        let (_, t) = table(&icosahedron());
        assert_eq!(t.len(), 12 * 6);
        assert_eq!(t.attrs.len(), t.edges.len());
    }

    #[test]
    fn edge_count_is_degree_plus_self_loop() {
        let s = icosphere(2);
        let (rings, t) = table(&s);
        let expected: usize = rings.iter().map(|r| r.len() + 1).sum();
        assert_eq!(t.len(), expected);
    }

    #[test]
    fn edges_grouped_per_vertex_self_loop_first() {
        let s = icosphere(1);
        let (rings, t) = table(&s);
        let mut at = 0;
        for (v, ring) in rings.iter().enumerate() {
            assert_eq!(t.edges[at], [v as u32, v as u32]);
            assert_eq!(t.attrs[at], [EPSILON, EPSILON]);
            for (j, &n) in ring.iter().enumerate() {
                assert_eq!(t.edges[at + 1 + j], [v as u32, n]);
            }
            at += ring.len() + 1;
        }
        assert_eq!(at, t.len());
    }

    #[test]
    fn fan_positions_increase_to_two_pi() {
        let s = icosphere(2);
        let (rings, t) = table(&s);
        let mut at = 0;
        for ring in rings.iter() {
            let positions: Vec<f64> = t.attrs[at + 1..at + 1 + ring.len()].iter().map(|a| a[0]).collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);
            assert!((positions[positions.len() - 1] - TAU).abs() < 1e-6);
            at += ring.len() + 1;
        }
    }

    #[test]
    fn distances_are_edge_lengths() {
        let s = icosahedron();
        let (_, t) = table(&s);
        // Unit icosahedron edge length: 1 / sin(2π/5).
        let edge = 1.0 / (2.0 * PI / 5.0).sin();
        for (&[a, b], &[_, d]) in t.edges.iter().zip(&t.attrs) {
            if a != b {
                assert!((d - edge).abs() < 1e-12, "{} -> {}: {}", a, b, d);
                assert!((d - (s.coords[b as usize] - s.coords[a as usize]).length()).abs() < 1e-15);
            }
        }
    }

    #[test]
    fn regular_fan_is_evenly_spaced() {
        let ring: Vec<DVec3> = (0..6)
            .map(|i| {
                let t = TAU * i as f64 / 6.0;
                DVec3::new(t.cos(), t.sin(), 0.0)
            })
            .collect();
        let (positions, dists) = fan_positions(DVec3::ZERO, &ring);
        for (i, p) in positions.iter().enumerate() {
            assert!((p - TAU * (i + 1) as f64 / 6.0).abs() < 1e-12);
        }
        assert!(dists.iter().all(|d| (d - 1.0).abs() < 1e-12));
    }

    #[test]
    fn rows_round_trip() {
        let (_, t) = table(&icosphere(1));
        let back = EdgeTable::from_rows(&t.to_rows()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn rows_with_fractional_index_are_rejected() {
        assert!(EdgeTable::from_rows(&[[0.5, 1.0, 0.0, 0.0]]).is_err());
        assert!(EdgeTable::from_rows(&[[-1.0, 1.0, 0.0, 0.0]]).is_err());
    }

    #[test]
    fn wrap_longitude_cases() {
        assert!(wrap_longitude(0.0) > 0.0 && wrap_longitude(0.0) < 1e-14);
        assert_eq!(wrap_longitude(-PI), EPSILON);
        assert!((wrap_longitude(1.0) - 1.0).abs() < 1e-12);
        assert!((wrap_longitude(-1.0) - (PI - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn pseudo_longitudes_in_range_and_nonzero() {
        let s = icosphere(2);
        let (_, t) = table(&s);
        let sph = spherical_coords(&s.coords);
        let pseudo = pseudo_edge_attrs(&t.edges, &sph);
        assert_eq!(pseudo.len(), t.len());
        for (&[a, b], &[lat, lon]) in t.edges.iter().zip(&pseudo) {
            assert!(lon > 0.0 && lon < TAU, "edge {}->{}: {}", a, b, lon);
            let raw = sph[a as usize] - sph[b as usize];
            assert_eq!(lat, raw.x);
        }
    }

    #[test]
    fn edge_mode_parsing() {
        assert_eq!("exact".parse::<EdgeMode>().unwrap(), EdgeMode::Exact);
        assert_eq!(" Pseudo ".parse::<EdgeMode>().unwrap(), EdgeMode::Pseudo);
        assert!("cosine".parse::<EdgeMode>().is_err());
        assert_eq!(EdgeMode::Pseudo.to_string(), "pseudo");
    }

    proptest::proptest! {
        #[test]
        fn wrapped_longitude_never_zero(alpha in -TAU..TAU) {
            let w = wrap_longitude(alpha);
            proptest::prop_assert!(w > 0.0 && w < TAU);
        }
    }
}
