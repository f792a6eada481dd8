//! Ordered neighbour rings from a triangle list.
//!
//! Every triangle `(a, b, c)` tells each of its corners which two vertices
//! follow each other around it: `a` sees `b` then `c`, `b` sees `c` then
//! `a`, `c` sees `a` then `b`. Chaining those "next" hints around a vertex
//! walks its fan and yields the neighbours in winding order.
//!
//! The walk starts at the first element of the vertex's first hint, so the
//! ring begins with that hint's second element and ends back on its first.
//! Anything that prevents one closed walk over all hints (open fan, pinched
//! vertex, repeated corner) is reported, never papered over: every angle
//! downstream assumes a proper cycle.

use std::fmt;

use meld_mesh::Face;
use serde::{Deserialize, Serialize};

/// Why a vertex's hints do not form a single closed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateReason {
    /// No triangle touches the vertex.
    Isolated,
    /// A triangle repeats a corner, so the vertex neighbours itself or a
    /// hint goes nowhere.
    SelfReference,
    /// Two triangles claim to follow the same neighbour.
    AmbiguousSuccessor { from: u32 },
    /// The fan is open: nothing follows this neighbour.
    MissingSuccessor { from: u32 },
    /// The walk closed before using every triangle (several fans meet here).
    Split { ring_len: usize, hints: usize },
}

impl fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegenerateReason::Isolated => write!(f, "no face references it"),
            DegenerateReason::SelfReference => write!(f, "a face repeats a vertex"),
            DegenerateReason::AmbiguousSuccessor { from } => {
                write!(f, "two faces continue the fan from vertex {}", from)
            }
            DegenerateReason::MissingSuccessor { from } => {
                write!(f, "no face continues the fan from vertex {}", from)
            }
            DegenerateReason::Split { ring_len, hints } => {
                write!(f, "fan closed after {} of {} faces", ring_len, hints)
            }
        }
    }
}

/// A vertex whose neighbour ring could not be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegenerateVertex {
    pub vertex: u32,
    pub reason: DegenerateReason,
}

/// Per-vertex neighbour rings in an offsets + flat layout.
///
/// Ring `v` is `flat[offsets[v]..offsets[v + 1]]`. Degrees vary (five at the
/// twelve icosahedron corners, six elsewhere), so no fixed width is assumed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NeighbourRings {
    offsets: Vec<usize>,
    flat: Vec<u32>,
}

impl NeighbourRings {
    /// Build from one ring per vertex.
    pub fn from_rings<I, R>(rings: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u32]>,
    {
        let mut offsets = vec![0];
        let mut flat = Vec::new();
        for ring in rings {
            flat.extend_from_slice(ring.as_ref());
            offsets.push(flat.len());
        }
        Self { offsets, flat }
    }

    pub fn vertex_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Ordered neighbours of `vertex`.
    pub fn ring(&self, vertex: usize) -> &[u32] {
        &self.flat[self.offsets[vertex]..self.offsets[vertex + 1]]
    }

    pub fn degree(&self, vertex: usize) -> usize {
        self.offsets[vertex + 1] - self.offsets[vertex]
    }

    /// Sum of all degrees (each undirected mesh edge counted twice).
    pub fn total_degree(&self) -> usize {
        self.flat.len()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[u32]> + '_ {
        self.offsets.windows(2).map(move |w| &self.flat[w[0]..w[1]])
    }

    /// Smallest and largest degree, `None` when empty.
    pub fn degree_range(&self) -> Option<(usize, usize)> {
        let mut degrees = self.offsets.windows(2).map(|w| w[1] - w[0]);
        let first = degrees.next()?;
        Some(degrees.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Structural check used before trusting rings read back from a cache.
    pub fn check_layout(&self, n_vertices: usize) -> Result<(), String> {
        if self.vertex_count() != n_vertices {
            return Err(format!(
                "{} rings for {} vertices",
                self.vertex_count(),
                n_vertices
            ));
        }
        if self.offsets.first() != Some(&0) || self.offsets.last() != Some(&self.flat.len()) {
            return Err("offsets do not span the flat array".to_string());
        }
        if self.offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err("offsets are not monotonic".to_string());
        }
        if let Some(&bad) = self.flat.iter().find(|&&v| v as usize >= n_vertices) {
            return Err(format!("neighbour {} out of range", bad));
        }
        Ok(())
    }
}

/// Derive the ordered neighbour ring of every vertex from `faces`.
///
/// Fails on the lowest-numbered vertex whose hints do not chain into one
/// closed cycle. Face indices must be below `n_vertices`, as
/// [`Surface::new`](meld_mesh::Surface::new) guarantees.
pub fn extract_neighbours(faces: &[Face], n_vertices: usize) -> Result<NeighbourRings, DegenerateVertex> {
    // Bucket the hints per vertex, keeping face order within each bucket.
    let mut counts = vec![0usize; n_vertices + 1];
    for tri in faces {
        for &v in tri {
            counts[v as usize + 1] += 1;
        }
    }
    for i in 1..counts.len() {
        counts[i] += counts[i - 1];
    }
    let starts = counts;
    let mut cursor = starts.clone();
    let mut hints = vec![(0u32, 0u32); faces.len() * 3];
    for &[a, b, c] in faces {
        for (v, hint) in [(a, (b, c)), (c, (a, b)), (b, (c, a))] {
            let slot = &mut cursor[v as usize];
            hints[*slot] = hint;
            *slot += 1;
        }
    }

    let mut offsets = Vec::with_capacity(n_vertices + 1);
    offsets.push(0);
    let mut flat = Vec::with_capacity(hints.len());
    for v in 0..n_vertices {
        let vertex = v as u32;
        close_ring(vertex, &hints[starts[v]..starts[v + 1]], &mut flat)
            .map_err(|reason| DegenerateVertex { vertex, reason })?;
        offsets.push(flat.len());
    }

    Ok(NeighbourRings { offsets, flat })
}

/// Chain one vertex's hints into its ring, appending it to `out`.
fn close_ring(vertex: u32, hints: &[(u32, u32)], out: &mut Vec<u32>) -> Result<(), DegenerateReason> {
    let Some(&(start, _)) = hints.first() else {
        return Err(DegenerateReason::Isolated);
    };
    if hints.iter().any(|&(a, b)| a == vertex || b == vertex || a == b) {
        return Err(DegenerateReason::SelfReference);
    }

    let k = hints.len();
    let mut used = vec![false; k];
    let mut tail = start;
    for step in 0..k {
        let mut next = None;
        for (i, &(from, _)) in hints.iter().enumerate() {
            if from == tail {
                if next.is_some() {
                    return Err(DegenerateReason::AmbiguousSuccessor { from: tail });
                }
                next = Some(i);
            }
        }
        let i = next.ok_or(DegenerateReason::MissingSuccessor { from: tail })?;
        if used[i] {
            return Err(DegenerateReason::Split { ring_len: step, hints: k });
        }
        used[i] = true;
        tail = hints[i].1;
        out.push(tail);
        if tail == start && step + 1 < k {
            return Err(DegenerateReason::Split { ring_len: step + 1, hints: k });
        }
    }

    if tail != start {
        return Err(DegenerateReason::MissingSuccessor { from: tail });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meld_mesh::{icosahedron, icosphere, Surface};
    use std::collections::BTreeSet;

    fn rings(surface: &Surface) -> NeighbourRings {
        extract_neighbours(&surface.faces, surface.vertex_count()).unwrap()
    }

    /// Neighbours found by scanning every face that contains `v`.
    fn brute_force(surface: &Surface, v: u32) -> BTreeSet<u32> {
        surface
            .faces
            .iter()
            .filter(|f| f.contains(&v))
            .flat_map(|f| f.iter().copied().filter(|&u| u != v))
            .collect()
    }

    #[test]
    fn icosahedron_has_five_neighbours_everywhere() {
        let ico = icosahedron();
        let r = rings(&ico);
        assert_eq!(r.vertex_count(), 12);
        for v in 0..12 {
            assert_eq!(r.degree(v), 5, "vertex {}", v);
        }
        assert_eq!(r.total_degree(), 60);
    }

    #[test]
    fn rings_match_brute_force_adjacency() {
        let s = icosphere(2);
        let r = rings(&s);
        for v in 0..s.vertex_count() {
            let ring = r.ring(v);
            let as_set: BTreeSet<u32> = ring.iter().copied().collect();
            assert_eq!(as_set.len(), ring.len(), "duplicate in ring of {}", v);
            assert_eq!(as_set, brute_force(&s, v as u32), "vertex {}", v);
        }
    }

    #[test]
    fn consecutive_ring_members_share_a_face() {
        let s = icosphere(1);
        let r = rings(&s);
        for v in 0..s.vertex_count() as u32 {
            let ring = r.ring(v as usize);
            for i in 0..ring.len() {
                let (a, b) = (ring[i], ring[(i + 1) % ring.len()]);
                let shared = s
                    .faces
                    .iter()
                    .any(|f| f.contains(&v) && f.contains(&a) && f.contains(&b));
                assert!(shared, "{} -> {} not a fan step around {}", a, b, v);
            }
        }
    }

    #[test]
    fn ring_starts_from_first_hint() {
        // Vertex 0 first appears in face [0, 11, 5]: walk starts at 11, so
        // the ring opens with 5 and closes on 11.
        let r = rings(&icosahedron());
        let ring = r.ring(0);
        assert_eq!(ring.first(), Some(&5));
        assert_eq!(ring.last(), Some(&11));
    }

    #[test]
    fn icosphere_degrees() {
        let s = icosphere(3);
        let r = rings(&s);
        let fives = (0..s.vertex_count()).filter(|&v| r.degree(v) == 5).count();
        assert_eq!(fives, 12);
        assert_eq!(r.degree_range(), Some((5, 6)));
    }

    #[test]
    fn duplicated_corner_is_degenerate() {
        let mut ico = icosahedron();
        ico.faces[0] = [0, 0, 5];
        let err = extract_neighbours(&ico.faces, ico.vertex_count()).unwrap_err();
        assert_eq!(err.vertex, 0);
        assert_eq!(err.reason, DegenerateReason::SelfReference);
    }

    #[test]
    fn open_fan_is_degenerate() {
        let mut ico = icosahedron();
        ico.faces.remove(0);
        let err = extract_neighbours(&ico.faces, ico.vertex_count()).unwrap_err();
        assert_eq!(err.vertex, 0);
        assert!(matches!(err.reason, DegenerateReason::MissingSuccessor { .. }));
    }

    #[test]
    fn isolated_vertex_is_degenerate() {
        let ico = icosahedron();
        let err = extract_neighbours(&ico.faces, ico.vertex_count() + 1).unwrap_err();
        assert_eq!(err.vertex, 12);
        assert_eq!(err.reason, DegenerateReason::Isolated);
    }

    #[test]
    fn pinched_vertex_is_degenerate() {
        // Two separate fans around vertex 0: a bowtie.
        let faces = vec![[0, 1, 2], [0, 2, 3], [0, 3, 1], [0, 4, 5], [0, 5, 6], [0, 6, 4]];
        let err = extract_neighbours(&faces, 7).unwrap_err();
        assert_eq!(err.vertex, 0);
        assert_eq!(err.reason, DegenerateReason::Split { ring_len: 3, hints: 6 });
    }

    #[test]
    fn layout_check() {
        let r = rings(&icosahedron());
        assert!(r.check_layout(12).is_ok());
        assert!(r.check_layout(13).is_err());
        let bad = NeighbourRings::from_rings([vec![1u32, 2], vec![0, 99]]);
        assert!(bad.check_layout(2).is_err());
    }

    #[test]
    fn from_rings_round_trip() {
        let r = NeighbourRings::from_rings([vec![1u32, 2], vec![0], vec![]]);
        assert_eq!(r.vertex_count(), 3);
        assert_eq!(r.ring(0), &[1, 2]);
        assert_eq!(r.ring(1), &[0]);
        assert!(r.ring(2).is_empty());
        assert_eq!(r.iter().map(<[u32]>::len).collect::<Vec<_>>(), vec![2, 1, 0]);
    }
}
