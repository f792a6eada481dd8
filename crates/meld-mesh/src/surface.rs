//! Triangulated surface geometry.

use glam::DVec3;

use crate::error::{MeshLoadError, Result};

/// A triangle as three vertex indices, in authored winding order.
pub type Face = [u32; 3];

/// Vertex coordinates plus triangles.
///
/// Vertex index is the position in `coords`. Faces keep the winding the
/// file was authored with; nothing here reorients them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Surface {
    pub coords: Vec<DVec3>,
    pub faces: Vec<Face>,
}

impl Surface {
    /// Build a surface, rejecting faces that point past the vertex list.
    pub fn new(coords: Vec<DVec3>, faces: Vec<Face>) -> Result<Self> {
        let surface = Self { coords, faces };
        surface.check_face_indices()?;
        Ok(surface)
    }

    pub fn vertex_count(&self) -> usize {
        self.coords.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Euler characteristic V - E + F, with E counted from undirected face edges.
    ///
    /// A closed genus-0 surface (every icosphere) gives 2.
    pub fn euler_characteristic(&self) -> i64 {
        let mut edges: Vec<(u32, u32)> = self
            .faces
            .iter()
            .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
            .map(|(x, y)| if x < y { (x, y) } else { (y, x) })
            .collect();
        edges.sort_unstable();
        edges.dedup();
        self.coords.len() as i64 - edges.len() as i64 + self.faces.len() as i64
    }

    fn check_face_indices(&self) -> Result<()> {
        let n = self.coords.len();
        for (face, tri) in self.faces.iter().enumerate() {
            if let Some(&vertex) = tri.iter().find(|&&v| v as usize >= n) {
                return Err(MeshLoadError::FaceOutOfRange {
                    face,
                    vertex: i64::from(vertex),
                    vertices: n,
                });
            }
        }
        Ok(())
    }
}
