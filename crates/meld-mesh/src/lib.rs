//! MELD Surface Meshes
//!
//! Triangulated sphere surfaces for the icosphere geometry engine.
//!
//! # Contents
//!
//! - [`Surface`]: vertex coordinates plus orientation-consistent triangles
//! - [`gifti`]: reading and writing `.surf.gii` files (ASCII, base64 and
//!   zlib-compressed payloads)
//! - [`icosahedron`]: regular icosahedron and its midpoint subdivisions,
//!   used to produce the `ico{L}.surf.gii` level files
//!
//! Level `L` of the icosphere has `10·4^L + 2` vertices; level 7
//! (163 842 vertices) is the resolution the lesion classifier runs at.

pub mod error;
pub mod gifti;
pub mod icosahedron;
mod surface;

pub use error::{MeshLoadError, Result};
pub use gifti::{read_surface, write_surface, Encoding};
pub use icosahedron::{icosahedron, icosphere};
pub use surface::{Face, Surface};

/// File name of the surface for an icosphere level.
pub fn surface_file_name(level: u8) -> String {
    format!("ico{}.surf.gii", level)
}
