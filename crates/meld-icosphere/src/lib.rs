//! MELD Icosphere Geometry
//!
//! Precomputes, per icosphere level, the graph structure that spherical
//! graph convolutions consume: cyclically ordered neighbour rings, an edge
//! list with per-edge geometric attributes, and a sparse adjacency matrix.
//!
//! # Pipeline
//!
//! For each level `L` in `1..=max_level`:
//!
//! 1. Load `ico{L}.surf.gii` ([`meld_mesh`])
//! 2. Order each vertex's neighbours into a closed ring ([`neighbours`])
//! 3. Map vertices to latitude/longitude ([`spherical`])
//! 4. Emit a self-loop plus one edge per ring neighbour, with exact fan
//!    angle/distance attributes ([`edges`])
//! 5. Build the CSR adjacency matrix ([`adjacency`])
//!
//! Rings and edge rows are cached per level ([`cache`]), so only the first
//! start-up pays for steps 2 and 4.
//!
//! # Example
//!
//! ```no_run
//! use meld_icosphere::{EdgeMode, IcoSpheres, IcosphereConfig};
//!
//! let ico = IcoSpheres::new(IcosphereConfig::new("data/icospheres"))?;
//! let edges = ico.edges(7)?;
//! let attrs = ico.edge_vectors(7, EdgeMode::Exact)?;
//! assert_eq!(edges.len(), attrs.len());
//! # Ok::<(), meld_icosphere::Error>(())
//! ```

pub mod adjacency;
pub mod cache;
pub mod config;
pub mod edges;
pub mod error;
mod level;
pub mod neighbours;
mod registry;
pub mod spherical;

pub use adjacency::AdjacencyMatrix;
pub use cache::{Artifact, ArtifactStore, Cache, CacheKey, CachePolicy, DiskStore, MemoryStore, SourceDigest};
pub use config::{IcosphereConfig, MAX_LEVEL};
pub use edges::{Edge, EdgeAttr, EdgeMode, EdgeTable, EPSILON};
pub use error::{Error, Result};
pub use level::IcosphereLevel;
pub use neighbours::{extract_neighbours, DegenerateReason, DegenerateVertex, NeighbourRings};
pub use registry::IcoSpheres;
