//! One icosphere level and the pipeline that derives it.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

use glam::{DVec2, DVec3};
use meld_mesh::{Face, MeshLoadError, Surface};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::adjacency::AdjacencyMatrix;
use crate::cache::{Artifact, Cache, CacheKey, SourceDigest};
use crate::edges::{exact_edge_attrs, pseudo_edge_attrs, Edge, EdgeAttr, EdgeMode, EdgeTable};
use crate::error::{Error, Result};
use crate::neighbours::{extract_neighbours, NeighbourRings};
use crate::spherical::spherical_coords;

/// Everything graph convolutions need about one resolution.
///
/// Built once, then read-only. `edges`, `exact_edge_attr` and the lazily
/// computed pseudo attributes are parallel arrays.
#[derive(Debug)]
pub struct IcosphereLevel {
    pub level: u8,
    pub coords: Vec<DVec3>,
    pub faces: Vec<Face>,
    pub neighbours: NeighbourRings,
    pub spherical_coords: Vec<DVec2>,
    pub edges: Vec<Edge>,
    pub exact_edge_attr: Vec<EdgeAttr>,
    pub adj_mat: AdjacencyMatrix,
    pseudo_edge_attr: OnceLock<Vec<EdgeAttr>>,
}

impl IcosphereLevel {
    /// Read `ico{level}.surf.gii` from `path` and derive the level.
    pub fn load(level: u8, path: &Path, cache: &Cache) -> Result<Self> {
        let mesh_error = |source| Error::MeshLoad { level, source };
        let bytes = std::fs::read(path).map_err(|e| {
            mesh_error(MeshLoadError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        })?;
        let surface = meld_mesh::gifti::parse_surface_bytes(&bytes).map_err(mesh_error)?;
        let digest = cache.wants_source_digest().then(|| SourceDigest::of_bytes(&bytes));

        debug!(
            level,
            path = %path.display(),
            vertices = surface.vertex_count(),
            faces = surface.face_count(),
            "Loaded icosphere surface"
        );
        Self::from_surface(level, surface, cache, digest.as_ref())
    }

    /// Derive rings, spherical coordinates, edges and adjacency for `surface`.
    ///
    /// Rings and edge rows go through `cache`; `source` is the digest
    /// recorded with (and, under `VerifySource`, checked against) entries.
    pub fn from_surface(level: u8, surface: Surface, cache: &Cache, source: Option<&SourceDigest>) -> Result<Self> {
        let span = info_span!("icosphere", level);
        let _enter = span.enter();
        let started = Instant::now();

        let Surface { coords, faces } = surface;
        let n = coords.len();

        let neighbours: NeighbourRings = cached_or_compute(
            cache,
            CacheKey::new(level, Artifact::Neighbours),
            source,
            |rings: &NeighbourRings| rings.check_layout(n),
            || {
                extract_neighbours(&faces, n).map_err(|d| Error::DegenerateVertex {
                    level,
                    vertex: d.vertex,
                    reason: d.reason,
                })
            },
        )?;

        let spherical = spherical_coords(&coords);

        let rows: Vec<[f64; 4]> = cached_or_compute(
            cache,
            CacheKey::new(level, Artifact::EdgesAndAttrs),
            source,
            |rows: &Vec<[f64; 4]>| {
                let table = EdgeTable::from_rows(rows)?;
                check_edge_order(&table.edges, &neighbours)
            },
            || {
                let t = Instant::now();
                let table = exact_edge_attrs(&coords, &neighbours);
                debug!(
                    edges = table.len(),
                    elapsed_ms = t.elapsed().as_millis() as u64,
                    "Computed exact edge attributes"
                );
                Ok(table.to_rows())
            },
        )?;
        let EdgeTable { edges, attrs } = EdgeTable::from_rows(&rows).map_err(|reason| Error::CacheCorruption {
            key: CacheKey::new(level, Artifact::EdgesAndAttrs),
            reason,
        })?;

        let adj_mat = AdjacencyMatrix::from_edges(&edges, n);

        info!(
            level,
            vertices = n,
            edges = edges.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Icosphere level ready"
        );

        Ok(Self {
            level,
            coords,
            faces,
            neighbours,
            spherical_coords: spherical,
            edges,
            exact_edge_attr: attrs,
            adj_mat,
            pseudo_edge_attr: OnceLock::new(),
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.coords.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Spherical-difference attributes, computed on first use.
    pub fn pseudo_edge_attr(&self) -> &[EdgeAttr] {
        self.pseudo_edge_attr
            .get_or_init(|| pseudo_edge_attrs(&self.edges, &self.spherical_coords))
    }

    /// Attributes for `mode`, aligned with [`IcosphereLevel::edges`].
    pub fn edge_vectors(&self, mode: EdgeMode) -> &[EdgeAttr] {
        match mode {
            EdgeMode::Exact => &self.exact_edge_attr,
            EdgeMode::Pseudo => self.pseudo_edge_attr(),
        }
    }
}

/// Load `key` from `cache` if present and consistent, otherwise compute and
/// store it. Unusable entries are logged and overwritten; write failures are
/// logged and otherwise ignored.
fn cached_or_compute<T, V, F>(
    cache: &Cache,
    key: CacheKey,
    source: Option<&SourceDigest>,
    validate: V,
    compute: F,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    V: FnOnce(&T) -> std::result::Result<(), String>,
    F: FnOnce() -> Result<T>,
{
    match cache.load::<T>(&key, source) {
        Ok(Some(value)) => match validate(&value) {
            Ok(()) => return Ok(value),
            Err(reason) => warn!(%key, %reason, "Cache entry does not match mesh; recomputing"),
        },
        Ok(None) => {}
        Err(Error::CacheCorruption { reason, .. }) => {
            warn!(%key, %reason, "Corrupt cache entry; recomputing")
        }
        Err(e) => warn!(%key, error = %e, "Cache unreadable; recomputing"),
    }

    let value = compute()?;
    if let Err(e) = cache.save(&key, source, &value) {
        warn!(%key, error = %e, "Failed to write cache entry");
    }
    Ok(value)
}

/// Edges must be, per vertex in order, a self-loop then the ring.
fn check_edge_order(edges: &[Edge], rings: &NeighbourRings) -> std::result::Result<(), String> {
    let expected = rings.total_degree() + rings.vertex_count();
    if edges.len() != expected {
        return Err(format!("{} edges, expected {}", edges.len(), expected));
    }
    let mut at = 0;
    for (v, ring) in rings.iter().enumerate() {
        let v = v as u32;
        if edges[at] != [v, v] {
            return Err(format!("edge {} should be the self-loop of {}", at, v));
        }
        for (j, &n) in ring.iter().enumerate() {
            if edges[at + 1 + j] != [v, n] {
                return Err(format!("edge {} does not follow the ring of {}", at + 1 + j, v));
            }
        }
        at += ring.len() + 1;
    }
    Ok(())
}
