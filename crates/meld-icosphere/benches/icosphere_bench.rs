//! Benchmarks for icosphere level construction
//!
//! Measures performance of:
//! - Neighbour ring extraction
//! - Exact edge attributes
//! - Pseudo edge attributes
//! - Adjacency matrix assembly

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use meld_icosphere::adjacency::AdjacencyMatrix;
use meld_icosphere::edges::{exact_edge_attrs, pseudo_edge_attrs};
use meld_icosphere::extract_neighbours;
use meld_icosphere::spherical::spherical_coords;
use meld_mesh::icosphere;

const LEVELS: [u32; 4] = [3, 4, 5, 6];

/// Benchmark ring extraction from the face list
fn bench_neighbours(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_neighbours");
    group.sample_size(20);

    for &level in &LEVELS {
        let surface = icosphere(level);
        group.throughput(Throughput::Elements(surface.vertex_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(level), &surface, |b, s| {
            b.iter(|| extract_neighbours(black_box(&s.faces), s.vertex_count()))
        });
    }
    group.finish();
}

/// Benchmark fan angles and distances for every edge
fn bench_exact_attrs(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact_edge_attrs");
    group.sample_size(20);

    for &level in &LEVELS {
        let surface = icosphere(level);
        let Ok(rings) = extract_neighbours(&surface.faces, surface.vertex_count()) else {
            continue;
        };
        group.throughput(Throughput::Elements(surface.vertex_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, _| {
            b.iter(|| exact_edge_attrs(black_box(&surface.coords), &rings))
        });
    }
    group.finish();
}

/// Benchmark spherical differences, the lazily computed descriptor
fn bench_pseudo_attrs(c: &mut Criterion) {
    let mut group = c.benchmark_group("pseudo_edge_attrs");

    for &level in &LEVELS {
        let surface = icosphere(level);
        let Ok(rings) = extract_neighbours(&surface.faces, surface.vertex_count()) else {
            continue;
        };
        let edges = exact_edge_attrs(&surface.coords, &rings).edges;
        let spherical = spherical_coords(&surface.coords);
        group.throughput(Throughput::Elements(edges.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, _| {
            b.iter(|| pseudo_edge_attrs(black_box(&edges), &spherical))
        });
    }
    group.finish();
}

/// Benchmark CSR assembly from the edge list
fn bench_adjacency(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjacency");

    for &level in &LEVELS {
        let surface = icosphere(level);
        let Ok(rings) = extract_neighbours(&surface.faces, surface.vertex_count()) else {
            continue;
        };
        let edges = exact_edge_attrs(&surface.coords, &rings).edges;
        group.throughput(Throughput::Elements(edges.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, _| {
            b.iter(|| AdjacencyMatrix::from_edges(black_box(&edges), surface.vertex_count()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_neighbours,
    bench_exact_attrs,
    bench_pseudo_attrs,
    bench_adjacency,
);

criterion_main!(benches);
