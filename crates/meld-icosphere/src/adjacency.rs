//! Sparse vertex adjacency.

use crate::edges::Edge;

/// Compressed sparse row matrix of edge counts.
///
/// Entry `(r, c)` counts how many times `[r, c]` occurs in the edge list.
/// On a manifold mesh every count is 1; duplicates would accumulate rather
/// than be dropped. Built once and never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyMatrix {
    n: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    data: Vec<u8>,
}

impl AdjacencyMatrix {
    /// Build an `n × n` matrix from `(source, target)` pairs.
    ///
    /// Every endpoint must be below `n`.
    pub fn from_edges(edges: &[Edge], n: usize) -> Self {
        let mut indptr = vec![0usize; n + 1];
        for &[r, _] in edges {
            indptr[r as usize + 1] += 1;
        }
        for i in 0..n {
            indptr[i + 1] += indptr[i];
        }

        let mut cursor = indptr.clone();
        let mut raw = vec![0u32; edges.len()];
        for &[r, c] in edges {
            let slot = &mut cursor[r as usize];
            raw[*slot] = c;
            *slot += 1;
        }

        // Sort each row and fold duplicate columns into counts.
        let mut out_ptr = Vec::with_capacity(n + 1);
        let mut indices = Vec::with_capacity(edges.len());
        let mut data: Vec<u8> = Vec::with_capacity(edges.len());
        out_ptr.push(0);
        for r in 0..n {
            let row = &mut raw[indptr[r]..indptr[r + 1]];
            row.sort_unstable();
            let row_start = indices.len();
            for &c in row.iter() {
                if indices.len() > row_start && indices[indices.len() - 1] == c {
                    let last = data.len() - 1;
                    data[last] = data[last].saturating_add(1);
                } else {
                    indices.push(c);
                    data.push(1);
                }
            }
            out_ptr.push(indices.len());
        }

        Self {
            n,
            indptr: out_ptr,
            indices,
            data,
        }
    }

    /// `(rows, cols)`; always square.
    pub fn shape(&self) -> (usize, usize) {
        (self.n, self.n)
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Column indices present in `row`, ascending.
    pub fn row(&self, row: usize) -> &[u32] {
        &self.indices[self.indptr[row]..self.indptr[row + 1]]
    }

    /// Number of distinct targets of `row`.
    pub fn degree(&self, row: usize) -> usize {
        self.indptr[row + 1] - self.indptr[row]
    }

    /// Edge count at `(row, col)`, zero when absent or out of range.
    pub fn get(&self, row: usize, col: usize) -> u8 {
        if row >= self.n {
            return 0;
        }
        let start = self.indptr[row];
        self.row(row)
            .binary_search(&(col as u32))
            .map(|i| self.data[start + i])
            .unwrap_or(0)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.get(row, col) > 0
    }

    /// Every stored entry as `(row, col, count)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32, u8)> + '_ {
        (0..self.n).flat_map(move |r| {
            let start = self.indptr[r];
            self.row(r)
                .iter()
                .enumerate()
                .map(move |(i, &c)| (r, c, self.data[start + i]))
        })
    }
}
