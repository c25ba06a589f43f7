//! Worker-grid geometry for the distributed problem.
//!
//! Every worker owns an `nx x ny x nz` box of grid points; the worker group
//! itself is arranged as an `npx x npy x npz` grid covering the global
//! domain. All workers construct the same geometry from the same inputs, so
//! partitioning decisions never diverge across the group.

use serde::Serialize;

/// Placement of one worker's box inside the global problem domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Geometry {
    /// Number of workers in the group.
    pub size: usize,
    /// This worker's rank, in `0..size`.
    pub rank: usize,
    /// Local box dimensions.
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    /// Worker-grid dimensions; `npx * npy * npz == size`.
    pub npx: usize,
    pub npy: usize,
    pub npz: usize,
    /// This worker's coordinates in the worker grid.
    pub ipx: usize,
    pub ipy: usize,
    pub ipz: usize,
}

impl Geometry {
    /// Build the geometry for one worker.
    ///
    /// The worker grid is derived from `size` alone, so every rank arrives at
    /// the same decomposition.
    ///
    /// # Panics
    ///
    /// Panics if `rank >= size` or any local dimension is zero.
    pub fn new(size: usize, rank: usize, nx: usize, ny: usize, nz: usize) -> Self {
        assert!(size > 0, "worker group must not be empty");
        assert!(rank < size, "rank {rank} out of range for {size} workers");
        assert!(nx > 0 && ny > 0 && nz > 0, "local dimensions must be positive");

        let (npx, npy, npz) = partition_workers(size);
        let ipx = rank % npx;
        let ipy = (rank / npx) % npy;
        let ipz = rank / (npx * npy);

        Self {
            size,
            rank,
            nx,
            ny,
            nz,
            npx,
            npy,
            npz,
            ipx,
            ipy,
            ipz,
        }
    }

    /// Number of grid points (matrix rows) owned by this worker.
    pub fn local_rows(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Global domain dimensions.
    pub fn global_dims(&self) -> (usize, usize, usize) {
        (self.npx * self.nx, self.npy * self.ny, self.npz * self.nz)
    }

    /// Worker-grid coordinates owning the given global grid point.
    pub fn owner_of(&self, gx: usize, gy: usize, gz: usize) -> (usize, usize, usize) {
        (gx / self.nx, gy / self.ny, gz / self.nz)
    }

    /// Whether this worker owns the given global grid point.
    pub fn owns(&self, gx: usize, gy: usize, gz: usize) -> bool {
        self.owner_of(gx, gy, gz) == (self.ipx, self.ipy, self.ipz)
    }
}

/// Factor `size` into a 3-D worker grid.
///
/// Picks the factor triple minimizing the total partition surface, which is
/// proportional to the boundary data exchanged per iteration.
fn partition_workers(size: usize) -> (usize, usize, usize) {
    let mut best = (size, 1, 1);
    let mut best_surface = usize::MAX;

    for i in 1..=size {
        if size % i != 0 {
            continue;
        }
        let rest = size / i;
        for j in 1..=rest {
            if rest % j != 0 {
                continue;
            }
            let k = rest / j;
            let surface = i * j + j * k + i * k;
            if surface < best_surface {
                best_surface = surface;
                best = (i, j, k);
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_worker_grid() {
        let geom = Geometry::new(1, 0, 16, 16, 16);
        assert_eq!((geom.npx, geom.npy, geom.npz), (1, 1, 1));
        assert_eq!((geom.ipx, geom.ipy, geom.ipz), (0, 0, 0));
        assert_eq!(geom.local_rows(), 4096);
        assert_eq!(geom.global_dims(), (16, 16, 16));
    }

    #[test]
    fn cubic_worker_count_factors_cubically() {
        assert_eq!(partition_workers(8), (2, 2, 2));
        assert_eq!(partition_workers(27), (3, 3, 3));
    }

    #[test]
    fn non_cubic_worker_count_stays_balanced() {
        let (a, b, c) = partition_workers(12);
        assert_eq!(a * b * c, 12);
        // No axis should take all twelve workers
        assert!(a.max(b).max(c) <= 4);
    }

    #[test]
    fn rank_coordinates_cover_grid() {
        let size = 8;
        let mut seen = std::collections::HashSet::new();
        for rank in 0..size {
            let geom = Geometry::new(size, rank, 4, 4, 4);
            assert!(geom.ipx < geom.npx);
            assert!(geom.ipy < geom.npy);
            assert!(geom.ipz < geom.npz);
            seen.insert((geom.ipx, geom.ipy, geom.ipz));
        }
        assert_eq!(seen.len(), size);
    }

    #[test]
    fn ownership_matches_coordinates() {
        let geom = Geometry::new(8, 3, 4, 4, 4);
        // Rank 3 in a 2x2x2 grid sits at (1, 1, 0)
        assert_eq!((geom.ipx, geom.ipy, geom.ipz), (1, 1, 0));
        assert!(geom.owns(4, 4, 0));
        assert!(!geom.owns(0, 0, 0));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn rank_out_of_range_panics() {
        Geometry::new(4, 4, 8, 8, 8);
    }
}
