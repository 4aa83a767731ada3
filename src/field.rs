//! Ghosted local storage for the two coupled scalar fields.
//!
//! Both fields live in dense row-major buffers of `(local_nz + 2) * ny * nx`
//! values: one ghost plane on each side of the decomposed z axis, no ghosts
//! on y or x (those axes are periodic and wrap locally in the stencil).
//! Plane index 0 and plane `local_nz + 1` are the ghosts; interior planes
//! are `1..=local_nz`.
//!
//! Write access is split by role: the halo exchange writes ghost planes
//! (via [`GhostedField::write_plane`] / [`GhostedField::mirror_edge`]) and
//! the stencil writes interior planes of the *next* buffer (via
//! [`GhostedField::u_mut`] / [`GhostedField::v_mut`]).

use crate::config::GridConfig;
use crate::domain::Subdomain;

/// Which of the two coupled fields an operation addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scalar {
    U,
    V,
}

/// The two global edges of the decomposed axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Lower,
    Upper,
}

/// Dense ghosted storage for one rank's slab of the U and V fields.
#[derive(Clone, Debug, PartialEq)]
pub struct GhostedField {
    u: Vec<f64>,
    v: Vec<f64>,
    local_nz: usize,
    ny: usize,
    nx: usize,
    z_start: usize,
}

impl GhostedField {
    /// Allocate the slab for `sub`, uniformly initialized to the quiescent
    /// state U = 1, V = 0 (ghost planes included).
    pub fn new(sub: &Subdomain, grid: &GridConfig) -> Self {
        let len = (sub.local_nz + 2) * grid.ny * grid.nx;
        Self {
            u: vec![1.0; len],
            v: vec![0.0; len],
            local_nz: sub.local_nz,
            ny: grid.ny,
            nx: grid.nx,
            z_start: sub.z_start,
        }
    }

    #[inline]
    pub fn local_nz(&self) -> usize {
        self.local_nz
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Values per z plane (`ny * nx`).
    #[inline]
    pub fn plane_len(&self) -> usize {
        self.ny * self.nx
    }

    /// Flat index of `(zg, y, x)`, with `zg` counted *including* ghosts:
    /// 0 is the lower ghost plane, `local_nz + 1` the upper one.
    #[inline]
    pub fn index(&self, zg: usize, y: usize, x: usize) -> usize {
        (zg * self.ny + y) * self.nx + x
    }

    /// Entire U buffer, ghosts included.
    #[inline]
    pub fn u(&self) -> &[f64] {
        &self.u
    }

    /// Entire V buffer, ghosts included.
    #[inline]
    pub fn v(&self) -> &[f64] {
        &self.v
    }

    /// Mutable U buffer; reserved for the interior sweep of the next-step
    /// buffer.
    #[inline]
    pub fn u_mut(&mut self) -> &mut [f64] {
        &mut self.u
    }

    /// Mutable V buffer; reserved for the interior sweep of the next-step
    /// buffer.
    #[inline]
    pub fn v_mut(&mut self) -> &mut [f64] {
        &mut self.v
    }

    /// Both mutable buffers at once, for the interior sweep that updates
    /// U and V of the next-step buffer in a single pass.
    #[inline]
    pub fn uv_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.u, &mut self.v)
    }

    #[inline]
    fn buf(&self, which: Scalar) -> &[f64] {
        match which {
            Scalar::U => &self.u,
            Scalar::V => &self.v,
        }
    }

    #[inline]
    fn buf_mut(&mut self, which: Scalar) -> &mut Vec<f64> {
        match which {
            Scalar::U => &mut self.u,
            Scalar::V => &mut self.v,
        }
    }

    /// Read one value; `zg` includes ghosts.
    #[inline]
    pub fn get(&self, which: Scalar, zg: usize, y: usize, x: usize) -> f64 {
        self.buf(which)[self.index(zg, y, x)]
    }

    /// Overwrite both fields at an interior cell addressed by *local*
    /// interior plane `lz` in `0..local_nz`.
    pub fn set_interior(&mut self, lz: usize, y: usize, x: usize, u: f64, v: f64) {
        debug_assert!(lz < self.local_nz);
        let i = self.index(lz + 1, y, x);
        self.u[i] = u;
        self.v[i] = v;
    }

    /// Seed every interior cell whose *global* coordinates satisfy `pred`.
    ///
    /// The predicate sees `(gz, gy, gx)` with `gz = z_start + lz`; the seed
    /// region is defined on the global domain, not per subdomain, so two
    /// decompositions of the same grid produce the same global initial
    /// condition.
    pub fn seed_where<F>(&mut self, mut pred: F, u_val: f64, v_val: f64)
    where
        F: FnMut(usize, usize, usize) -> bool,
    {
        for lz in 0..self.local_nz {
            let gz = self.z_start + lz;
            for y in 0..self.ny {
                for x in 0..self.nx {
                    if pred(gz, y, x) {
                        let i = self.index(lz + 1, y, x);
                        self.u[i] = u_val;
                        self.v[i] = v_val;
                    }
                }
            }
        }
    }

    /// Seed the standard centered perturbation cube: U = 0.5, V = 0.25
    /// within `grid.seed_radius()` of the global center on every axis.
    pub fn seed_center(&mut self, grid: &GridConfig) {
        let (cz, cy, cx) = (grid.nz / 2, grid.ny / 2, grid.nx / 2);
        let r = grid.seed_radius();
        self.seed_where(
            |gz, gy, gx| gz.abs_diff(cz) <= r && gy.abs_diff(cy) <= r && gx.abs_diff(cx) <= r,
            0.5,
            0.25,
        );
    }

    /// Copy out one full z plane (`zg` includes ghosts).
    pub fn copy_plane(&self, which: Scalar, zg: usize) -> Vec<f64> {
        let start = self.index(zg, 0, 0);
        self.buf(which)[start..start + self.plane_len()].to_vec()
    }

    /// Overwrite one full z plane (`zg` includes ghosts); the halo
    /// exchange uses this to fill ghost planes from received payloads.
    ///
    /// # Panics
    /// Panics if `vals` is not exactly one plane long.
    pub fn write_plane(&mut self, which: Scalar, zg: usize, vals: &[f64]) {
        let start = self.index(zg, 0, 0);
        let len = self.plane_len();
        assert_eq!(vals.len(), len, "plane payload must be ny*nx values");
        self.buf_mut(which)[start..start + len].copy_from_slice(vals);
    }

    /// Zero-gradient edge fill: copy the adjacent interior plane into the
    /// ghost plane at a global domain edge.
    pub fn mirror_edge(&mut self, which: Scalar, edge: Edge) {
        let (ghost, interior) = match edge {
            Edge::Lower => (0, 1),
            Edge::Upper => (self.local_nz + 1, self.local_nz),
        };
        let len = self.plane_len();
        let src = self.index(interior, 0, 0);
        let dst = self.index(ghost, 0, 0);
        let buf = self.buf_mut(which);
        buf.copy_within(src..src + len, dst);
    }

    /// Ghost-free copy of the interior, in `(z, y, x)` row-major order, as
    /// handed to the snapshot sink.
    pub fn interior(&self, which: Scalar) -> Vec<f64> {
        let start = self.index(1, 0, 0);
        let end = self.index(self.local_nz + 1, 0, 0);
        self.buf(which)[start..end].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Subdomain;

    fn field(nz: usize, size: usize, rank: usize, grid: &GridConfig) -> GhostedField {
        let sub = Subdomain::partition(nz, size, rank).unwrap();
        GhostedField::new(&sub, grid)
    }

    #[test]
    fn uniform_initialization() {
        let grid = GridConfig::cube(4);
        let f = field(4, 1, 0, &grid);
        assert!(f.u().iter().all(|&x| x == 1.0));
        assert!(f.v().iter().all(|&x| x == 0.0));
        assert_eq!(f.u().len(), 6 * 16);
    }

    #[test]
    fn center_seed_lands_on_owning_rank_only() {
        // 8x8x8 over two ranks: seed radius is 0, so only the global center
        // cell (4,4,4) is perturbed, and it belongs to rank 1 (z_start 4).
        let grid = GridConfig::cube(8);
        let mut lo = field(8, 2, 0, &grid);
        let mut hi = field(8, 2, 1, &grid);
        lo.seed_center(&grid);
        hi.seed_center(&grid);

        assert!(lo.u().iter().all(|&x| x == 1.0));
        assert!(lo.v().iter().all(|&x| x == 0.0));

        let seeded: Vec<_> = (0..hi.v().len()).filter(|&i| hi.v()[i] != 0.0).collect();
        // local plane 1 is global z = 4
        assert_eq!(seeded, vec![hi.index(1, 4, 4)]);
        assert_eq!(hi.get(Scalar::U, 1, 4, 4), 0.5);
        assert_eq!(hi.get(Scalar::V, 1, 4, 4), 0.25);
    }

    #[test]
    fn seed_predicate_sees_global_coordinates() {
        let grid = GridConfig {
            nz: 6,
            ny: 2,
            nx: 2,
        };
        let mut f = field(6, 3, 2, &grid); // owns global z = 4..6
        let mut seen = Vec::new();
        f.seed_where(
            |gz, gy, gx| {
                if gy == 0 && gx == 0 {
                    seen.push(gz);
                }
                false
            },
            0.0,
            0.0,
        );
        assert_eq!(seen, vec![4, 5]);
    }

    #[test]
    fn plane_roundtrip_and_mirror() {
        let grid = GridConfig {
            nz: 4,
            ny: 3,
            nx: 2,
        };
        let mut f = field(4, 1, 0, &grid);
        let plane: Vec<f64> = (0..6).map(|i| i as f64).collect();
        f.write_plane(Scalar::V, 1, &plane);
        assert_eq!(f.copy_plane(Scalar::V, 1), plane);

        f.mirror_edge(Scalar::V, Edge::Lower);
        assert_eq!(f.copy_plane(Scalar::V, 0), plane);

        let top: Vec<f64> = (0..6).map(|i| 10.0 + i as f64).collect();
        f.write_plane(Scalar::V, 4, &top);
        f.mirror_edge(Scalar::V, Edge::Upper);
        assert_eq!(f.copy_plane(Scalar::V, 5), top);
    }

    #[test]
    fn interior_strips_ghosts() {
        let grid = GridConfig {
            nz: 2,
            ny: 2,
            nx: 2,
        };
        let mut f = field(2, 1, 0, &grid);
        // Poison the ghosts; interior() must not see them.
        f.write_plane(Scalar::U, 0, &[9.0; 4]);
        f.write_plane(Scalar::U, 3, &[9.0; 4]);
        let inner = f.interior(Scalar::U);
        assert_eq!(inner.len(), 8);
        assert!(inner.iter().all(|&x| x == 1.0));
    }

    #[test]
    fn zero_extent_slab_is_two_ghost_planes() {
        let grid = GridConfig::cube(2);
        let f = field(2, 4, 3, &grid);
        assert_eq!(f.local_nz(), 0);
        assert_eq!(f.u().len(), 2 * 4);
        assert!(f.interior(Scalar::U).is_empty());
    }
}
