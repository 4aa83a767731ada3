//! Run configuration: global grid extents, physical constants, step counts.
//!
//! Ownership of where these values come from (files, CLI, launch scripts)
//! lies outside this crate; everything here is plain serde-friendly data
//! plus the validation that must pass before any stepping starts.

use crate::sim_error::SimError;

/// Immutable global grid extents, ordered `(z, y, x)` with `z` the
/// decomposed axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GridConfig {
    pub nz: usize,
    pub ny: usize,
    pub nx: usize,
}

impl GridConfig {
    /// Cubic grid of edge length `n`.
    pub fn cube(n: usize) -> Self {
        Self {
            nz: n,
            ny: n,
            nx: n,
        }
    }

    /// Global shape in `(z, y, x)` order, as used for sink declarations.
    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        [self.nz, self.ny, self.nx]
    }

    /// Total number of cells in the global grid.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.nz * self.ny * self.nx
    }

    /// Half-width of the centered seed cube: `min(nz, ny, nx) / 10`.
    ///
    /// Integer division is intentional; on grids smaller than 10 cells per
    /// axis only the single center cell is seeded.
    #[inline]
    pub fn seed_radius(&self) -> usize {
        self.nz.min(self.ny).min(self.nx) / 10
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::cube(128)
    }
}

/// The five physical constants of the Gray-Scott model plus the explicit
/// scheme's time step and grid spacing.
///
/// Defaults are the coral-pattern preset.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Physics {
    /// Diffusion rate of the U field.
    pub du: f64,
    /// Diffusion rate of the V field.
    pub dv: f64,
    /// Feed rate F.
    pub feed: f64,
    /// Kill rate k.
    pub kill: f64,
    /// Explicit Euler time step.
    pub dt: f64,
    /// Grid spacing (uniform on all three axes).
    pub dx: f64,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            du: 0.2,
            dv: 0.1,
            feed: 0.0545,
            kill: 0.062,
            dt: 1.0,
            dx: 1.0,
        }
    }
}

/// Everything the stepping core consumes: grid, constants, step counts.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub grid: GridConfig,
    pub physics: Physics,
    /// Total number of integration steps; the loop visits `0..=total_steps`.
    pub total_steps: u64,
    /// Emit a frame whenever `step % output_interval == 0`.
    pub output_interval: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            physics: Physics::default(),
            total_steps: 10_000,
            output_interval: 100,
        }
    }
}

impl RunConfig {
    /// Check the configuration before any stepping begins.
    ///
    /// More processes than `nz` slices is *not* rejected here: the surplus
    /// ranks legitimately own zero-extent subdomains.
    ///
    /// # Errors
    /// Returns the first violated constraint: zero grid axis, zero output
    /// interval, non-positive `dt`/`dx`, or negative rate constants.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.grid.nz == 0 {
            return Err(SimError::InvalidGridAxis("nz"));
        }
        if self.grid.ny == 0 {
            return Err(SimError::InvalidGridAxis("ny"));
        }
        if self.grid.nx == 0 {
            return Err(SimError::InvalidGridAxis("nx"));
        }
        if self.output_interval == 0 {
            return Err(SimError::ZeroOutputInterval);
        }
        for (name, value) in [("dt", self.physics.dt), ("dx", self.physics.dx)] {
            if !(value > 0.0) {
                return Err(SimError::InvalidParameter { name, value });
            }
        }
        for (name, value) in [
            ("du", self.physics.du),
            ("dv", self.physics.dv),
            ("feed", self.physics.feed),
            ("kill", self.physics.kill),
        ] {
            if !(value >= 0.0) {
                return Err(SimError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}
