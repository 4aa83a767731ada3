//! Explicit reaction-diffusion step: 7-point Laplacian plus Gray-Scott
//! reaction terms, forward Euler in time.
//!
//! For every interior cell the Laplacian sums the two z neighbors (which
//! may be ghost planes) and the periodically wrapped y/x neighbors, then
//! the update is
//!
//! ```text
//! u' = u + dt * (du * lap_u - u*v^2 + F * (1 - u))
//! v' = v + dt * (dv * lap_v + u*v^2 - (F + k) * v)
//! ```
//!
//! Both results are clamped to `[0, 1]`; that clamp is the only guard
//! against divergence of the explicit scheme, so the sweep reports how
//! often it fired. Writes go exclusively to the next-step buffer -- the
//! sweep reads neighbor cells that an in-place update would already have
//! overwritten.

use crate::config::Physics;
use crate::field::GhostedField;

#[inline]
fn clamp_unit(x: f64) -> (f64, bool) {
    if x < 0.0 {
        (0.0, true)
    } else if x > 1.0 {
        (1.0, true)
    } else {
        (x, false)
    }
}

/// Advance every interior cell of `current` into `next`, leaving the ghost
/// planes of `next` untouched. Ghost planes of `current` must have been
/// refreshed by the halo exchange for this step.
///
/// Returns the number of clamped field updates (up to two per cell). The
/// caller swaps the buffers after the sweep; no reader ever observes a
/// partially updated field.
pub fn step_interior(phys: &Physics, current: &GhostedField, next: &mut GhostedField) -> usize {
    debug_assert_eq!(current.local_nz(), next.local_nz());
    debug_assert_eq!(current.plane_len(), next.plane_len());

    let (nz, ny, nx) = (current.local_nz(), current.ny(), current.nx());
    let dx2 = phys.dx * phys.dx;
    let (feed, kill, dt) = (phys.feed, phys.kill, phys.dt);

    let u = current.u();
    let v = current.v();
    let (nu, nv) = next.uv_mut();
    let mut clamped = 0usize;

    for lz in 1..=nz {
        for y in 0..ny {
            let ym = if y > 0 { y - 1 } else { ny - 1 };
            let yp = if y + 1 < ny { y + 1 } else { 0 };
            for x in 0..nx {
                let xm = if x > 0 { x - 1 } else { nx - 1 };
                let xp = if x + 1 < nx { x + 1 } else { 0 };

                let i = current.index(lz, y, x);
                let uc = u[i];
                let vc = v[i];

                let sum_u = u[current.index(lz - 1, y, x)]
                    + u[current.index(lz + 1, y, x)]
                    + u[current.index(lz, ym, x)]
                    + u[current.index(lz, yp, x)]
                    + u[current.index(lz, y, xm)]
                    + u[current.index(lz, y, xp)];
                let sum_v = v[current.index(lz - 1, y, x)]
                    + v[current.index(lz + 1, y, x)]
                    + v[current.index(lz, ym, x)]
                    + v[current.index(lz, yp, x)]
                    + v[current.index(lz, y, xm)]
                    + v[current.index(lz, y, xp)];

                let lap_u = (sum_u - 6.0 * uc) / dx2;
                let lap_v = (sum_v - 6.0 * vc) / dx2;

                let uvv = uc * vc * vc;
                let (un, hit_u) = clamp_unit(uc + dt * (phys.du * lap_u - uvv + feed * (1.0 - uc)));
                let (vn, hit_v) = clamp_unit(vc + dt * (phys.dv * lap_v + uvv - (feed + kill) * vc));
                clamped += usize::from(hit_u) + usize::from(hit_v);

                nu[i] = un;
                nv[i] = vn;
            }
        }
    }
    clamped
}
