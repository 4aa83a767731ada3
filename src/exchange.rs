//! Halo exchange: refresh both ghost planes of both fields from the axis
//! neighbors, applying the zero-gradient policy at global edges.
//!
//! Four paired exchanges per step (2 fields × 2 links), each a blocking
//! rendezvous with one neighbor over [`Communicator::send_recv`]. The
//! exchanges write disjoint ghost planes and may complete in any order,
//! but `exchange_halos` does not return until all of them have, so every
//! ghost cell is valid before the stencil reads it.
//!
//! The lateral y/x axes are periodic and wrap locally in the stencil; no
//! communication happens for them.

use bytemuck::{cast_slice, pod_collect_to_vec};

use crate::comm::{CommTag, Communicator};
use crate::domain::Subdomain;
use crate::field::{Edge, GhostedField, Scalar};
use crate::sim_error::SimError;

/// Tag family for halo traffic: base + 0 for U, base + 1 for V. The same
/// tag is used on both sides of a link; the peer rank disambiguates.
pub const HALO_TAG: CommTag = CommTag(0x4100);

/// Refresh all ghost planes of `field` for one step.
///
/// A zero-extent subdomain returns immediately: it has no interior to
/// guard and, by construction, no neighbor links either.
///
/// # Errors
/// Any incomplete or wrongly-sized exchange is fatal
/// ([`SimError::Communication`] / [`SimError::HaloPayloadSize`]); the
/// field is no longer globally consistent and the run must abort.
pub fn exchange_halos<C: Communicator>(
    comm: &C,
    sub: &Subdomain,
    field: &mut GhostedField,
) -> Result<(), SimError> {
    if sub.is_empty() {
        return Ok(());
    }
    let payload = field.plane_len() * std::mem::size_of::<f64>();

    for (k, which) in [Scalar::U, Scalar::V].into_iter().enumerate() {
        let tag = HALO_TAG.offset(k as u16);

        // Lower link: send our lowest interior plane, receive the
        // neighbor's highest into our lower ghost.
        match sub.below {
            Some(peer) => {
                let send = field.copy_plane(which, 1);
                let raw = comm.send_recv(peer, tag, cast_slice(&send), payload)?;
                let plane: Vec<f64> = pod_collect_to_vec(&raw);
                field.write_plane(which, 0, &plane);
            }
            None => field.mirror_edge(which, Edge::Lower),
        }

        // Upper link, symmetric.
        match sub.above {
            Some(peer) => {
                let send = field.copy_plane(which, sub.local_nz);
                let raw = comm.send_recv(peer, tag, cast_slice(&send), payload)?;
                let plane: Vec<f64> = pod_collect_to_vec(&raw);
                field.write_plane(which, sub.local_nz + 1, &plane);
            }
            None => field.mirror_edge(which, Edge::Upper),
        }
    }
    Ok(())
}
