//! 1-D block decomposition of the global z axis across ranks.
//!
//! Each rank owns a contiguous run of z slices; the first `nz % size` ranks
//! take one extra slice. Neighbor identities are plain rank ids recomputed
//! from the partition, never object references, so there is no link cycle
//! between adjacent subdomains.

use crate::sim_error::SimError;

/// This rank's slice of the decomposed axis plus its exchange partners.
///
/// With more ranks than slices the surplus ranks get `local_nz == 0`; those
/// ranks are legitimate zero-work participants, and because the remainder
/// goes to the lowest ranks they always form a suffix of the rank order.
/// Neighbor links skip them, so a zero-extent rank has no partners and the
/// last populated rank applies the edge boundary policy upward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Subdomain {
    pub rank: usize,
    pub size: usize,
    /// Global z index of this rank's first interior slice.
    pub z_start: usize,
    /// Number of interior slices owned by this rank (may be zero).
    pub local_nz: usize,
    /// Rank owning the slices just below `z_start`, if any.
    pub below: Option<usize>,
    /// Rank owning the slices just above the local run, if any.
    pub above: Option<usize>,
}

/// Pure partition arithmetic shared by [`Subdomain::partition`] and the
/// neighbor computation.
#[inline]
fn slice_of(nz: usize, size: usize, rank: usize) -> (usize, usize) {
    let base = nz / size;
    let remainder = nz % size;
    let local = base + usize::from(rank < remainder);
    let start = rank * base + rank.min(remainder);
    (start, local)
}

impl Subdomain {
    /// Decompose `nz` global slices over `size` ranks and describe `rank`'s
    /// share.
    ///
    /// Deterministic: extents sum to `nz`, differ by at most one, and the
    /// extra slices go to the lowest ranks.
    ///
    /// # Errors
    /// Returns [`SimError::RankOutOfRange`] if `rank >= size` (or `size`
    /// is zero).
    ///
    /// ```
    /// use gray_scott_stream::domain::Subdomain;
    /// let lo = Subdomain::partition(8, 2, 0).unwrap();
    /// let hi = Subdomain::partition(8, 2, 1).unwrap();
    /// assert_eq!((lo.z_start, lo.local_nz), (0, 4));
    /// assert_eq!((hi.z_start, hi.local_nz), (4, 4));
    /// assert_eq!(lo.above, Some(1));
    /// assert_eq!(hi.below, Some(0));
    /// ```
    pub fn partition(nz: usize, size: usize, rank: usize) -> Result<Self, SimError> {
        if size == 0 || rank >= size {
            return Err(SimError::RankOutOfRange { rank, size });
        }
        let (z_start, local_nz) = slice_of(nz, size, rank);

        // A populated rank's lower neighbor is always populated (extents
        // never grow with rank), so only the upper link needs an extent
        // check. Zero-extent ranks have no partners at all.
        let (below, above) = if local_nz == 0 {
            (None, None)
        } else {
            let below = rank.checked_sub(1);
            let above = (rank + 1 < size && slice_of(nz, size, rank + 1).1 > 0).then(|| rank + 1);
            (below, above)
        };

        Ok(Self {
            rank,
            size,
            z_start,
            local_nz,
            below,
            above,
        })
    }

    /// True when this rank owns no interior slices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.local_nz == 0
    }
}
