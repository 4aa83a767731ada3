//! Per-frame throughput accounting.
//!
//! Purely observational: the reduction result feeds logging on the
//! designated rank and never touches field state, so a backend whose
//! summation order varies (or a future best-effort relaxation of the
//! blocking reduce) cannot perturb simulation results.

use std::time::Duration;

use crate::comm::{CommTag, Communicator};
use crate::sim_error::SimError;

/// Tag family for the metrics reduction.
pub const METRICS_TAG: CommTag = CommTag(0x4200);

const MIB: f64 = 1024.0 * 1024.0;

/// Sum every rank's emitted payload for one frame and log the aggregate
/// throughput on rank 0.
///
/// # Errors
/// [`SimError::Communication`] if the reduction cannot complete; treated
/// as fatal like any other lost collective.
pub fn report_frame<C: Communicator>(
    comm: &C,
    frame: u64,
    step: u64,
    local_bytes: usize,
    elapsed: Duration,
) -> Result<(), SimError> {
    let local_mib = local_bytes as f64 / MIB;
    if let Some(total_mib) = comm.reduce_sum(METRICS_TAG, local_mib)? {
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { total_mib / secs } else { 0.0 };
        log::info!(
            "frame {frame} (step {step}): {total_mib:.2} MiB in {secs:.3} s ({rate:.2} MiB/s)"
        );
    }
    Ok(())
}
