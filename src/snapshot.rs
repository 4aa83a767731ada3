//! Snapshot extraction and frame emission.
//!
//! A snapshot is a transient, ghost-free copy of this rank's interior
//! field data, tagged with its global offset and the step that produced
//! it. The emitter frames snapshots for the sink: begin-frame, one `put`
//! per field, the scalar step index from the designated rank only, then
//! end-frame. Frame indices advance only on emitted steps and strictly
//! increase.

use crate::config::GridConfig;
use crate::domain::Subdomain;
use crate::field::{GhostedField, Scalar};
use crate::sim_error::SimError;
use crate::sink::{StreamSink, VariableSpec};

/// Ghost-free interior data for one rank at one step; handed to the sink
/// and then discarded.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub step: u64,
    /// Global z offset of this rank's block.
    pub z_start: usize,
    /// Local block extent in `(z, y, x)` order; z may be zero.
    pub extent: [usize; 3],
    pub u: Vec<f64>,
    pub v: Vec<f64>,
}

impl Snapshot {
    /// Copy the interior out of `field`. The field must be fully
    /// integrated (never mid-sweep) when this is called.
    pub fn capture(step: u64, sub: &Subdomain, field: &GhostedField) -> Self {
        Self {
            step,
            z_start: sub.z_start,
            extent: [sub.local_nz, field.ny(), field.nx()],
            u: field.interior(Scalar::U),
            v: field.interior(Scalar::V),
        }
    }

    /// Payload size of both fields in bytes.
    pub fn payload_bytes(&self) -> usize {
        (self.u.len() + self.v.len()) * std::mem::size_of::<f64>()
    }
}

/// Frames snapshots for a [`StreamSink`], declaring the U/V variables once
/// and keeping their names and global shape fixed across frames.
#[derive(Clone, Debug)]
pub struct SnapshotEmitter {
    var_u: VariableSpec,
    var_v: VariableSpec,
    /// Exactly one rank emits the scalar step variable, so the sink never
    /// sees duplicate or conflicting scalar writes.
    designated: bool,
    next_frame: u64,
}

impl SnapshotEmitter {
    pub const STEP_VARIABLE: &'static str = "step";

    pub fn new(grid: &GridConfig, rank: usize) -> Self {
        Self {
            var_u: VariableSpec::new("U", grid.shape()),
            var_v: VariableSpec::new("V", grid.shape()),
            designated: rank == 0,
            next_frame: 0,
        }
    }

    /// Output frames emitted so far; also the index the next frame gets.
    pub fn frames_emitted(&self) -> u64 {
        self.next_frame
    }

    /// Emit one frame and return its index.
    ///
    /// # Errors
    /// Propagates any sink contract violation or transport failure; the
    /// frame counter does not advance on error.
    pub fn emit<S: StreamSink>(&mut self, sink: &mut S, snap: &Snapshot) -> Result<u64, SimError> {
        sink.begin_frame()?;
        let offset = [snap.z_start, 0, 0];
        sink.put(&self.var_u, offset, snap.extent, &snap.u)?;
        sink.put(&self.var_v, offset, snap.extent, &snap.v)?;
        if self.designated {
            sink.put_step(Self::STEP_VARIABLE, snap.step)?;
        }
        sink.end_frame()?;
        let frame = self.next_frame;
        self.next_frame += 1;
        log::trace!("emitted frame {frame} for step {}", snap.step);
        Ok(frame)
    }
}
