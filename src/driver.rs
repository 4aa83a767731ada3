//! The stepping driver: owns the buffer pair and runs the simulation
//! state machine.
//!
//! Per step `s` in `0..=total_steps`: emit a frame if `s` lands on the
//! output interval, then -- unless `s` is the final step -- exchange
//! halos, integrate into the next-step buffer, and swap. The swap is the
//! only point where "next" becomes "current", so no reader ever observes
//! a partially integrated field, and every emitted frame reflects a fully
//! integrated, halo-consistent state.

use std::time::Instant;

use crate::comm::Communicator;
use crate::config::RunConfig;
use crate::domain::Subdomain;
use crate::exchange::exchange_halos;
use crate::field::GhostedField;
use crate::metrics;
use crate::sim_error::SimError;
use crate::sink::StreamSink;
use crate::snapshot::{Snapshot, SnapshotEmitter};
use crate::stencil::step_interior;

/// What a completed run did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub total_steps: u64,
    pub frames_emitted: u64,
}

/// Owns the per-rank simulation state and the step loop. All mutable
/// state is threaded explicitly through the components; there is no
/// ambient global.
pub struct SimulationDriver {
    config: RunConfig,
    sub: Subdomain,
    current: GhostedField,
    next: GhostedField,
    emitter: SnapshotEmitter,
    step: u64,
}

impl SimulationDriver {
    /// Validate the configuration, partition the domain for this rank and
    /// seed the standard centered perturbation.
    ///
    /// # Errors
    /// Fails fast on configuration problems, before any stepping or
    /// communication happens.
    pub fn new<C: Communicator>(config: RunConfig, comm: &C) -> Result<Self, SimError> {
        config.validate()?;
        let sub = Subdomain::partition(config.grid.nz, comm.size(), comm.rank())?;
        if sub.is_empty() {
            log::warn!(
                "rank {} owns zero slices of nz = {} over {} ranks; continuing as a zero-work participant",
                sub.rank,
                config.grid.nz,
                sub.size
            );
        }
        let mut current = GhostedField::new(&sub, &config.grid);
        current.seed_center(&config.grid);
        let next = GhostedField::new(&sub, &config.grid);
        let emitter = SnapshotEmitter::new(&config.grid, sub.rank);
        Ok(Self {
            config,
            sub,
            current,
            next,
            emitter,
            step: 0,
        })
    }

    #[inline]
    pub fn subdomain(&self) -> &Subdomain {
        &self.sub
    }

    /// The current (fully integrated) field state.
    #[inline]
    pub fn field(&self) -> &GhostedField {
        &self.current
    }

    #[inline]
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Advance one step: halo exchange for the current state, stencil
    /// sweep into the next buffer, swap.
    ///
    /// # Errors
    /// A failed exchange aborts the run; the field would otherwise carry
    /// stale ghost data into the stencil.
    pub fn advance<C: Communicator>(&mut self, comm: &C) -> Result<(), SimError> {
        exchange_halos(comm, &self.sub, &mut self.current)?;
        let clamped = step_interior(&self.config.physics, &self.current, &mut self.next);
        if clamped > 0 {
            log::debug!("step {}: clamped {clamped} field updates to [0,1]", self.step);
        }
        std::mem::swap(&mut self.current, &mut self.next);
        self.step += 1;
        Ok(())
    }

    /// Run the remaining steps to completion, emitting frames at the
    /// configured interval (step 0 included).
    ///
    /// # Errors
    /// Aborts on the first communication or sink failure with no
    /// partial-result recovery.
    pub fn run<C, S>(&mut self, comm: &C, sink: &mut S) -> Result<RunSummary, SimError>
    where
        C: Communicator,
        S: StreamSink,
    {
        let total = self.config.total_steps;
        let interval = self.config.output_interval;
        loop {
            let s = self.step;
            if s % interval == 0 {
                let started = Instant::now();
                let snap = Snapshot::capture(s, &self.sub, &self.current);
                let bytes = snap.payload_bytes();
                let frame = self.emitter.emit(sink, &snap)?;
                metrics::report_frame(comm, frame, s, bytes, started.elapsed())?;
            }
            if s == total {
                break;
            }
            self.advance(comm)?;
        }
        Ok(RunSummary {
            total_steps: total,
            frames_emitted: self.emitter.frames_emitted(),
        })
    }
}
