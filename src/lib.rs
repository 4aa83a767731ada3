#![cfg_attr(docsrs, feature(doc_cfg))]
//! # gray-scott-stream
//!
//! gray-scott-stream is the distributed-memory core of a Gray-Scott
//! reaction-diffusion simulation: 1-D domain decomposition along z,
//! ghosted local storage for the two coupled fields, per-step halo
//! exchange over a pluggable communication backend, an explicit 7-point
//! stencil integrator, and a stepping driver that emits consistent,
//! ghost-free snapshots to a streaming sink.
//!
//! ## Features
//! - Deterministic block partition of the z axis (remainder to low ranks,
//!   zero-extent ranks are valid zero-work participants)
//! - Pluggable communication backends (serial, in-process threaded, MPI)
//!   behind one [`Communicator`](comm::Communicator) seam
//! - Zero-gradient boundary policy on the decomposed axis, periodic
//!   lateral axes handled locally in the stencil
//! - Frame-oriented snapshot emission through the
//!   [`StreamSink`](sink::StreamSink) contract; the physical transport is
//!   a collaborator, not part of this crate
//!
//! ## Determinism
//!
//! Identical grid, rank count, constants and step counts produce
//! bit-identical field values at every emitted step. Only the throughput
//! metrics reduction may vary with backend summation order; it never
//! feeds back into field state.
//!
//! ## Usage
//!
//! ```
//! use gray_scott_stream::prelude::*;
//!
//! let config = RunConfig {
//!     grid: GridConfig::cube(16),
//!     total_steps: 20,
//!     output_interval: 10,
//!     ..RunConfig::default()
//! };
//! let comm = NoComm;
//! let mut sink = MemorySink::new();
//! let mut driver = SimulationDriver::new(config, &comm)?;
//! let summary = driver.run(&comm, &mut sink)?;
//! assert_eq!(summary.frames_emitted, 3);
//! # Ok::<(), gray_scott_stream::sim_error::SimError>(())
//! ```
//!
//! Enable the `mpi-support` feature and construct
//! [`MpiComm`](comm::MpiComm) instead of [`NoComm`](comm::NoComm) to run
//! one rank per process under `mpirun`.

pub mod comm;
pub mod config;
pub mod domain;
pub mod driver;
pub mod exchange;
pub mod field;
pub mod metrics;
pub mod sim_error;
pub mod sink;
pub mod snapshot;
pub mod stencil;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::MpiComm;
    pub use crate::comm::{CommTag, Communicator, NoComm, RayonComm, Wait};
    pub use crate::config::{GridConfig, Physics, RunConfig};
    pub use crate::domain::Subdomain;
    pub use crate::driver::{RunSummary, SimulationDriver};
    pub use crate::exchange::exchange_halos;
    pub use crate::field::{Edge, GhostedField, Scalar};
    pub use crate::sim_error::SimError;
    pub use crate::sink::{Frame, MemorySink, NullSink, StreamSink, VariableSpec};
    pub use crate::snapshot::{Snapshot, SnapshotEmitter};
    pub use crate::stencil::step_interior;
}
