//! SimError: unified error type for the gray-scott-stream public APIs.
//!
//! Configuration problems are detected before stepping begins and fail fast;
//! communication failures are fatal because the distributed field is no
//! longer globally consistent once an exchange is lost. Callers must not
//! continue stepping after receiving a [`SimError::Communication`].

use thiserror::Error;

/// Unified error type for simulation setup, exchange and emission.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A grid axis was configured with zero extent.
    #[error("grid axis `{0}` must be non-zero")]
    InvalidGridAxis(&'static str),
    /// A physical constant was configured outside its valid range.
    #[error("physical constant `{name}` has invalid value {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    /// The output interval must be at least one step.
    #[error("output interval must be non-zero")]
    ZeroOutputInterval,
    /// A rank id outside `0..size` was handed to the partitioner.
    #[error("rank {rank} out of range for {size} processes")]
    RankOutOfRange { rank: usize, size: usize },
    /// A paired exchange or reduction with `peer` did not complete.
    #[error("communication with rank {peer} failed during {op}")]
    Communication { peer: usize, op: &'static str },
    /// A peer delivered a halo payload of the wrong size.
    #[error("rank {peer} delivered {got} halo bytes, expected {expected}")]
    HaloPayloadSize {
        peer: usize,
        expected: usize,
        got: usize,
    },
    /// `put` was called while no frame was open on this process.
    #[error("put of `{0}` outside begin_frame/end_frame")]
    PutOutsideFrame(String),
    /// `begin_frame` was called while a frame was already open.
    #[error("begin_frame while a frame is already open")]
    FrameAlreadyOpen,
    /// `end_frame` was called while no frame was open.
    #[error("end_frame without a matching begin_frame")]
    FrameNotOpen,
    /// A variable was re-declared with a different global shape.
    #[error("variable `{name}` re-declared with global shape {got:?}, previously {declared:?}")]
    VariableShapeChanged {
        name: String,
        declared: [usize; 3],
        got: [usize; 3],
    },
    /// A put's data length disagreed with its declared local extent.
    #[error("variable `{name}`: {got} values put for local extent {expected}")]
    PutLengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    /// A put's region falls outside the variable's global shape.
    #[error("variable `{name}`: region offset {offset:?} + extent {extent:?} exceeds global shape {shape:?}")]
    PutRegionOutOfBounds {
        name: String,
        offset: [usize; 3],
        extent: [usize; 3],
        shape: [usize; 3],
    },
}
