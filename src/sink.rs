//! Streaming-sink seam: where consistent snapshots leave the simulation.
//!
//! The transport that physically moves frames (connection setup, queuing,
//! WAN marshaling) lives outside this crate; the core is bound only by the
//! begin/put/end contract below. Every `put` for a frame happens strictly
//! between that frame's `begin_frame` and `end_frame` on the same process,
//! and a variable's name and global shape never change once declared.

use std::collections::HashMap;

use crate::sim_error::SimError;

/// A sink variable: name plus immutable global shape in `(z, y, x)` order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableSpec {
    pub name: String,
    pub global_shape: [usize; 3],
}

impl VariableSpec {
    pub fn new(name: impl Into<String>, global_shape: [usize; 3]) -> Self {
        Self {
            name: name.into(),
            global_shape,
        }
    }
}

/// Frame-oriented snapshot consumer.
///
/// `end_frame` is contractually collective: it must not return on any
/// participating process until the frame is complete on all of them. That
/// is what keeps frame `s + 1` from starting anywhere before frame `s`
/// finished everywhere; in-process sinks used by tests trivially satisfy
/// it.
pub trait StreamSink {
    fn begin_frame(&mut self) -> Result<(), SimError>;

    /// Contribute this process's block of an array variable to the open
    /// frame. `offset`/`extent` address the block inside the variable's
    /// global shape; a zero z-extent block is a legitimate contribution
    /// from a zero-work rank.
    fn put(
        &mut self,
        var: &VariableSpec,
        offset: [usize; 3],
        extent: [usize; 3],
        data: &[f64],
    ) -> Result<(), SimError>;

    /// Contribute a scalar to the open frame (emitted by exactly one
    /// designated process).
    fn put_step(&mut self, name: &str, step: u64) -> Result<(), SimError>;

    fn end_frame(&mut self) -> Result<(), SimError>;
}

/// One recorded `put` inside a [`Frame`].
#[derive(Clone, Debug, PartialEq)]
pub struct FramePut {
    pub name: String,
    pub offset: [usize; 3],
    pub extent: [usize; 3],
    pub data: Vec<f64>,
}

/// One completed frame as recorded by [`MemorySink`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub puts: Vec<FramePut>,
    pub step: Option<u64>,
}

/// In-memory sink for tests and single-process runs. Records every frame
/// and enforces the full sink contract, so contract violations surface as
/// errors instead of silently corrupt streams.
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<Frame>,
    open: Option<Frame>,
    declared: HashMap<String, [usize; 3]>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All completed frames, in emission order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl StreamSink for MemorySink {
    fn begin_frame(&mut self) -> Result<(), SimError> {
        if self.open.is_some() {
            return Err(SimError::FrameAlreadyOpen);
        }
        self.open = Some(Frame::default());
        Ok(())
    }

    fn put(
        &mut self,
        var: &VariableSpec,
        offset: [usize; 3],
        extent: [usize; 3],
        data: &[f64],
    ) -> Result<(), SimError> {
        match self.declared.get(&var.name) {
            Some(&shape) if shape != var.global_shape => {
                return Err(SimError::VariableShapeChanged {
                    name: var.name.clone(),
                    declared: shape,
                    got: var.global_shape,
                });
            }
            Some(_) => {}
            None => {
                self.declared.insert(var.name.clone(), var.global_shape);
            }
        }
        let expected: usize = extent.iter().product();
        if data.len() != expected {
            return Err(SimError::PutLengthMismatch {
                name: var.name.clone(),
                expected,
                got: data.len(),
            });
        }
        if offset
            .iter()
            .zip(extent)
            .zip(var.global_shape)
            .any(|((&o, e), s)| o + e > s)
        {
            return Err(SimError::PutRegionOutOfBounds {
                name: var.name.clone(),
                offset,
                extent,
                shape: var.global_shape,
            });
        }
        let frame = self
            .open
            .as_mut()
            .ok_or_else(|| SimError::PutOutsideFrame(var.name.clone()))?;
        frame.puts.push(FramePut {
            name: var.name.clone(),
            offset,
            extent,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn put_step(&mut self, name: &str, step: u64) -> Result<(), SimError> {
        let frame = self
            .open
            .as_mut()
            .ok_or_else(|| SimError::PutOutsideFrame(name.to_string()))?;
        frame.step = Some(step);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), SimError> {
        let frame = self.open.take().ok_or(SimError::FrameNotOpen)?;
        self.frames.push(frame);
        Ok(())
    }
}

/// Sink that discards all data but still counts frames; useful for
/// throughput measurement without a consumer.
#[derive(Debug, Default)]
pub struct NullSink {
    frames: u64,
    open: bool,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl StreamSink for NullSink {
    fn begin_frame(&mut self) -> Result<(), SimError> {
        if self.open {
            return Err(SimError::FrameAlreadyOpen);
        }
        self.open = true;
        Ok(())
    }

    fn put(
        &mut self,
        _var: &VariableSpec,
        _offset: [usize; 3],
        _extent: [usize; 3],
        _data: &[f64],
    ) -> Result<(), SimError> {
        Ok(())
    }

    fn put_step(&mut self, _name: &str, _step: u64) -> Result<(), SimError> {
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), SimError> {
        if !self.open {
            return Err(SimError::FrameNotOpen);
        }
        self.open = false;
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var() -> VariableSpec {
        VariableSpec::new("U", [4, 4, 4])
    }

    #[test]
    fn records_frames_in_order() {
        let mut sink = MemorySink::new();
        for step in [0u64, 5, 10] {
            sink.begin_frame().unwrap();
            sink.put(&var(), [0, 0, 0], [4, 4, 4], &[0.0; 64]).unwrap();
            sink.put_step("step", step).unwrap();
            sink.end_frame().unwrap();
        }
        let steps: Vec<_> = sink.frames().iter().map(|f| f.step).collect();
        assert_eq!(steps, vec![Some(0), Some(5), Some(10)]);
    }

    #[test]
    fn put_outside_frame_is_rejected() {
        let mut sink = MemorySink::new();
        let err = sink.put(&var(), [0, 0, 0], [4, 4, 4], &[0.0; 64]);
        assert!(matches!(err, Err(SimError::PutOutsideFrame(_))));
        assert_eq!(sink.end_frame(), Err(SimError::FrameNotOpen));
    }

    #[test]
    fn nested_begin_is_rejected() {
        let mut sink = MemorySink::new();
        sink.begin_frame().unwrap();
        assert_eq!(sink.begin_frame(), Err(SimError::FrameAlreadyOpen));
    }

    #[test]
    fn shape_redeclaration_is_rejected() {
        let mut sink = MemorySink::new();
        sink.begin_frame().unwrap();
        sink.put(&var(), [0, 0, 0], [4, 4, 4], &[0.0; 64]).unwrap();
        let changed = VariableSpec::new("U", [8, 4, 4]);
        let err = sink.put(&changed, [0, 0, 0], [4, 4, 4], &[0.0; 64]);
        assert!(matches!(err, Err(SimError::VariableShapeChanged { .. })));
    }

    #[test]
    fn wrong_length_and_out_of_bounds_are_rejected() {
        let mut sink = MemorySink::new();
        sink.begin_frame().unwrap();
        assert!(matches!(
            sink.put(&var(), [0, 0, 0], [2, 4, 4], &[0.0; 64]),
            Err(SimError::PutLengthMismatch { .. })
        ));
        assert!(matches!(
            sink.put(&var(), [3, 0, 0], [2, 4, 4], &[0.0; 32]),
            Err(SimError::PutRegionOutOfBounds { .. })
        ));
    }

    #[test]
    fn zero_extent_put_is_legitimate() {
        let mut sink = MemorySink::new();
        sink.begin_frame().unwrap();
        sink.put(&var(), [4, 0, 0], [0, 4, 4], &[]).unwrap();
        sink.end_frame().unwrap();
        assert_eq!(sink.frames()[0].puts[0].data.len(), 0);
    }
}
