//! Output sinks for interpolation frames and convergence records
//!
//! The solver never decides where its output goes; callers hand it a
//! [`FrameSink`] and a [`ConvergenceSink`].

use std::io::Write;

use crate::error::Result;
use crate::field::DensityField;

/// One entry of the convergence log
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceRecord {
    /// Zero-based transport iteration
    pub iteration: usize,
    /// Mean squared difference between target and current mass fractions
    pub mse: f64,
}

/// Append-only stream of convergence records
pub trait ConvergenceSink {
    fn record(&mut self, record: ConvergenceRecord) -> Result<()>;
}

impl ConvergenceSink for Vec<ConvergenceRecord> {
    fn record(&mut self, record: ConvergenceRecord) -> Result<()> {
        self.push(record);
        Ok(())
    }
}

impl<S: ConvergenceSink + ?Sized> ConvergenceSink for &mut S {
    fn record(&mut self, record: ConvergenceRecord) -> Result<()> {
        (**self).record(record)
    }
}

/// Convergence sink writing one `"<iteration> <mse>"` line per record
#[derive(Debug)]
pub struct WriterLog<W: Write> {
    writer: W,
}

impl<W: Write> WriterLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ConvergenceSink for WriterLog<W> {
    fn record(&mut self, record: ConvergenceRecord) -> Result<()> {
        writeln!(self.writer, "{} {}", record.iteration, record.mse)?;
        Ok(())
    }
}

/// Receiver of rendered interpolation frames
pub trait FrameSink {
    /// Accept the frame rendered at `iteration` for interpolation step `step`
    fn emit(&mut self, iteration: usize, step: usize, frame: &DensityField) -> Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn emit(&mut self, iteration: usize, step: usize, frame: &DensityField) -> Result<()> {
        (**self).emit(iteration, step, frame)
    }
}

/// A frame kept in memory by [`FrameCollector`]
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub iteration: usize,
    pub step: usize,
    pub field: DensityField,
}

/// Frame sink that keeps every frame in memory
#[derive(Debug, Clone, Default)]
pub struct FrameCollector {
    frames: Vec<Frame>,
}

impl FrameCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

impl FrameSink for FrameCollector {
    fn emit(&mut self, iteration: usize, step: usize, frame: &DensityField) -> Result<()> {
        self.frames.push(Frame {
            iteration,
            step,
            field: frame.clone(),
        });
        Ok(())
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn emit(&mut self, _iteration: usize, _step: usize, _frame: &DensityField) -> Result<()> {
        Ok(())
    }
}

impl ConvergenceSink for NullSink {
    fn record(&mut self, _record: ConvergenceRecord) -> Result<()> {
        Ok(())
    }
}
