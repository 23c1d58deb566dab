//! Pull-based iteration over a stage's output.
//!
//! Every stage output is exposed as a [`PointSource`]: a cursor that fills a
//! caller-owned [`PointBuffer`] on request. Sources are chained at open time
//! (a filter's source owns the source of its input), so a stage iterator is
//! self-contained once created and does not borrow the manager.

use crate::pipeline::buffer::PointBuffer;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::StageId;

/// Cursor over a stream of points.
pub trait PointSource: Send {
    /// Clear `buffer` and place up to `min(max, capacity)` points in it.
    ///
    /// Returning fewer points than that signals the end of the sequence.
    fn read(&mut self, buffer: &mut PointBuffer, max: u32) -> PipelineResult<u32>;

    /// Whether [`PointSource::seek`] is available on this source and every
    /// source it pulls from.
    fn supports_seek(&self) -> bool {
        false
    }

    /// Reposition so the next read starts at point `index`.
    fn seek(&mut self, _index: u64) -> PipelineResult<()> {
        Err(PipelineError::unsupported("point source", "seek"))
    }
}

/// Sequential iterator: a monotonically advancing cursor.
///
/// Once a read comes back short the iterator is exhausted and every later
/// read returns 0.
pub struct StageSequentialIterator {
    stage: StageId,
    source: Box<dyn PointSource>,
    index: u64,
    exhausted: bool,
}

impl StageSequentialIterator {
    pub(crate) fn new(stage: StageId, source: Box<dyn PointSource>) -> Self {
        Self {
            stage,
            source,
            index: 0,
            exhausted: false,
        }
    }

    /// Stage this iterator reads from.
    pub fn stage(&self) -> StageId {
        self.stage
    }

    /// Fill `buffer` up to its capacity.
    pub fn read(&mut self, buffer: &mut PointBuffer) -> PipelineResult<u32> {
        let capacity = buffer.capacity();
        self.read_at_most(buffer, capacity)
    }

    /// Fill `buffer` with at most `max` points.
    pub fn read_at_most(&mut self, buffer: &mut PointBuffer, max: u32) -> PipelineResult<u32> {
        if self.exhausted {
            buffer.clear();
            return Ok(0);
        }

        let want = max.min(buffer.capacity());
        let count = self.source.read(buffer, want)?;
        self.index += u64::from(count);
        if count < want {
            self.exhausted = true;
        }
        Ok(count)
    }

    /// Number of points read so far.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn at_end(&self) -> bool {
        self.exhausted
    }
}

impl std::fmt::Debug for StageSequentialIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSequentialIterator")
            .field("stage", &self.stage)
            .field("index", &self.index)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

/// Random-access iterator over a fully seekable chain.
pub struct StageRandomIterator {
    stage: StageId,
    source: Box<dyn PointSource>,
    index: u64,
}

impl StageRandomIterator {
    pub(crate) fn new(stage: StageId, source: Box<dyn PointSource>) -> Self {
        Self {
            stage,
            source,
            index: 0,
        }
    }

    pub fn stage(&self) -> StageId {
        self.stage
    }

    /// Move the cursor to point `index`.
    pub fn seek(&mut self, index: u64) -> PipelineResult<()> {
        self.source.seek(index)?;
        self.index = index;
        Ok(())
    }

    pub fn read(&mut self, buffer: &mut PointBuffer) -> PipelineResult<u32> {
        let capacity = buffer.capacity();
        self.read_at_most(buffer, capacity)
    }

    pub fn read_at_most(&mut self, buffer: &mut PointBuffer, max: u32) -> PipelineResult<u32> {
        let count = self.source.read(buffer, max.min(buffer.capacity()))?;
        self.index += u64::from(count);
        Ok(count)
    }

    pub fn index(&self) -> u64 {
        self.index
    }
}

impl std::fmt::Debug for StageRandomIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRandomIterator")
            .field("stage", &self.stage)
            .field("index", &self.index)
            .finish()
    }
}
