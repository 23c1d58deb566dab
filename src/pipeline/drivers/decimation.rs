//! `filters.decimation`: keep every `step`-th point, starting at `offset`.

use super::scratch;
use crate::pipeline::buffer::PointBuffer;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::iterator::PointSource;
use crate::pipeline::options::Options;
use crate::pipeline::schema::{Schema, SchemaLayout};
use crate::pipeline::stage::FilterDriver;

pub struct DecimationFilter {
    step: u64,
    offset: u64,
}

impl DecimationFilter {
    pub const TYPE_NAME: &'static str = "filters.decimation";

    pub fn new(step: u64, offset: u64) -> PipelineResult<Self> {
        if step == 0 {
            return Err(PipelineError::InvalidOption {
                stage: Self::TYPE_NAME.to_string(),
                option: "step".to_string(),
                value: step.to_string(),
                reason: "step must be at least 1".to_string(),
            });
        }
        Ok(Self { step, offset })
    }

    pub fn from_options(options: &Options) -> PipelineResult<Self> {
        let step = options.get_or(Self::TYPE_NAME, "step", 1u64)?;
        let offset = options.get_or(Self::TYPE_NAME, "offset", 0u64)?;
        Self::new(step, offset)
    }
}

impl FilterDriver for DecimationFilter {
    fn schema(&self, input: &Schema) -> PipelineResult<Schema> {
        Ok(input.clone())
    }

    fn num_points(&self, input: u64) -> u64 {
        if input > self.offset {
            (input - self.offset - 1) / self.step + 1
        } else {
            0
        }
    }

    fn open(
        &self,
        input_schema: &Schema,
        upstream: Box<dyn PointSource>,
    ) -> PipelineResult<Box<dyn PointSource>> {
        Ok(Box::new(DecimationSource {
            upstream,
            layout: SchemaLayout::new(input_schema),
            scratch: None,
            step: self.step,
            offset: self.offset,
            upstream_pos: 0,
            upstream_done: false,
        }))
    }
}

struct DecimationSource {
    upstream: Box<dyn PointSource>,
    layout: SchemaLayout,
    scratch: Option<PointBuffer>,
    step: u64,
    offset: u64,
    /// Index of the next upstream point.
    upstream_pos: u64,
    upstream_done: bool,
}

impl PointSource for DecimationSource {
    fn read(&mut self, buffer: &mut PointBuffer, max: u32) -> PipelineResult<u32> {
        buffer.clear();
        let max = max.min(buffer.capacity());

        while buffer.len() < max && !self.upstream_done {
            // Pulling remaining * step points can never overfill the output.
            let remaining = u64::from(max - buffer.len());
            let want = remaining.saturating_mul(self.step).min(u64::from(u32::MAX)) as u32;
            let chunk = scratch(&mut self.scratch, &self.layout, want);
            let want = want.min(chunk.capacity());
            let got = self.upstream.read(chunk, want)?;

            for i in 0..got {
                let index = self.upstream_pos + u64::from(i);
                if index >= self.offset && (index - self.offset) % self.step == 0 {
                    buffer.push_from(chunk, i);
                }
            }
            self.upstream_pos += u64::from(got);

            if got < want {
                self.upstream_done = true;
            }
        }

        Ok(buffer.len())
    }

    fn supports_seek(&self) -> bool {
        self.upstream.supports_seek()
    }

    fn seek(&mut self, index: u64) -> PipelineResult<()> {
        let target = self.offset.saturating_add(index.saturating_mul(self.step));
        self.upstream.seek(target)?;
        self.upstream_pos = target;
        self.upstream_done = false;
        Ok(())
    }
}
