//! `filters.mosaic`: concatenate the points of several inputs.

use super::scratch;
use crate::pipeline::buffer::PointBuffer;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::iterator::PointSource;
use crate::pipeline::options::Options;
use crate::pipeline::schema::{Schema, SchemaLayout};
use crate::pipeline::stage::MultiFilterDriver;

#[derive(Debug, Default)]
pub struct MosaicFilter;

impl MosaicFilter {
    pub const TYPE_NAME: &'static str = "filters.mosaic";

    pub fn from_options(_options: &Options) -> PipelineResult<Self> {
        Ok(Self)
    }
}

impl MultiFilterDriver for MosaicFilter {
    fn schema(&self, inputs: &[&Schema]) -> PipelineResult<Schema> {
        let Some((first, rest)) = inputs.split_first() else {
            return Err(PipelineError::schema(Self::TYPE_NAME, "mosaic has no inputs"));
        };
        if let Some(pos) = rest.iter().position(|schema| schema != first) {
            return Err(PipelineError::schema(
                Self::TYPE_NAME,
                format!("schema of input {} differs from input 0", pos + 1),
            ));
        }
        Ok((*first).clone())
    }

    fn open(
        &self,
        input_schemas: &[&Schema],
        upstream: Vec<Box<dyn PointSource>>,
    ) -> PipelineResult<Box<dyn PointSource>> {
        let schema = self.schema(input_schemas)?;
        Ok(Box::new(MosaicSource {
            inputs: upstream,
            current: 0,
            layout: SchemaLayout::new(&schema),
            scratch: None,
        }))
    }
}

struct MosaicSource {
    inputs: Vec<Box<dyn PointSource>>,
    /// Input currently being drained.
    current: usize,
    layout: SchemaLayout,
    scratch: Option<PointBuffer>,
}

impl PointSource for MosaicSource {
    fn read(&mut self, buffer: &mut PointBuffer, max: u32) -> PipelineResult<u32> {
        buffer.clear();
        let max = max.min(buffer.capacity());

        while buffer.len() < max {
            let Some(input) = self.inputs.get_mut(self.current) else {
                break;
            };
            let want = max - buffer.len();
            let chunk = scratch(&mut self.scratch, &self.layout, want);
            let want = want.min(chunk.capacity());
            let got = input.read(chunk, want)?;

            for i in 0..got {
                buffer.push_from(chunk, i);
            }
            if got < want {
                self.current += 1;
            }
        }

        Ok(buffer.len())
    }
}
