//! Synthetic reader and discarding writer.
//!
//! `drivers.faux.reader` fabricates `num_points` points inside `bounds`,
//! either all at the minimum corner (`constant`) or spread along the box
//! diagonal (`ramp`). `drivers.faux.writer` accepts any input and drops it.

use crate::pipeline::buffer::PointBuffer;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::iterator::PointSource;
use crate::pipeline::options::Options;
use crate::pipeline::schema::{Dimension, DimensionRole, Schema};
use crate::pipeline::stage::{ReaderDriver, WriterDriver};
use crate::types::{Bounds, DataType};
use std::str::FromStr;

/// How the faux reader places its points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FauxMode {
    #[default]
    Constant,
    Ramp,
}

impl FromStr for FauxMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constant" => Ok(FauxMode::Constant),
            "ramp" => Ok(FauxMode::Ramp),
            other => Err(format!("unknown mode '{}', expected constant or ramp", other)),
        }
    }
}

pub struct FauxReader {
    num_points: u64,
    bounds: Bounds,
    mode: FauxMode,
}

impl FauxReader {
    pub const TYPE_NAME: &'static str = "drivers.faux.reader";

    pub fn new(num_points: u64, bounds: Bounds, mode: FauxMode) -> Self {
        Self {
            num_points,
            bounds,
            mode,
        }
    }

    pub fn from_options(options: &Options) -> PipelineResult<Self> {
        let num_points = options.require::<u64>(Self::TYPE_NAME, "num_points")?;
        let bounds = options.get_or(Self::TYPE_NAME, "bounds", Bounds::default())?;
        let mode = match options.get_opt::<String>(Self::TYPE_NAME, "mode")? {
            Some(text) => text
                .parse::<FauxMode>()
                .map_err(|reason| PipelineError::InvalidOption {
                    stage: Self::TYPE_NAME.to_string(),
                    option: "mode".to_string(),
                    value: text.clone(),
                    reason,
                })?,
            None => FauxMode::default(),
        };
        Ok(Self::new(num_points, bounds, mode))
    }
}

impl ReaderDriver for FauxReader {
    fn schema(&self) -> PipelineResult<Schema> {
        let mut schema = Schema::xyz();
        schema.add(Dimension::new("Time", DataType::Uint64, DimensionRole::Time));
        Ok(schema)
    }

    fn num_points(&self) -> PipelineResult<u64> {
        Ok(self.num_points)
    }

    fn open(&self, _schema: &Schema) -> PipelineResult<Box<dyn PointSource>> {
        Ok(Box::new(FauxSource {
            num_points: self.num_points,
            bounds: self.bounds,
            mode: self.mode,
            pos: 0,
        }))
    }
}

struct FauxSource {
    num_points: u64,
    bounds: Bounds,
    mode: FauxMode,
    pos: u64,
}

impl FauxSource {
    fn point(&self, index: u64) -> [f64; 3] {
        let t = match self.mode {
            FauxMode::Constant => 0.0,
            FauxMode::Ramp if self.num_points > 1 => index as f64 / (self.num_points - 1) as f64,
            FauxMode::Ramp => 0.0,
        };
        let size = self.bounds.size();
        [
            self.bounds.min[0] + size[0] * t,
            self.bounds.min[1] + size[1] * t,
            self.bounds.min[2] + size[2] * t,
        ]
    }
}

impl PointSource for FauxSource {
    fn read(&mut self, buffer: &mut PointBuffer, max: u32) -> PipelineResult<u32> {
        buffer.clear();
        let left = self.num_points - self.pos;
        let count = u64::from(max.min(buffer.capacity())).min(left) as u32;

        let layout = buffer.layout();
        let columns = [
            layout.index_of("X"),
            layout.index_of("Y"),
            layout.index_of("Z"),
        ];
        let time = layout.index_of("Time");

        for i in 0..count {
            let index = self.pos + u64::from(i);
            let xyz = self.point(index);
            for (column, value) in columns.iter().zip(xyz) {
                if let Some(dim) = column {
                    buffer.set_f64(i, *dim, value);
                }
            }
            if let Some(dim) = time {
                buffer.set_f64(i, dim, index as f64);
            }
        }

        buffer.set_len(count);
        self.pos += u64::from(count);
        Ok(count)
    }

    fn supports_seek(&self) -> bool {
        true
    }

    fn seek(&mut self, index: u64) -> PipelineResult<()> {
        self.pos = index.min(self.num_points);
        Ok(())
    }
}

/// Writer that counts and discards its input.
#[derive(Debug, Default)]
pub struct FauxWriter {
    written: u64,
}

impl FauxWriter {
    pub const TYPE_NAME: &'static str = "drivers.faux.writer";

    pub fn from_options(_options: &Options) -> PipelineResult<Self> {
        Ok(Self::default())
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl WriterDriver for FauxWriter {
    fn begin(&mut self, _schema: &Schema) -> PipelineResult<()> {
        self.written = 0;
        Ok(())
    }

    fn write_buffer(&mut self, buffer: &PointBuffer) -> PipelineResult<u32> {
        self.written += u64::from(buffer.len());
        Ok(buffer.len())
    }

    fn finish(&mut self) -> PipelineResult<()> {
        tracing::debug!("Faux writer discarded {} points", self.written);
        Ok(())
    }
}
