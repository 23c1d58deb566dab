//! Stage abstraction for the pipeline.
//!
//! Two-layer design:
//! - **Driver traits** (`ReaderDriver`, `FilterDriver`, `MultiFilterDriver`,
//!   `WriterDriver`): what a concrete format codec or filter algorithm
//!   implements. Drivers know nothing about the graph.
//! - **`StageDriver` enum**: the closed set of stage kinds. The manager
//!   matches on it to resolve schemas and open sources, so each kind's
//!   wiring lives in one place.
//!
//! `Stage` is the arena slot owned by the manager. Edges between stages are
//! [`StageId`] handles into the same arena.

use crate::pipeline::buffer::PointBuffer;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::id::StageId;
use crate::pipeline::iterator::PointSource;
use crate::pipeline::kind::StageKind;
use crate::pipeline::options::Options;
use crate::pipeline::schema::Schema;
use std::cell::OnceCell;

/// A source of points with an intrinsic schema.
pub trait ReaderDriver: Send {
    /// Schema of the records this reader produces.
    fn schema(&self) -> PipelineResult<Schema>;

    /// Declared total number of points (may be an estimate).
    fn num_points(&self) -> PipelineResult<u64>;

    /// Open a fresh cursor at the first point.
    fn open(&self, schema: &Schema) -> PipelineResult<Box<dyn PointSource>>;
}

/// Transforms the output of exactly one input stage.
pub trait FilterDriver: Send {
    /// Output schema as a function of the input schema.
    fn schema(&self, input: &Schema) -> PipelineResult<Schema>;

    /// Upper bound on the number of points produced.
    fn num_points(&self, input: u64) -> u64 {
        input
    }

    fn open(
        &self,
        input_schema: &Schema,
        upstream: Box<dyn PointSource>,
    ) -> PipelineResult<Box<dyn PointSource>>;
}

/// Combines the output of one or more input stages.
pub trait MultiFilterDriver: Send {
    fn schema(&self, inputs: &[&Schema]) -> PipelineResult<Schema>;

    fn num_points(&self, inputs: &[u64]) -> u64 {
        inputs.iter().sum()
    }

    fn open(
        &self,
        input_schemas: &[&Schema],
        upstream: Vec<Box<dyn PointSource>>,
    ) -> PipelineResult<Box<dyn PointSource>>;
}

/// Sink for the points of exactly one input stage.
pub trait WriterDriver: Send {
    /// Reject an input schema this writer cannot store.
    fn validate(&self, _input: &Schema) -> PipelineResult<()> {
        Ok(())
    }

    /// Called once before the first buffer.
    fn begin(&mut self, schema: &Schema) -> PipelineResult<()>;

    /// Store the valid points of `buffer`, returning how many were written.
    fn write_buffer(&mut self, buffer: &PointBuffer) -> PipelineResult<u32>;

    /// Called once after the last buffer, even when nothing was written.
    fn finish(&mut self) -> PipelineResult<()>;
}

/// Closed set of stage kinds, each wrapping its driver.
pub enum StageDriver {
    Reader(Box<dyn ReaderDriver>),
    Filter(Box<dyn FilterDriver>),
    MultiFilter(Box<dyn MultiFilterDriver>),
    Writer(Box<dyn WriterDriver>),
}

impl StageDriver {
    pub fn kind(&self) -> StageKind {
        match self {
            StageDriver::Reader(_) => StageKind::Reader,
            StageDriver::Filter(_) => StageKind::Filter,
            StageDriver::MultiFilter(_) => StageKind::MultiFilter,
            StageDriver::Writer(_) => StageKind::Writer,
        }
    }
}

impl std::fmt::Debug for StageDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StageDriver::{:?}", self.kind())
    }
}

/// Arena slot for one stage of a pipeline graph.
pub struct Stage {
    pub(crate) id: StageId,
    pub(crate) type_name: String,
    pub(crate) options: Options,
    pub(crate) inputs: Vec<StageId>,
    /// Downstream stage that takes this one as input, if any.
    pub(crate) consumer: Option<StageId>,
    pub(crate) driver: StageDriver,
    /// Resolved once, on first request.
    pub(crate) schema: OnceCell<Schema>,
}

impl Stage {
    pub(crate) fn new(
        id: StageId,
        type_name: String,
        options: Options,
        inputs: Vec<StageId>,
        driver: StageDriver,
    ) -> Self {
        Self {
            id,
            type_name,
            options,
            inputs,
            consumer: None,
            driver,
            schema: OnceCell::new(),
        }
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn kind(&self) -> StageKind {
        self.driver.kind()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn inputs(&self) -> &[StageId] {
        &self.inputs
    }

    pub fn consumer(&self) -> Option<StageId> {
        self.consumer
    }

    /// Schema, if it has already been resolved.
    pub fn cached_schema(&self) -> Option<&Schema> {
        self.schema.get()
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("type_name", &self.type_name)
            .field("inputs", &self.inputs)
            .field("consumer", &self.consumer)
            .finish()
    }
}
