//! Stage-graph pipelines for point-cloud data.
//!
//! A pipeline is a tree of stages. Readers produce points, filters and
//! multifilters transform the points of their inputs, and a writer consumes
//! the output of exactly one input. Graphs are built either through the
//! [`PipelineManager`] API or from an XML [`PipelineDocument`].
//!
//! # Architecture
//!
//! ```text
//! [Reader] ──► [Filter] ──┐
//!                         ├──► [MultiFilter] ──► [Writer]
//! [Reader] ───────────────┘
//! ```
//!
//! # Design
//!
//! - **Arena ownership**: the manager owns every stage in a `Vec<Stage>`;
//!   stages refer to their inputs by [`StageId`].
//! - **Enum dispatch**: [`StageDriver`] is the closed set of stage kinds, each
//!   wrapping a boxed driver trait object.
//! - **Pull-based streaming**: iterators pull fixed-capacity [`PointBuffer`]s
//!   through a chain of [`PointSource`]s opened from the graph.
//! - **Lazy schemas**: a stage's output [`Schema`] is resolved on first use
//!   and cached.

pub mod buffer;
pub mod document;
pub mod drivers;
pub mod error;
pub mod id;
pub mod iterator;
pub mod kind;
pub mod manager;
pub mod options;
pub mod registry;
pub mod schema;
pub mod snapshot;
pub mod stage;

pub use buffer::PointBuffer;
pub use document::{PipelineDocument, StageDescriptor, PIPELINE_VERSION};
pub use error::{PipelineError, PipelineResult, StructureError};
pub use id::StageId;
pub use iterator::{PointSource, StageRandomIterator, StageSequentialIterator};
pub use kind::{PipelineKind, StageKind};
pub use manager::{PipelineManager, StageRef, WriterRef};
pub use options::{FromOptionValue, OptionEntry, OptionValue, Options};
pub use registry::StageRegistry;
pub use schema::{Dimension, DimensionRole, Schema, SchemaLayout};
pub use snapshot::{EdgeSnapshot, StageSnapshot, TopologySnapshot};
pub use stage::{FilterDriver, MultiFilterDriver, ReaderDriver, Stage, StageDriver, WriterDriver};
