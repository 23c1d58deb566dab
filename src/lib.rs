//! # cloudpipe: point-cloud processing pipelines
//!
//! Point-cloud processing is expressed as a tree of stages: readers produce
//! points, filters transform them and a writer consumes the result. This
//! crate builds such trees from XML pipeline documents (or programmatically),
//! validates their structure, streams points through them in fixed-size
//! buffers and serializes them back to canonical XML.
//!
//! ## Architecture
//!
//! - **Pipeline**: stage graph owned by [`PipelineManager`], built-in drivers,
//!   pull-based iterators
//! - **Documents**: roxmltree-based parser/validator and canonical serializer
//! - **Config**: TOML execution and logging settings
//! - **Logging**: tracing subscriber installation
//!
//! ## Example
//!
//! ```no_run
//! use cloudpipe::{PipelineManager, Result};
//!
//! fn main() -> Result<()> {
//!     let mut manager = PipelineManager::new();
//!     let writer = manager.read_writer_pipeline("pipeline.xml")?;
//!     let written = manager.writer(writer)?.write(None)?;
//!     println!("wrote {} points", written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod types;

use std::path::Path;

// Re-export commonly used types
pub use config::{ExecutionConfig, LoggingConfig, PipelineConfig};
pub use error::{CloudPipeError, Result, ResultExt};
pub use pipeline::{
    Options, PipelineDocument, PipelineError, PipelineKind, PipelineManager, PipelineResult,
    StageId, StageKind, StageRegistry, StructureError,
};
pub use types::{Bounds, DataType};

/// Build the writer pipeline stored at `path` and run it to completion (or
/// until `max_points` points are written). Returns the number written.
pub fn run_writer_pipeline(
    path: impl AsRef<Path>,
    config: &PipelineConfig,
    max_points: Option<u64>,
) -> Result<u64> {
    let path = path.as_ref();
    let mut manager = PipelineManager::with_config(config.clone());

    let writer = manager
        .read_writer_pipeline(path)
        .with_context(|| format!("Failed to load pipeline {:?}", path))?;
    let written = manager
        .writer(writer)
        .and_then(|mut w| w.write(max_points))
        .with_context(|| format!("Failed to run pipeline {:?}", path))?;

    Ok(written)
}
