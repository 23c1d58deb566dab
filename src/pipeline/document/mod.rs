//! Declarative pipeline documents.
//!
//! A document is parsed into a tree of [`StageDescriptor`]s before any stage
//! is constructed, so grammar violations are caught without touching the
//! manager's arena. Serialization goes the other way: the manager describes
//! its graph as descriptors and [`PipelineDocument::to_xml`] renders them.
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <Pipeline version="1.0">
//!   <Writer type="drivers.faux.writer">
//!     <Filter type="filters.crop">
//!       <Option name="bounds">([0, 1], [0, 1], [0, 1])</Option>
//!       <Reader type="drivers.faux.reader">
//!         <Option name="num_points">1065</Option>
//!       </Reader>
//!     </Filter>
//!   </Writer>
//! </Pipeline>
//! ```

mod parse;
mod serialize;

use crate::pipeline::error::StructureError;
use crate::pipeline::kind::{PipelineKind, StageKind};
use crate::pipeline::options::{OptionValue, Options};

/// The only document version understood.
pub const PIPELINE_VERSION: &str = "1.0";

/// One stage element: its kind, driver type, options and inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDescriptor {
    pub kind: StageKind,
    pub type_name: String,
    pub options: Options,
    /// Input stages, in document order.
    pub inputs: Vec<StageDescriptor>,
}

impl StageDescriptor {
    pub fn new(kind: StageKind, type_name: impl Into<String>) -> Self {
        Self {
            kind,
            type_name: type_name.into(),
            options: Options::new(),
            inputs: Vec::new(),
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.add(name, value);
        self
    }

    pub fn with_input(mut self, input: StageDescriptor) -> Self {
        self.inputs.push(input);
        self
    }

    /// Number of stages in this subtree, including itself.
    pub fn stage_count(&self) -> usize {
        1 + self.inputs.iter().map(StageDescriptor::stage_count).sum::<usize>()
    }
}

/// A parsed pipeline document.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDocument {
    pub version: String,
    pub root: StageDescriptor,
}

impl PipelineDocument {
    pub fn new(root: StageDescriptor) -> Self {
        Self {
            version: PIPELINE_VERSION.to_string(),
            root,
        }
    }

    /// Document kind, decided by the outermost stage.
    pub fn kind(&self) -> PipelineKind {
        PipelineKind::of_terminal(self.root.kind)
    }

    /// Parse and validate `text` as a document of the `expected` kind.
    pub fn parse(text: &str, expected: PipelineKind) -> Result<Self, StructureError> {
        parse::parse_document(text, expected)
    }

    /// Render the canonical text form.
    pub fn to_xml(&self) -> String {
        serialize::write_document(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let doc = PipelineDocument::new(
            StageDescriptor::new(StageKind::Writer, "drivers.faux.writer").with_input(
                StageDescriptor::new(StageKind::MultiFilter, "filters.mosaic")
                    .with_input(StageDescriptor::new(StageKind::Reader, "a"))
                    .with_input(StageDescriptor::new(StageKind::Reader, "b")),
            ),
        );
        assert_eq!(doc.kind(), PipelineKind::Writer);
        assert_eq!(doc.root.stage_count(), 4);
        assert_eq!(doc.version, "1.0");
    }

    #[test]
    fn test_round_trip_through_text() {
        let doc = PipelineDocument::new(
            StageDescriptor::new(StageKind::Filter, "filters.decimation")
                .with_option("step", "2")
                .with_input(
                    StageDescriptor::new(StageKind::Reader, "drivers.faux.reader")
                        .with_option("num_points", "10"),
                ),
        );
        let text = doc.to_xml();
        let parsed = PipelineDocument::parse(&text, PipelineKind::Reader).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(parsed.to_xml(), text);
    }
}
