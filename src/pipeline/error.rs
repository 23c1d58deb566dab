//! Pipeline-specific error types.

use crate::pipeline::id::StageId;
use crate::pipeline::kind::{PipelineKind, StageKind};
use thiserror::Error;

/// Grammar violations found while reading a pipeline document.
///
/// Every variant maps to exactly one structural rule, so callers can tell
/// e.g. a filter with no input apart from a filter with two.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("document is not well-formed XML: {message}")]
    Malformed { message: String },

    #[error("expected a <Pipeline> root element, found <{found}>")]
    MissingPipeline { found: String },

    #[error("unsupported pipeline version '{version}' (expected 1.0)")]
    UnsupportedVersion { version: String },

    #[error("<Pipeline> contains no stage element")]
    EmptyPipeline,

    #[error("<Pipeline> must contain exactly one stage element, found {count}")]
    MultipleStages { count: usize },

    #[error("expected a {expected}, but the outermost stage is a {found}")]
    WrongPipelineKind {
        expected: PipelineKind,
        found: StageKind,
    },

    #[error("<{}> element has no 'type' attribute", .element.element_name())]
    MissingType { element: StageKind },

    #[error("unknown element <{element}> inside <{parent}>")]
    UnknownElement { element: String, parent: String },

    #[error("option in stage '{stage}' has no 'name' attribute")]
    MissingOptionName { stage: String },

    #[error("reader '{stage}' cannot have an input, found a <{}> child", .child.element_name())]
    ChildOfReader { stage: String, child: StageKind },

    #[error("filter '{stage}' requires exactly one input, found none")]
    MissingFilterInput { stage: String },

    #[error("filter '{stage}' requires exactly one input, found {found}")]
    ExtraFilterInput { stage: String, found: usize },

    #[error("multifilter '{stage}' requires at least one input, found none")]
    MissingMultiFilterInput { stage: String },

    #[error("writer '{stage}' requires exactly one input, found none")]
    MissingWriterInput { stage: String },

    #[error("writer '{stage}' requires exactly one input, found {found}")]
    ExtraWriterInput { stage: String, found: usize },

    #[error("writer '{stage}' cannot be the input of {parent} '{parent_stage}'")]
    WriterAsInput {
        stage: String,
        parent: StageKind,
        parent_stage: String,
    },
}

impl StructureError {
    /// Short rule identifier, handy for logs and diagnostics.
    pub fn rule(&self) -> &'static str {
        match self {
            StructureError::Malformed { .. } => "malformed",
            StructureError::MissingPipeline { .. } => "missing-pipeline",
            StructureError::UnsupportedVersion { .. } => "unsupported-version",
            StructureError::EmptyPipeline => "empty-pipeline",
            StructureError::MultipleStages { .. } => "multiple-stages",
            StructureError::WrongPipelineKind { .. } => "wrong-pipeline-kind",
            StructureError::MissingType { .. } => "missing-type",
            StructureError::UnknownElement { .. } => "unknown-element",
            StructureError::MissingOptionName { .. } => "missing-option-name",
            StructureError::ChildOfReader { .. } => "child-of-reader",
            StructureError::MissingFilterInput { .. } => "missing-filter-input",
            StructureError::ExtraFilterInput { .. } => "extra-filter-input",
            StructureError::MissingMultiFilterInput { .. } => "missing-multifilter-input",
            StructureError::MissingWriterInput { .. } => "missing-writer-input",
            StructureError::ExtraWriterInput { .. } => "extra-writer-input",
            StructureError::WriterAsInput { .. } => "writer-as-input",
        }
    }
}

/// Errors that can occur within the pipeline system.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The pipeline document violates the structural grammar.
    #[error("Pipeline structure error: {0}")]
    Structure(#[from] StructureError),

    /// A stage's configuration is incompatible with its input schema.
    #[error("Schema error in '{stage}': {message}")]
    Schema { stage: String, message: String },

    #[error("No driver registered for stage type '{type_name}'")]
    UnknownDriver { type_name: String },

    #[error("Stage type '{type_name}' is a {found}, not a {expected}")]
    DriverKindMismatch {
        type_name: String,
        expected: StageKind,
        found: StageKind,
    },

    #[error("Stage '{stage}' requires option '{option}'")]
    MissingOption { stage: String, option: String },

    #[error("Invalid value '{value}' for option '{option}' of '{stage}': {reason}")]
    InvalidOption {
        stage: String,
        option: String,
        value: String,
        reason: String,
    },

    #[error("Stage {0} does not exist in this pipeline")]
    InvalidStage(StageId),

    #[error("Invalid input for '{stage}': {reason}")]
    InvalidInput { stage: String, reason: String },

    #[error("Stage {input} is already the input of stage {consumer}")]
    InputAlreadyConsumed { input: StageId, consumer: StageId },

    #[error("No {expected} is held by this manager")]
    NoPipeline { expected: PipelineKind },

    #[error("Stage '{stage}' does not support {operation}")]
    Unsupported { stage: String, operation: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True for the distinguished pipeline-structure error kind.
    pub fn is_structure(&self) -> bool {
        matches!(self, PipelineError::Structure(_))
    }

    /// The structural rule that fired, if this is a structure error.
    pub fn structure(&self) -> Option<&StructureError> {
        match self {
            PipelineError::Structure(e) => Some(e),
            _ => None,
        }
    }

    pub fn schema(stage: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Schema {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(stage: impl Into<String>, operation: impl Into<String>) -> Self {
        PipelineError::Unsupported {
            stage: stage.into(),
            operation: operation.into(),
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_errors_are_distinguishable() {
        let missing = StructureError::MissingFilterInput {
            stage: "filters.crop".into(),
        };
        let extra = StructureError::ExtraFilterInput {
            stage: "filters.crop".into(),
            found: 2,
        };
        assert_ne!(missing, extra);
        assert_ne!(missing.rule(), extra.rule());
        assert!(extra.to_string().contains("found 2"));
    }

    #[test]
    fn test_structure_error_display() {
        let err = StructureError::MissingType {
            element: StageKind::Filter,
        };
        assert_eq!(err.to_string(), "<Filter> element has no 'type' attribute");

        let err = StructureError::WrongPipelineKind {
            expected: PipelineKind::Reader,
            found: StageKind::Writer,
        };
        assert_eq!(
            err.to_string(),
            "expected a reader pipeline, but the outermost stage is a writer"
        );
    }

    #[test]
    fn test_is_structure() {
        let err: PipelineError = StructureError::EmptyPipeline.into();
        assert!(err.is_structure());
        assert_eq!(err.structure(), Some(&StructureError::EmptyPipeline));

        let err = PipelineError::schema("filters.crop", "missing dimension 'X'");
        assert!(!err.is_structure());
        assert!(err.structure().is_none());
    }

    #[test]
    fn test_io_error_passes_through() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "points.txt");
        let err: PipelineError = io.into();
        match err {
            PipelineError::Io(inner) => assert_eq!(inner.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected Io, got {:?}", other),
        }
    }
}
