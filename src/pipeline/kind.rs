//! Stage and pipeline kind enumerations.
//!
//! [`StageKind`] is the closed set of stage variants. Its arity rules are the
//! single source of truth for how many inputs each variant takes; both the
//! document parser and the graph-building API consult them.

use serde::{Deserialize, Serialize};

/// The four kinds of stage in a pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    /// Produces points from a source. Takes no inputs.
    Reader,
    /// Transforms the points of exactly one input.
    Filter,
    /// Combines the points of one or more inputs.
    MultiFilter,
    /// Consumes the points of exactly one input. Never an input itself.
    Writer,
}

impl StageKind {
    /// Element name used for this kind in pipeline documents.
    pub fn element_name(&self) -> &'static str {
        match self {
            StageKind::Reader => "Reader",
            StageKind::Filter => "Filter",
            StageKind::MultiFilter => "MultiFilter",
            StageKind::Writer => "Writer",
        }
    }

    /// Inverse of [`StageKind::element_name`].
    pub fn from_element_name(name: &str) -> Option<StageKind> {
        match name {
            "Reader" => Some(StageKind::Reader),
            "Filter" => Some(StageKind::Filter),
            "MultiFilter" => Some(StageKind::MultiFilter),
            "Writer" => Some(StageKind::Writer),
            _ => None,
        }
    }

    /// Get all stage kinds.
    pub fn all() -> &'static [StageKind] {
        &[
            StageKind::Reader,
            StageKind::Filter,
            StageKind::MultiFilter,
            StageKind::Writer,
        ]
    }

    /// Minimum and (optional) maximum number of inputs.
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            StageKind::Reader => (0, Some(0)),
            StageKind::Filter => (1, Some(1)),
            StageKind::MultiFilter => (1, None),
            StageKind::Writer => (1, Some(1)),
        }
    }

    /// Check whether `count` inputs is allowed for this kind.
    pub fn accepts_input_count(&self, count: usize) -> bool {
        let (min, max) = self.arity();
        count >= min && max.map_or(true, |max| count <= max)
    }

    /// Whether a stage of this kind may feed another stage.
    pub fn can_be_input(&self) -> bool {
        !matches!(self, StageKind::Writer)
    }

    pub fn is_writer(&self) -> bool {
        matches!(self, StageKind::Writer)
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageKind::Reader => "reader",
            StageKind::Filter => "filter",
            StageKind::MultiFilter => "multifilter",
            StageKind::Writer => "writer",
        };
        f.write_str(name)
    }
}

/// The two pipeline document kinds, distinguished by their terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineKind {
    /// Terminal stage is a Reader, Filter or MultiFilter.
    Reader,
    /// Terminal stage is a Writer.
    Writer,
}

impl PipelineKind {
    /// The document kind a graph ending in `terminal` belongs to.
    pub fn of_terminal(terminal: StageKind) -> PipelineKind {
        if terminal.is_writer() {
            PipelineKind::Writer
        } else {
            PipelineKind::Reader
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineKind::Reader => f.write_str("reader pipeline"),
            PipelineKind::Writer => f.write_str("writer pipeline"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_name_round_trip() {
        for kind in StageKind::all() {
            assert_eq!(StageKind::from_element_name(kind.element_name()), Some(*kind));
        }
        assert_eq!(StageKind::from_element_name("Option"), None);
        assert_eq!(StageKind::from_element_name("reader"), None);
    }

    #[test]
    fn test_arity() {
        assert!(StageKind::Reader.accepts_input_count(0));
        assert!(!StageKind::Reader.accepts_input_count(1));

        assert!(!StageKind::Filter.accepts_input_count(0));
        assert!(StageKind::Filter.accepts_input_count(1));
        assert!(!StageKind::Filter.accepts_input_count(2));

        assert!(!StageKind::MultiFilter.accepts_input_count(0));
        assert!(StageKind::MultiFilter.accepts_input_count(1));
        assert!(StageKind::MultiFilter.accepts_input_count(17));

        assert!(!StageKind::Writer.accepts_input_count(0));
        assert!(StageKind::Writer.accepts_input_count(1));
        assert!(!StageKind::Writer.accepts_input_count(2));
    }

    #[test]
    fn test_pipeline_kind_of_terminal() {
        assert_eq!(PipelineKind::of_terminal(StageKind::Writer), PipelineKind::Writer);
        assert_eq!(PipelineKind::of_terminal(StageKind::MultiFilter), PipelineKind::Reader);
        assert!(!StageKind::Writer.can_be_input());
        assert!(StageKind::Filter.can_be_input());
    }
}
