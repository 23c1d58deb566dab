//! Recursive-descent validation of pipeline documents.
//!
//! Parsing stops at the first violation. Only elements are significant;
//! comments, processing instructions and stray text between elements are
//! skipped.

use super::{PipelineDocument, StageDescriptor, PIPELINE_VERSION};
use crate::pipeline::error::StructureError;
use crate::pipeline::kind::{PipelineKind, StageKind};
use crate::pipeline::options::{OptionEntry, OptionValue, Options};
use roxmltree::{Document, Node};

const PIPELINE: &str = "Pipeline";
const OPTION: &str = "Option";
const OPTIONS: &str = "Options";

pub(super) fn parse_document(
    text: &str,
    expected: PipelineKind,
) -> Result<PipelineDocument, StructureError> {
    let doc = Document::parse(text).map_err(|e| StructureError::Malformed {
        message: e.to_string(),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != PIPELINE {
        return Err(StructureError::MissingPipeline {
            found: root.tag_name().name().to_string(),
        });
    }

    let version = root.attribute("version").unwrap_or(PIPELINE_VERSION);
    if version.trim() != PIPELINE_VERSION {
        return Err(StructureError::UnsupportedVersion {
            version: version.to_string(),
        });
    }

    let mut stages = Vec::new();
    for child in root.children().filter(|n| n.is_element()) {
        let name = child.tag_name().name();
        match StageKind::from_element_name(name) {
            Some(kind) => stages.push((child, kind)),
            None => {
                return Err(StructureError::UnknownElement {
                    element: name.to_string(),
                    parent: PIPELINE.to_string(),
                })
            }
        }
    }

    let (top, kind) = match stages.as_slice() {
        [] => return Err(StructureError::EmptyPipeline),
        [single] => *single,
        many => return Err(StructureError::MultipleStages { count: many.len() }),
    };

    // The two entry points are not interchangeable.
    if PipelineKind::of_terminal(kind) != expected {
        return Err(StructureError::WrongPipelineKind {
            expected,
            found: kind,
        });
    }

    Ok(PipelineDocument {
        version: PIPELINE_VERSION.to_string(),
        root: parse_stage(top, kind)?,
    })
}

fn parse_stage(node: Node, kind: StageKind) -> Result<StageDescriptor, StructureError> {
    let type_name = match node.attribute("type").map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => return Err(StructureError::MissingType { element: kind }),
    };

    let mut options = Options::new();
    let mut inputs = Vec::new();

    for child in node.children().filter(|n| n.is_element()) {
        let name = child.tag_name().name();
        match name {
            OPTION => {
                options.insert(parse_option(child, &type_name)?);
            }
            OPTIONS => {
                for option in child.children().filter(|n| n.is_element()) {
                    if option.tag_name().name() != OPTION {
                        return Err(unknown(option, OPTIONS));
                    }
                    options.insert(parse_option(option, &type_name)?);
                }
            }
            _ => match StageKind::from_element_name(name) {
                Some(child_kind) => inputs.push((child, child_kind)),
                None => return Err(unknown(child, kind.element_name())),
            },
        }
    }

    check_arity(kind, &type_name, &inputs)?;

    let mut descriptors = Vec::with_capacity(inputs.len());
    for (child, child_kind) in inputs {
        if !child_kind.can_be_input() {
            return Err(StructureError::WriterAsInput {
                stage: child.attribute("type").unwrap_or_default().to_string(),
                parent: kind,
                parent_stage: type_name,
            });
        }
        descriptors.push(parse_stage(child, child_kind)?);
    }

    Ok(StageDescriptor {
        kind,
        type_name,
        options,
        inputs: descriptors,
    })
}

fn check_arity(
    kind: StageKind,
    type_name: &str,
    inputs: &[(Node, StageKind)],
) -> Result<(), StructureError> {
    if kind.accepts_input_count(inputs.len()) {
        return Ok(());
    }

    let stage = type_name.to_string();
    let found = inputs.len();
    Err(match kind {
        StageKind::Reader => StructureError::ChildOfReader {
            stage,
            child: inputs.first().map_or(StageKind::Reader, |(_, k)| *k),
        },
        StageKind::Filter if found == 0 => StructureError::MissingFilterInput { stage },
        StageKind::Filter => StructureError::ExtraFilterInput { stage, found },
        StageKind::MultiFilter => StructureError::MissingMultiFilterInput { stage },
        StageKind::Writer if found == 0 => StructureError::MissingWriterInput { stage },
        StageKind::Writer => StructureError::ExtraWriterInput { stage, found },
    })
}

fn parse_option(node: Node, stage: &str) -> Result<OptionEntry, StructureError> {
    let name = node
        .attribute("name")
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| StructureError::MissingOptionName {
            stage: stage.to_string(),
        })?;

    if let Some(nested) = node.children().find(|n| n.is_element()) {
        return Err(unknown(nested, OPTION));
    }

    let text: String = node
        .children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    Ok(OptionEntry {
        name: name.to_string(),
        value: OptionValue::String(text.trim().to_string()),
        description: node.attribute("description").map(str::to_string),
    })
}

fn unknown(node: Node, parent: &str) -> StructureError {
    StructureError::UnknownElement {
        element: node.tag_name().name().to_string(),
        parent: parent.to_string(),
    }
}
