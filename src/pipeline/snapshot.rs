//! Serializable view of a pipeline graph, for diagnostics and tooling.

use crate::pipeline::id::StageId;
use crate::pipeline::kind::StageKind;
use crate::pipeline::options::Options;
use crate::pipeline::schema::Schema;
use serde::{Deserialize, Serialize};

/// Snapshot of a single stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub id: StageId,
    pub kind: StageKind,
    pub type_name: String,
    pub options: Options,
    /// Present once the schema has been resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// A data-flow edge, from an input stage to the stage consuming it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub from: StageId,
    pub to: StageId,
}

/// Complete topology snapshot of the pipeline graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub stages: Vec<StageSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub root: Option<StageId>,
}

impl TopologySnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Stages with no inputs.
    pub fn sources(&self) -> impl Iterator<Item = &StageSnapshot> {
        self.stages
            .iter()
            .filter(|s| !self.edges.iter().any(|e| e.to == s.id))
    }
}
