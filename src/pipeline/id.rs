//! Identity type for stages.
//!
//! A `StageId` is a newtype over `u32` that serves as a direct array index
//! into the owning `PipelineManager`'s stage arena, providing O(1) lookup.
//! Edges between stages are stored as `StageId`s, never as owning pointers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into `PipelineManager::stages`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageId(pub u32);

impl StageId {
    pub const INVALID: StageId = StageId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        StageId(index as u32)
    }
}

impl Default for StageId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "StageId(INVALID)")
        } else {
            write!(f, "StageId({})", self.0)
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
