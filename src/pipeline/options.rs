//! Stage options: an ordered name → value mapping with optional descriptions.
//!
//! Options are attached to a stage at construction time. The pipeline core
//! only transports them; drivers interpret them through the typed accessors
//! ([`Options::require`], [`Options::get_or`], [`Options::get_opt`]).
//!
//! Values read from a pipeline document are kept as the text that appeared
//! in the document, so serializing them back is lossless. Typed accessors
//! parse that text on demand. Surrounding whitespace is not significant in a
//! document, so string values are stored trimmed however they are added.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::types::Bounds;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dynamically typed option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bounds(Bounds),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(v) => Some(*v),
            OptionValue::String(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(v) => Some(*v),
            OptionValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            OptionValue::Float(v) => Some(*v),
            OptionValue::Int(v) => Some(*v as f64),
            OptionValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bounds(&self) -> Option<Bounds> {
        match self {
            OptionValue::Bounds(b) => Some(*b),
            OptionValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Canonical text form, used when writing pipeline documents.
impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(v) => write!(f, "{}", v),
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::String(v) => f.write_str(v),
            OptionValue::Bounds(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(v as i64)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        OptionValue::Int(v as i64)
    }
}

impl From<u64> for OptionValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => OptionValue::Int(v),
            Err(_) => OptionValue::String(v.to_string()),
        }
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::String(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::String(v)
    }
}

impl From<&std::path::Path> for OptionValue {
    fn from(v: &std::path::Path) -> Self {
        OptionValue::String(v.to_string_lossy().into_owned())
    }
}

impl From<Bounds> for OptionValue {
    fn from(v: Bounds) -> Self {
        OptionValue::Bounds(v)
    }
}

/// Types that can be extracted from an [`OptionValue`].
pub trait FromOptionValue: Sized {
    /// Human readable name of the expected type, for error messages.
    const EXPECTED: &'static str;

    fn from_option_value(value: &OptionValue) -> Option<Self>;
}

impl FromOptionValue for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_option_value(value: &OptionValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromOptionValue for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_option_value(value: &OptionValue) -> Option<Self> {
        value.as_int()
    }
}

impl FromOptionValue for u64 {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_option_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::String(s) => s.trim().parse().ok(),
            other => other.as_int().and_then(|v| u64::try_from(v).ok()),
        }
    }
}

impl FromOptionValue for u32 {
    const EXPECTED: &'static str = "a non-negative 32-bit integer";

    fn from_option_value(value: &OptionValue) -> Option<Self> {
        value.as_int().and_then(|v| u32::try_from(v).ok())
    }
}

impl FromOptionValue for f64 {
    const EXPECTED: &'static str = "a number";

    fn from_option_value(value: &OptionValue) -> Option<Self> {
        value.as_float()
    }
}

impl FromOptionValue for String {
    const EXPECTED: &'static str = "a string";

    fn from_option_value(value: &OptionValue) -> Option<Self> {
        Some(value.to_string())
    }
}

impl FromOptionValue for Bounds {
    const EXPECTED: &'static str = "bounds of the form ([minx, maxx], [miny, maxy], [minz, maxz])";

    fn from_option_value(value: &OptionValue) -> Option<Self> {
        value.as_bounds()
    }
}

/// A single named option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub name: String,
    pub value: OptionValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Ordered option set. Re-adding a name replaces the entry in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Options {
    entries: Vec<OptionEntry>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an option without a description.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> &mut Self {
        self.insert(OptionEntry {
            name: name.into(),
            value: value.into(),
            description: None,
        })
    }

    /// Add or replace an option with a human readable description.
    pub fn add_with_description(
        &mut self,
        name: impl Into<String>,
        value: impl Into<OptionValue>,
        description: impl Into<String>,
    ) -> &mut Self {
        self.insert(OptionEntry {
            name: name.into(),
            value: value.into(),
            description: Some(description.into()),
        })
    }

    /// Builder-style [`Options::add`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.add(name, value);
        self
    }

    pub fn insert(&mut self, mut entry: OptionEntry) -> &mut Self {
        if let OptionValue::String(text) = &mut entry.value {
            let trimmed = text.trim();
            if trimmed.len() != text.len() {
                *text = trimmed.to_string();
            }
        }
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<OptionEntry> {
        let pos = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(pos))
    }

    pub fn entry(&self, name: &str) -> Option<&OptionEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&OptionValue> {
        self.entry(name).map(|e| &e.value)
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.entry(name).and_then(|e| e.description.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionEntry> {
        self.entries.iter()
    }

    /// Typed value of a required option.
    pub fn require<T: FromOptionValue>(&self, stage: &str, name: &str) -> PipelineResult<T> {
        self.get_opt(stage, name)?
            .ok_or_else(|| PipelineError::MissingOption {
                stage: stage.to_string(),
                option: name.to_string(),
            })
    }

    /// Typed value of an optional option, `None` when absent.
    pub fn get_opt<T: FromOptionValue>(&self, stage: &str, name: &str) -> PipelineResult<Option<T>> {
        let Some(value) = self.value(name) else {
            return Ok(None);
        };
        T::from_option_value(value)
            .map(Some)
            .ok_or_else(|| PipelineError::InvalidOption {
                stage: stage.to_string(),
                option: name.to_string(),
                value: value.to_string(),
                reason: format!("expected {}", T::EXPECTED),
            })
    }

    /// Typed value of an optional option, `default` when absent.
    pub fn get_or<T: FromOptionValue>(&self, stage: &str, name: &str, default: T) -> PipelineResult<T> {
        Ok(self.get_opt(stage, name)?.unwrap_or(default))
    }
}

impl<'a> IntoIterator for &'a Options {
    type Item = &'a OptionEntry;
    type IntoIter = std::slice::Iter<'a, OptionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
