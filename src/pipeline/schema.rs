//! Point schemas and their binary layouts.
//!
//! A [`Schema`] is the ordered set of dimensions a stage produces. A
//! [`SchemaLayout`] packs those dimensions into a fixed record so that
//! point buffers can be allocated against it. Packing is a pure function of
//! the schema: dimensions are laid out back to back in schema order with no
//! padding.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// Semantic role of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DimensionRole {
    X,
    Y,
    Z,
    Intensity,
    ReturnNumber,
    Classification,
    Red,
    Green,
    Blue,
    Time,
    #[default]
    Undefined,
}

impl DimensionRole {
    /// Role conventionally carried by a dimension of this name.
    pub fn for_name(name: &str) -> DimensionRole {
        match name.to_ascii_lowercase().as_str() {
            "x" => DimensionRole::X,
            "y" => DimensionRole::Y,
            "z" => DimensionRole::Z,
            "intensity" => DimensionRole::Intensity,
            "returnnumber" | "return_number" => DimensionRole::ReturnNumber,
            "classification" => DimensionRole::Classification,
            "red" => DimensionRole::Red,
            "green" => DimensionRole::Green,
            "blue" => DimensionRole::Blue,
            "time" | "gpstime" => DimensionRole::Time,
            _ => DimensionRole::Undefined,
        }
    }
}

/// A single named, typed point attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub data_type: DataType,
    pub role: DimensionRole,
}

impl Dimension {
    pub fn new(name: impl Into<String>, data_type: DataType, role: DimensionRole) -> Self {
        Self {
            name: name.into(),
            data_type,
            role,
        }
    }

    /// Dimension whose role is inferred from its name.
    pub fn named(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        let role = DimensionRole::for_name(&name);
        Self::new(name, data_type, role)
    }

    pub fn size_bytes(&self) -> usize {
        self.data_type.size_bytes()
    }
}

/// Ordered set of dimensions describing a stage's output records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    dimensions: Vec<Dimension>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from dimensions, dropping later duplicates by name.
    pub fn with_dimensions(dimensions: impl IntoIterator<Item = Dimension>) -> Self {
        let mut schema = Self::new();
        for dim in dimensions {
            schema.add(dim);
        }
        schema
    }

    /// X, Y, Z as float64.
    pub fn xyz() -> Self {
        Self::with_dimensions([
            Dimension::new("X", DataType::Float64, DimensionRole::X),
            Dimension::new("Y", DataType::Float64, DimensionRole::Y),
            Dimension::new("Z", DataType::Float64, DimensionRole::Z),
        ])
    }

    /// Append a dimension. Returns `false` if the name is already present.
    pub fn add(&mut self, dimension: Dimension) -> bool {
        if self.contains(&dimension.name) {
            return false;
        }
        self.dimensions.push(dimension);
        true
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Index of the first dimension carrying `role`.
    pub fn find_role(&self, role: DimensionRole) -> Option<usize> {
        self.dimensions.iter().position(|d| d.role == role)
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.iter()
    }

    /// Fail with a schema error naming the first of `names` that is absent.
    pub fn require(&self, names: &[&str], stage: &str) -> PipelineResult<()> {
        match names.iter().find(|name| !self.contains(name)) {
            Some(missing) => Err(PipelineError::schema(
                stage,
                format!("input schema has no '{}' dimension", missing),
            )),
            None => Ok(()),
        }
    }
}

/// Fixed binary arrangement of a schema's dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaLayout {
    schema: Schema,
    offsets: Vec<usize>,
    point_size: usize,
}

impl SchemaLayout {
    pub fn new(schema: &Schema) -> Self {
        let mut offsets = Vec::with_capacity(schema.len());
        let mut point_size = 0;
        for dim in schema.iter() {
            offsets.push(point_size);
            point_size += dim.size_bytes();
        }

        Self {
            schema: schema.clone(),
            offsets,
            point_size,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Size of one point record in bytes.
    pub fn point_size(&self) -> usize {
        self.point_size
    }

    /// Byte offset of dimension `index` within a record.
    pub fn offset(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).copied()
    }

    pub fn data_type(&self, index: usize) -> Option<DataType> {
        self.schema.dimensions.get(index).map(|d| d.data_type)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.schema.index_of(name)
    }
}
