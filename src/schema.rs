//! Target feature schemas and their case-insensitive lookup index.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Scalar bindings text content can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Boolean,
    Integer,
    Long,
    Float,
    Double,
}

impl ScalarType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Boolean => "boolean",
            ScalarType::Integer => "integer",
            ScalarType::Long => "long",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Scalar(ScalarType),
    Geometry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    pub kind: AttributeKind,
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
}

fn nullable_by_default() -> bool {
    true
}

impl AttributeDescriptor {
    pub fn scalar(name: impl Into<String>, binding: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Scalar(binding),
            nullable: true,
        }
    }

    pub fn geometry(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Geometry,
            nullable: true,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn is_geometry(&self) -> bool {
        self.kind == AttributeKind::Geometry
    }
}

/// An ordered list of attribute descriptors. Record slots follow this order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    attributes: Vec<AttributeDescriptor>,
}

impl FeatureSchema {
    #[must_use]
    pub fn new(attributes: Vec<AttributeDescriptor>) -> Self {
        Self { attributes }
    }

    #[must_use]
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Index of the first geometry attribute, if any.
    #[must_use]
    pub fn default_geometry(&self) -> Option<usize> {
        self.attributes.iter().position(AttributeDescriptor::is_geometry)
    }
}

impl FromIterator<AttributeDescriptor> for FeatureSchema {
    fn from_iter<I: IntoIterator<Item = AttributeDescriptor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Maps lower-cased local names to schema slots.
///
/// Names that differ only by case collide; the later descriptor wins.
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    slots: HashMap<String, usize>,
}

impl SchemaIndex {
    #[must_use]
    pub fn new(schema: &FeatureSchema) -> Self {
        let slots = schema
            .attributes()
            .iter()
            .enumerate()
            .map(|(slot, descriptor)| (descriptor.name.to_lowercase(), slot))
            .collect();
        Self { slots }
    }

    #[must_use]
    pub fn slot(&self, local_name: &str) -> Option<usize> {
        self.slots.get(local_name.to_lowercase().as_str()).copied()
    }
}
