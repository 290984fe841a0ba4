use geozero::ColumnValue;
use serde::ser::{self, SerializeMap};

use crate::{feature::FeatureRecord, schema::FeatureSchema, value::Value};

impl Value {
    /// The geozero column for a scalar value; `None` for geometries.
    #[must_use]
    pub fn column_value(&self) -> Option<ColumnValue<'_>> {
        match self {
            Value::String(val) => Some(ColumnValue::String(val)),
            Value::Boolean(val) => Some(ColumnValue::Bool(*val)),
            Value::Integer(val) => Some(ColumnValue::Int(*val)),
            Value::Long(val) => Some(ColumnValue::Long(*val)),
            Value::Float(val) => Some(ColumnValue::Float(*val)),
            Value::Double(val) => Some(ColumnValue::Double(*val)),
            Value::Geometry(_) => None,
        }
    }
}

/// Geometries serialize as [`geo::Geometry`], so they deserialize straight
/// into `geo` fields.
impl ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match self {
            Value::String(val) => serializer.serialize_str(val),
            Value::Boolean(val) => serializer.serialize_bool(*val),
            Value::Integer(val) => serializer.serialize_i32(*val),
            Value::Long(val) => serializer.serialize_i64(*val),
            Value::Float(val) => serializer.serialize_f32(*val),
            Value::Double(val) => serializer.serialize_f64(*val),
            Value::Geometry(geometry) => geometry.to_geo_types().serialize(serializer),
        }
    }
}

/// A record viewed through its schema: a map from attribute name to value,
/// plus the feature identifier under `id`.
///
/// Absent slots serialize as `null`. A schema attribute literally named
/// `id` takes that key instead of the identifier.
pub struct NamedRecord<'a> {
    schema: &'a FeatureSchema,
    record: &'a FeatureRecord,
}

impl<'a> NamedRecord<'a> {
    #[must_use]
    pub fn new(schema: &'a FeatureSchema, record: &'a FeatureRecord) -> Self {
        Self { schema, record }
    }
}

impl ser::Serialize for NamedRecord<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let attributes = self.schema.attributes();
        let shadowed = attributes.iter().any(|a| a.name == "id");
        let mut map = serializer.serialize_map(None)?;
        if !shadowed {
            map.serialize_entry("id", self.record.id())?;
        }
        for (descriptor, value) in attributes.iter().zip(self.record.values()) {
            map.serialize_entry(&descriptor.name, value)?;
        }
        map.end()
    }
}
