use serde::Serialize;

use crate::{
    geometry::Geometry,
    schema::{FeatureSchema, SchemaIndex},
    value::Value,
};

/// One decoded feature: its identifier and one slot per schema attribute,
/// in schema order.
///
/// The identifier is empty when the feature element carried none of
/// `gml:id`, `fid` or `id`.
///
/// Serializes positionally as `{"id": .., "values": [..]}`; see
/// [`crate::ser::NamedRecord`] for the keyed form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    id: String,
    values: Vec<Option<Value>>,
}

impl FeatureRecord {
    #[must_use]
    pub fn new(id: String, values: Vec<Option<Value>>) -> Self {
        Self { id, values }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    #[must_use]
    pub fn value(&self, slot: usize) -> Option<&Value> {
        self.values.get(slot).and_then(Option::as_ref)
    }

    /// The value of the attribute named `name`, compared case-insensitively.
    ///
    /// Resolves names like the decoder does: when two attributes differ
    /// only by case, the later one answers.
    #[must_use]
    pub fn get<'a>(&'a self, schema: &FeatureSchema, name: &str) -> Option<&'a Value> {
        self.value(SchemaIndex::new(schema).slot(name)?)
    }

    /// The first populated geometry slot.
    #[must_use]
    pub fn geometry(&self) -> Option<&Geometry> {
        self.values.iter().flatten().find_map(Value::as_geometry)
    }

    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Option<Value>>) {
        (self.id, self.values)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::{AttributeDescriptor, ScalarType};

    #[test]
    fn test_get_ignores_case() {
        let schema = FeatureSchema::new(vec![
            AttributeDescriptor::scalar("Name", ScalarType::String),
            AttributeDescriptor::scalar("lanes", ScalarType::Long),
        ]);
        let record = FeatureRecord::new(
            "roads.1".to_string(),
            vec![Some(Value::String("Main Street".to_string())), None],
        );
        assert_eq!(
            record.get(&schema, "NAME"),
            Some(&Value::String("Main Street".to_string()))
        );
        assert_eq!(record.get(&schema, "lanes"), None);
        assert_eq!(record.get(&schema, "width"), None);
    }

    #[test]
    fn test_get_case_collision_matches_decoder_slot() {
        let schema = FeatureSchema::new(vec![
            AttributeDescriptor::scalar("code", ScalarType::String),
            AttributeDescriptor::scalar("CODE", ScalarType::Long),
        ]);
        let record = FeatureRecord::new(String::new(), vec![None, Some(Value::Long(7))]);
        assert_eq!(SchemaIndex::new(&schema).slot("code"), Some(1));
        assert_eq!(record.get(&schema, "code"), Some(&Value::Long(7)));
        assert_eq!(record.get(&schema, "Code"), Some(&Value::Long(7)));
    }
}
