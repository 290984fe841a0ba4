use serde::{Deserialize, Serialize};

use crate::{crs::Crs, error::Result};

/// Namespace URI plus local name of an XML element. An empty namespace
/// matches elements in any namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedName {
    pub namespace: String,
    pub local_name: String,
}

impl QualifiedName {
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }
}

/// Ordinate order of positions in the response.
///
/// `NorthEast` declares that the server writes geographic coordinates
/// latitude first (the EPSG authority order); such lists are swapped to
/// x = longitude, y = latitude while decoding. Projected systems are never
/// swapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrder {
    #[default]
    EastNorth,
    NorthEast,
}

impl AxisOrder {
    #[must_use]
    pub fn swap_xy(self, crs: &Crs) -> bool {
        self == AxisOrder::NorthEast && crs.is_geographic()
    }
}

/// What the decoder does when an attribute's text can't be converted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionPolicy {
    /// Close the stream and surface the error.
    #[default]
    Fail,
    /// Log, skip the rest of the feature and continue with the next one.
    SkipFeature,
}

fn default_max_depth() -> usize {
    8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub feature_name: QualifiedName,
    #[serde(default)]
    pub default_crs: Crs,
    #[serde(default)]
    pub axis_order: AxisOrder,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub on_conversion_error: ConversionPolicy,
}

impl DecoderConfig {
    #[must_use]
    pub fn new(feature_name: QualifiedName) -> Self {
        Self {
            feature_name,
            default_crs: Crs::default(),
            axis_order: AxisOrder::default(),
            max_depth: default_max_depth(),
            on_conversion_error: ConversionPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_default_crs(mut self, crs: Crs) -> Self {
        self.default_crs = crs;
        self
    }

    #[must_use]
    pub fn with_axis_order(mut self, axis_order: AxisOrder) -> Self {
        self.axis_order = axis_order;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_conversion_policy(mut self, policy: ConversionPolicy) -> Self {
        self.on_conversion_error = policy;
        self
    }

    /// Loads a configuration from its JSON rendering.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SerdeError`] on malformed JSON or an
    /// unresolvable `default_crs`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_json_defaults() -> Result<()> {
        let config = DecoderConfig::from_json(
            r#"{"feature_name": {"namespace": "http://www.openplans.org/topp", "local_name": "roads"}}"#,
        )?;
        assert_eq!(
            config,
            DecoderConfig::new(QualifiedName::new("http://www.openplans.org/topp", "roads"))
        );
        assert_eq!(config.default_crs, Crs::WGS84);
        assert_eq!(config.max_depth, 8);
        Ok(())
    }

    #[test]
    fn test_json_overrides() -> Result<()> {
        let config = DecoderConfig::from_json(
            r#"{
                "feature_name": {"namespace": "urn:x", "local_name": "f"},
                "default_crs": "urn:ogc:def:crs:EPSG::3857",
                "axis_order": "north_east",
                "max_depth": 4,
                "on_conversion_error": "skip_feature"
            }"#,
        )?;
        assert_eq!(config.default_crs, Crs::epsg(3857));
        assert_eq!(config.axis_order, AxisOrder::NorthEast);
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.on_conversion_error, ConversionPolicy::SkipFeature);
        Ok(())
    }

    #[test]
    fn test_unresolvable_default_crs() {
        let result = DecoderConfig::from_json(
            r#"{"feature_name": {"namespace": "urn:x", "local_name": "f"}, "default_crs": "nope"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_axis_swap_only_for_geographic() {
        assert!(AxisOrder::NorthEast.swap_xy(&Crs::WGS84));
        assert!(!AxisOrder::NorthEast.swap_xy(&Crs::epsg(3857)));
        assert!(!AxisOrder::EastNorth.swap_xy(&Crs::WGS84));
    }
}
