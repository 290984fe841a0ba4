//! Decoded attribute values and the permissive text conversion behind them.

use crate::{
    error::{Error, Result},
    geometry::Geometry,
    schema::{AttributeDescriptor, AttributeKind, ScalarType},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Geometry(Geometry),
}

impl Value {
    #[must_use]
    pub fn as_geometry(&self) -> Option<&Geometry> {
        match self {
            Value::Geometry(geometry) => Some(geometry),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integral values widened to `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Integer(v) => Some(f64::from(*v)),
            #[allow(clippy::cast_precision_loss)]
            Value::Long(v) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Geometry> for Value {
    fn from(geometry: Geometry) -> Self {
        Value::Geometry(geometry)
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "t" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "f" | "off" => Some(false),
        _ => None,
    }
}

/// Integral text, also accepting a decimal form with no fractional part
/// (`"12.0"`), which some servers emit for integer columns.
fn parse_integral(text: &str) -> Option<i64> {
    let text = text.strip_prefix('+').unwrap_or(text);
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    let (whole, fraction) = text.split_once('.')?;
    if !fraction.is_empty() && fraction.bytes().all(|b| b == b'0') {
        whole.parse::<i64>().ok()
    } else {
        None
    }
}

/// Converts trimmed element text to the descriptor's scalar binding.
///
/// Blank text becomes `None` for nullable attributes. A non-nullable string
/// attribute gets an empty string instead.
///
/// # Errors
///
/// Returns [`Error::ScalarConversion`] if the text can't be represented in
/// the declared binding, or if a non-nullable numeric or boolean attribute
/// is blank.
pub fn convert_scalar(descriptor: &AttributeDescriptor, text: &str) -> Result<Option<Value>> {
    let AttributeKind::Scalar(binding) = descriptor.kind else {
        return Err(Error::Message(format!(
            "attribute '{}' is not a scalar",
            descriptor.name
        )));
    };
    let text = text.trim();
    if text.is_empty() {
        return match (binding, descriptor.nullable) {
            (_, true) => Ok(None),
            (ScalarType::String, false) => Ok(Some(Value::String(String::new()))),
            _ => Err(conversion_error(descriptor, text, binding)),
        };
    }

    let value = match binding {
        ScalarType::String => Some(Value::String(text.to_string())),
        ScalarType::Boolean => parse_bool(text).map(Value::Boolean),
        ScalarType::Integer => parse_integral(text)
            .and_then(|v| i32::try_from(v).ok())
            .map(Value::Integer),
        ScalarType::Long => parse_integral(text).map(Value::Long),
        ScalarType::Float => text.parse::<f32>().ok().map(Value::Float),
        ScalarType::Double => text.parse::<f64>().ok().map(Value::Double),
    };
    value
        .map(Some)
        .ok_or_else(|| conversion_error(descriptor, text, binding))
}

fn conversion_error(descriptor: &AttributeDescriptor, text: &str, binding: ScalarType) -> Error {
    Error::ScalarConversion {
        attribute: descriptor.name.clone(),
        text: text.to_string(),
        expected: binding.name(),
    }
}
