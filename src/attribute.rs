//! Decoding of a single feature attribute element.

use std::io::BufRead;

use crate::{
    config::DecoderConfig,
    crs::ReferenceResolver,
    cursor::XmlCursor,
    error::{Error, Result},
    gml::GeometryReader,
    schema::{AttributeDescriptor, AttributeKind},
    value::{convert_scalar, Value},
};

/// Decodes the attribute element under the cursor.
///
/// Precondition: cursor on the attribute's start boundary.
/// Postcondition: cursor on the attribute's end boundary.
///
/// Geometry attributes hand their first child element to the GML grammar;
/// an attribute without a child element decodes to `None`. Scalar
/// attributes convert their trimmed text content.
pub(crate) fn decode_attribute<R: BufRead>(
    cursor: &mut XmlCursor<R>,
    descriptor: &AttributeDescriptor,
    resolver: &mut ReferenceResolver,
    config: &DecoderConfig,
) -> Result<Option<Value>> {
    match descriptor.kind {
        AttributeKind::Geometry => {
            let property = cursor.start_name()?.clone();
            cursor.next_tag()?;
            if cursor.is_any_end() {
                cursor.require_end(property.namespace.as_deref(), &property.local)?;
                return Ok(None);
            }
            let geometry =
                GeometryReader::new(cursor, resolver, config.axis_order, config.max_depth)
                    .read_geometry(config.default_crs)?;
            cursor.next_tag()?;
            cursor
                .require_end(property.namespace.as_deref(), &property.local)
                .map_err(|_| {
                    Error::structural(format!(
                        "geometry property <{property}> holds more than one geometry"
                    ))
                })?;
            Ok(Some(Value::Geometry(geometry)))
        }
        AttributeKind::Scalar(_) => {
            let text = cursor.next_text()?;
            convert_scalar(descriptor, &text)
        }
    }
}
