use std::io::BufRead;

use serde::Deserialize;

use crate::{
    decoder::FeatureDecoder,
    error::{Error, Result},
    ser::NamedRecord,
};

/// Deserializes every remaining feature of a decoder into a type that
/// implements Deserialize.
///
/// Each record is presented as a map keyed by schema attribute names plus
/// `id` for the feature identifier. Geometry attributes deserialize into
/// [`geo::Geometry`] fields.
///
/// # Examples
///
/// ```
/// use geo::Geometry;
/// use serde::Deserialize;
/// use wfs_geozero::{
///     from_decoder, AttributeDescriptor, DecoderConfig, FeatureDecoder, FeatureSchema,
///     QualifiedName, ScalarType,
/// };
///
/// #[derive(Deserialize)]
/// struct City {
///     id: String,
///     name: String,
///     population: i64,
///     location: Geometry,
/// }
///
/// let xml = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs"
///         xmlns:gml="http://www.opengis.net/gml" xmlns:app="urn:app">
///     <gml:featureMember>
///         <app:city fid="city.1">
///             <app:name>Berlin</app:name>
///             <app:population>3669495</app:population>
///             <app:location><gml:Point><gml:pos>13.4 52.5</gml:pos></gml:Point></app:location>
///         </app:city>
///     </gml:featureMember>
/// </wfs:FeatureCollection>"#;
///
/// let schema = FeatureSchema::new(vec![
///     AttributeDescriptor::scalar("name", ScalarType::String),
///     AttributeDescriptor::scalar("population", ScalarType::Long),
///     AttributeDescriptor::geometry("location"),
/// ]);
/// let config = DecoderConfig::new(QualifiedName::new("urn:app", "city"));
/// let mut decoder = FeatureDecoder::new(xml.as_bytes(), &schema, config).unwrap();
///
/// let cities: Vec<City> = from_decoder(&mut decoder).unwrap();
/// assert_eq!(cities[0].id, "city.1");
/// assert_eq!(cities[0].name, "Berlin");
/// ```
///
/// # Errors
///
/// Returns an error if:
/// - Decoding a feature fails
/// - A record cannot be deserialized into the target type
pub fn from_decoder<'de, T: Deserialize<'de>, R: BufRead>(
    decoder: &mut FeatureDecoder<'_, R>,
) -> Result<Vec<T>> {
    let schema = decoder.schema();
    decoder
        .map(|record| {
            let record = record?;
            serde_json::to_value(NamedRecord::new(schema, &record))
                .and_then(T::deserialize)
                .map_err(Error::SerdeError)
        })
        .collect()
}
