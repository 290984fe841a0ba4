//! Pull-driven decoding of a WFS `FeatureCollection` response.
//!
//! [`FeatureDecoder`] owns the input stream. Each call to
//! [`FeatureDecoder::next_feature`] scans forward to the next feature
//! element, decodes its attributes against the target schema and hands back
//! a [`FeatureRecord`]. Any fatal error closes the stream before it is
//! returned, and a closed decoder yields `None` forever after.
//!
//! # Example
//!
//! ```rust
//! use wfs_geozero::{
//!     AttributeDescriptor, DecoderConfig, FeatureDecoder, FeatureSchema, QualifiedName,
//!     ScalarType,
//! };
//!
//! let xml = r#"<wfs:FeatureCollection numberOfFeatures="1"
//!         xmlns:wfs="http://www.opengis.net/wfs"
//!         xmlns:gml="http://www.opengis.net/gml"
//!         xmlns:topp="http://www.openplans.org/topp">
//!     <gml:featureMember>
//!         <topp:roads gml:id="roads.1">
//!             <topp:name>Main Street</topp:name>
//!             <topp:the_geom>
//!                 <gml:Point><gml:pos>13.4 52.5</gml:pos></gml:Point>
//!             </topp:the_geom>
//!         </topp:roads>
//!     </gml:featureMember>
//! </wfs:FeatureCollection>"#;
//!
//! let schema = FeatureSchema::new(vec![
//!     AttributeDescriptor::scalar("name", ScalarType::String),
//!     AttributeDescriptor::geometry("the_geom"),
//! ]);
//! let config = DecoderConfig::new(QualifiedName::new("http://www.openplans.org/topp", "roads"));
//!
//! let mut decoder = FeatureDecoder::new(xml.as_bytes(), &schema, config).unwrap();
//! assert_eq!(decoder.count_hint(), 1);
//!
//! let road = decoder.next_feature().unwrap().unwrap();
//! assert_eq!(road.id(), "roads.1");
//! assert_eq!(road.value(0).and_then(|v| v.as_str()), Some("Main Street"));
//! assert!(road.geometry().is_some());
//!
//! assert!(decoder.next_feature().unwrap().is_none());
//! ```

use std::io::BufRead;

use geozero::{error::GeozeroError, FeatureProcessor, GeozeroDatasource, GeozeroGeometry};

use crate::{
    attribute::decode_attribute,
    config::{ConversionPolicy, DecoderConfig},
    crs::ReferenceResolver,
    cursor::{Token, XmlCursor},
    error::{Error, Result},
    feature::FeatureRecord,
    gml::{GML_32_NAMESPACE, GML_NAMESPACE},
    schema::{FeatureSchema, SchemaIndex},
    value::Value,
};

/// Identifier attributes of a feature element, tried in order.
const ID_ATTRIBUTES: [(Option<&str>, &str); 4] = [
    (Some(GML_NAMESPACE), "id"),
    (Some(GML_32_NAMESPACE), "id"),
    (None, "fid"),
    (None, "id"),
];

/// Count-of-features attributes of the collection root, tried in order.
const COUNT_ATTRIBUTES: [&str; 2] = ["numberOfFeatures", "numberReturned"];

pub struct FeatureDecoder<'s, R> {
    cursor: Option<XmlCursor<R>>,
    schema: &'s FeatureSchema,
    index: SchemaIndex,
    config: DecoderConfig,
    resolver: ReferenceResolver,
    count_hint: i64,
}

fn count_hint<R: BufRead>(cursor: &XmlCursor<R>) -> i64 {
    let Some(raw) = COUNT_ATTRIBUTES
        .iter()
        .find_map(|name| cursor.attribute(None, name))
    else {
        return -1;
    };
    raw.trim().parse::<i64>().unwrap_or_else(|_| {
        log::warn!("Ignoring unparsable feature count '{raw}'");
        -1
    })
}

impl<'s, R: BufRead> FeatureDecoder<'s, R> {
    /// Reads up to the collection's root element and builds the schema
    /// index.
    ///
    /// # Errors
    ///
    /// Returns a structural error if the document does not start with a
    /// `FeatureCollection` element, or [`Error::Malformed`] if it is not
    /// well-formed XML.
    pub fn new(source: R, schema: &'s FeatureSchema, config: DecoderConfig) -> Result<Self> {
        let mut cursor = XmlCursor::new(source);
        cursor.next_tag()?;
        cursor.require_start(None, "FeatureCollection")?;
        let count_hint = count_hint(&cursor);

        log::debug!(
            "Decoding {{{}}}{} features, count hint {count_hint}",
            config.feature_name.namespace,
            config.feature_name.local_name
        );

        Ok(Self {
            cursor: Some(cursor),
            schema,
            index: SchemaIndex::new(schema),
            config,
            resolver: ReferenceResolver::new(),
            count_hint,
        })
    }

    /// The feature count stated on the collection root, or `-1` when it is
    /// absent or unparsable.
    #[must_use]
    pub fn count_hint(&self) -> i64 {
        self.count_hint
    }

    #[must_use]
    pub fn schema(&self) -> &'s FeatureSchema {
        self.schema
    }

    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cursor.is_none()
    }

    /// Releases the input stream. Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.cursor.take().is_some() {
            log::debug!("Feature stream closed");
        }
    }

    /// Decodes the next feature, or returns `None` once the document is
    /// exhausted or the decoder has been closed.
    ///
    /// # Errors
    ///
    /// Any error is fatal: the stream is closed before it is returned and
    /// later calls yield `Ok(None)`.
    pub fn next_feature(&mut self) -> Result<Option<FeatureRecord>> {
        let result = self.read_feature();
        if result.is_err() {
            self.close();
        }
        result
    }

    fn read_feature(&mut self) -> Result<Option<FeatureRecord>> {
        loop {
            let Some((id, depth)) = self.seek_next_feature()? else {
                return Ok(None);
            };
            match self.read_attributes(id, depth) {
                Err(err @ Error::ScalarConversion { .. })
                    if self.config.on_conversion_error == ConversionPolicy::SkipFeature =>
                {
                    log::warn!("Skipping feature: {err}");
                    self.skip_rest_of_feature(depth)?;
                }
                other => return other.map(Some),
            }
        }
    }

    /// Advances to the next feature start boundary, returning its identifier
    /// and element depth. Reaching the end of the document closes the
    /// decoder.
    fn seek_next_feature(&mut self) -> Result<Option<(String, usize)>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        let feature = &self.config.feature_name;
        let namespace = Some(feature.namespace.as_str()).filter(|ns| !ns.is_empty());
        loop {
            cursor.next()?;
            match cursor.current() {
                Token::Eof => break,
                Token::Element(name, _) if name.matches(namespace, &feature.local_name) => {
                    let id = ID_ATTRIBUTES
                        .iter()
                        .find_map(|(ns, local)| cursor.attribute(*ns, local))
                        .unwrap_or_default()
                        .to_string();
                    log::debug!("Found feature '{id}'");
                    return Ok(Some((id, cursor.depth())));
                }
                _ => {}
            }
        }
        self.close();
        Ok(None)
    }

    fn cursor(&mut self) -> Result<&mut XmlCursor<R>> {
        self.cursor
            .as_mut()
            .ok_or_else(|| Error::structural("the feature stream is closed"))
    }

    /// Decodes the children of the feature element at `depth` until its end
    /// boundary. Unknown children are skipped whole.
    fn read_attributes(&mut self, id: String, depth: usize) -> Result<FeatureRecord> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Err(Error::structural("the feature stream is closed"));
        };
        let mut values = vec![None; self.schema.len()];
        loop {
            cursor.next()?;
            let local = match cursor.current() {
                Token::Eof => {
                    return Err(Error::structural(format!(
                        "document ended inside feature '{id}'"
                    )))
                }
                Token::End(_) if cursor.depth() == depth => break,
                Token::Element(name, _) => name.local.clone(),
                Token::Start | Token::End(_) | Token::Text(_) => continue,
            };
            if let Some(slot) = self.index.slot(&local) {
                let descriptor = &self.schema.attributes()[slot];
                values[slot] =
                    decode_attribute(cursor, descriptor, &mut self.resolver, &self.config)?;
            } else {
                log::debug!("Skipping unknown element <{local}> in feature '{id}'");
                cursor.skip_element()?;
            }
        }
        Ok(FeatureRecord::new(id, values))
    }

    fn skip_rest_of_feature(&mut self, depth: usize) -> Result<()> {
        let cursor = self.cursor()?;
        loop {
            match cursor.current() {
                Token::End(_) if cursor.depth() == depth => return Ok(()),
                Token::Eof => {
                    return Err(Error::structural("document ended inside a skipped feature"))
                }
                _ => {}
            }
            cursor.next()?;
        }
    }
}

impl<R: BufRead> Iterator for FeatureDecoder<'_, R> {
    type Item = Result<FeatureRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_feature().transpose()
    }
}

impl<R: BufRead> GeozeroDatasource for FeatureDecoder<'_, R> {
    /// Emits every remaining feature: scalar slots as properties, the first
    /// populated geometry slot as the feature geometry.
    ///
    /// A decoding failure is reported as [`GeozeroError::Feature`] whose
    /// message starts with the [`ErrorKind`](crate::ErrorKind) name, for example
    /// `DimensionMismatch: ...`. Converted back into [`Error`] it classifies
    /// as [`crate::ErrorKind::Output`], so callers needing the original kind should
    /// drive the decoder as an iterator instead.
    fn process<P: FeatureProcessor>(&mut self, processor: &mut P) -> geozero::error::Result<()> {
        processor.dataset_begin(Some(self.config.feature_name.local_name.as_str()))?;
        let schema = self.schema;
        let mut idx = 0;
        while let Some(record) = self
            .next_feature()
            .map_err(|err| GeozeroError::Feature(format!("{:?}: {err}", err.kind())))?
        {
            processor.feature_begin(idx)?;
            processor.properties_begin()?;
            let mut property_idx = 0;
            for (descriptor, value) in schema.attributes().iter().zip(record.values()) {
                let Some(column) = value.as_ref().and_then(Value::column_value) else {
                    continue;
                };
                if processor.property(property_idx, &descriptor.name, &column)? {
                    break;
                }
                property_idx += 1;
            }
            processor.properties_end()?;
            if let Some(geometry) = record.geometry() {
                processor.geometry_begin()?;
                geometry.process_geom(processor)?;
                processor.geometry_end()?;
            }
            processor.feature_end(idx)?;
            idx += 1;
        }
        processor.dataset_end()
    }
}

#[cfg(test)]
mod test {
    use std::{fs::File, io::BufReader};

    use geozero::geojson::GeoJsonWriter;

    use super::*;
    use crate::{
        config::QualifiedName,
        crs::Crs,
        error::ErrorKind,
        geometry::{Coord, Shape},
        schema::{AttributeDescriptor, ScalarType},
    };

    const NS: &str = "http://www.openplans.org/topp";

    fn collection(root_attributes: &str, features: &str) -> String {
        format!(
            r#"<wfs:FeatureCollection {root_attributes}
                xmlns:wfs="http://www.opengis.net/wfs"
                xmlns:gml="http://www.opengis.net/gml"
                xmlns:topp="{NS}">
                <gml:featureMembers>{features}</gml:featureMembers>
            </wfs:FeatureCollection>"#
        )
    }

    fn roads_config() -> DecoderConfig {
        DecoderConfig::new(QualifiedName::new(NS, "roads"))
    }

    fn roads_schema() -> FeatureSchema {
        FeatureSchema::new(vec![
            AttributeDescriptor::scalar("name", ScalarType::String),
            AttributeDescriptor::scalar("lanes", ScalarType::Long),
            AttributeDescriptor::scalar("oneway", ScalarType::Boolean),
            AttributeDescriptor::geometry("the_geom"),
        ])
    }

    fn decode_all(xml: &str, schema: &FeatureSchema) -> Result<Vec<FeatureRecord>> {
        FeatureDecoder::new(xml.as_bytes(), schema, roads_config())?.collect()
    }

    #[test]
    fn test_single_point_feature() -> Result<()> {
        let schema = FeatureSchema::new(vec![
            AttributeDescriptor::scalar("id", ScalarType::Integer),
            AttributeDescriptor::geometry("the_geom"),
        ]);
        let xml = collection(
            "",
            r#"<topp:roads gml:id="roads.0">
                <topp:id>0</topp:id>
                <topp:the_geom><gml:Point><gml:pos>0 0</gml:pos></gml:Point></topp:the_geom>
            </topp:roads>"#,
        );
        let records = decode_all(&xml, &schema)?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value(0), Some(&Value::Integer(0)));

        let geometry = records[0].geometry().cloned();
        let geometry = geometry.ok_or_else(|| Error::structural("no geometry"))?;
        assert_eq!(geometry.shape, Shape::Point(Coord::xy(0.0, 0.0)));
        assert_eq!(geometry.crs, Some(Crs::WGS84));
        Ok(())
    }

    #[test]
    fn test_empty_collection() -> Result<()> {
        let schema = roads_schema();
        let xml = collection("", "");
        let mut decoder = FeatureDecoder::new(xml.as_bytes(), &schema, roads_config())?;
        assert_eq!(decoder.count_hint(), -1);
        assert!(decoder.next_feature()?.is_none());
        assert!(decoder.is_closed());
        Ok(())
    }

    #[test]
    fn test_count_hint() -> Result<()> {
        let schema = roads_schema();
        for (attributes, expected) in [
            (r#"numberOfFeatures="3""#, 3),
            (r#"numberOfFeatures="abc""#, -1),
            (r#"numberReturned="12""#, 12),
            (r#"numberOfFeatures="2" numberReturned="5""#, 2),
            ("", -1),
        ] {
            let xml = collection(attributes, "");
            let decoder = FeatureDecoder::new(xml.as_bytes(), &schema, roads_config())?;
            assert_eq!(decoder.count_hint(), expected, "{attributes}");
        }
        Ok(())
    }

    #[test]
    fn test_root_must_be_a_feature_collection() {
        let schema = roads_schema();
        let result = FeatureDecoder::new(
            "<gml:Point xmlns:gml=\"http://www.opengis.net/gml\"/>".as_bytes(),
            &schema,
            roads_config(),
        );
        assert_eq!(
            result.err().map(|err| err.kind()),
            Some(ErrorKind::Structural)
        );
    }

    #[test]
    fn test_identifier_precedence() -> Result<()> {
        let schema = roads_schema();
        let xml = collection(
            "",
            r#"<topp:roads gml:id="gml-wins" fid="fid-loses"/>
            <topp:roads fid="fid-wins" id="id-loses"/>
            <topp:roads id="plain"/>
            <topp:roads/>"#,
        );
        let ids: Vec<String> = decode_all(&xml, &schema)?
            .into_iter()
            .map(|record| record.id().to_string())
            .collect();
        assert_eq!(ids, ["gml-wins", "fid-wins", "plain", ""]);
        Ok(())
    }

    #[test]
    fn test_unknown_elements_are_skipped() -> Result<()> {
        let schema = roads_schema();
        let plain = collection(
            "",
            "<topp:roads><topp:name>A</topp:name><topp:lanes>2</topp:lanes></topp:roads>",
        );
        let noisy = collection(
            "",
            r#"<topp:roads>
                <topp:name>A</topp:name>
                <topp:extra><topp:lanes>99</topp:lanes></topp:extra>
                <topp:lanes>2</topp:lanes>
                <topp:note/>
            </topp:roads>"#,
        );
        assert_eq!(decode_all(&plain, &schema)?, decode_all(&noisy, &schema)?);
        Ok(())
    }

    #[test]
    fn test_case_insensitive_attributes() -> Result<()> {
        let schema = roads_schema();
        for element in ["Name", "NAME", "name"] {
            let xml = collection(
                "",
                &format!("<topp:roads><topp:{element}>A</topp:{element}></topp:roads>"),
            );
            let records = decode_all(&xml, &schema)?;
            assert_eq!(
                records[0].get(&schema, "name").and_then(Value::as_str),
                Some("A")
            );
        }
        Ok(())
    }

    #[test]
    fn test_repeated_attribute_last_wins() -> Result<()> {
        let schema = roads_schema();
        let xml = collection(
            "",
            "<topp:roads><topp:lanes>1</topp:lanes><topp:LANES>3</topp:LANES></topp:roads>",
        );
        assert_eq!(decode_all(&xml, &schema)?[0].value(1), Some(&Value::Long(3)));
        Ok(())
    }

    #[test]
    fn test_termination_is_sticky() -> Result<()> {
        let schema = roads_schema();
        let xml = collection("", "<topp:roads/>");
        let mut decoder = FeatureDecoder::new(xml.as_bytes(), &schema, roads_config())?;
        assert!(decoder.next_feature()?.is_some());
        for _ in 0..3 {
            assert!(decoder.next_feature()?.is_none());
        }
        assert!(decoder.next().is_none());
        Ok(())
    }

    #[test]
    fn test_close_is_idempotent() -> Result<()> {
        let schema = roads_schema();
        let xml = collection("", "<topp:roads/><topp:roads/>");
        let mut decoder = FeatureDecoder::new(xml.as_bytes(), &schema, roads_config())?;
        decoder.close();
        decoder.close();
        assert!(decoder.is_closed());
        assert!(decoder.next_feature()?.is_none());
        Ok(())
    }

    #[test]
    fn test_feature_closed_inside_polygon() -> Result<()> {
        let schema = roads_schema();
        let xml = collection(
            "",
            r#"<topp:roads>
                <topp:the_geom>
                    <gml:Polygon>
                        <gml:exterior><gml:LinearRing>
                            <gml:posList>0 0 4 0 4 4 0 4 0 0</gml:posList>
                        </gml:LinearRing></gml:exterior>
                        <gml:interior><gml:LinearRing>
                            <gml:posList>1 1 2 1 2 2 1 2 1 1</gml:posList>
                        </gml:LinearRing>
            </topp:roads>"#,
        );
        let mut decoder = FeatureDecoder::new(xml.as_bytes(), &schema, roads_config())?;
        let err = decoder.next_feature().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(decoder.is_closed());
        assert!(decoder.next_feature()?.is_none());
        Ok(())
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() -> Result<()> {
        let schema = roads_schema();
        let xml = collection(
            "",
            r#"<topp:roads>
                <topp:the_geom><gml:LineString><gml:posList>0 0 1 1 2</gml:posList></gml:LineString></topp:the_geom>
            </topp:roads>
            <topp:roads/>"#,
        );
        let mut decoder = FeatureDecoder::new(xml.as_bytes(), &schema, roads_config())?;
        let err = decoder.next_feature().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        assert!(decoder.next_feature()?.is_none());
        Ok(())
    }

    #[test]
    fn test_process_error_names_its_kind() -> Result<()> {
        let schema = roads_schema();
        let xml = collection(
            "",
            r#"<topp:roads>
                <topp:the_geom><gml:LineString><gml:posList>0 0 1 1 2</gml:posList></gml:LineString></topp:the_geom>
            </topp:roads>"#,
        );
        let mut decoder = FeatureDecoder::new(xml.as_bytes(), &schema, roads_config())?;
        let mut out: Vec<u8> = Vec::new();
        let err = decoder
            .process(&mut GeoJsonWriter::new(&mut out))
            .unwrap_err();
        assert!(matches!(
            &err,
            GeozeroError::Feature(message) if message.starts_with("DimensionMismatch: ")
        ));
        assert_eq!(Error::from(err).kind(), ErrorKind::Output);
        assert!(decoder.is_closed());
        Ok(())
    }

    #[test]
    fn test_conversion_error_policies() -> Result<()> {
        let schema = roads_schema();
        let xml = collection(
            "",
            r#"<topp:roads gml:id="r.1"><topp:lanes>many</topp:lanes><topp:name>skipped</topp:name></topp:roads>
            <topp:roads gml:id="r.2"><topp:lanes>2</topp:lanes></topp:roads>"#,
        );

        let mut failing = FeatureDecoder::new(xml.as_bytes(), &schema, roads_config())?;
        let err = failing.next_feature().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScalarConversion);
        assert!(failing.is_closed());

        let config = roads_config().with_conversion_policy(ConversionPolicy::SkipFeature);
        let records = FeatureDecoder::new(xml.as_bytes(), &schema, config)?
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "r.2");
        Ok(())
    }

    #[test]
    fn test_roads_fixture() -> anyhow::Result<()> {
        let schema = roads_schema();
        let reader = BufReader::new(File::open("test-data/roads.xml")?);
        let mut decoder = FeatureDecoder::new(reader, &schema, roads_config())?;
        assert_eq!(decoder.count_hint(), 3);

        let records = decoder.by_ref().collect::<Result<Vec<_>>>()?;
        assert_eq!(records.len(), 3);
        assert!(decoder.is_closed());

        let harbour = &records[1];
        assert_eq!(harbour.id(), "roads.2");
        assert_eq!(harbour.get(&schema, "lanes"), Some(&Value::Long(4)));
        assert_eq!(harbour.get(&schema, "oneway"), Some(&Value::Boolean(true)));
        let Some(Shape::MultiLineString(lines)) = harbour.geometry().map(|g| &g.shape) else {
            anyhow::bail!("expected a multi line string");
        };
        assert_eq!(lines.iter().map(Vec::len).collect::<Vec<_>>(), [2, 3]);

        let track = &records[2];
        assert_eq!(
            track.values(),
            [
                Some(Value::String("Unnamed Track".to_string())),
                None,
                None,
                None
            ]
        );
        Ok(())
    }

    #[test]
    fn test_gml32_fixture() -> anyhow::Result<()> {
        let schema = FeatureSchema::new(vec![
            AttributeDescriptor::scalar("area", ScalarType::Double),
            AttributeDescriptor::geometry("footprint"),
        ]);
        let config =
            DecoderConfig::new(QualifiedName::new("http://example.org/cadastre", "parcel"));
        let reader = BufReader::new(File::open("test-data/parcels_gml32.xml")?);
        let decoder = FeatureDecoder::new(reader, &schema, config)?;
        assert_eq!(decoder.count_hint(), 2);

        let records = decoder.collect::<Result<Vec<_>>>()?;
        assert_eq!(records[0].id(), "parcel.17");
        let Some(geometry) = records[0].geometry() else {
            anyhow::bail!("expected a geometry");
        };
        assert_eq!(geometry.crs, Some(Crs::epsg(25832)));
        let Shape::Polygon(polygon) = &geometry.shape else {
            anyhow::bail!("expected a polygon");
        };
        assert_eq!(polygon.exterior.len(), 5);
        assert_eq!(polygon.interiors.len(), 1);

        assert!(matches!(
            records[1].geometry().map(|g| &g.shape),
            Some(Shape::MultiPolygon(polygons)) if polygons.len() == 1
        ));
        Ok(())
    }

    #[test]
    fn test_process_to_geojson() -> anyhow::Result<()> {
        let schema = roads_schema();
        let reader = BufReader::new(File::open("test-data/roads.xml")?);
        let mut decoder = FeatureDecoder::new(reader, &schema, roads_config())?;

        let mut out: Vec<u8> = Vec::new();
        decoder.process(&mut GeoJsonWriter::new(&mut out))?;
        let json: serde_json::Value = serde_json::from_slice(&out)?;

        let features = json["features"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("no features"))?;
        assert_eq!(features.len(), 3);
        assert_eq!(features[0]["properties"]["name"], "Main Street");
        assert_eq!(features[1]["properties"]["lanes"], 4);
        assert_eq!(features[1]["properties"]["oneway"], true);
        assert_eq!(features[1]["geometry"]["type"], "MultiLineString");
        assert!(features[2]["properties"].get("lanes").is_none());
        Ok(())
    }
}
