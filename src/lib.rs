//! # wfs-geozero
//!
//! A streaming reader for WFS `FeatureCollection` responses encoded in GML.
//!
//! The decoder pulls one feature at a time from any [`std::io::BufRead`]
//! source and converts its attributes into typed values against a caller
//! supplied schema. Geometry attributes are parsed from GML 2, GML 3.1 and
//! GML 3.2 markup into a closed set of shapes that convert into [`geo`]
//! types and feed any geozero processor.
//!
//! ## Features
//!
//! - Point, `LineString`, `LinearRing`, Polygon, `MultiPoint`, `MultiLineString`,
//!   `MultiSurface` and `MultiPolygon`, in both member encodings
//! - Per-list dimension and reference system inheritance with `srsDimension`
//!   and `srsName` overrides
//! - Case-insensitive attribute matching and permissive scalar conversion
//! - [`FeatureDecoder`] is an [`Iterator`] and a [`geozero::GeozeroDatasource`]
//! - [`from_decoder`] deserializes records into your own types
//!
//! ## Example
//!
//! ```rust
//! use geozero::{geojson::GeoJsonWriter, GeozeroDatasource};
//! use wfs_geozero::{
//!     AttributeDescriptor, DecoderConfig, FeatureDecoder, FeatureSchema, QualifiedName,
//!     ScalarType,
//! };
//!
//! let xml = r#"<wfs:FeatureCollection numberOfFeatures="1"
//!         xmlns:wfs="http://www.opengis.net/wfs"
//!         xmlns:gml="http://www.opengis.net/gml"
//!         xmlns:app="urn:app">
//!     <gml:featureMember>
//!         <app:city gml:id="city.1">
//!             <app:name>Berlin</app:name>
//!             <app:location>
//!                 <gml:Point srsName="EPSG:4326"><gml:pos>13.4 52.5</gml:pos></gml:Point>
//!             </app:location>
//!         </app:city>
//!     </gml:featureMember>
//! </wfs:FeatureCollection>"#;
//!
//! let schema = FeatureSchema::new(vec![
//!     AttributeDescriptor::scalar("name", ScalarType::String),
//!     AttributeDescriptor::geometry("location"),
//! ]);
//! let config = DecoderConfig::new(QualifiedName::new("urn:app", "city"));
//! let mut decoder = FeatureDecoder::new(xml.as_bytes(), &schema, config).unwrap();
//!
//! let mut out = Vec::new();
//! decoder.process(&mut GeoJsonWriter::new(&mut out)).unwrap();
//! assert!(std::str::from_utf8(&out).unwrap().contains("Berlin"));
//! ```
//!
//! ## Modules
//!
//! - [`decoder`] - The feature stream and its scanner
//! - [`gml`] - GML geometry namespaces
//! - [`geometry`] - Decoded geometry values
//! - [`schema`] - Target schemas and their lookup index
//! - [`value`] - Attribute values and scalar conversion
//! - [`de`] - Deserialization into caller types
//! - [`error`] - Error types and handling

mod attribute;
#[allow(clippy::module_name_repetitions)]
pub mod config;
mod coords;
pub mod crs;
mod cursor;
pub mod de;
#[allow(clippy::module_name_repetitions)]
pub mod decoder;
#[allow(clippy::module_name_repetitions)]
pub mod error;
#[allow(clippy::module_name_repetitions)]
pub mod feature;
pub mod geometry;
pub mod gml;
#[allow(clippy::module_name_repetitions)]
pub mod schema;
pub mod ser;
pub mod value;

pub use config::{AxisOrder, ConversionPolicy, DecoderConfig, QualifiedName};
pub use crs::Crs;
pub use de::from_decoder;
pub use decoder::FeatureDecoder;
pub use error::{Error, ErrorKind, Result};
pub use feature::FeatureRecord;
pub use geometry::{Coord, Geometry, Polygon, Shape};
pub use schema::{AttributeDescriptor, AttributeKind, FeatureSchema, ScalarType};
pub use value::Value;
