//! Geometry values produced by the GML grammar.
//!
//! Coordinates keep an optional z ordinate, which `geo` types cannot hold.
//! A [`Geometry`] therefore converts into [`geo::Geometry`] by dropping z,
//! and implements [`GeozeroGeometry`] so 3D coordinates reach any geozero
//! processor that asks for them.

use geozero::{CoordDimensions, GeomProcessor, GeozeroGeometry};

use crate::crs::Crs;

/// A single position. `z` is set only for lists decoded with dimension 3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coord {
    #[must_use]
    pub fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    #[must_use]
    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }
}

/// A closed coordinate sequence. Closure and minimum length are not checked.
pub type Ring = Vec<Coord>;

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub interiors: Vec<Ring>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Polygon),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Polygon>),
}

/// A decoded geometry and the reference system declared on (or inherited
/// by) its outermost element.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub shape: Shape,
    pub crs: Option<Crs>,
}

impl Geometry {
    #[must_use]
    pub fn new(shape: Shape, crs: Option<Crs>) -> Self {
        Self { shape, crs }
    }

    #[must_use]
    pub fn has_z(&self) -> bool {
        let any_z = |coords: &[Coord]| coords.iter().any(|c| c.z.is_some());
        match &self.shape {
            Shape::Point(c) => c.z.is_some(),
            Shape::LineString(coords) | Shape::MultiPoint(coords) => any_z(coords),
            Shape::Polygon(p) => polygon_has_z(p),
            Shape::MultiLineString(lines) => lines.iter().any(|l| any_z(l)),
            Shape::MultiPolygon(polygons) => polygons.iter().any(polygon_has_z),
        }
    }

    /// The `geo` equivalent of this geometry, without z ordinates.
    #[must_use]
    pub fn to_geo_types(&self) -> geo::Geometry<f64> {
        geo::Geometry::from(&self.shape)
    }
}

fn polygon_has_z(polygon: &Polygon) -> bool {
    polygon
        .exterior
        .iter()
        .chain(polygon.interiors.iter().flatten())
        .any(|c| c.z.is_some())
}

fn to_line(coords: &[Coord]) -> geo::LineString<f64> {
    geo::LineString::new(coords.iter().map(|c| geo::Coord { x: c.x, y: c.y }).collect())
}

fn to_polygon(polygon: &Polygon) -> geo::Polygon<f64> {
    geo::Polygon::new(
        to_line(&polygon.exterior),
        polygon.interiors.iter().map(|r| to_line(r)).collect(),
    )
}

impl From<&Shape> for geo::Geometry<f64> {
    fn from(shape: &Shape) -> Self {
        match shape {
            Shape::Point(c) => geo::Point::new(c.x, c.y).into(),
            Shape::LineString(coords) => to_line(coords).into(),
            Shape::Polygon(p) => to_polygon(p).into(),
            Shape::MultiPoint(coords) => {
                geo::MultiPoint::new(coords.iter().map(|c| geo::Point::new(c.x, c.y)).collect())
                    .into()
            }
            Shape::MultiLineString(lines) => {
                geo::MultiLineString::new(lines.iter().map(|l| to_line(l)).collect()).into()
            }
            Shape::MultiPolygon(polygons) => {
                geo::MultiPolygon::new(polygons.iter().map(to_polygon).collect()).into()
            }
        }
    }
}

impl From<&Geometry> for geo::Geometry<f64> {
    fn from(geometry: &Geometry) -> Self {
        geometry.to_geo_types()
    }
}

fn process_coord<P: GeomProcessor>(
    coord: &Coord,
    idx: usize,
    processor: &mut P,
) -> geozero::error::Result<()> {
    if processor.multi_dim() {
        processor.coordinate(coord.x, coord.y, coord.z, None, None, None, idx)
    } else {
        processor.xy(coord.x, coord.y, idx)
    }
}

fn process_line<P: GeomProcessor>(
    coords: &[Coord],
    tagged: bool,
    idx: usize,
    processor: &mut P,
) -> geozero::error::Result<()> {
    processor.linestring_begin(tagged, coords.len(), idx)?;
    for (i, coord) in coords.iter().enumerate() {
        process_coord(coord, i, processor)?;
    }
    processor.linestring_end(tagged, idx)
}

fn process_polygon<P: GeomProcessor>(
    polygon: &Polygon,
    tagged: bool,
    idx: usize,
    processor: &mut P,
) -> geozero::error::Result<()> {
    processor.polygon_begin(tagged, 1 + polygon.interiors.len(), idx)?;
    process_line(&polygon.exterior, false, 0, processor)?;
    for (i, ring) in polygon.interiors.iter().enumerate() {
        process_line(ring, false, i + 1, processor)?;
    }
    processor.polygon_end(tagged, idx)
}

impl GeozeroGeometry for Geometry {
    fn process_geom<P: GeomProcessor>(&self, processor: &mut P) -> geozero::error::Result<()> {
        processor.srid(self.srid())?;
        match &self.shape {
            Shape::Point(c) => {
                processor.point_begin(0)?;
                process_coord(c, 0, processor)?;
                processor.point_end(0)
            }
            Shape::LineString(coords) => process_line(coords, true, 0, processor),
            Shape::Polygon(p) => process_polygon(p, true, 0, processor),
            Shape::MultiPoint(coords) => {
                processor.multipoint_begin(coords.len(), 0)?;
                for (i, c) in coords.iter().enumerate() {
                    process_coord(c, i, processor)?;
                }
                processor.multipoint_end(0)
            }
            Shape::MultiLineString(lines) => {
                processor.multilinestring_begin(lines.len(), 0)?;
                for (i, line) in lines.iter().enumerate() {
                    process_line(line, false, i, processor)?;
                }
                processor.multilinestring_end(0)
            }
            Shape::MultiPolygon(polygons) => {
                processor.multipolygon_begin(polygons.len(), 0)?;
                for (i, polygon) in polygons.iter().enumerate() {
                    process_polygon(polygon, false, i, processor)?;
                }
                processor.multipolygon_end(0)
            }
        }
    }

    fn dims(&self) -> CoordDimensions {
        if self.has_z() {
            CoordDimensions::xyz()
        } else {
            CoordDimensions::xy()
        }
    }

    fn srid(&self) -> Option<i32> {
        self.crs.as_ref().and_then(Crs::srid)
    }
}
