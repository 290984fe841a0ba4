//! Streaming GML geometry grammar.
//!
//! Every entry parser starts with the cursor on its own start boundary and
//! returns with the cursor on the matching end boundary, never past it.
//! Reference system, dimension and nesting depth travel down the recursion
//! in a `Scope` instead of living in shared mutable state.

use std::io::BufRead;

use crate::{
    config::AxisOrder,
    coords::{self, TupleFormat},
    crs::{Crs, ReferenceResolver},
    cursor::XmlCursor,
    error::{Error, Result},
    geometry::{Coord, Geometry, Polygon, Ring, Shape},
};

pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml";
pub const GML_32_NAMESPACE: &str = "http://www.opengis.net/gml/3.2";

const DEFAULT_DIMENSION: usize = 2;

fn gml_namespace(uri: Option<&str>) -> Option<&'static str> {
    match uri {
        Some(GML_NAMESPACE) => Some(GML_NAMESPACE),
        Some(GML_32_NAMESPACE) => Some(GML_32_NAMESPACE),
        _ => None,
    }
}

/// The geometry elements accepted as the outermost element of a geometry
/// property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeometryElement {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiSurface,
    MultiPolygon,
}

impl GeometryElement {
    fn from_local_name(local: &str) -> Option<Self> {
        Some(match local {
            "Point" => GeometryElement::Point,
            "LineString" => GeometryElement::LineString,
            "Polygon" => GeometryElement::Polygon,
            "MultiPoint" => GeometryElement::MultiPoint,
            "MultiLineString" => GeometryElement::MultiLineString,
            "MultiSurface" => GeometryElement::MultiSurface,
            "MultiPolygon" => GeometryElement::MultiPolygon,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    ns: &'static str,
    dimension: usize,
    crs: Crs,
    depth: usize,
}

/// Reads geometries off a cursor owned by the feature decoder.
pub(crate) struct GeometryReader<'a, R> {
    cursor: &'a mut XmlCursor<R>,
    resolver: &'a mut ReferenceResolver,
    axis_order: AxisOrder,
    max_depth: usize,
}

impl<'a, R: BufRead> GeometryReader<'a, R> {
    pub fn new(
        cursor: &'a mut XmlCursor<R>,
        resolver: &'a mut ReferenceResolver,
        axis_order: AxisOrder,
        max_depth: usize,
    ) -> Self {
        Self {
            cursor,
            resolver,
            axis_order,
            max_depth,
        }
    }

    /// Parses the geometry element under the cursor.
    ///
    /// Precondition: cursor on a GML geometry start boundary.
    /// Postcondition: cursor on that element's end boundary.
    pub fn read_geometry(&mut self, default_crs: Crs) -> Result<Geometry> {
        let name = self.cursor.start_name()?;
        let (Some(ns), Some(element)) = (
            gml_namespace(name.namespace.as_deref()),
            GeometryElement::from_local_name(&name.local),
        ) else {
            return Err(Error::UnsupportedShape(name.to_string()));
        };
        let local = name.local.clone();

        let crs = self
            .resolver
            .resolve(self.cursor.attribute(None, "srsName"), default_crs)?;
        let root = Scope {
            ns,
            dimension: DEFAULT_DIMENSION,
            crs,
            depth: 0,
        };

        let shape = match element {
            GeometryElement::Point => Shape::Point(self.point(root)?),
            GeometryElement::LineString => Shape::LineString(self.line_string(root)?),
            GeometryElement::Polygon => Shape::Polygon(self.polygon(root)?),
            GeometryElement::MultiPoint => Shape::MultiPoint(self.multi_point(root)?),
            GeometryElement::MultiLineString => {
                Shape::MultiLineString(self.multi_line_string(root)?)
            }
            GeometryElement::MultiSurface => Shape::MultiPolygon(self.multi_surface(root)?),
            GeometryElement::MultiPolygon => Shape::MultiPolygon(self.multi_polygon(root)?),
        };

        self.cursor.require_end(Some(ns), &local)?;
        Ok(Geometry::new(shape, Some(crs)))
    }

    /// Checks the start boundary and derives the element's scope from its
    /// `srsDimension` and `srsName` attributes.
    fn enter(&mut self, scope: Scope, local: &str) -> Result<Scope> {
        self.cursor.require_start(Some(scope.ns), local)?;
        let depth = scope.depth + 1;
        if depth > self.max_depth {
            return Err(Error::structural(format!(
                "geometry nesting exceeds {} levels at <{local}>",
                self.max_depth
            )));
        }
        let dimension = self.dimension(scope.dimension)?;
        let crs = self
            .resolver
            .resolve(self.cursor.attribute(None, "srsName"), scope.crs)?;
        if crs != scope.crs {
            log::warn!(
                "<{local}> declares {crs} inside a geometry in {}, keeping the outer system",
                scope.crs
            );
        }
        Ok(Scope {
            ns: scope.ns,
            dimension,
            crs,
            depth,
        })
    }

    fn dimension(&self, inherited: usize) -> Result<usize> {
        let Some(raw) = self.cursor.attribute(None, "srsDimension") else {
            return Ok(inherited);
        };
        match raw.trim().parse::<usize>() {
            Ok(dimension) if dimension >= 2 => Ok(dimension),
            _ => Err(Error::structural(format!("invalid srsDimension '{raw}'"))),
        }
    }

    fn swap_xy(&self, scope: Scope) -> bool {
        self.axis_order.swap_xy(&scope.crs)
    }

    /// Local name of the current start boundary, which must share the
    /// scope's GML namespace.
    fn current_local(&self, scope: Scope) -> Result<String> {
        let name = self.cursor.start_name()?;
        if name.namespace.as_deref() != Some(scope.ns) {
            return Err(Error::structural(format!(
                "expected an element in {}, found <{name}>",
                scope.ns
            )));
        }
        Ok(name.local.clone())
    }

    /// `pos` or `posList`, honouring a local `srsDimension`.
    fn coord_list(&mut self, scope: Scope) -> Result<Vec<Coord>> {
        let dimension = self.dimension(scope.dimension)?;
        let text = self.cursor.next_text()?;
        coords::decode(&text, dimension, self.swap_xy(scope))
    }

    /// GML 2 `coordinates` with its `decimal`, `cs` and `ts` separators.
    fn coordinates(&mut self, scope: Scope) -> Result<Vec<Coord>> {
        let dimension = self.dimension(scope.dimension)?;
        let mut format = TupleFormat::default();
        for (attribute, slot) in [
            ("decimal", &mut format.decimal),
            ("cs", &mut format.cs),
            ("ts", &mut format.ts),
        ] {
            match self.cursor.attribute(None, attribute) {
                Some(value) if !value.is_empty() => *slot = value.to_string(),
                _ => {}
            }
        }
        let text = self.cursor.next_text()?;
        coords::decode_tuples(&text, &format, dimension, self.swap_xy(scope))
    }

    /// GML 2 `coord` with `X`, `Y` and optional `Z` children.
    fn coord(&mut self, scope: Scope) -> Result<Coord> {
        let mut ordinates = Vec::with_capacity(3);
        for axis in ["X", "Y", "Z"] {
            self.cursor.next_tag()?;
            if axis == "Z" && self.cursor.is_end(Some(scope.ns), "coord") {
                break;
            }
            self.cursor.require_start(Some(scope.ns), axis)?;
            let text = self.cursor.next_text()?;
            ordinates.push(
                text.parse::<f64>()
                    .map_err(|_| Error::InvalidOrdinate(text.clone()))?,
            );
        }
        if ordinates.len() == 3 {
            self.cursor.next_tag()?;
        }
        self.cursor.require_end(Some(scope.ns), "coord")?;

        let (x, y) = if self.swap_xy(scope) {
            (ordinates[1], ordinates[0])
        } else {
            (ordinates[0], ordinates[1])
        };
        Ok(Coord {
            x,
            y,
            z: ordinates.get(2).copied(),
        })
    }

    fn single(coords: &[Coord], element: &str) -> Result<Coord> {
        match coords {
            [coord] => Ok(*coord),
            other => Err(Error::structural(format!(
                "expected exactly one position in <{element}>, found {}",
                other.len()
            ))),
        }
    }

    fn point(&mut self, scope: Scope) -> Result<Coord> {
        let scope = self.enter(scope, "Point")?;
        self.cursor.next_tag()?;
        let coord = match self.current_local(scope)?.as_str() {
            "pos" => Self::single(&self.coord_list(scope)?, "Point")?,
            "coordinates" => Self::single(&self.coordinates(scope)?, "Point")?,
            "coord" => self.coord(scope)?,
            other => {
                return Err(Error::structural(format!(
                    "unknown coordinate element <{other}> in Point"
                )))
            }
        };
        self.cursor.next_tag()?;
        self.cursor.require_end(Some(scope.ns), "Point")?;
        Ok(coord)
    }

    /// Coordinates of a `LineString` or `LinearRing` whose start boundary has
    /// already been entered.
    fn line_coords(&mut self, scope: Scope, element: &str) -> Result<Vec<Coord>> {
        self.cursor.next_tag()?;
        let coords = match self.current_local(scope)?.as_str() {
            "posList" => {
                let coords = self.coord_list(scope)?;
                self.cursor.next_tag()?;
                coords
            }
            "coordinates" => {
                let coords = self.coordinates(scope)?;
                self.cursor.next_tag()?;
                coords
            }
            "pos" => {
                let mut coords = Vec::new();
                while self.cursor.is_start(Some(scope.ns), "pos") {
                    coords.push(Self::single(&self.coord_list(scope)?, "pos")?);
                    self.cursor.next_tag()?;
                }
                coords
            }
            "coord" => {
                let mut coords = Vec::new();
                while self.cursor.is_start(Some(scope.ns), "coord") {
                    coords.push(self.coord(scope)?);
                    self.cursor.next_tag()?;
                }
                coords
            }
            other => {
                return Err(Error::structural(format!(
                    "expected posList or pos inside <{element}>, found <{other}>"
                )))
            }
        };
        self.cursor.require_end(Some(scope.ns), element)?;
        Ok(coords)
    }

    fn line_string(&mut self, scope: Scope) -> Result<Vec<Coord>> {
        let scope = self.enter(scope, "LineString")?;
        self.line_coords(scope, "LineString")
    }

    fn linear_ring(&mut self, scope: Scope) -> Result<Ring> {
        let scope = self.enter(scope, "LinearRing")?;
        self.line_coords(scope, "LinearRing")
    }

    /// One ring inside a boundary wrapper, leaving the cursor on the
    /// wrapper's end boundary.
    fn boundary(&mut self, scope: Scope, wrapper: &str) -> Result<Ring> {
        self.cursor.next_tag()?;
        let ring = self.linear_ring(scope)?;
        self.cursor.next_tag()?;
        self.cursor.require_end(Some(scope.ns), wrapper)?;
        Ok(ring)
    }

    fn polygon(&mut self, scope: Scope) -> Result<Polygon> {
        let scope = self.enter(scope, "Polygon")?;

        self.cursor.next_tag()?;
        let wrapper = self.current_local(scope)?;
        if wrapper != "exterior" && wrapper != "outerBoundaryIs" {
            return Err(Error::structural(format!(
                "unknown polygon boundary element <{wrapper}>"
            )));
        }
        let exterior = self.boundary(scope, &wrapper)?;

        let mut interiors = Vec::new();
        self.cursor.next_tag()?;
        while !self.cursor.is_any_end() {
            let wrapper = self.current_local(scope)?;
            if wrapper != "interior" && wrapper != "innerBoundaryIs" {
                return Err(Error::structural(format!(
                    "unexpected <{wrapper}> after the polygon exterior"
                )));
            }
            interiors.push(self.boundary(scope, &wrapper)?);
            self.cursor.next_tag()?;
        }

        self.cursor.require_end(Some(scope.ns), "Polygon")?;
        Ok(Polygon {
            exterior,
            interiors,
        })
    }

    /// Members of a multi geometry in either encoding: repeated `member`
    /// wrappers holding one geometry each, or one `members` wrapper holding
    /// them all. Both may appear; document order is kept.
    fn members<T>(
        &mut self,
        scope: Scope,
        outer: &str,
        member: &str,
        members: Option<&str>,
        parse: fn(&mut Self, Scope) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut parsed = Vec::new();
        self.cursor.next_tag()?;
        while !self.cursor.is_end(Some(scope.ns), outer) {
            let wrapper = self.current_local(scope)?;
            if wrapper == member {
                self.cursor.next_tag()?;
                parsed.push(parse(self, scope)?);
                self.cursor.next_tag()?;
                self.cursor.require_end(Some(scope.ns), member)?;
            } else if Some(wrapper.as_str()) == members {
                self.cursor.next_tag()?;
                while !self.cursor.is_end(Some(scope.ns), &wrapper) {
                    parsed.push(parse(self, scope)?);
                    self.cursor.next_tag()?;
                }
            } else {
                return Err(Error::structural(format!(
                    "unexpected <{wrapper}> inside <{outer}>"
                )));
            }
            self.cursor.next_tag()?;
        }
        Ok(parsed)
    }

    fn multi_point(&mut self, scope: Scope) -> Result<Vec<Coord>> {
        let scope = self.enter(scope, "MultiPoint")?;
        let points = self.members(
            scope,
            "MultiPoint",
            "pointMember",
            Some("pointMembers"),
            Self::point,
        )?;
        self.cursor.require_end(Some(scope.ns), "MultiPoint")?;
        Ok(points)
    }

    fn multi_line_string(&mut self, scope: Scope) -> Result<Vec<Vec<Coord>>> {
        let scope = self.enter(scope, "MultiLineString")?;
        let lines = self.members(
            scope,
            "MultiLineString",
            "lineStringMember",
            None,
            Self::line_string,
        )?;
        self.cursor.require_end(Some(scope.ns), "MultiLineString")?;
        Ok(lines)
    }

    fn multi_surface(&mut self, scope: Scope) -> Result<Vec<Polygon>> {
        let scope = self.enter(scope, "MultiSurface")?;
        let polygons = self.members(
            scope,
            "MultiSurface",
            "surfaceMember",
            Some("surfaceMembers"),
            Self::polygon,
        )?;
        self.cursor.require_end(Some(scope.ns), "MultiSurface")?;
        Ok(polygons)
    }

    fn multi_polygon(&mut self, scope: Scope) -> Result<Vec<Polygon>> {
        let scope = self.enter(scope, "MultiPolygon")?;
        let polygons = self.members(
            scope,
            "MultiPolygon",
            "polygonMember",
            None,
            Self::polygon,
        )?;
        self.cursor.require_end(Some(scope.ns), "MultiPolygon")?;
        Ok(polygons)
    }
}
