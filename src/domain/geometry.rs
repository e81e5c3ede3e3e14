//! Well-Known Text geometry parsing.
//!
//! Only the 2D simple feature types are supported. A trailing Z or M ordinate
//! is accepted and ignored. Every parsed geometry exposes its envelope, which
//! is what the spatial filters compare against.

use nom::{
    IResult, Parser,
    branch::alt,
    character::complete::{alpha1, char, multispace0, multispace1},
    combinator::{all_consuming, map, opt},
    error::{Error as NomError, ErrorKind},
    multi::separated_list1,
    number::complete::double,
    sequence::{delimited, preceded, terminated},
};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kilometres per degree of latitude.
const KM_PER_DEGREE: f64 = 111.32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WktError {
    #[error("invalid WKT syntax near '{0}'")]
    Syntax(String),

    #[error("{0} needs at least {1} points")]
    TooFewPoints(GeometryKind, usize),

    #[error("polygon ring is not closed")]
    OpenRing,

    #[error("coordinates must be finite numbers")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl GeometryKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeometryKind {
    type Err = WktError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POINT" => Ok(Self::Point),
            "LINESTRING" => Ok(Self::LineString),
            "POLYGON" => Ok(Self::Polygon),
            "MULTIPOINT" => Ok(Self::MultiPoint),
            "MULTILINESTRING" => Ok(Self::MultiLineString),
            "MULTIPOLYGON" => Ok(Self::MultiPolygon),
            _ => Err(WktError::Syntax(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
}

/// Axis aligned bounding rectangle in the server CRS (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

type Res<'a, T> = IResult<&'a str, T>;

fn ws(i: &str) -> Res<'_, &str> {
    multispace0(i)
}

fn gap(i: &str) -> Res<'_, &str> {
    multispace1(i)
}

fn number(i: &str) -> Res<'_, f64> {
    double(i)
}

fn open(i: &str) -> Res<'_, char> {
    delimited(ws, char('('), ws).parse(i)
}

fn close(i: &str) -> Res<'_, char> {
    delimited(ws, char(')'), ws).parse(i)
}

fn comma(i: &str) -> Res<'_, char> {
    delimited(ws, char(','), ws).parse(i)
}

fn coord(i: &str) -> Res<'_, Coord> {
    let (i, x) = number(i)?;
    let (i, _) = gap(i)?;
    let (i, y) = number(i)?;
    let (i, _) = opt(preceded(gap, number)).parse(i)?;
    Ok((i, Coord { x, y }))
}

fn coord_seq(i: &str) -> Res<'_, Vec<Coord>> {
    delimited(open, separated_list1(comma, coord), close).parse(i)
}

/// MULTIPOINT accepts both `(1 2, 3 4)` and `((1 2), (3 4))`.
fn multipoint_seq(i: &str) -> Res<'_, Vec<Coord>> {
    let item = alt((delimited(open, coord, close), coord));
    delimited(open, separated_list1(comma, item), close).parse(i)
}

fn ring_seq(i: &str) -> Res<'_, Vec<Vec<Coord>>> {
    delimited(open, separated_list1(comma, coord_seq), close).parse(i)
}

fn polygon_seq(i: &str) -> Res<'_, Vec<Vec<Vec<Coord>>>> {
    delimited(open, separated_list1(comma, ring_seq), close).parse(i)
}

fn keyword(i: &str) -> Res<'_, &str> {
    preceded(ws, alpha1).parse(i)
}

fn geometry(i: &str) -> Res<'_, Geometry> {
    let (rest, word) = keyword(i)?;
    let kind = GeometryKind::from_str(word)
        .map_err(|_| nom::Err::Error(NomError::new(i, ErrorKind::Tag)))?;

    match kind {
        GeometryKind::Point => map(delimited(open, coord, close), Geometry::Point).parse(rest),
        GeometryKind::LineString => map(coord_seq, Geometry::LineString).parse(rest),
        GeometryKind::Polygon => map(ring_seq, Geometry::Polygon).parse(rest),
        GeometryKind::MultiPoint => map(multipoint_seq, Geometry::MultiPoint).parse(rest),
        GeometryKind::MultiLineString => map(ring_seq, Geometry::MultiLineString).parse(rest),
        GeometryKind::MultiPolygon => map(polygon_seq, Geometry::MultiPolygon).parse(rest),
    }
}

fn document(i: &str) -> Res<'_, Geometry> {
    terminated(geometry, ws).parse(i)
}

impl Geometry {
    /// Parses and validates a WKT string.
    pub fn parse(wkt: &str) -> Result<Self, WktError> {
        let (_, geometry) = all_consuming(document).parse(wkt).map_err(|e| match e {
            nom::Err::Error(err) | nom::Err::Failure(err) => {
                WktError::Syntax(err.input.chars().take(20).collect())
            }
            nom::Err::Incomplete(_) => WktError::Syntax(String::new()),
        })?;
        geometry.validate()?;
        Ok(geometry)
    }

    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::LineString(_) => GeometryKind::LineString,
            Self::Polygon(_) => GeometryKind::Polygon,
            Self::MultiPoint(_) => GeometryKind::MultiPoint,
            Self::MultiLineString(_) => GeometryKind::MultiLineString,
            Self::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    fn coords(&self) -> Box<dyn Iterator<Item = &Coord> + '_> {
        match self {
            Self::Point(c) => Box::new(std::iter::once(c)),
            Self::LineString(cs) | Self::MultiPoint(cs) => Box::new(cs.iter()),
            Self::Polygon(rings) | Self::MultiLineString(rings) => {
                Box::new(rings.iter().flatten())
            }
            Self::MultiPolygon(polys) => Box::new(polys.iter().flatten().flatten()),
        }
    }

    fn validate(&self) -> Result<(), WktError> {
        if self.coords().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(WktError::NonFinite);
        }

        match self {
            Self::Point(_) | Self::MultiPoint(_) => Ok(()),
            Self::LineString(line) => validate_line(line),
            Self::MultiLineString(lines) => lines.iter().try_for_each(|l| validate_line(l)),
            Self::Polygon(rings) => rings.iter().try_for_each(|r| validate_ring(r)),
            Self::MultiPolygon(polys) => polys
                .iter()
                .flatten()
                .try_for_each(|r| validate_ring(r)),
        }
    }

    /// Bounding rectangle of all coordinates.
    #[must_use]
    pub fn envelope(&self) -> Envelope {
        let mut coords = self.coords();
        // Parsing guarantees at least one coordinate.
        let first = coords.next().copied().unwrap_or(Coord { x: 0.0, y: 0.0 });
        coords.fold(Envelope::from_point(first), |env, c| env.including(*c))
    }
}

fn validate_line(line: &[Coord]) -> Result<(), WktError> {
    if line.len() < 2 {
        return Err(WktError::TooFewPoints(GeometryKind::LineString, 2));
    }
    Ok(())
}

fn validate_ring(ring: &[Coord]) -> Result<(), WktError> {
    if ring.len() < 4 {
        return Err(WktError::TooFewPoints(GeometryKind::Polygon, 4));
    }
    if ring.first() != ring.last() {
        return Err(WktError::OpenRing);
    }
    Ok(())
}

impl Envelope {
    #[must_use]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    const fn from_point(c: Coord) -> Self {
        Self::new(c.x, c.y, c.x, c.y)
    }

    fn including(self, c: Coord) -> Self {
        Self {
            min_x: self.min_x.min(c.x),
            min_y: self.min_y.min(c.y),
            max_x: self.max_x.max(c.x),
            max_y: self.max_y.max(c.y),
        }
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Touching edges count as intersecting.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Grows the rectangle by `km` kilometres on every side.
    ///
    /// Longitude degrees are scaled with the latitude of the centre, so the
    /// widening is only approximate near the poles.
    #[must_use]
    pub fn expand_km(self, km: f64) -> Self {
        let dy = km / KM_PER_DEGREE;
        let centre_lat = f64::midpoint(self.min_y, self.max_y).to_radians();
        let dx = km / (KM_PER_DEGREE * centre_lat.cos().max(0.01));
        Self {
            min_x: self.min_x - dx,
            min_y: (self.min_y - dy).max(-90.0),
            max_x: self.max_x + dx,
            max_y: (self.max_y + dy).min(90.0),
        }
    }

    /// Renders the rectangle as a closed WKT polygon.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        format!(
            "POLYGON(({minx} {miny},{maxx} {miny},{maxx} {maxy},{minx} {maxy},{minx} {miny}))",
            minx = self.min_x,
            miny = self.min_y,
            maxx = self.max_x,
            maxy = self.max_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_polygon_and_computes_envelope() {
        let g = Geometry::parse("POLYGON((7 51, 8 51, 8 52, 7 52, 7 51))").unwrap();
        assert_eq!(g.kind(), GeometryKind::Polygon);
        assert_eq!(g.envelope(), Envelope::new(7.0, 51.0, 8.0, 52.0));
    }

    #[test]
    fn accepts_case_and_whitespace_variations() {
        let g = Geometry::parse("  point ( -7.5   51.25 ) ").unwrap();
        assert_eq!(g, Geometry::Point(Coord { x: -7.5, y: 51.25 }));

        let g = Geometry::parse("LineString(0 0,1 1, 2 2)").unwrap();
        assert_eq!(g.kind(), GeometryKind::LineString);
    }

    #[test]
    fn ignores_third_ordinate() {
        let g = Geometry::parse("POINT(1 2 3)").unwrap();
        assert_eq!(g, Geometry::Point(Coord { x: 1.0, y: 2.0 }));
    }

    #[test]
    fn parses_multi_geometries() {
        let mp = Geometry::parse("MULTIPOINT((1 2), (3 4))").unwrap();
        assert_eq!(mp.envelope(), Envelope::new(1.0, 2.0, 3.0, 4.0));

        let mp = Geometry::parse("MULTIPOINT(1 2, 3 4)").unwrap();
        assert_eq!(mp.kind(), GeometryKind::MultiPoint);

        let mpoly = Geometry::parse(
            "MULTIPOLYGON(((0 0,1 0,1 1,0 0)),((10 10,11 10,11 11,10 10)))",
        )
        .unwrap();
        assert_eq!(mpoly.envelope(), Envelope::new(0.0, 0.0, 11.0, 11.0));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(Geometry::parse(""), Err(WktError::Syntax(_))));
        assert!(matches!(Geometry::parse("CIRCLE(1 2)"), Err(WktError::Syntax(_))));
        assert!(matches!(Geometry::parse("POINT(1)"), Err(WktError::Syntax(_))));
        assert_eq!(
            Geometry::parse("POLYGON((0 0, 1 1))"),
            Err(WktError::TooFewPoints(GeometryKind::Polygon, 4))
        );
        assert_eq!(
            Geometry::parse("POLYGON((0 0, 1 0, 1 1, 0 1))"),
            Err(WktError::OpenRing)
        );
        assert!(Geometry::parse("POINT(1 2) trailing").is_err());
    }

    #[test]
    fn envelopes_intersect_on_touching_edges() {
        let a = Envelope::new(0.0, 0.0, 1.0, 1.0);
        let b = Envelope::new(1.0, 1.0, 2.0, 2.0);
        let c = Envelope::new(1.5, 1.5, 2.0, 2.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn expanding_by_radius_widens_every_side() {
        let env = Envelope::new(7.0, 51.0, 8.0, 52.0).expand_km(111.32);
        assert!((env.min_y - 50.0).abs() < 1e-9);
        assert!((env.max_y - 53.0).abs() < 1e-9);
        assert!(env.min_x < 6.0);
        assert!(env.max_x > 9.0);
    }

    #[test]
    fn envelope_renders_as_closed_polygon() {
        let wkt = Envelope::new(1.0, 2.0, 3.5, 4.0).to_wkt();
        assert_eq!(wkt, "POLYGON((1 2,3.5 2,3.5 4,1 4,1 2))");
        let parsed = Geometry::parse(&wkt).unwrap();
        assert_eq!(parsed.envelope(), Envelope::new(1.0, 2.0, 3.5, 4.0));
    }
}
