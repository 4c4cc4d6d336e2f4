//! Normalization of spatial filter shapes

use crate::error::{SearchError, SearchResult};
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use wkt::{ToWkt, TryFromWkt, Wkt};

const LINEAR_RING: &str = "LINEARRING";
const LINE_STRING: &str = "LINESTRING";

/// Parses WKT, checks the shape kind and removes consecutive duplicate ring vertices.
///
/// Supported shapes are points, linear rings, polygons and multi-polygons.
/// Linear rings are validated for closure but otherwise passed through.
/// Polygon rings must be closed as written and keep at least 4 coordinates
/// once duplicates are removed.
pub fn normalize(wkt: &str) -> SearchResult<String> {
    let trimmed = wkt.trim();

    if let Some(rest) = strip_keyword(trimmed, LINEAR_RING) {
        return normalize_linear_ring(rest);
    }

    let parsed: Wkt<f64> = trimmed
        .parse()
        .map_err(|e| SearchError::shape(format!("invalid WKT '{}': {}", trimmed, e)))?;
    check_rings_closed(&parsed)?;

    let geometry = Geometry::<f64>::try_from(parsed)
        .map_err(|e| SearchError::shape(format!("invalid WKT '{}': {}", trimmed, e)))?;

    let normalized = match geometry {
        Geometry::Point(point) => Geometry::Point(point),
        Geometry::Polygon(polygon) => Geometry::Polygon(normalize_polygon(&polygon)?),
        Geometry::MultiPolygon(multi) => Geometry::MultiPolygon(MultiPolygon::new(
            multi
                .0
                .iter()
                .map(normalize_polygon)
                .collect::<SearchResult<Vec<_>>>()?,
        )),
        other => {
            return Err(SearchError::shape(format!(
                "{} shape is not supported",
                geometry_kind(&other)
            )))
        }
    };

    Ok(normalized.wkt_string())
}

fn strip_keyword<'a>(wkt: &'a str, keyword: &str) -> Option<&'a str> {
    let head = wkt.get(..keyword.len())?;
    if head.eq_ignore_ascii_case(keyword) {
        wkt.get(keyword.len()..)
    } else {
        None
    }
}

fn normalize_linear_ring(body: &str) -> SearchResult<String> {
    let line = LineString::<f64>::try_from_wkt_str(&format!("{}{}", LINE_STRING, body))
        .map_err(|e| SearchError::shape(format!("invalid WKT linear ring: {}", e)))?;

    if line.0.len() < 4 || !line.is_closed() {
        return Err(SearchError::shape(
            "linear ring must be closed and have at least 4 points",
        ));
    }

    let text = line.wkt_string();
    let coordinates = text.get(LINE_STRING.len()..).unwrap_or_default();
    Ok(format!("{}{}", LINEAR_RING, coordinates))
}

/// Polygon rings as written, before conversion closes them
fn check_rings_closed(parsed: &Wkt<f64>) -> SearchResult<()> {
    let polygons = match parsed {
        Wkt::Polygon(polygon) => std::slice::from_ref(polygon),
        Wkt::MultiPolygon(multi) => multi.0.as_slice(),
        _ => return Ok(()),
    };

    for ring in polygons.iter().flat_map(|polygon| &polygon.0) {
        let closed = match (ring.0.first(), ring.0.last()) {
            (Some(first), Some(last)) => first.x == last.x && first.y == last.y,
            _ => false,
        };
        if !closed {
            return Err(SearchError::shape("polygon ring must be closed"));
        }
    }
    Ok(())
}

fn normalize_polygon(polygon: &Polygon<f64>) -> SearchResult<Polygon<f64>> {
    Ok(Polygon::new(
        normalize_ring(polygon.exterior())?,
        polygon
            .interiors()
            .iter()
            .map(normalize_ring)
            .collect::<SearchResult<Vec<_>>>()?,
    ))
}

fn normalize_ring(ring: &LineString<f64>) -> SearchResult<LineString<f64>> {
    let coordinates = dedup_consecutive(&ring.0);
    if coordinates.len() < 4 {
        return Err(SearchError::shape(
            "polygon ring must have at least 4 distinct consecutive points",
        ));
    }
    Ok(LineString::new(coordinates))
}

/// Drops every coordinate equal to its predecessor; order is preserved.
///
/// The first coordinate is always kept, so a closing vertex equal to the
/// first one survives unless it repeats its own predecessor.
pub fn dedup_consecutive(coordinates: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(coordinates.len());
    for coordinate in coordinates {
        if out.last() != Some(coordinate) {
            out.push(*coordinate);
        }
    }
    out
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        _ => "Geometry",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::coord;

    fn parse(wkt: &str) -> Geometry<f64> {
        Geometry::try_from_wkt_str(wkt).unwrap()
    }

    #[test]
    fn test_point_passes_through() {
        let normalized = normalize("POINT(30 10)").unwrap();
        assert_eq!(parse(&normalized), parse("POINT(30 10)"));
    }

    #[test]
    fn test_polygon_consecutive_duplicates_removed() {
        let normalized =
            normalize("POLYGON((30 10, 40 40, 40 40, 40 40, 20 40, 10 20, 30 10))").unwrap();
        assert_eq!(
            parse(&normalized),
            parse("POLYGON((30 10, 40 40, 20 40, 10 20, 30 10))")
        );
    }

    #[test]
    fn test_closing_vertex_is_preserved() {
        let wkt = "POLYGON((30 10, 40 40, 20 40, 10 20, 30 10))";
        let normalized = normalize(wkt).unwrap();
        match parse(&normalized) {
            Geometry::Polygon(polygon) => {
                assert_eq!(polygon.exterior().0.len(), 5);
                assert!(polygon.exterior().is_closed());
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_holes_are_normalized() {
        let normalized = normalize(
            "POLYGON((35 10, 45 45, 15 40, 10 20, 35 10), (20 30, 20 30, 35 35, 30 20, 20 30))",
        )
        .unwrap();
        match parse(&normalized) {
            Geometry::Polygon(polygon) => assert_eq!(polygon.interiors()[0].0.len(), 4),
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_multipolygon_normalized() {
        let normalized = normalize(
            "MULTIPOLYGON(((30 20, 45 40, 45 40, 10 40, 30 20)), ((15 5, 40 10, 10 20, 5 10, 15 5)))",
        )
        .unwrap();
        match parse(&normalized) {
            Geometry::MultiPolygon(multi) => {
                assert_eq!(multi.0[0].exterior().0.len(), 4);
                assert_eq!(multi.0[1].exterior().0.len(), 5);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_linear_ring_supported() {
        let normalized = normalize("LINEARRING(0 0, 1 0, 1 1, 0 0)").unwrap();
        assert!(normalized.starts_with("LINEARRING"));
        assert_eq!(normalize(&normalized).unwrap(), normalized);

        assert!(normalize("LINEARRING(0 0, 1 0, 1 1)").is_err());
    }

    #[test]
    fn test_unsupported_shapes() {
        let err = normalize("LINESTRING(0 0, 1 1)").unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedShape(ref msg) if msg.contains("LineString")));
        assert!(normalize("MULTIPOINT((0 0), (1 1))").is_err());
        assert!(normalize("POLYGON((0 0, 1 1").is_err());
        assert!(normalize("not a shape").is_err());
    }

    #[test]
    fn test_unclosed_polygon_ring_rejected() {
        let err = normalize("POLYGON((0 0, 1 0, 1 1))").unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedShape(_)));

        let err = normalize(
            "MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6)))",
        )
        .unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedShape(_)));
    }

    #[test]
    fn test_collapsed_polygon_ring_rejected() {
        let err = normalize("POLYGON((0 0, 0 0, 0 0, 0 0))").unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedShape(_)));

        let err = normalize("POLYGON((0 0, 1 0, 1 0, 0 0))").unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedShape(_)));

        let err = normalize(
            "POLYGON((35 10, 45 45, 15 40, 10 20, 35 10), (20 30, 20 30, 35 35, 20 30))",
        )
        .unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedShape(_)));
    }

    #[test]
    fn test_dedup_consecutive() {
        let a = coord! { x: 0.0, y: 0.0 };
        let b = coord! { x: 1.0, y: 0.0 };
        let c = coord! { x: 1.0, y: 1.0 };
        assert_eq!(dedup_consecutive(&[a, b, b, b, c, a]), vec![a, b, c, a]);
        assert_eq!(dedup_consecutive(&[a, b, c, a]), vec![a, b, c, a]);
        assert!(dedup_consecutive(&[]).is_empty());
    }
}
