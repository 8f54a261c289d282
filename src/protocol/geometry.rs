/// MySQL GEOMETRY cells: a 4-byte SRID prefix followed by OGC WKB.
///
/// Undecodable input (short buffer, unknown WKB type) yields `None` rather
/// than an error; a bad geometry poisons one cell, not the frame.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(Vec<Point>),
    Polygon(Vec<Vec<Point>>),
    MultiPoint(Vec<Point>),
    MultiLineString(Vec<Vec<Point>>),
    MultiPolygon(Vec<Vec<Vec<Point>>>),
    Collection(Vec<Geometry>),
}

/// Parse a GEOMETRY cell. The SRID prefix is skipped; the byte-order flag is
/// read per nested geometry, never inherited.
pub fn parse_geometry(data: &[u8]) -> Option<Geometry> {
    if data.len() < 4 {
        return None;
    }
    let (geometry, _rest) = parse_wkb(&data[4..])?;
    Some(geometry)
}

fn parse_wkb(data: &[u8]) -> Option<(Geometry, &[u8])> {
    let (&order, rest) = data.split_first()?;
    let le = order != 0;
    let (wkb_type, mut rest) = read_u32(rest, le)?;

    match wkb_type {
        1 => {
            let (point, rest) = read_point(rest, le)?;
            Some((Geometry::Point(point), rest))
        }
        2 => {
            let (points, rest) = read_point_seq(rest, le)?;
            Some((Geometry::LineString(points), rest))
        }
        3 => {
            let (rings, rest) = read_rings(rest, le)?;
            Some((Geometry::Polygon(rings), rest))
        }
        4 => {
            let (count, r) = read_u32(rest, le)?;
            rest = r;
            let mut points = Vec::with_capacity(count as usize);
            for _ in 0..count {
                // Each member is a full WKB point with its own order flag.
                let (geometry, r) = parse_wkb(rest)?;
                rest = r;
                match geometry {
                    Geometry::Point(p) => points.push(p),
                    _ => return None,
                }
            }
            Some((Geometry::MultiPoint(points), rest))
        }
        5 => {
            let (count, r) = read_u32(rest, le)?;
            rest = r;
            let mut lines = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (geometry, r) = parse_wkb(rest)?;
                rest = r;
                match geometry {
                    Geometry::LineString(l) => lines.push(l),
                    _ => return None,
                }
            }
            Some((Geometry::MultiLineString(lines), rest))
        }
        6 => {
            let (count, r) = read_u32(rest, le)?;
            rest = r;
            let mut polygons = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (geometry, r) = parse_wkb(rest)?;
                rest = r;
                match geometry {
                    Geometry::Polygon(p) => polygons.push(p),
                    _ => return None,
                }
            }
            Some((Geometry::MultiPolygon(polygons), rest))
        }
        7 => {
            let (count, r) = read_u32(rest, le)?;
            rest = r;
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (geometry, r) = parse_wkb(rest)?;
                rest = r;
                members.push(geometry);
            }
            Some((Geometry::Collection(members), rest))
        }
        _ => None,
    }
}

fn read_u32(data: &[u8], le: bool) -> Option<(u32, &[u8])> {
    let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
    let value = if le {
        u32::from_le_bytes(bytes)
    } else {
        u32::from_be_bytes(bytes)
    };
    Some((value, &data[4..]))
}

fn read_f64(data: &[u8], le: bool) -> Option<(f64, &[u8])> {
    let bytes: [u8; 8] = data.get(..8)?.try_into().ok()?;
    let value = if le {
        f64::from_le_bytes(bytes)
    } else {
        f64::from_be_bytes(bytes)
    };
    Some((value, &data[8..]))
}

fn read_point(data: &[u8], le: bool) -> Option<(Point, &[u8])> {
    let (x, rest) = read_f64(data, le)?;
    let (y, rest) = read_f64(rest, le)?;
    Some((Point { x, y }, rest))
}

fn read_point_seq(data: &[u8], le: bool) -> Option<(Vec<Point>, &[u8])> {
    let (count, mut rest) = read_u32(data, le)?;
    let mut points = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (point, r) = read_point(rest, le)?;
        rest = r;
        points.push(point);
    }
    Some((points, rest))
}

fn read_rings(data: &[u8], le: bool) -> Option<(Vec<Vec<Point>>, &[u8])> {
    let (count, mut rest) = read_u32(data, le)?;
    let mut rings = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (ring, r) = read_point_seq(rest, le)?;
        rest = r;
        rings.push(ring);
    }
    Some((rings, rest))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn wkb_point(x: f64, y: f64, le: bool) -> Vec<u8> {
        let mut out = vec![le as u8];
        if le {
            out.extend_from_slice(&1_u32.to_le_bytes());
            out.extend_from_slice(&x.to_le_bytes());
            out.extend_from_slice(&y.to_le_bytes());
        } else {
            out.extend_from_slice(&1_u32.to_be_bytes());
            out.extend_from_slice(&x.to_be_bytes());
            out.extend_from_slice(&y.to_be_bytes());
        }
        out
    }

    fn with_srid(wkb: Vec<u8>) -> Vec<u8> {
        let mut out = 0_u32.to_le_bytes().to_vec();
        out.extend_from_slice(&wkb);
        out
    }

    #[test]
    fn test_point() {
        let data = with_srid(wkb_point(1.5, -2.5, true));
        assert_eq!(
            parse_geometry(&data),
            Some(Geometry::Point(Point { x: 1.5, y: -2.5 }))
        );
    }

    #[test]
    fn test_big_endian_point() {
        let data = with_srid(wkb_point(3.0, 4.0, false));
        assert_eq!(
            parse_geometry(&data),
            Some(Geometry::Point(Point { x: 3.0, y: 4.0 }))
        );
    }

    #[test]
    fn test_linestring() {
        let mut wkb = vec![1_u8];
        wkb.extend_from_slice(&2_u32.to_le_bytes());
        wkb.extend_from_slice(&2_u32.to_le_bytes());
        for v in [0.0_f64, 0.0, 1.0, 1.0] {
            wkb.extend_from_slice(&v.to_le_bytes());
        }
        let data = with_srid(wkb);
        assert_eq!(
            parse_geometry(&data),
            Some(Geometry::LineString(vec![
                Point { x: 0.0, y: 0.0 },
                Point { x: 1.0, y: 1.0 },
            ]))
        );
    }

    #[test]
    fn test_collection_mixed_byte_order() {
        let mut wkb = vec![1_u8];
        wkb.extend_from_slice(&7_u32.to_le_bytes());
        wkb.extend_from_slice(&2_u32.to_le_bytes());
        wkb.extend_from_slice(&wkb_point(1.0, 2.0, true));
        wkb.extend_from_slice(&wkb_point(3.0, 4.0, false));
        let data = with_srid(wkb);
        assert_eq!(
            parse_geometry(&data),
            Some(Geometry::Collection(vec![
                Geometry::Point(Point { x: 1.0, y: 2.0 }),
                Geometry::Point(Point { x: 3.0, y: 4.0 }),
            ]))
        );
    }

    #[test]
    fn test_undecodable_input() {
        assert_eq!(parse_geometry(&[]), None);
        assert_eq!(parse_geometry(&[0, 0, 0]), None);

        // Unknown WKB type 99
        let mut wkb = vec![1_u8];
        wkb.extend_from_slice(&99_u32.to_le_bytes());
        assert_eq!(parse_geometry(&with_srid(wkb)), None);
    }
}
