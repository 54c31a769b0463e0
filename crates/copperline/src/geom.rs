use anyhow::{anyhow, Result};
use clipper2::{inflate, EndType, JoinType, Path as ClipPath, PathType, Polygon as ClipPolygon, Polygons, Vertex};
use geo::{BooleanOps, BoundingRect, Coord, Intersects, LineString, MultiPolygon, Polygon, Rect};
use kurbo::Point;

/// All board geometry is carried as a `geo` multipolygon in millimeters.
pub type Poly = MultiPolygon<f64>;

/// Segment count used when approximating circles.
const CIRCLE_SEGMENTS: usize = 64;

pub fn empty() -> Poly {
    MultiPolygon::new(Vec::new())
}

fn coord(p: Point) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

/// Build a polygon from an ordered list of boundary points. The ring is
/// closed implicitly and the result is self-repaired.
pub fn from_ring(points: &[Point]) -> Result<Poly> {
    if points.len() < 3 {
        return Err(anyhow!("polygon ring needs at least 3 points, got {}", points.len()));
    }
    let ring: LineString<f64> = points.iter().map(|p| coord(*p)).collect();
    Ok(repair(&MultiPolygon::new(vec![Polygon::new(ring, vec![])])))
}

/// A circle approximated by a regular 64-gon.
pub fn disc(center: Point, r: f64) -> Poly {
    let pts: Vec<Coord<f64>> = (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let a = 2.0 * std::f64::consts::PI * (i as f64) / (CIRCLE_SEGMENTS as f64);
            Coord {
                x: center.x + r * a.cos(),
                y: center.y + r * a.sin(),
            }
        })
        .collect();
    MultiPolygon::new(vec![Polygon::new(LineString::new(pts), vec![])])
}

/// Axis-aligned rectangle polygon.
pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Poly {
    let ring = LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]);
    MultiPolygon::new(vec![Polygon::new(ring, vec![])])
}

/// Stroke an open path with the given width: the union of one capsule per
/// segment (an oriented rectangle plus discs at both ends).
pub fn stroke(path: &[Point], width: f64) -> Result<Poly> {
    if path.len() < 2 {
        return Err(anyhow!("stroke needs at least 2 points, got {}", path.len()));
    }
    let r = width / 2.0;
    let mut out = disc(path[0], r);
    for pair in path.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        out = union(&out, &disc(b, r));
        let d = b - a;
        let len = d.hypot();
        if len < 1e-12 {
            continue;
        }
        // Unit normal of the segment, scaled to the half width.
        let (nx, ny) = (-d.y / len * r, d.x / len * r);
        let quad = [
            Point::new(a.x + nx, a.y + ny),
            Point::new(b.x + nx, b.y + ny),
            Point::new(b.x - nx, b.y - ny),
            Point::new(a.x - nx, a.y - ny),
        ];
        let ring: LineString<f64> = quad.iter().map(|p| coord(*p)).collect();
        let seg = MultiPolygon::new(vec![Polygon::new(ring, vec![])]);
        out = union(&out, &seg);
    }
    Ok(out)
}

/// Stroke a closed outline: the path is closed back to its first point first.
pub fn ring_stroke(path: &[Point], width: f64) -> Result<Poly> {
    if path.len() < 3 {
        return Err(anyhow!("outline stroke needs at least 3 points, got {}", path.len()));
    }
    let mut closed = path.to_vec();
    closed.push(path[0]);
    stroke(&closed, width)
}

pub fn union(a: &Poly, b: &Poly) -> Poly {
    a.union(b)
}

pub fn union_all<I>(polys: I) -> Poly
where
    I: IntoIterator<Item = Poly>,
{
    let mut out = empty();
    for p in polys {
        out = out.union(&p);
    }
    out
}

pub fn difference(a: &Poly, b: &Poly) -> Poly {
    a.difference(b)
}

pub fn intersection(a: &Poly, b: &Poly) -> Poly {
    a.intersection(b)
}

pub fn intersects(a: &Poly, b: &Poly) -> bool {
    a.intersects(b)
}

/// Ramer-Douglas-Peucker vertex reduction.
pub fn simplify(p: &Poly, eps: f64) -> Poly {
    use geo::Simplify;
    p.simplify(&eps)
}

pub fn bounds(p: &Poly) -> Option<Rect<f64>> {
    p.bounding_rect()
}

/// Zero-width self-union. Every polygon entering a layer goes through this so
/// that later set operations see well-formed input.
pub fn repair(p: &Poly) -> Poly {
    p.union(&empty())
}

/// Offset (grow for positive `delta`, shrink for negative) through clipper2.
pub fn buffer(p: &Poly, delta: f64) -> Poly {
    if p.0.is_empty() {
        return empty();
    }
    let inflated = inflate(
        to_clipper(p, true),
        delta,
        JoinType::Round,
        EndType::ClosedPolygon,
        2.0,  // miter limit, unused for round joins
        0.25, // arc tolerance
    );
    from_clipper(&inflated)
}

fn ring_to_path(ring: &LineString<f64>) -> ClipPath {
    let mut pts: Vec<(f64, f64)> = ring.coords().map(|c| (c.x, c.y)).collect();
    // clipper paths are implicitly closed
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    let vertices: Vec<Vertex> = pts.iter().map(|(x, y)| Vertex::new(*x, *y)).collect();
    ClipPath::new(vertices, true)
}

fn to_clipper(p: &Poly, subject: bool) -> Polygons {
    let polygons: Vec<ClipPolygon> = p
        .0
        .iter()
        .map(|poly| {
            let mut paths = vec![ring_to_path(poly.exterior())];
            for hole in poly.interiors() {
                paths.push(ring_to_path(hole));
            }
            let path_type = if subject { PathType::Subject } else { PathType::Clip };
            ClipPolygon::new(paths, path_type)
        })
        .collect();
    Polygons::new(polygons)
}

fn signed_area(pts: &[(f64, f64)]) -> f64 {
    let n = pts.len();
    let mut a = 0.0;
    for i in 0..n {
        let (x0, y0) = pts[i];
        let (x1, y1) = pts[(i + 1) % n];
        a += x0 * y1 - x1 * y0;
    }
    a / 2.0
}

fn point_in_ring(point: (f64, f64), ring: &[(f64, f64)]) -> bool {
    let (x, y) = point;
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        let crosses = ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi);
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Rebuild a geo multipolygon from clipper output. Rings are classified by
/// signed area and holes are matched to the outer that contains them.
fn from_clipper(polys: &Polygons) -> Poly {
    let mut outers: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut holes: Vec<Vec<(f64, f64)>> = Vec::new();

    for cpoly in polys.polygons() {
        for path in cpoly.paths() {
            let pts: Vec<(f64, f64)> = path.vertices().iter().map(|v| (v.x(), v.y())).collect();
            if pts.len() < 3 {
                continue;
            }
            if signed_area(&pts) > 0.0 {
                outers.push(pts);
            } else {
                holes.push(pts);
            }
        }
    }

    let mut out: Vec<Polygon<f64>> = Vec::new();
    for outer in outers {
        let mut my_holes: Vec<LineString<f64>> = Vec::new();
        let mut i = 0;
        while i < holes.len() {
            if point_in_ring(holes[i][0], &outer) {
                let hole = holes.remove(i);
                my_holes.push(LineString::from(hole));
            } else {
                i += 1;
            }
        }
        out.push(Polygon::new(LineString::from(outer), my_holes));
    }
    MultiPolygon::new(out)
}
