//! Planar geometry primitives: half-planes, clipping, intersections and hulls.

use crate::Position;

/// Polygon as an ordered vertex ring without a closing duplicate.
pub type Polygon = Vec<Position>;

/// Tolerance for half-plane membership. Bisector coefficients come from
/// subtracted site coordinates and carry rounding error.
pub const HALF_PLANE_EPSILON: f64 = 1e-10;

/// Denominators below this are treated as parallel.
const PARALLEL_EPSILON: f64 = 1e-12;

/// `{(x, y) : a*x + b*y + c <= 0}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfPlane {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl HalfPlane {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Half-plane of points at least as close to `s` as to `t` (Euclidean).
    pub fn bisector(s: &Position, t: &Position) -> Self {
        let dx = t.x - s.x;
        let dy = t.y - s.y;
        let mid_x = (s.x + t.x) * 0.5;
        let mid_y = (s.y + t.y) * 0.5;
        let plane = HalfPlane::new(dx, dy, -(dx * mid_x + dy * mid_y));
        if plane.eval(s) > 0.0 {
            plane.flipped()
        } else {
            plane
        }
    }

    #[inline]
    pub fn eval(&self, p: &Position) -> f64 {
        self.a * p.x + self.b * p.y + self.c
    }

    pub fn flipped(&self) -> Self {
        HalfPlane::new(-self.a, -self.b, -self.c)
    }

    /// Where the segment `p -> q` meets the boundary line, if it is not parallel.
    fn boundary_crossing(&self, p: &Position, q: &Position) -> Option<Position> {
        let dx = q.x - p.x;
        let dy = q.y - p.y;
        let denom = self.a * dx + self.b * dy;
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = -self.eval(p) / denom;
        Some(Position::new(p.x + t * dx, p.y + t * dy))
    }
}

pub fn point_in_half_plane(point: &Position, half_plane: &HalfPlane, epsilon: f64) -> bool {
    half_plane.eval(point) <= epsilon
}

/// Sutherland–Hodgman clip of `polygon` against one half-plane.
///
/// Returns a new ring; fewer than 3 vertices means the result is empty. Edges
/// parallel to the boundary contribute no intersection point.
pub fn clip_polygon_with_half_plane(polygon: &[Position], half_plane: &HalfPlane) -> Polygon {
    let n = polygon.len();
    let mut out = Vec::with_capacity(n + 1);
    if n == 0 {
        return out;
    }

    for i in 0..n {
        let cur = &polygon[i];
        let next = &polygon[(i + 1) % n];
        let cur_in = point_in_half_plane(cur, half_plane, HALF_PLANE_EPSILON);
        let next_in = point_in_half_plane(next, half_plane, HALF_PLANE_EPSILON);

        if cur_in {
            out.push(*cur);
        }
        if cur_in != next_in {
            if let Some(p) = half_plane.boundary_crossing(cur, next) {
                out.push(p);
            }
        }
    }

    dedup_ring(&mut out);
    out
}

/// Drop consecutive coincident vertices, including the wrap-around pair.
fn dedup_ring(ring: &mut Polygon) {
    const EPS: f64 = 1e-12;
    ring.dedup_by(|b, a| (a.x - b.x).abs() <= EPS && (a.y - b.y).abs() <= EPS);
    while ring.len() > 1 {
        let first = ring[0];
        let last = ring[ring.len() - 1];
        if (first.x - last.x).abs() <= EPS && (first.y - last.y).abs() <= EPS {
            ring.pop();
        } else {
            break;
        }
    }
}

/// Intersection of the infinite lines through `p1-p2` and `q1-q2`.
pub fn line_intersection(
    p1: &Position,
    p2: &Position,
    q1: &Position,
    q2: &Position,
) -> Option<Position> {
    let (t, _) = line_params(p1, p2, q1, q2)?;
    Some(Position::new(p1.x + t * (p2.x - p1.x), p1.y + t * (p2.y - p1.y)))
}

/// Intersection of the closed segments `p1-p2` and `q1-q2`.
pub fn segment_intersection(
    p1: &Position,
    p2: &Position,
    q1: &Position,
    q2: &Position,
) -> Option<Position> {
    let (t, u) = line_params(p1, p2, q1, q2)?;
    let range = -PARALLEL_EPSILON..=1.0 + PARALLEL_EPSILON;
    if range.contains(&t) && range.contains(&u) {
        Some(Position::new(p1.x + t * (p2.x - p1.x), p1.y + t * (p2.y - p1.y)))
    } else {
        None
    }
}

fn line_params(p1: &Position, p2: &Position, q1: &Position, q2: &Position) -> Option<(f64, f64)> {
    let rx = p2.x - p1.x;
    let ry = p2.y - p1.y;
    let sx = q2.x - q1.x;
    let sy = q2.y - q1.y;
    let denom = rx * sy - ry * sx;
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }
    let qpx = q1.x - p1.x;
    let qpy = q1.y - p1.y;
    let t = (qpx * sy - qpy * sx) / denom;
    let u = (qpx * ry - qpy * rx) / denom;
    Some((t, u))
}

#[inline]
fn cross(o: &Position, a: &Position, b: &Position) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Monotone-chain convex hull, counter-clockwise, collinear points dropped.
///
/// Inputs with fewer than 3 points are returned unchanged; callers handle
/// those degenerate regions themselves.
pub fn convex_hull(points: &[Position]) -> Polygon {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

    let mut lower: Vec<Position> = Vec::with_capacity(sorted.len());
    for p in &sorted {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Position> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    // Each chain's last point is the other chain's first.
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Signed shoelace area; positive for counter-clockwise rings.
pub fn polygon_area(polygon: &[Position]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        area += a.x * b.y - b.x * a.y;
    }
    area * 0.5
}

pub fn polygon_centroid(polygon: &[Position]) -> Option<Position> {
    let n = polygon.len();
    if n < 3 {
        return None;
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    let mut area = 0.0;
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        let c = a.x * b.y - b.x * a.y;
        area += c;
        cx += (a.x + b.x) * c;
        cy += (a.y + b.y) * c;
    }
    if area.abs() < 1e-12 {
        return None;
    }
    let factor = 1.0 / (3.0 * area);
    Some(Position::new(cx * factor, cy * factor))
}

/// Even-odd point-in-polygon test. Points exactly on an edge may go either way.
pub fn point_in_polygon(point: &Position, polygon: &[Position]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = &polygon[i];
        let pj = &polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x = pj.x + (point.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if point.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        vec![
            Position::new(0.0, 0.0),
            Position::new(4.0, 0.0),
            Position::new(4.0, 4.0),
            Position::new(0.0, 4.0),
        ]
    }

    #[test]
    fn test_point_in_half_plane_epsilon() {
        // x <= 1
        let hp = HalfPlane::new(1.0, 0.0, -1.0);
        assert!(point_in_half_plane(&Position::new(0.5, 9.0), &hp, HALF_PLANE_EPSILON));
        assert!(point_in_half_plane(&Position::new(1.0 + 1e-12, 0.0), &hp, HALF_PLANE_EPSILON));
        assert!(!point_in_half_plane(&Position::new(1.1, 0.0), &hp, HALF_PLANE_EPSILON));
    }

    #[test]
    fn test_bisector_keeps_own_site() {
        let s = Position::new(1.0, 2.0);
        let t = Position::new(5.0, -3.0);
        let hp = HalfPlane::bisector(&s, &t);
        assert!(hp.eval(&s) < 0.0);
        assert!(hp.eval(&t) > 0.0);
        let mid = Position::new(3.0, -0.5);
        assert!(hp.eval(&mid).abs() < 1e-12);
    }

    #[test]
    fn test_clip_fully_inside_is_unchanged() {
        let poly = square();
        let hp = HalfPlane::new(1.0, 0.0, -10.0); // x <= 10
        assert_eq!(clip_polygon_with_half_plane(&poly, &hp), poly);
    }

    #[test]
    fn test_clip_fully_outside_is_empty() {
        let hp = HalfPlane::new(1.0, 0.0, 10.0); // x <= -10
        assert!(clip_polygon_with_half_plane(&square(), &hp).len() < 3);
    }

    #[test]
    fn test_clip_halves_square() {
        let hp = HalfPlane::new(1.0, 0.0, -2.0); // x <= 2
        let clipped = clip_polygon_with_half_plane(&square(), &hp);
        assert_eq!(clipped.len(), 4);
        assert!((polygon_area(&clipped) - 8.0).abs() < 1e-12);
        assert!(clipped.iter().all(|p| p.x <= 2.0 + 1e-12));
    }

    #[test]
    fn test_clip_through_vertex_has_no_duplicates() {
        // x + y <= 4 passes through (4,0) and (0,4)
        let hp = HalfPlane::new(1.0, 1.0, -4.0);
        let clipped = clip_polygon_with_half_plane(&square(), &hp);
        assert_eq!(clipped.len(), 3);
        assert!((polygon_area(&clipped) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_plane_excludes_everything() {
        // a = b = 0: every vertex evaluates to c > 0
        let hp = HalfPlane::new(0.0, 0.0, 1.0);
        assert!(clip_polygon_with_half_plane(&square(), &hp).is_empty());
    }

    #[test]
    fn test_boundary_crossing_skips_parallel_edge() {
        let hp = HalfPlane::new(1.0, 0.0, -2.0); // x <= 2
        let vertical = (Position::new(3.0, 0.0), Position::new(3.0, 4.0));
        assert!(hp.boundary_crossing(&vertical.0, &vertical.1).is_none());

        let across = hp
            .boundary_crossing(&Position::new(0.0, 1.0), &Position::new(4.0, 3.0))
            .unwrap();
        assert!((across.x - 2.0).abs() < 1e-12 && (across.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_line_and_segment_intersection() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(2.0, 2.0);
        let c = Position::new(0.0, 2.0);
        let d = Position::new(2.0, 0.0);
        let p = segment_intersection(&a, &b, &c, &d).unwrap();
        assert!((p.x - 1.0).abs() < 1e-12 && (p.y - 1.0).abs() < 1e-12);

        let e = Position::new(5.0, 0.0);
        let f = Position::new(6.0, -1.0);
        assert!(segment_intersection(&a, &b, &e, &f).is_none());
        assert!(line_intersection(&a, &b, &e, &f).is_some());

        // parallel
        let g = Position::new(0.0, 1.0);
        let h = Position::new(2.0, 3.0);
        assert!(line_intersection(&a, &b, &g, &h).is_none());
    }

    #[test]
    fn test_convex_hull() {
        let mut points = square();
        points.push(Position::new(2.0, 2.0));
        points.push(Position::new(2.0, 0.0)); // collinear on an edge
        points.push(Position::new(1.0, 3.0));
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!((polygon_area(&hull) - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_convex_hull_small_input_unchanged() {
        let pts = vec![Position::new(1.0, 1.0), Position::new(2.0, 2.0)];
        assert_eq!(convex_hull(&pts), pts);
    }

    #[test]
    fn test_area_centroid_contains() {
        let poly = square();
        assert_eq!(polygon_area(&poly), 16.0);
        let c = polygon_centroid(&poly).unwrap();
        assert!((c.x - 2.0).abs() < 1e-12 && (c.y - 2.0).abs() < 1e-12);
        assert!(point_in_polygon(&Position::new(1.0, 3.0), &poly));
        assert!(!point_in_polygon(&Position::new(5.0, 3.0), &poly));
    }
}
