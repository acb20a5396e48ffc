//! Geometry value types for calibration meshes
//!
//! Points and triangles are plain `Copy` values. A triangle keeps its vertex
//! order (A, B, C) exactly as given; the correspondence between a source and a
//! destination triangle is by vertex index only.

use serde::{Deserialize, Serialize};

use crate::error::DegenerateReason;

/// A 2D point in either source or destination space
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance_to(&self, other: Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Point2D> for (f64, f64) {
    fn from(p: Point2D) -> Self {
        (p.x, p.y)
    }
}

/// Three ordered vertices
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Triangle {
    pub a: Point2D,
    pub b: Point2D,
    pub c: Point2D,
}

impl Triangle {
    pub const fn new(a: Point2D, b: Point2D, c: Point2D) -> Self {
        Self { a, b, c }
    }

    pub fn vertices(&self) -> [Point2D; 3] {
        [self.a, self.b, self.c]
    }

    /// Signed area, positive when A, B, C turn counter-clockwise in a y-up frame
    pub fn signed_area(&self) -> f64 {
        let abx = self.b.x - self.a.x;
        let aby = self.b.y - self.a.y;
        let acx = self.c.x - self.a.x;
        let acy = self.c.y - self.a.y;
        0.5 * (abx * acy - aby * acx)
    }

    pub fn centroid(&self) -> Point2D {
        Point2D::new(
            (self.a.x + self.b.x + self.c.x) / 3.0,
            (self.a.y + self.b.y + self.c.y) / 3.0,
        )
    }

    /// Check that the triangle spans a real area.
    ///
    /// A triangle whose absolute signed area is `<= epsilon` is treated as
    /// collinear. Non-finite coordinates are always rejected.
    pub fn check_area(&self, epsilon: f64) -> Result<(), DegenerateReason> {
        if !self.vertices().iter().all(Point2D::is_finite) {
            return Err(DegenerateReason::NonFinite);
        }
        let area = self.signed_area();
        if !area.is_finite() || area.abs() <= epsilon {
            return Err(DegenerateReason::Collinear { area });
        }
        Ok(())
    }

    pub fn is_degenerate(&self, epsilon: f64) -> bool {
        self.check_area(epsilon).is_err()
    }

    pub fn longest_edge(&self) -> f64 {
        self.a
            .distance_to(self.b)
            .max(self.b.distance_to(self.c))
            .max(self.c.distance_to(self.a))
    }

    /// Closest point of the filled triangle to `p`.
    ///
    /// Returns `p` itself when it lies inside or on the boundary, otherwise the
    /// orthogonal projection onto the nearest edge, clamped to that segment.
    pub fn closest_point(&self, p: Point2D) -> Point2D {
        let orientation = self.signed_area().signum();
        let inside = [(self.a, self.b), (self.b, self.c), (self.c, self.a)]
            .iter()
            .all(|&(s, e)| orientation * cross(s, e, p) >= 0.0);
        if inside {
            return p;
        }

        [
            closest_on_segment(p, self.a, self.b),
            closest_on_segment(p, self.b, self.c),
            closest_on_segment(p, self.c, self.a),
        ]
        .into_iter()
        .fold((f64::INFINITY, p), |best, q| {
            let d = p.distance_to(q);
            if d < best.0 {
                (d, q)
            } else {
                best
            }
        })
        .1
    }
}

/// Z component of `(e - s) x (p - s)`
fn cross(s: Point2D, e: Point2D, p: Point2D) -> f64 {
    (e.x - s.x) * (p.y - s.y) - (e.y - s.y) * (p.x - s.x)
}

fn closest_on_segment(p: Point2D, s: Point2D, e: Point2D) -> Point2D {
    let dx = e.x - s.x;
    let dy = e.y - s.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return s;
    }
    let t = (((p.x - s.x) * dx + (p.y - s.y) * dy) / len_sq).clamp(0.0, 1.0);
    Point2D::new(s.x + t * dx, s.y + t * dy)
}

/// One calibration cell: a source triangle and its destination counterpart
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrianglePair {
    pub source: Triangle,
    pub destination: Triangle,
}

impl TrianglePair {
    pub const fn new(source: Triangle, destination: Triangle) -> Self {
        Self {
            source,
            destination,
        }
    }
}
