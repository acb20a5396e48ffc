//! Barycentric solving against a single triangle
//!
//! Given a source triangle with vertices A, B, C and a query point Q, the
//! weights (a, b, c) satisfy
//!
//! ```text
//! a*A.x + b*B.x + c*C.x = Q.x
//! a*A.y + b*B.y + c*C.y = Q.y
//! a + b + c             = 1
//! ```
//!
//! The system is eliminated in closed form, solving `c` first, then `b`, and
//! deriving `a = 1 - b - c`. The same weights applied to a destination
//! triangle give the calibrated point.

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, DegenerateReason};
use crate::geometry::{Point2D, Triangle};

/// Barycentric weights of a point relative to triangle vertices A, B, C
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BarycentricWeights {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl BarycentricWeights {
    /// Build from solved `b` and `c`; `a` is derived so the weights sum to one
    #[inline]
    pub fn from_bc(b: f64, c: f64) -> Self {
        Self { a: 1.0 - b - c, b, c }
    }

    /// True if the point lies inside or on the boundary of the triangle
    #[inline]
    pub fn contains(&self) -> bool {
        self.a >= 0.0 && self.b >= 0.0 && self.c >= 0.0
    }

    pub fn min(&self) -> f64 {
        self.a.min(self.b).min(self.c)
    }

    pub fn sum(&self) -> f64 {
        self.a + self.b + self.c
    }

    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite()
    }

    /// Combine the triangle's vertices with these weights
    #[inline]
    pub fn apply(&self, triangle: &Triangle) -> Point2D {
        Point2D::new(
            self.a * triangle.a.x + self.b * triangle.b.x + self.c * triangle.c.x,
            self.a * triangle.a.y + self.b * triangle.b.y + self.c * triangle.c.y,
        )
    }
}

/// Check that the closed-form elimination has no zero divisor for this triangle.
///
/// `edge_tolerance` is relative: `|B.x - A.x|` and `|B.y - A.y|` must exceed
/// `edge_tolerance` times the longest edge. Pass `0.0` to reject exact zeros
/// only.
pub fn check_solvable(triangle: &Triangle, edge_tolerance: f64) -> Result<(), DegenerateReason> {
    if !triangle.vertices().iter().all(Point2D::is_finite) {
        return Err(DegenerateReason::NonFinite);
    }
    let Triangle { a, b, c } = *triangle;
    let min_delta = edge_tolerance * triangle.longest_edge();

    let dx = b.x - a.x;
    if dx == 0.0 || dx.abs() <= min_delta {
        return Err(DegenerateReason::VerticalBaseEdge);
    }
    let dy = b.y - a.y;
    if dy == 0.0 || dy.abs() <= min_delta {
        return Err(DegenerateReason::HorizontalBaseEdge);
    }

    let denom = (a.x - c.x) / dx - (a.y - c.y) / dy;
    if denom == 0.0 || !denom.is_finite() {
        return Err(DegenerateReason::SingularSystem);
    }
    Ok(())
}

/// Compute the barycentric weights of `query` relative to `src`
pub fn weights(src: &Triangle, query: Point2D) -> Result<BarycentricWeights, CalibrationError> {
    check_solvable(src, 0.0)?;

    let Triangle { a, b, c } = *src;
    let (qx, qy) = (query.x, query.y);

    let wc = ((qy - a.y) / (b.y - a.y) - (qx - a.x) / (b.x - a.x))
        / ((a.x - c.x) / (b.x - a.x) - (a.y - c.y) / (b.y - a.y));
    let wb = (qx - a.x + wc * (a.x - c.x)) / (b.x - a.x);
    let w = BarycentricWeights::from_bc(wb, wc);

    // A finite query against a solvable triangle can still overflow
    if query.is_finite() && !w.is_finite() {
        return Err(DegenerateReason::SingularSystem.into());
    }
    Ok(w)
}

/// Solve `query` against `src` and project it into `dst`.
///
/// Returns the weights and the mapped point whether or not the query lies
/// inside `src`; use [`BarycentricWeights::contains`] to decide.
pub fn solve(
    src: &Triangle,
    dst: &Triangle,
    query: Point2D,
) -> Result<(BarycentricWeights, Point2D), CalibrationError> {
    let w = weights(src, query)?;
    Ok((w, w.apply(dst)))
}
