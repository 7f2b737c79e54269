//! Predicate adapter: wraps the geometry primitives to produce the signed
//! per-triangle cost and squared displacement length the optimizer uses as
//! its objective, for a chosen embedding dimension.

use crate::common::*;
use crate::geometry;

/// The objective and distance functions the optimizer evaluates moves
/// against. `cost` ranges over `(-inf, 1]`, with `1` the ideal
/// (equilateral) score; `lsqr` is the squared Euclidean length of a
/// displacement in the working dimension.
pub trait Pred<const D: usize> {
    fn cost(&self, p1: &Point<D>, p2: &Point<D>, p3: &Point<D>) -> f64;
    fn lsqr(&self, v: &Point<D>) -> f64 {
        v.norm_squared()
    }
}

/// [`Pred`] for a planar mesh embedded in R^2.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pred2D;

impl Pred<2> for Pred2D {
    fn cost(&self, p1: &Point2, p2: &Point2, p3: &Point2) -> f64 {
        geometry::tria_quality_2d(p1, p2, p3)
    }
}

/// [`Pred`] for a surface mesh embedded in R^3.
///
/// Because [`geometry::tria_area_3d`] is unsigned, this cost is never
/// negative on its own; `flip_sign`'s winding-consistency pass is what
/// gives the invariant "every live triangle has non-negative cost" real
/// content for a 3D mesh, by flipping any triangle whose stored node
/// order disagrees with its neighbors' into agreement.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pred3D;

impl Pred<3> for Pred3D {
    fn cost(&self, p1: &Point3, p2: &Point3, p3: &Point3) -> f64 {
        geometry::tria_quality_3d(p1, p2, p3)
    }
}
