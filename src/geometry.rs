//! Triangle area/volume/normal/quality primitives.
//!
//! These are pure, branch-free functions over `nalgebra` points. Anything
//! named `_2d` ignores all but the first two components of its arguments.

use crate::common::*;

/// 4 * sqrt(3), the normalizing constant for 2D/3D triangle quality.
const TRI_QUALITY_SCALE: f64 = 6.928_203_230_275_509;

/// 6 * sqrt(2), the normalizing constant for tetrahedron quality.
const TETRA_QUALITY_SCALE: f64 = 8.485_281_374_238_571;

/// Signed area of the triangle `(p1, p2, p3)` in the plane.
pub fn tria_area_2d(p1: &Point2, p2: &Point2, p3: &Point2) -> f64 {
    let e12 = p2 - p1;
    let e13 = p3 - p1;
    0.5 * (e12.x * e13.y - e12.y * e13.x)
}

/// Unsigned area of the triangle `(p1, p2, p3)` embedded in R^3.
pub fn tria_area_3d(p1: &Point3, p2: &Point3, p3: &Point3) -> f64 {
    0.5 * tria_norm_3d(p1, p2, p3).norm()
}

/// Unnormalized outward normal of the triangle `(p1, p2, p3)`.
pub fn tria_norm_3d(p1: &Point3, p2: &Point3, p3: &Point3) -> Point3 {
    let e12 = p2 - p1;
    let e13 = p3 - p1;
    e12.cross(&e13)
}

/// Signed volume of the tetrahedron `(p1, p2, p3, p4)`; positive when `p4`
/// lies above the `p1-p2-p3` plane in a right-handed frame.
pub fn tetra_vol_3d(p1: &Point3, p2: &Point3, p3: &Point3, p4: &Point3) -> f64 {
    let e12 = p2 - p1;
    let e13 = p3 - p1;
    let e14 = p4 - p1;
    e12.dot(&e13.cross(&e14)) / 6.0
}

fn lensqr_2d(p1: &Point2, p2: &Point2) -> f64 {
    (p2 - p1).norm_squared()
}

fn lensqr_3d(p1: &Point3, p2: &Point3) -> f64 {
    (p2 - p1).norm_squared()
}

/// `4*sqrt(3) * area / (sum of squared edge lengths)`. Equals `1` for an
/// equilateral triangle, `<= 1` otherwise, and is signed -- a
/// clockwise-wound triangle scores negative.
pub fn tria_quality_2d(p1: &Point2, p2: &Point2, p3: &Point2) -> f64 {
    let elen = lensqr_2d(p1, p2) + lensqr_2d(p2, p3) + lensqr_2d(p3, p1);
    let area = tria_area_2d(p1, p2, p3);
    TRI_QUALITY_SCALE * area / elen
}

/// As [`tria_quality_2d`], but for a triangle embedded in R^3. Since
/// [`tria_area_3d`] is unsigned, orientation must instead be tracked via a
/// separately maintained winding (see `flip_sign`).
pub fn tria_quality_3d(p1: &Point3, p2: &Point3, p3: &Point3) -> f64 {
    let elen = lensqr_3d(p1, p2) + lensqr_3d(p2, p3) + lensqr_3d(p3, p1);
    let area = tria_area_3d(p1, p2, p3);
    TRI_QUALITY_SCALE * area / elen
}

/// Quality of the tetrahedron `(p1, p2, p3, p4)`: `6*sqrt(2) * vol / L^3`
/// where `L` is the root-mean-square edge length. Out of scope for the
/// surface-mesh optimizer (volumetric optimization is a non-goal); kept as
/// a geometry primitive since the source ships it alongside the triangle
/// forms.
pub fn tetra_quality_3d(p1: &Point3, p2: &Point3, p3: &Point3, p4: &Point3) -> f64 {
    let lrms = (lensqr_3d(p1, p2)
        + lensqr_3d(p2, p3)
        + lensqr_3d(p3, p1)
        + lensqr_3d(p1, p4)
        + lensqr_3d(p2, p4)
        + lensqr_3d(p3, p4))
        / 6.0;
    let tvol = tetra_vol_3d(p1, p2, p3, p4);
    TETRA_QUALITY_SCALE * tvol / lrms.powf(1.5)
}
