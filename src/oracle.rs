//! The geometry-domain and size-field oracles the optimizer borrows
//! read-only. Both are external collaborators per spec: the core never
//! constructs a domain description or a sizing function itself.

use crate::common::*;

/// Closest-point projection onto the geometric domain.
pub trait Geom<const D: usize> {
    /// Project `point` onto the constraint surface in place. `origin` is a
    /// reference location used to disambiguate multi-sheeted surfaces
    /// (e.g. pick the sheet nearest `origin`). Identity when unconstrained.
    fn project(&self, origin: &Point<D>, point: &mut Point<D>);
}

/// A domain with no constraint: `project` is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconstrainedGeom;

impl<const D: usize> Geom<D> for UnconstrainedGeom {
    fn project(&self, _origin: &Point<D>, _point: &mut Point<D>) {}
}

/// Target edge length field.
pub trait Hfun<const D: usize> {
    fn eval(&self, point: &Point<D>) -> f64;
}

/// A uniform sizing field returning the same target length everywhere.
#[derive(Debug, Clone, Copy)]
pub struct UniformHfun(pub f64);

impl<const D: usize> Hfun<D> for UniformHfun {
    fn eval(&self, _point: &Point<D>) -> f64 {
        self.0
    }
}
