pub use nalgebra as na;
pub use na::SVector;

/// A point (or displacement) in the working embedding dimension.
pub type Point<const D: usize> = SVector<f64, D>;
pub type Point2 = SVector<f64, 2>;
pub type Point3 = SVector<f64, 3>;

pub(crate) const EPS: f64 = 1e-9;
pub(crate) const LINE_LENGTH_EPS: f64 = 1e-9;
