//! Hill-climbing local optimization of 2D simplicial surface meshes
//! embedded in R^2 or R^3: node smoothing, 2-2 edge flip, edge collapse,
//! and edge split, each gated by a strict-improvement acceptance rule
//! over a neighborhood quality vector.
//!
//! The optimizer is generic over four collaborator traits ([`Mesh`],
//! [`Geom`], [`Hfun`], [`Pred`]) so callers plug in their own mesh
//! container, geometric domain, sizing field, and quality metric; the
//! driver ([`iter_mesh`]) never assumes a concrete representation for any
//! of them. [`mesh::SimpleMesh`] and the `*2D`/`*3D` [`Pred`] impls are
//! reference implementations for tests and small meshes.

mod accept;
mod common;
mod error;
mod flip;
mod geometry;
mod log_sink;
mod marker;
mod mesh;
mod oracle;
mod pred;
mod smooth;
mod topo;

pub mod driver;

pub use accept::{loop_cost, move_okay};
pub use common::{Point, Point2, Point3};
pub use error::OptimizeError;
pub use flip::{flip_mesh, flip_sign, flip_tria, FLIP_GOOD, FLIP_QTOL};
pub use geometry::{
    tetra_quality_3d, tetra_vol_3d, tria_area_2d, tria_area_3d, tria_norm_3d, tria_quality_2d,
    tria_quality_3d,
};
pub use log_sink::{format_counters, LogSink, StringLogSink, LOG_HEADER};
pub use marker::Marker;
pub use mesh::{face_node, Edge, Mesh, Node, SimpleMesh, Tri, TRI3_FACE_NODE};
pub use oracle::{Geom, Hfun, UnconstrainedGeom, UniformHfun};
pub use pred::{Pred, Pred2D, Pred3D};
pub use smooth::{move_node_pass, move_node_trial};
pub use topo::{div_edge, try_zip_div_at_node, zip_edge, DEG_MAX, DEG_MIN};

pub use driver::{iter_mesh, IterOpts, IterStats};
