//! Construction-time error conditions. Once `Driver::run` is underway, the
//! hill-climbing loop cannot fail -- invariant violations, projection
//! failures, and acceptance rejections are all non-error control flow
//! handled by rolling back the offending local move.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("mesh has no live triangles")]
    EmptyMesh,

    #[error("invalid options: {reason}")]
    InvalidOptions { reason: String },
}
