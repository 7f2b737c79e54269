//! The outer hill-climbing loop: per-iteration smoothing subpasses, a
//! zip/divide pass, and a flip pass, repeated under a ramped quality
//! target until the working set empties or a whole iteration is a no-op.

use log::{debug, info};
use rand::Rng;

use crate::error::OptimizeError;
use crate::flip::{flip_mesh, flip_sign};
use crate::log_sink::{format_counters, LogSink, LOG_HEADER};
use crate::marker::Marker;
use crate::mesh::Mesh;
use crate::oracle::{Geom, Hfun};
use crate::pred::Pred;
use crate::smooth::move_node_pass;
use crate::topo::try_zip_div_at_node;

/// Driver options. `qlim` is the final (maximum) quality target; the
/// driver ramps up to it over the first 5 iterations rather than
/// demanding it immediately.
#[derive(Debug, Clone)]
pub struct IterOpts {
    /// Number of outer iterations to run.
    pub iter: usize,
    /// Final quality target in `(0, 1]`.
    pub qlim: f64,
    /// Relative tolerance passed to every `move_okay` call.
    pub qtol: f64,
    /// Whether edge collapse is attempted.
    pub zip_enabled: bool,
    /// Whether edge split is attempted.
    pub div_enabled: bool,
    /// `0` = silent, `1` = header + per-iteration counters.
    pub verb: u8,
}

impl Default for IterOpts {
    fn default() -> Self {
        IterOpts {
            iter: 8,
            qlim: 0.95,
            qtol: 1.0e-4,
            zip_enabled: true,
            div_enabled: true,
            verb: 1,
        }
    }
}

impl IterOpts {
    fn validate(&self) -> Result<(), OptimizeError> {
        if !(self.qlim > 0.0 && self.qlim <= 1.0) {
            return Err(OptimizeError::InvalidOptions {
                reason: format!("qlim must be in (0, 1], got {}", self.qlim),
            });
        }
        if self.qtol <= 0.0 {
            return Err(OptimizeError::InvalidOptions {
                reason: format!("qtol must be positive, got {}", self.qtol),
            });
        }
        Ok(())
    }
}

/// Counters from the run, for the caller to inspect (and for the log
/// lines emitted through the `LogSink`).
#[derive(Debug, Clone, Copy, Default)]
pub struct IterStats {
    pub iterations_run: usize,
    pub nmov: usize,
    pub nflp: usize,
    pub nzip: usize,
    pub ndiv: usize,
}

/// Stamp boundary markers: any edge that is a `self` (feature) edge, or
/// isn't shared by exactly two live triangles, freezes itself and both
/// its endpoint nodes. Everything else starts at generation `0`.
fn init_mark<const D: usize, M: Mesh<D>>(
    mesh: &M,
    nmrk: &mut Vec<Marker>,
    emrk: &mut Vec<Marker>,
    tmrk: &mut Vec<Marker>,
) {
    nmrk.clear();
    nmrk.resize(mesh.node_count(), Marker::default());
    emrk.clear();
    emrk.resize(mesh.edge_count(), Marker::default());
    tmrk.clear();
    tmrk.resize(mesh.tri_count(), Marker::default());

    let mut tset = Vec::new();
    for e in 0..mesh.edge_count() {
        let edge = mesh.edge(e);
        if !edge.is_live() {
            continue;
        }
        tset.clear();
        mesh.edge_tri3(edge.nodes, &mut tset);
        if edge.is_self || tset.len() != 2 {
            emrk[e] = Marker::Frozen;
            nmrk[edge.nodes[0]] = Marker::Frozen;
            nmrk[edge.nodes[1]] = Marker::Frozen;
        }
    }
}

/// Grow the marker arrays to match the mesh's current entity counts,
/// filling newly-created slots (from splits/collapses in the previous
/// iteration) with `Marker::Gen(flag)`. Existing entries -- including
/// `Frozen` boundary markers -- are left untouched.
fn grow_mark(nmrk: &mut Vec<Marker>, emrk: &mut Vec<Marker>, tmrk: &mut Vec<Marker>, node_count: usize, edge_count: usize, tri_count: usize, flag: i64) {
    nmrk.resize(node_count, Marker::Gen(flag));
    emrk.resize(edge_count, Marker::Gen(flag));
    tmrk.resize(tri_count, Marker::Gen(flag));
}

/// Run the hill-climbing optimizer against `mesh` in place.
///
/// `geom` projects onto the constraint domain, `hfun` supplies the target
/// edge length field, `pred` scores triangle quality, and `rng` drives
/// every randomized choice (shuffle order, flip coin-flips, zip/divide
/// visit direction) -- callers after reproducible runs should seed it
/// deterministically.
#[allow(clippy::too_many_arguments)]
pub fn iter_mesh<const D: usize, M, G, H, P, R, L>(
    geom: &G,
    mesh: &mut M,
    hfun: &H,
    pred: &P,
    opts: &IterOpts,
    rng: &mut R,
    sink: &mut L,
) -> Result<IterStats, OptimizeError>
where
    M: Mesh<D>,
    G: Geom<D>,
    H: Hfun<D>,
    P: Pred<D>,
    R: Rng,
    L: LogSink,
{
    opts.validate()?;
    if mesh.tri_count() == 0 {
        return Err(OptimizeError::EmptyMesh);
    }

    let mut nmrk = Vec::new();
    let mut emrk = Vec::new();
    let mut tmrk = Vec::new();
    init_mark(mesh, &mut nmrk, &mut emrk, &mut tmrk);

    flip_sign(mesh, pred);

    if opts.verb > 0 {
        sink.push(LOG_HEADER);
    }

    let qmax = opts.qlim;
    let qmin = 0.75 * qmax;
    let qinc = (qmax - qmin) / 5.0;

    let mut stats = IterStats::default();

    for iter in 1..=opts.iter {
        let iout = iter as i64;
        grow_mark(
            &mut nmrk,
            &mut emrk,
            &mut tmrk,
            mesh.node_count(),
            mesh.edge_count(),
            mesh.tri_count(),
            iout - 1,
        );

        let good = (qmin + iout as f64 * qinc).min(qmax);

        let mut nset: Vec<usize> = Vec::new();
        let nsub = (iter).clamp(2, 8);

        let mut nmov = 0usize;
        for isub in 0..nsub {
            nmov += move_node_pass(
                geom, mesh, hfun, pred, &mut nset, &mut nmrk, iout, isub, good, opts.qtol, rng,
            );
        }

        let mut ndiv = 0usize;
        let mut nzip = 0usize;
        for &i in nset.iter() {
            if !mesh.node(i).is_live() || nmrk[i].is_frozen() {
                continue;
            }
            let (divided, zipped) = try_zip_div_at_node(
                geom, mesh, hfun, pred, i, &nmrk, &mut emrk, iout, opts.div_enabled, opts.zip_enabled, rng,
            );
            if divided {
                ndiv += 1;
            }
            if zipped {
                nzip += 1;
            }
        }

        let nflp = flip_mesh(mesh, pred, rng, &nset);

        stats.iterations_run = iter;
        stats.nmov = nmov;
        stats.nflp = nflp;
        stats.nzip = nzip;
        stats.ndiv = ndiv;

        if opts.verb > 0 {
            sink.push(&format_counters(nmov, nflp, nzip, ndiv));
        }
        debug!(
            "iter {iter}: good={good:.4} nmov={nmov} nflp={nflp} nzip={nzip} ndiv={ndiv}"
        );

        if nset.is_empty() || (nmov == 0 && nflp == 0 && nzip == 0 && ndiv == 0) {
            break;
        }
    }

    info!(
        "iter_mesh finished after {} iterations ({} nodes, {} triangles live)",
        stats.iterations_run,
        mesh.node_count(),
        mesh.tri_count()
    );

    Ok(stats)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::Point2;
    use crate::log_sink::StringLogSink;
    use crate::mesh::SimpleMesh;
    use crate::oracle::{UnconstrainedGeom, UniformHfun};
    use crate::pred::Pred2D;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn hex_fan() -> SimpleMesh<2> {
        let mut m = SimpleMesh::<2>::new();
        let center = m.add_node(Point2::new(0.0, 0.0));
        let mut rim = Vec::new();
        for k in 0..6 {
            let theta = std::f64::consts::PI / 3.0 * k as f64;
            rim.push(m.add_node(Point2::new(theta.cos(), theta.sin())));
        }
        for k in 0..6 {
            let a = rim[k];
            let b = rim[(k + 1) % 6];
            m.add_tri(center, a, b);
            m.add_edge(a, b, true);
        }
        m
    }

    #[test]
    fn rejects_empty_mesh() {
        let mut mesh = SimpleMesh::<2>::new();
        let geom = UnconstrainedGeom;
        let hfun = UniformHfun(1.0);
        let pred = Pred2D;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut sink = StringLogSink::default();
        let opts = IterOpts::default();

        let err = iter_mesh(&geom, &mut mesh, &hfun, &pred, &opts, &mut rng, &mut sink).unwrap_err();
        assert!(matches!(err, OptimizeError::EmptyMesh));
    }

    #[test]
    fn rejects_invalid_qlim() {
        let mut mesh = hex_fan();
        let geom = UnconstrainedGeom;
        let hfun = UniformHfun(1.0);
        let pred = Pred2D;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut sink = StringLogSink::default();
        let opts = IterOpts {
            qlim: 1.5,
            ..IterOpts::default()
        };

        let err = iter_mesh(&geom, &mut mesh, &hfun, &pred, &opts, &mut rng, &mut sink).unwrap_err();
        assert!(matches!(err, OptimizeError::InvalidOptions { .. }));
    }

    #[test]
    fn equilateral_fan_is_left_alone() {
        let _ = env_logger::try_init();
        let mut mesh = hex_fan();
        let geom = UnconstrainedGeom;
        let hfun = UniformHfun(1.0);
        let pred = Pred2D;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut sink = StringLogSink::default();
        let opts = IterOpts {
            iter: 3,
            ..IterOpts::default()
        };

        let stats = iter_mesh(&geom, &mut mesh, &hfun, &pred, &opts, &mut rng, &mut sink).unwrap();
        assert_eq!(stats.nmov, 0);
        assert_eq!(stats.nflp, 0);
        assert!(!sink.lines.is_empty());
        assert_eq!(sink.lines[0], LOG_HEADER);
    }
}
