//! Node smoothing: CVT-like and gradient-ascent displacement generators,
//! line search, and the outer per-iteration smoothing pass.

use rand::Rng;

use crate::accept::{loop_cost, move_okay};
use crate::common::*;
use crate::marker::Marker;
use crate::mesh::Mesh;
use crate::oracle::{Geom, Hfun};
use crate::pred::Pred;

const LINE_SEARCH_ITERS: u32 = 6;
const SHUFFLE_WINDOW: usize = 1024;

/// Weighted average of incident triangle circumcenters, weights from the
/// size field evaluated at each triangle's centroid. Returns the
/// displacement from the node's current position and its length.
fn ccvt_move<const D: usize, M, H>(
    mesh: &M,
    hfun: &H,
    tset: &[usize],
    node: usize,
) -> (Point<D>, f64)
where
    M: Mesh<D>,
    H: Hfun<D>,
{
    let mut accum = Point::<D>::zeros();
    let mut wsum = 0.0;

    for &t in tset {
        let tri = mesh.tri(t);
        let p = [
            mesh.node(tri.nodes[0]).pos,
            mesh.node(tri.nodes[1]).pos,
            mesh.node(tri.nodes[2]).pos,
        ];
        let centroid = (p[0] + p[1] + p[2]) / 3.0;
        let weight = hfun.eval(&centroid).recip().max(0.0);
        accum += centroid * weight;
        wsum += weight;
    }

    let target = if wsum > 0.0 {
        accum / wsum
    } else {
        mesh.node(node).pos
    };

    let line = target - mesh.node(node).pos;
    let llen = line.norm();
    (line, llen)
}

/// Central-difference numerical gradient of the neighborhood min-cost
/// with respect to the node's position, ascending toward higher quality.
fn grad_move<const D: usize, M, P>(
    mesh: &mut M,
    pred: &P,
    tset: &[usize],
    node: usize,
    long: f64,
) -> (Point<D>, f64)
where
    M: Mesh<D>,
    P: Pred<D>,
{
    let h = (long * 1.0e-3).max(1.0e-9);
    let save = mesh.node(node).pos;

    let mut grad = Point::<D>::zeros();
    for d in 0..D {
        let mut plus = save;
        plus[d] += h;
        mesh.node_mut(node).pos = plus;
        let mut cplus = Vec::new();
        let qplus = loop_cost(mesh, pred, tset, &mut cplus);

        let mut minus = save;
        minus[d] -= h;
        mesh.node_mut(node).pos = minus;
        let mut cminus = Vec::new();
        let qminus = loop_cost(mesh, pred, tset, &mut cminus);

        grad[d] = (qplus - qminus) / (2.0 * h);
    }
    mesh.node_mut(node).pos = save;

    let llen = grad.norm();
    (grad, llen)
}

/// Characteristic local edge length at `node`, used to scale the line
/// search and the numerical-gradient step in `grad_move`.
fn local_scale<const D: usize, M: Mesh<D>>(mesh: &M, tset: &[usize], node: usize) -> f64 {
    let p0 = mesh.node(node).pos;
    let mut acc = 0.0;
    let mut n = 0usize;
    for &t in tset {
        for &other in &mesh.tri(t).nodes {
            if other != node {
                acc += (mesh.node(other).pos - p0).norm();
                n += 1;
            }
        }
    }
    if n > 0 {
        acc / n as f64
    } else {
        1.0
    }
}

/// Whether any triangle in `tset` flips orientation sign between `before`
/// and the node's current (post-move) position -- the "do I need to check
/// normals too" resolution from spec.md's Open Questions: a move is
/// rejected if it flips any incident triangle's winding, even if the
/// quality vector alone would have accepted it.
fn any_normal_flip<const D: usize, M, P>(
    mesh: &M,
    pred: &P,
    tset: &[usize],
    node: usize,
    before_costs: &[f64],
) -> bool
where
    M: Mesh<D>,
    P: Pred<D>,
{
    let _ = node;
    for (i, &t) in tset.iter().enumerate() {
        let tri = mesh.tri(t);
        let after = pred.cost(
            &mesh.node(tri.nodes[0]).pos,
            &mesh.node(tri.nodes[1]).pos,
            &mesh.node(tri.nodes[2]).pos,
        );
        let before = before_costs[i];
        if before.signum() != after.signum() && before != 0.0 {
            return true;
        }
    }
    false
}

/// One smoothing trial of `kind` (`1` = CVT, `2` = gradient ascent) for a
/// single node: generate a displacement, line-search along it with
/// geometric projection, accept only under the acceptance predicate.
/// Returns whether the move was committed.
#[allow(clippy::too_many_arguments)]
pub fn move_node_trial<const D: usize, M, G, H, P>(
    geom: &G,
    mesh: &mut M,
    hfun: &H,
    pred: &P,
    tset: &[usize],
    node: usize,
    kind: u8,
    init_cost: &[f64],
    qmin: f64,
    good: f64,
    qtol: f64,
) -> bool
where
    M: Mesh<D>,
    G: Geom<D>,
    H: Hfun<D>,
    P: Pred<D>,
{
    let long = local_scale(mesh, tset, node);

    let (mut line, llen) = if kind == 1 {
        ccvt_move(mesh, hfun, tset, node)
    } else if qmin < good {
        grad_move(mesh, pred, tset, node, long)
    } else {
        return false;
    };

    let xtol = 0.1 * qtol;
    if llen <= long * xtol {
        return false;
    }

    let save = mesh.node(node).pos;
    line /= llen;
    let mut scal = llen * 2.0;

    let mut okay = false;
    for _ in 0..LINE_SEARCH_ITERS {
        let mut trial = save + line * scal;
        geom.project(&save, &mut trial);
        mesh.node_mut(node).pos = trial;

        let mut cost = Vec::new();
        loop_cost(mesh, pred, tset, &mut cost);

        if move_okay(&cost, init_cost, good, qtol)
            && !any_normal_flip(mesh, pred, tset, node, init_cost)
        {
            okay = true;
            break;
        }
        scal *= 0.5;
    }

    if !okay {
        mesh.node_mut(node).pos = save;
    }
    okay
}

/// Build the working node set for subpass `isub` of outer iteration
/// `iout`: subpass 0 seeds from recently-touched nodes and triangles
/// below the quality target; later subpasses expand by one ring along
/// edges from nodes moved in the previous subpass.
#[allow(clippy::too_many_arguments)]
fn build_active_set<const D: usize, M: Mesh<D>>(
    mesh: &M,
    nset: &mut Vec<usize>,
    nmrk: &mut [Marker],
    isub: usize,
    iout: i64,
    good: f64,
    pred_cost: impl Fn(&M, usize) -> f64,
) -> Vec<usize> {
    let mut amrk = vec![-1i64; mesh.node_count()];
    let mut aset = Vec::new();

    if isub == 0 {
        for i in 0..mesh.node_count() {
            if mesh.node(i).is_live() && nmrk[i].at_least(iout - 2) {
                amrk[i] = isub as i64;
                aset.push(i);
            }
        }

        for t in 0..mesh.tri_count() {
            let tri = mesh.tri(t);
            if !tri.is_live() {
                continue;
            }
            let [a, b, c] = tri.nodes;
            if amrk[a] == isub as i64 && amrk[b] == isub as i64 && amrk[c] == isub as i64 {
                continue;
            }
            if pred_cost(mesh, t) <= good {
                for n in [a, b, c] {
                    if amrk[n] != isub as i64 && !nmrk[n].is_frozen() {
                        amrk[n] = isub as i64;
                        aset.push(n);
                        nmrk[n] = Marker::Gen(iout);
                        nset.push(n);
                    }
                }
            }
        }
    } else {
        let mut eset = Vec::new();
        for &n in nset.iter() {
            eset.clear();
            mesh.node_edge(n, &mut eset);
            for &e in &eset {
                let edge = mesh.edge(e);
                for m in edge.nodes {
                    if amrk[m] != isub as i64 && !nmrk[m].is_frozen() {
                        amrk[m] = isub as i64;
                        aset.push(m);
                    }
                }
            }
        }
    }

    aset
}

/// A single smoothing subpass: build the active set, shuffle it in
/// sliding windows to decorrelate sweep order, then attempt Kind-1 then
/// Kind-2 moves tail-to-head. Returns the number of nodes moved.
#[allow(clippy::too_many_arguments)]
pub fn move_node_pass<const D: usize, M, G, H, P, R>(
    geom: &G,
    mesh: &mut M,
    hfun: &H,
    pred: &P,
    nset: &mut Vec<usize>,
    nmrk: &mut [Marker],
    iout: i64,
    isub: usize,
    good: f64,
    qtol: f64,
    rng: &mut R,
) -> usize
where
    M: Mesh<D>,
    G: Geom<D>,
    H: Hfun<D>,
    P: Pred<D>,
    R: Rng,
{
    let cost_of = |mesh: &M, t: usize| {
        let tri = mesh.tri(t);
        pred.cost(
            &mesh.node(tri.nodes[0]).pos,
            &mesh.node(tri.nodes[1]).pos,
            &mesh.node(tri.nodes[2]).pos,
        )
    };

    let mut aset = build_active_set(mesh, nset, nmrk, isub, iout, good, cost_of);

    let len = aset.len();
    for i in 0..len {
        let sift = SHUFFLE_WINDOW.min(len - i);
        let j = i + rng.gen_range(0..sift);
        aset.swap(i, j);
    }

    let mut tset = Vec::new();
    let mut nmov = 0usize;

    for &node in aset.iter().rev() {
        tset.clear();
        mesh.node_tri3(node, &mut tset);

        let mut qsrc = Vec::new();
        let qmin = loop_cost(mesh, pred, &tset, &mut qsrc);

        let mut okay = move_node_trial(geom, mesh, hfun, pred, &tset, node, 1, &qsrc, qmin, good, qtol);
        if !okay {
            okay = move_node_trial(geom, mesh, hfun, pred, &tset, node, 2, &qsrc, qmin, good, qtol);
        }

        if okay {
            if nmrk[node] != Marker::Gen(iout) {
                nmrk[node] = Marker::Gen(iout);
                nset.push(node);
            }
            nmov += 1;
        }
    }

    nmov
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::SimpleMesh;
    use crate::oracle::{UniformHfun, UnconstrainedGeom};
    use crate::pred::Pred2D;
    use rand_chacha::ChaCha8Rng;
    use rand::SeedableRng;

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
        }
        m
    }

    #[test]
    fn equilateral_hexagon_fan_does_not_move() {
        let mut mesh = hex_fan();
        let pred = Pred2D;
        let geom = UnconstrainedGeom;
        let hfun = UniformHfun(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let mut nmrk = vec![Marker::default(); mesh.node_count()];
        let mut nset: Vec<usize> = (0..mesh.node_count()).collect();

        let nmov = move_node_pass(
            &geom, &mut mesh, &hfun, &pred, &mut nset, &mut nmrk, 1, 0, 0.95, 1e-4, &mut rng,
        );
        assert_eq!(nmov, 0);

        for t in 0..mesh.tri_count() {
            let tri = mesh.tri(t);
            let cost = pred.cost(
                &mesh.node(tri.nodes[0]).pos,
                &mesh.node(tri.nodes[1]).pos,
                &mesh.node(tri.nodes[2]).pos,
            );
            assert!((cost - 1.0).abs() < 1e-9);
        }
    }
}
