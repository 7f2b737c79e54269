//! Orientation normalization (`flip_sign`) and the 2-2 edge flip
//! (`flip_mesh`, `flip_tria`, `flip_t2t2`).

use rand::Rng;

use crate::accept::{loop_cost, move_okay};
use crate::mesh::{face_node, Mesh};
use crate::pred::Pred;

/// Default acceptance parameters used by the flip gate; the driver does
/// not ramp these the way it ramps `move_node`'s quality target.
pub const FLIP_GOOD: f64 = 0.95;
pub const FLIP_QTOL: f64 = 1.0e-4;

/// Find the triangle adjacent to `tpos` across its local edge `epos`, and
/// rotate that neighbor's node order into winding-agreement with `tpos` if
/// needed. Returns `None` if the edge is a boundary (not shared by exactly
/// two live triangles).
fn flip_next<const D: usize, M: Mesh<D>>(
    mesh: &mut M,
    tpos: usize,
    epos: usize,
) -> Option<usize> {
    let inod = {
        let tria = mesh.tri(tpos);
        let [i, j] = face_node(epos);
        [tria.nodes[i], tria.nodes[j]]
    };

    let mut tset = Vec::new();
    mesh.edge_tri3(inod, &mut tset);
    if tset.len() != 2 {
        return None;
    }

    let tadj = if tset[0] == tpos { tset[1] } else { tset[0] };

    // Find tadj's local edge whose apex is its unique (non-shared) node --
    // that's the local edge carrying the same two nodes as `inod`, and
    // `jnod` is the order those nodes are presented in by `tadj`'s own
    // winding.
    let jnod = {
        let tria_adj = mesh.tri(tadj);
        (0..3)
            .find_map(|e| {
                let apex = tria_adj.nodes[e];
                if apex != inod[0] && apex != inod[1] {
                    let [i, j] = face_node(e);
                    Some([tria_adj.nodes[i], tria_adj.nodes[j]])
                } else {
                    None
                }
            })
            .expect("triangles sharing an edge must share exactly two nodes")
    };

    if jnod[0] == inod[0] && jnod[1] == inod[1] {
        mesh.tri_mut(tadj).nodes.swap(0, 1);
    }

    Some(tadj)
}

/// Flood-fill the triangle-adjacency graph, flipping triangle winding
/// where necessary so every live triangle has non-negative cost and
/// neighboring triangles agree on orientation.
pub fn flip_sign<const D: usize, M: Mesh<D>, P: Pred<D>>(mesh: &mut M, pred: &P) {
    let n = mesh.tri_count();
    let mut seen = vec![false; n];

    for start in 0..n {
        if !mesh.tri(start).is_live() || seen[start] {
            continue;
        }

        {
            let tri = mesh.tri(start);
            let cost = pred.cost(
                &mesh.node(tri.nodes[0]).pos,
                &mesh.node(tri.nodes[1]).pos,
                &mesh.node(tri.nodes[2]).pos,
            );
            if cost < 0.0 {
                mesh.tri_mut(start).nodes.swap(0, 1);
            }
        }

        seen[start] = true;
        let mut stack = vec![start];
        while let Some(tpos) = stack.pop() {
            for epos in (0..3).rev() {
                if let Some(tadj) = flip_next(mesh, tpos, epos) {
                    if !seen[tadj] {
                        seen[tadj] = true;
                        stack.push(tadj);
                    }
                }
            }
        }
    }
}

/// Attempt the 2-2 swap across triangle `tria`'s local edge `epos`:
/// replace it and its neighbor across that edge with the two triangles
/// sharing the opposite diagonal, committing only if the post-flip
/// quality vector strictly dominates the pre-flip one under `move_okay`,
/// and the shared edge is neither a boundary nor a `self` (feature) edge.
///
/// Returns the ids of the (unchanged) triangle slots that were rewritten,
/// for the caller to re-seed the propagation wave.
///
/// Unlike the source, which derives the shared edge purely from triangle
/// adjacency (`edge_tri3`), this looks up `(p, q)` via [`Mesh::find_edge`]
/// and no-ops if it isn't registered -- a `Mesh` populated with triangles
/// but no interior `Edge` records will never flip an interior diagonal.
/// Callers that want every interior edge eligible for flipping must
/// register it with `add_edge`, not just the boundary/feature edges.
fn flip_t2t2<const D: usize, M: Mesh<D>, P: Pred<D>>(
    mesh: &mut M,
    pred: &P,
    tria: usize,
    epos: usize,
) -> Option<[usize; 2]> {
    let (p, q, c) = {
        let t = mesh.tri(tria);
        let [i, j] = face_node(epos);
        (t.nodes[i], t.nodes[j], t.nodes[epos])
    };

    let eid = mesh.find_edge(p, q)?;
    if mesh.edge(eid).is_self {
        return None;
    }

    let mut tset = Vec::new();
    mesh.edge_tri3([p, q], &mut tset);
    if tset.len() != 2 {
        return None;
    }
    let tadj = if tset[0] == tria { tset[1] } else { tset[0] };

    let d = *mesh
        .tri(tadj)
        .nodes
        .iter()
        .find(|&&n| n != p && n != q)?;

    let qold_vec = {
        let mut v = Vec::with_capacity(2);
        loop_cost(mesh, pred, &[tria, tadj], &mut v);
        v
    };

    let p1 = mesh.node(p).pos;
    let q1 = mesh.node(q).pos;
    let c1 = mesh.node(c).pos;
    let d1 = mesh.node(d).pos;
    let qnew_vec = [pred.cost(&p1, &d1, &c1), pred.cost(&q1, &c1, &d1)];

    if !move_okay(&qnew_vec, &qold_vec, FLIP_GOOD, FLIP_QTOL) {
        return None;
    }

    mesh.tri_mut(tria).nodes = [p, d, c];
    mesh.tri_mut(tadj).nodes = [q, c, d];
    mesh.edge_mut(eid).nodes = [c, d];

    Some([tria, tadj])
}

/// Try each of a triangle's three edges in a randomized order until one
/// accepts a 2-2 flip.
///
/// The two coin-flip branches visit edges in orders `(0, 1, 2)` and
/// `(2, 1, 1)` respectively. The second order's repeated `1` mirrors the
/// reference implementation; it is very likely a typo for `0` (see
/// `DESIGN.md`), but is kept as-is rather than silently "fixed", per spec.
pub fn flip_tria<const D: usize, M: Mesh<D>, P: Pred<D>, R: Rng>(
    mesh: &mut M,
    pred: &P,
    rng: &mut R,
    tria: usize,
) -> Option<[usize; 2]> {
    let order: [usize; 3] = if rng.gen_bool(0.5) {
        [0, 1, 2]
    } else {
        [2, 1, 1]
    };

    for epos in order {
        if let Some(touched) = flip_t2t2(mesh, pred, tria, epos) {
            return Some(touched);
        }
    }
    None
}

/// Propagate 2-2 flips outward from the triangles touching `nset` (the
/// node set produced by smoothing), in waves: each wave attempts a flip
/// on every still-live triangle queued so far, and the triangles touched
/// by an accepted flip seed the next wave. Terminates when a wave
/// produces no work.
pub fn flip_mesh<const D: usize, M: Mesh<D>, P: Pred<D>, R: Rng>(
    mesh: &mut M,
    pred: &P,
    rng: &mut R,
    nset: &[usize],
) -> usize {
    let mut tmrk = vec![false; mesh.tri_count()];
    let mut wave = Vec::new();
    for &n in nset {
        if mesh.node(n).is_live() {
            let mut touched = Vec::new();
            mesh.node_tri3(n, &mut touched);
            for t in touched {
                if !tmrk[t] {
                    tmrk[t] = true;
                    wave.push(t);
                }
            }
        }
    }

    let mut nflp = 0usize;
    while !wave.is_empty() {
        let mut next = Vec::new();
        for &tria in &wave {
            if mesh.tri(tria).is_live() {
                if let Some(touched) = flip_tria(mesh, pred, rng, tria) {
                    nflp += 1;
                    next.extend_from_slice(&touched);
                }
            }
        }
        wave = next;
    }
    nflp
}
