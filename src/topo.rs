//! Edge collapse ("zip") and edge split ("divide"), and the per-node pass
//! that visits incident edges in a randomized direction to attempt one or
//! the other.

use rand::Rng;

use crate::accept::{loop_cost, move_okay};
use crate::marker::Marker;
use crate::mesh::Mesh;
use crate::oracle::{Geom, Hfun};
use crate::pred::Pred;

/// Below this incident-edge degree, collapsing an edge at the node is
/// triggered aggressively (raises degree back up).
pub const DEG_MIN: usize = 5;
/// Above this incident-edge degree, splitting an edge at the node is
/// triggered aggressively (lowers degree back down).
pub const DEG_MAX: usize = 8;

const GOOD_DEFAULT: f64 = 0.95;
const QTOL_DEFAULT: f64 = 1.0e-4;

/// Degree-triggered acceptance relaxation: a length-gate multiplier and a
/// flat (or slightly negative) quality increment that lets a collapse or
/// split commit even without a strict quality improvement, in order to
/// normalize degree.
struct DegGate {
    good: f64,
    qinc: f64,
    ltol: f64,
}

const NORMAL_DIV: DegGate = DegGate {
    good: GOOD_DEFAULT,
    qinc: 0.0,
    ltol: 1.0,
};
const TRIGGERED_DIV: DegGate = DegGate {
    good: 1.0,
    qinc: -0.5,
    ltol: 0.5,
};
const NORMAL_ZIP: DegGate = DegGate {
    good: GOOD_DEFAULT,
    qinc: 0.0,
    ltol: 1.0,
};
const TRIGGERED_ZIP: DegGate = DegGate {
    good: 1.0,
    qinc: -0.5,
    ltol: 2.0,
};

/// `move_okay`, relaxed by `qinc`: effectively lowers the bar for the
/// strict-min-improvement branch by `qinc`, so a degree-normalizing
/// collapse/split can commit even at flat or slightly worse quality.
fn move_okay_relaxed(cdst: &[f64], csrc: &[f64], good: f64, qtol: f64, qinc: f64) -> bool {
    if qinc == 0.0 {
        return move_okay(cdst, csrc, good, qtol);
    }
    if cdst.is_empty() || csrc.is_empty() {
        return false;
    }
    let m0_src = csrc.iter().cloned().fold(f64::INFINITY, f64::min);
    let m0_dst = cdst.iter().cloned().fold(f64::INFINITY, f64::min);
    m0_dst > m0_src + qinc || move_okay(cdst, csrc, good, qtol)
}

/// Split the edge `eid` by inserting a new node at its (projected)
/// midpoint, fanning it into 2-4 replacement triangles from the edge's
/// 1-2 incident triangles. Commits under the acceptance predicate plus an
/// edge-length gate; returns whether the split was applied.
#[allow(clippy::too_many_arguments)]
pub fn div_edge<const D: usize, M, G, H, P>(
    geom: &G,
    mesh: &mut M,
    hfun: &H,
    pred: &P,
    eid: usize,
    triggered: bool,
) -> bool
where
    M: Mesh<D>,
    G: Geom<D>,
    H: Hfun<D>,
    P: Pred<D>,
{
    let gate = if triggered { TRIGGERED_DIV } else { NORMAL_DIV };

    let (a, b) = {
        let e = mesh.edge(eid);
        if e.is_self {
            return false;
        }
        (e.nodes[0], e.nodes[1])
    };

    let pa = mesh.node(a).pos;
    let pb = mesh.node(b).pos;
    let len = (pb - pa).norm();
    let target = hfun.eval(&((pa + pb) * 0.5));
    if len < target * gate.ltol {
        return false;
    }

    let mut told = Vec::new();
    mesh.edge_tri3([a, b], &mut told);
    if told.is_empty() || told.len() > 2 {
        return false;
    }

    let mut mid = (pa + pb) * 0.5;
    geom.project(&pa, &mut mid);

    let mut qold = Vec::new();
    loop_cost(mesh, pred, &told, &mut qold);

    // Build the replacement fan: for each old triangle (a, b, apex) or
    // (b, a, apex), split into two triangles through the new midpoint
    // node, preserving winding.
    let mut apexes = Vec::with_capacity(told.len());
    for &t in &told {
        let tri = mesh.tri(t);
        let apex = *tri.nodes.iter().find(|&&n| n != a && n != b).unwrap();
        // Whether the triangle's winding visits `a` immediately before
        // `b` (vs. `b` before `a`), so the replacement fan preserves it.
        let idx_a = tri.nodes.iter().position(|&n| n == a).unwrap();
        let a_first = tri.nodes[(idx_a + 1) % 3] == b;
        apexes.push((apex, a_first));
    }

    // Score the replacement fan against `mid`'s position directly, without
    // yet allocating it as a mesh node -- a rejected split must leave the
    // mesh untouched, not an orphan node behind.
    let mut new_tri_nodes = Vec::with_capacity(apexes.len() * 2);
    for &(apex, a_first) in &apexes {
        let (p, q) = if a_first { (a, b) } else { (b, a) };
        new_tri_nodes.push((p, apex, true));
        new_tri_nodes.push((q, apex, false));
    }
    let mut qnew = Vec::new();
    for &(x, apex, p_first) in &new_tri_nodes {
        let px = mesh.node(x).pos;
        let papex = mesh.node(apex).pos;
        let cost = if p_first {
            pred.cost(&px, &mid, &papex)
        } else {
            pred.cost(&mid, &px, &papex)
        };
        qnew.push(cost);
    }

    if !move_okay_relaxed(&qnew, &qold, gate.good, QTOL_DEFAULT, gate.qinc) {
        return false;
    }

    let mid_id = mesh.add_node(mid);
    for t in &told {
        mesh.tri_mut(*t).mark = Marker::Gen(-1);
    }
    for &(x, apex, p_first) in &new_tri_nodes {
        if p_first {
            mesh.add_tri(x, mid_id, apex);
        } else {
            mesh.add_tri(mid_id, x, apex);
        }
    }
    mesh.edge_mut(eid).mark = Marker::Gen(-1);
    mesh.add_edge(a, mid_id, false);
    mesh.add_edge(mid_id, b, false);
    for &(apex, _) in &apexes {
        mesh.add_edge(apex, mid_id, false);
    }

    true
}

/// Collapse the edge `eid`, merging its two endpoints into the
/// lower-numbered node and deleting the 1-2 incident triangles. Commits
/// under the acceptance predicate plus an edge-length gate; returns
/// whether the collapse was applied.
pub fn zip_edge<const D: usize, M, G, H, P>(
    geom: &G,
    mesh: &mut M,
    hfun: &H,
    pred: &P,
    eid: usize,
    triggered: bool,
) -> bool
where
    M: Mesh<D>,
    G: Geom<D>,
    H: Hfun<D>,
    P: Pred<D>,
{
    let _ = geom;
    let gate = if triggered { TRIGGERED_ZIP } else { NORMAL_ZIP };

    let (a, b) = {
        let e = mesh.edge(eid);
        if e.is_self {
            return false;
        }
        (e.nodes[0], e.nodes[1])
    };
    let (keep, drop) = if a < b { (a, b) } else { (b, a) };

    let pa = mesh.node(keep).pos;
    let pb = mesh.node(drop).pos;
    let len = (pb - pa).norm();
    let target = hfun.eval(&((pa + pb) * 0.5));
    if len > target * gate.ltol {
        return false;
    }

    let mut told = Vec::new();
    mesh.edge_tri3([keep, drop], &mut told);
    if told.is_empty() || told.len() > 2 {
        return false;
    }

    // Triangles around `drop` that survive the merge, with `drop`
    // replaced by `keep`.
    let mut drop_tris = Vec::new();
    mesh.node_tri3(drop, &mut drop_tris);
    let ring: Vec<usize> = drop_tris.into_iter().filter(|t| !told.contains(t)).collect();

    let mut qold = Vec::new();
    loop_cost(mesh, pred, &told, &mut qold);
    ring.iter().for_each(|&t| {
        let tri = mesh.tri(t);
        let cost = pred.cost(
            &mesh.node(tri.nodes[0]).pos,
            &mesh.node(tri.nodes[1]).pos,
            &mesh.node(tri.nodes[2]).pos,
        );
        qold.push(cost);
    });

    let mut qnew = Vec::new();
    for &t in &ring {
        let tri = mesh.tri(t).nodes;
        let remapped: Vec<_> = tri.iter().map(|&n| if n == drop { keep } else { n }).collect();
        let cost = pred.cost(
            &mesh.node(remapped[0]).pos,
            &mesh.node(remapped[1]).pos,
            &mesh.node(remapped[2]).pos,
        );
        qnew.push(cost);
    }

    if !move_okay_relaxed(&qnew, &qold, gate.good, QTOL_DEFAULT, gate.qinc) {
        return false;
    }

    for &t in &told {
        mesh.tri_mut(t).mark = Marker::Gen(-1);
    }
    for &t in &ring {
        for n in mesh.tri_mut(t).nodes.iter_mut() {
            if *n == drop {
                *n = keep;
            }
        }
    }
    // Re-point every other live edge incident to `drop` at `keep`, so
    // node-edge incidence for `keep` stays consistent with the remapped
    // ring triangles above (invariant 4).
    for e in 0..mesh.edge_count() {
        if e == eid {
            continue;
        }
        if mesh.edge(e).is_live() && mesh.edge(e).has_node(drop) {
            for n in mesh.edge_mut(e).nodes.iter_mut() {
                if *n == drop {
                    *n = keep;
                }
            }
        }
    }
    mesh.node_mut(drop).mark = Marker::Gen(-1);
    mesh.edge_mut(eid).mark = Marker::Gen(-1);

    true
}

/// Visit `node`'s incident edges in a randomized direction, attempting a
/// divide then a collapse on each (subject to `opts`), stopping at the
/// first committed move. Returns `(divided, zipped)`.
#[allow(clippy::too_many_arguments)]
pub fn try_zip_div_at_node<const D: usize, M, G, H, P, R>(
    geom: &G,
    mesh: &mut M,
    hfun: &H,
    pred: &P,
    node: usize,
    nmrk: &[Marker],
    emrk: &mut [Marker],
    imrk: i64,
    div_enabled: bool,
    zip_enabled: bool,
    rng: &mut R,
) -> (bool, bool)
where
    M: Mesh<D>,
    G: Geom<D>,
    H: Hfun<D>,
    P: Pred<D>,
    R: Rng,
{
    let mut eset = Vec::new();
    mesh.node_edge(node, &mut eset);

    let visit_order: Vec<usize> = if rng.gen_bool(0.5) {
        eset.clone()
    } else {
        eset.iter().rev().cloned().collect()
    };
    let degree = eset.len();

    for eid in visit_order {
        if emrk[eid] == Marker::Gen(imrk) {
            continue;
        }
        emrk[eid] = Marker::Gen(imrk);

        let (n0, n1) = {
            let e = mesh.edge(eid);
            (e.nodes[0], e.nodes[1])
        };
        if nmrk[n0].is_frozen() || nmrk[n1].is_frozen() {
            continue;
        }

        if degree > DEG_MAX {
            if div_enabled && div_edge(geom, mesh, hfun, pred, eid, true) {
                return (true, false);
            }
        } else if div_enabled && div_edge(geom, mesh, hfun, pred, eid, false) {
            return (true, false);
        }

        if degree < DEG_MIN {
            if zip_enabled && zip_edge(geom, mesh, hfun, pred, eid, true) {
                return (false, true);
            }
        } else if zip_enabled && zip_edge(geom, mesh, hfun, pred, eid, false) {
            return (false, true);
        }
    }

    (false, false)
}
