//! Acceptance predicate and neighborhood cost: the hill-climbing gate
//! every mutator commits a move through.

use crate::common::*;
use crate::mesh::Mesh;
use crate::pred::Pred;

/// Decide whether a perturbed triangle neighborhood (`cdst`) strictly
/// improves over the baseline (`csrc`).
///
/// Lexicographic-like preference for lifting the worst element: accept
/// outright if the new minimum clears the old minimum by `qtol * old_min`.
/// Otherwise, if both neighborhoods are already "good" (new min `>= good`),
/// fall back to a mean-improvement rule to avoid stagnation. Empty
/// neighborhoods are always rejected.
pub fn move_okay(cdst: &[f64], csrc: &[f64], good: f64, qtol: f64) -> bool {
    if cdst.is_empty() || csrc.is_empty() {
        return false;
    }

    let m0_src = csrc.iter().cloned().fold(f64::INFINITY, f64::min);
    let m0_dst = cdst.iter().cloned().fold(f64::INFINITY, f64::min);

    let mean_src = csrc.iter().sum::<f64>() / csrc.len() as f64;
    let mean_dst = cdst.iter().sum::<f64>() / cdst.len() as f64;

    let tol = qtol * m0_src;

    if m0_dst > m0_src + tol {
        return true;
    }

    if m0_dst >= good {
        return mean_dst > mean_src + tol / cdst.len() as f64;
    }

    false
}

/// Cost vector (and min-cost) over a set of triangles.
pub fn loop_cost<const D: usize, M, P>(
    mesh: &M,
    pred: &P,
    tset: &[usize],
    cost: &mut Vec<f64>,
) -> f64
where
    M: Mesh<D>,
    P: Pred<D>,
{
    let mut qmin = f64::INFINITY;
    for &t in tset {
        let tri = mesh.tri(t);
        let score = pred.cost(
            &mesh.node(tri.nodes[0]).pos,
            &mesh.node(tri.nodes[1]).pos,
            &mesh.node(tri.nodes[2]).pos,
        );
        qmin = qmin.min(score);
        cost.push(score);
    }
    qmin
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_empty_neighborhoods() {
        assert!(!move_okay(&[], &[0.5], 0.95, 1e-4));
        assert!(!move_okay(&[0.5], &[], 0.95, 1e-4));
    }

    #[test]
    fn accepts_strict_min_improvement() {
        let csrc = [0.2, 0.3];
        let cdst = [0.25, 0.26];
        assert!(move_okay(&cdst, &csrc, 0.95, 1e-4));
    }

    #[test]
    fn rejects_equal_vectors() {
        let c = [0.5, 0.6];
        assert!(!move_okay(&c, &c, 0.95, 1e-4));
    }

    #[test]
    fn mean_rule_kicks_in_once_good() {
        let csrc = [0.96, 0.97];
        // identical min, but mean improves while both are already "good"
        let cdst = [0.96, 0.99];
        assert!(move_okay(&cdst, &csrc, 0.95, 1e-4));
    }

    #[test]
    fn mean_rule_does_not_fire_below_good() {
        let csrc = [0.5, 0.5];
        let cdst = [0.5, 0.9];
        // same min, mean improves, but min is below `good` -- reject
        assert!(!move_okay(&cdst, &csrc, 0.95, 1e-4));
    }
}
