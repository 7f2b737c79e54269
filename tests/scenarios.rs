//! End-to-end scenarios exercising the full `iter_mesh` driver, one per
//! concrete behavior called out for the individual move generators.

use meshopt_iter::{
    iter_mesh, try_zip_div_at_node, IterOpts, Marker, Mesh, Point2, Pred2D, SimpleMesh,
    StringLogSink, UnconstrainedGeom, UniformHfun,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn hex_fan_with_boundary() -> SimpleMesh<2> {
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
fn dragged_center_vertex_is_smoothed_back_toward_the_centroid() {
    // Same hexagon fan as the equilibrium scenario, but with the center
    // node dragged off-center before optimizing. Three iterations should
    // pull it back close to the origin since that's the CVT/quality
    // optimum for a regular fan.
    let mut mesh = hex_fan_with_boundary();
    mesh.nodes[0].pos = Point2::new(0.2, 0.15);

    let geom = UnconstrainedGeom;
    let hfun = UniformHfun(1.0);
    let pred = Pred2D;
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut sink = StringLogSink::default();
    let opts = IterOpts {
        iter: 3,
        zip_enabled: false,
        div_enabled: false,
        ..Default::default()
    };

    iter_mesh(&geom, &mut mesh, &hfun, &pred, &opts, &mut rng, &mut sink).unwrap();

    let center = mesh.nodes[0].pos;
    assert!(
        center.norm() < 0.2,
        "expected center to be pulled back toward the origin, got {center:?}"
    );
}

#[test]
fn under_refined_short_edge_collapses() {
    // Two thin slivers sharing a very short internal edge `(a, b)`, plus a
    // third, well-formed triangle hanging off `b` so the merge has a
    // surviving neighborhood for C5 to score (an edge whose collapse would
    // delete the mesh's only triangles is correctly rejected on an empty
    // neighborhood, per `zip_edge`'s `ring` check). Neither `a` nor `b` is
    // an endpoint of any registered `self` edge, so `init_mark` never
    // freezes them and `try_zip_div_at_node` is free to collapse `(a, b)`.
    let mut mesh = SimpleMesh::<2>::new();
    let a = mesh.add_node(Point2::new(0.0, 0.0));
    let b = mesh.add_node(Point2::new(0.1, 0.0));
    let c = mesh.add_node(Point2::new(-1.0, 1.0));
    let d = mesh.add_node(Point2::new(-1.0, -1.0));
    let e = mesh.add_node(Point2::new(1.0, 1.0));
    let f = mesh.add_node(Point2::new(1.0, -1.0));
    mesh.add_tri(a, b, c);
    mesh.add_tri(b, a, d);
    mesh.add_tri(b, e, f);
    mesh.add_edge(a, b, false);

    let geom = UnconstrainedGeom;
    let hfun = UniformHfun(1.0);
    let pred = Pred2D;
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let nmrk = vec![Marker::default(); mesh.node_count()];
    let mut emrk = vec![Marker::default(); mesh.edge_count()];

    let before = mesh.tri_count();
    let (divided, zipped) = try_zip_div_at_node(
        &geom, &mut mesh, &hfun, &pred, a, &nmrk, &mut emrk, 1, false, true, &mut rng,
    );

    assert!(!divided);
    assert!(zipped, "expected the short edge to collapse");
    let live_tris = (0..mesh.tri_count()).filter(|&t| mesh.tri(t).is_live()).count();
    assert!(
        live_tris < before,
        "expected the short edge to collapse, removing triangles"
    );
}

#[test]
fn inverted_input_is_sign_corrected_before_optimizing() {
    // Build a mesh where half the triangles are wound clockwise (negative
    // cost under Pred2D). `iter_mesh` runs `flip_sign` before anything
    // else, so after even a zero-iteration run every live triangle has
    // non-negative cost.
    let mut mesh = SimpleMesh::<2>::new();
    let n0 = mesh.add_node(Point2::new(0.0, 0.0));
    let n1 = mesh.add_node(Point2::new(1.0, 0.0));
    let n2 = mesh.add_node(Point2::new(1.0, 1.0));
    let n3 = mesh.add_node(Point2::new(0.0, 1.0));
    // (n0, n2, n1) is clockwise -- negative cost as stored.
    mesh.add_tri(n0, n2, n1);
    mesh.add_tri(n0, n3, n2);
    mesh.add_edge(n0, n1, true);
    mesh.add_edge(n1, n2, true);
    mesh.add_edge(n2, n3, true);
    mesh.add_edge(n3, n0, true);
    mesh.add_edge(n0, n2, false);

    let geom = UnconstrainedGeom;
    let hfun = UniformHfun(1.0);
    let pred = Pred2D;
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut sink = StringLogSink::default();
    let opts = IterOpts {
        iter: 0,
        ..Default::default()
    };

    iter_mesh(&geom, &mut mesh, &hfun, &pred, &opts, &mut rng, &mut sink).unwrap();

    for t in 0..mesh.tri_count() {
        let tri = mesh.tri(t);
        if !tri.is_live() {
            continue;
        }
        let cost = pred.cost(
            &mesh.node(tri.nodes[0]).pos,
            &mesh.node(tri.nodes[1]).pos,
            &mesh.node(tri.nodes[2]).pos,
        );
        assert!(cost >= 0.0, "triangle {t} still has negative cost: {cost}");
    }
}
