use lamantin::algo::kamada_kawai;
use lamantin::{CommonOptions, Error, Graph, KamadaKawaiOptions};
use nalgebra::DMatrix;

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[test]
fn path_distances_grow_along_the_path() {
    let g = Graph::from_edges([(0, 1), (1, 2), (2, 3), (3, 4)]);
    let result = kamada_kawai::layout(&g, &KamadaKawaiOptions::default()).unwrap();
    assert!(result.stats.converged, "{:?}", result.stats);

    let p = &result.positions;
    let d01 = distance(&p[&0], &p[&1]);
    let d02 = distance(&p[&0], &p[&2]);
    let d03 = distance(&p[&0], &p[&3]);
    let d04 = distance(&p[&0], &p[&4]);
    assert!(d02 > d01);
    assert!(d03 > d02);
    assert!(d04 > d03);
}

#[test]
fn disconnected_components_still_converge() {
    let mut g = Graph::from_edges([(0, 1), (1, 2), (3, 4)]);
    g.add_node(5);
    let result = kamada_kawai::layout(&g, &KamadaKawaiOptions::default()).unwrap();
    assert_eq!(result.positions.len(), 6);
    assert!(result.positions.values().flatten().all(|v| v.is_finite()));
}

#[test]
fn edge_weights_act_as_lengths() {
    let mut g = Graph::new();
    g.add_weighted_edge("a", "b", "weight", 3.0);
    g.add_weighted_edge("b", "c", "weight", 1.0);
    let p = kamada_kawai::layout(&g, &KamadaKawaiOptions::default())
        .unwrap()
        .positions;
    assert!(distance(&p["a"], &p["b"]) > 2.0 * distance(&p["b"], &p["c"]));
}

#[test]
fn explicit_distance_matrix_overrides_the_graph() {
    // The graph says a-b-c is a path; the matrix says c is far from both.
    let g = Graph::from_edges([("a", "b"), ("b", "c")]);
    let dist = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 5.0, 1.0, 0.0, 5.0, 5.0, 5.0, 0.0]);
    let opts = KamadaKawaiOptions {
        dist: Some(dist),
        ..Default::default()
    };
    let p = kamada_kawai::layout(&g, &opts).unwrap().positions;
    assert!(distance(&p["a"], &p["c"]) > 3.0 * distance(&p["a"], &p["b"]));
}

#[test]
fn distance_matrix_must_match_node_count() {
    let g = Graph::from_edges([(0, 1), (1, 2)]);
    let opts = KamadaKawaiOptions {
        dist: Some(DMatrix::zeros(2, 2)),
        ..Default::default()
    };
    assert!(matches!(
        kamada_kawai::layout(&g, &opts),
        Err(Error::InvalidParameter { name: "dist", .. })
    ));
}

#[test]
fn higher_dimensions_are_seeded() {
    let g = Graph::from_edges([(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)]);
    let opts = |seed| KamadaKawaiOptions {
        common: CommonOptions {
            dim: 3,
            seed: Some(seed),
            ..Default::default()
        },
        ..Default::default()
    };
    let a = kamada_kawai::layout(&g, &opts(5)).unwrap().positions;
    let b = kamada_kawai::layout(&g, &opts(5)).unwrap().positions;
    assert_eq!(a, b);
    assert!(a.values().all(|p| p.len() == 3));
}
