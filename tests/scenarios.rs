//! Literal end-to-end scenarios: each mirrors a worked example of how the index should behave
//! after a specific sequence of updates.

use mscsc::Graph;

#[test]
fn scenario_1_construction_merges_a_triangle_but_not_the_pendant() {
    let g = Graph::build(4, &[(0, 1), (1, 2), (2, 0), (1, 3)]);

    assert!(g.in_same_scc(0, 1));
    assert!(g.in_same_scc(1, 2));
    assert!(!g.in_same_scc(0, 3));

    let scc = g.find(0);
    assert!(scc > 4, "the triangle should own a super-node id, not a vertex id");
    assert_eq!(g.find(3), 3, "{{3}} stays a singleton, reusing its own id");
    assert_eq!(g.scc_necessary_edge_count(0), 3);
}

#[test]
fn scenario_2_insertion_merges_the_pendant_back_in() {
    let mut g = Graph::build(4, &[(0, 1), (1, 2), (2, 0), (1, 3)]);
    let triangle_id = g.find(0);

    g.insertion(3, 1);

    assert!(g.in_same_scc(0, 1));
    assert!(g.in_same_scc(1, 2));
    assert!(g.in_same_scc(2, 3));
    assert_eq!(g.find(3), triangle_id, "the bigger SCC absorbs the singleton's id slot");
    assert_eq!(g.scc_necessary_edge_count(0), 4);
}

#[test]
fn scenario_3_deletion_of_a_needed_edge_with_no_real_split() {
    let mut g = Graph::build(4, &[(0, 1), (1, 2), (2, 0), (1, 3)]);
    g.insertion(3, 1);

    // (1, 2) was a tree edge in the initial build, so it was marked needed; but the
    // remaining edges (0,1),(2,0),(1,3),(3,1) still keep all four vertices mutually
    // reachable, so this must not split the SCC.
    g.deletion(1, 2).unwrap();

    assert!(g.in_same_scc(0, 1));
    assert!(g.in_same_scc(1, 2));
    assert!(g.in_same_scc(2, 3));
}

#[test]
fn scenario_4_deletion_splits_and_preserves_the_id_on_the_larger_piece() {
    let mut g = Graph::build(3, &[(0, 1), (1, 0), (1, 2), (2, 1)]);
    let original_scc_id = g.find(0);

    g.deletion(1, 2).unwrap();

    assert!(g.in_same_scc(0, 1));
    assert!(!g.in_same_scc(1, 2));
    assert_eq!(
        g.find(0),
        original_scc_id,
        "the larger post-split piece {{0,1}} keeps the old SCC id"
    );
}

#[test]
fn scenario_5_batch_insertion_into_an_existing_scc_does_not_merge() {
    let mut g = Graph::build(4, &[(0, 1), (1, 2), (2, 0), (1, 3)]);

    // Both new edges point *into* the triangle's SCC, none point back out of it, so no
    // cycle closes.
    g.batch_insertion(&[(3, 0), (3, 1)]);

    assert!(!g.in_same_scc(0, 3));
    assert!(g.in_same_scc(0, 1));
}

#[test]
fn scenario_6_batch_deletion_of_two_internal_edges_collapses_the_triangle() {
    let mut g = Graph::build(4, &[(0, 1), (1, 2), (2, 0), (1, 3)]);

    // Removing both (0,1) and (1,2) leaves only (2,0) among the former triangle's
    // internal edges: not enough for strong connectivity, so it falls apart into
    // three singletons.
    g.batch_deletion(&[(0, 1), (1, 2)]).unwrap();

    assert!(!g.in_same_scc(0, 1));
    assert!(!g.in_same_scc(1, 2));
    assert!(!g.in_same_scc(0, 2));
    assert_eq!(g.find(0), 0);
    assert_eq!(g.find(1), 1);
    assert_eq!(g.find(2), 2);
}
