use nanorand::{Rng, WyRand};

use crate::{CsrGraph, NodeId};

/// The layout that keeps every node at its own id.
pub fn create_identity_layout(graph: &CsrGraph) -> Vec<NodeId> {
    (0..graph.node_count()).collect()
}

/// A uniformly random layout drawn from `rng`.
pub fn create_random_layout(graph: &CsrGraph, rng: &mut WyRand) -> Vec<NodeId> {
    let mut layout = create_identity_layout(graph);
    rng.shuffle(&mut layout);
    layout
}

/// Turns `layout[node] = position` into `layout[position] = node` and vice
/// versa. Applying the function twice returns the original permutation.
pub fn invert_linear_layout(layout: &[NodeId]) -> Vec<NodeId> {
    let mut inverted = vec![usize::MAX; layout.len()];
    for (node, &position) in layout.iter().enumerate() {
        assert_eq!(
            inverted[position],
            usize::MAX,
            "layout maps two nodes to position {position}"
        );
        inverted[position] = node;
    }
    inverted
}

/// Rebuilds `original` with its nodes renamed according to `layout`, so
/// that the node at position `i` of the layout becomes node `i`. Node and
/// edge weights travel with their nodes and edges.
pub fn apply_linear_layout(original: &CsrGraph, layout: &[NodeId]) -> CsrGraph {
    assert_eq!(original.node_count(), layout.len());

    let inverted = invert_linear_layout(layout);
    let mut builder =
        CsrGraph::start_construction(original.node_count(), original.edge_count());

    for position in 0..original.node_count() {
        let node = builder.new_node();
        let old_node = inverted[position];
        builder.set_node_weight(node, original.node_weight(old_node));

        for old_edge in original.first_edge(old_node)..original.first_invalid_edge(old_node) {
            let old_target = original.edge_target(old_edge);
            let edge = builder.new_edge(node, layout[old_target]);
            builder.set_edge_weight(edge, original.edge_weight(old_edge));
        }
    }

    builder.finish_construction()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen;

    #[test]
    fn identity_layout_is_the_identity() {
        let graph = gen::cycle(5);
        assert_eq!(create_identity_layout(&graph), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn random_layout_is_a_permutation() {
        let graph = gen::clique(8);
        let mut rng = WyRand::new_seed(42);
        let layout = create_random_layout(&graph, &mut rng);

        let mut sorted = layout.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, create_identity_layout(&graph));
    }

    #[test]
    fn random_layouts_are_reproducible_for_a_seed() {
        let graph = gen::clique(8);
        let first = create_random_layout(&graph, &mut WyRand::new_seed(7));
        let second = create_random_layout(&graph, &mut WyRand::new_seed(7));
        assert_eq!(first, second);
    }

    #[test]
    fn inverting_twice_is_the_identity() {
        let layout = vec![3, 0, 4, 1, 2];
        assert_eq!(invert_linear_layout(&invert_linear_layout(&layout)), layout);
    }

    #[test]
    #[should_panic(expected = "maps two nodes")]
    fn inverting_rejects_non_permutations() {
        invert_linear_layout(&[0, 0, 1]);
    }

    #[test]
    fn applying_a_layout_relabels_neighbors() {
        // path 0 - 1 - 2, reversed by the layout
        let mut builder = CsrGraph::start_construction(3, 4);
        for v in 0..3 {
            let node = builder.new_node();
            if v > 0 {
                builder.new_edge(node, v - 1);
            }
            if v < 2 {
                builder.new_edge(node, v + 1);
            }
        }
        let graph = builder.finish_construction();

        let reordered = apply_linear_layout(&graph, &[2, 1, 0]);

        assert_eq!(reordered.node_count(), 3);
        assert_eq!(reordered.edge_count(), 4);
        assert_eq!(reordered.neighbors(0), &[1]);
        assert_eq!(reordered.neighbors(2), &[1]);
        let mut middle = reordered.neighbors(1).to_vec();
        middle.sort_unstable();
        assert_eq!(middle, vec![0, 2]);
    }

    #[test]
    fn applying_a_layout_keeps_weights() {
        let mut builder = CsrGraph::start_construction(2, 2);
        let a = builder.new_node();
        let e = builder.new_edge(a, 1);
        builder.set_node_weight(a, 11);
        builder.set_edge_weight(e, 5);
        let b = builder.new_node();
        let e = builder.new_edge(b, 0);
        builder.set_edge_weight(e, 5);
        let graph = builder.finish_construction();

        let reordered = apply_linear_layout(&graph, &[1, 0]);

        assert_eq!(reordered.node_weight(1), 11);
        assert_eq!(reordered.edge_weight(0), 5);
        assert_eq!(reordered.edge_weight(1), 5);
    }
}
