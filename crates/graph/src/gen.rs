//! Generators for small benchmark graph families.

use crate::CsrGraph;

/// A complete graph on `size` nodes.
pub fn clique(size: usize) -> CsrGraph {
    assert!(size > 0, "clique size must be greater than zero");

    let mut builder = CsrGraph::start_construction(size, size * (size - 1));
    for v in 0..size {
        let node = builder.new_node();
        for u in 0..size {
            if u == v {
                continue;
            }
            builder.new_edge(node, u);
        }
    }
    builder.finish_construction()
}

/// Two cliques of `size0` and `size1` nodes, optionally bridged by a single
/// edge between their first nodes.
pub fn biclique(size0: usize, size1: usize, connected: bool) -> CsrGraph {
    assert!(size0 > 0 && size1 > 0, "clique sizes must be greater than zero");

    let edge_count =
        size0 * (size0 - 1) + size1 * (size1 - 1) + if connected { 2 } else { 0 };
    let mut builder = CsrGraph::start_construction(size0 + size1, edge_count);

    for v in 0..size0 {
        let node = builder.new_node();
        for u in 0..size0 {
            if u == v {
                continue;
            }
            builder.new_edge(node, u);
        }
        if v == 0 && connected {
            builder.new_edge(node, size0);
        }
    }
    for v in size0..size0 + size1 {
        let node = builder.new_node();
        for u in size0..size0 + size1 {
            if u == v {
                continue;
            }
            builder.new_edge(node, u);
        }
        if v == size0 && connected {
            builder.new_edge(node, 0);
        }
    }
    builder.finish_construction()
}

/// A chain of cliques of sizes `1..=count`, consecutive cliques joined by
/// one edge.
pub fn increasing_cliques(count: usize) -> CsrGraph {
    assert!(count > 0, "clique count must be greater than zero");

    let node_count = (count * (count + 1)) / 2;
    let mut edge_count = 2 * (count - 1);
    for clique in 1..=count {
        edge_count += clique * (clique - 1);
    }

    let mut builder = CsrGraph::start_construction(node_count, edge_count);
    let mut offset = 0;
    for clique in 1..=count {
        for v in offset..offset + clique {
            let node = builder.new_node();

            if v == offset && clique > 1 {
                builder.new_edge(node, v - 1);
            }
            if v == offset + clique - 1 && clique < count {
                builder.new_edge(node, v + 1);
            }
            for u in offset..offset + clique {
                if u == v {
                    continue;
                }
                builder.new_edge(node, u);
            }
        }
        offset += clique;
    }
    builder.finish_construction()
}

/// A ring of `size` nodes.
pub fn cycle(size: usize) -> CsrGraph {
    assert!(size >= 3, "cycle size must be at least 3");

    let mut builder = CsrGraph::start_construction(size, 2 * size);
    for v in 0..size {
        let node = builder.new_node();
        builder.new_edge(node, (v + 1) % size);
        builder.new_edge(node, if v == 0 { size - 1 } else { v - 1 });
    }
    builder.finish_construction()
}

/// A ring of `size` nodes (even) with a chord from every node to the node
/// on the opposite side of the ring.
pub fn cycle_with_chords(size: usize) -> CsrGraph {
    assert!(size >= 4, "cycle size must be at least 4");
    assert!(size % 2 == 0, "only even node counts are supported");

    let mut builder = CsrGraph::start_construction(size, 3 * size);
    for v in 0..size {
        let node = builder.new_node();
        builder.new_edge(node, if v == 0 { size - 1 } else { v - 1 });
        builder.new_edge(node, (v + 1) % size);
        if v < size / 2 {
            builder.new_edge(node, v + size / 2);
        } else {
            builder.new_edge(node, v - size / 2);
        }
    }
    builder.finish_construction()
}

/// A `size` by `size` grid.
pub fn rectangle(size: usize) -> CsrGraph {
    assert!(size > 0, "grid size must be greater than zero");

    let mut builder = CsrGraph::start_construction(size * size, 4 * (size - 1) * size);
    for v in 0..size * size {
        let node = builder.new_node();
        let x = v % size;
        let y = v / size;

        if x > 0 {
            builder.new_edge(node, (x - 1) + y * size);
        }
        if x < size - 1 {
            builder.new_edge(node, (x + 1) + y * size);
        }
        if y > 0 {
            builder.new_edge(node, x + (y - 1) * size);
        }
        if y < size - 1 {
            builder.new_edge(node, x + (y + 1) * size);
        }
    }
    builder.finish_construction()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clique_is_complete() {
        let graph = clique(5);
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 20);
        assert_eq!(graph.neighbors(2), &[0, 1, 3, 4]);
    }

    #[test]
    fn bridged_biclique_has_one_connecting_edge() {
        let graph = biclique(4, 4, true);
        assert_eq!(graph.node_count(), 8);
        assert_eq!(graph.edge_count(), 26);
        assert!(graph.neighbors(0).contains(&4));
        assert!(graph.neighbors(4).contains(&0));
        assert!(!graph.neighbors(1).iter().any(|&u| u >= 4));
    }

    #[test]
    fn disconnected_biclique_has_no_connecting_edge() {
        let graph = biclique(3, 4, false);
        assert_eq!(graph.edge_count(), 3 * 2 + 4 * 3);
        assert!(!graph.neighbors(0).iter().any(|&u| u >= 3));
    }

    #[test]
    fn cycle_degrees_are_two() {
        let graph = cycle(10);
        assert_eq!(graph.node_count(), 10);
        assert_eq!(graph.edge_count(), 20);
        assert!((0..10).all(|v| graph.degree(v) == 2));
        assert_eq!(graph.neighbors(0), &[1, 9]);
    }

    #[test]
    fn chords_connect_opposite_nodes() {
        let graph = cycle_with_chords(8);
        assert_eq!(graph.edge_count(), 24);
        assert!(graph.neighbors(1).contains(&5));
        assert!(graph.neighbors(5).contains(&1));
    }

    #[test]
    fn rectangle_is_a_grid() {
        let graph = rectangle(3);
        assert_eq!(graph.node_count(), 9);
        assert_eq!(graph.edge_count(), 24);
        // corner, border and center degrees
        assert_eq!(graph.degree(0), 2);
        assert_eq!(graph.degree(1), 3);
        assert_eq!(graph.degree(4), 4);
    }

    #[test]
    fn increasing_cliques_chain_up() {
        let graph = increasing_cliques(3);
        assert_eq!(graph.node_count(), 6);
        // cliques {0}, {1, 2} and {3, 4, 5} plus bridges {0,1} and {2,3}
        assert!(graph.neighbors(0).contains(&1));
        assert!(graph.neighbors(2).contains(&3));
        assert!(graph.neighbors(4).contains(&3));
        assert!(graph.neighbors(4).contains(&5));
    }
}
