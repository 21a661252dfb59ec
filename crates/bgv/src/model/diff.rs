//! Structural comparison of two graphs.

use std::collections::BTreeSet;

use crate::model::{Graph, NodeId, Props};

/// Direction of an edge relative to the node being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Direction {
    In,
    Out,
}

type EdgeKey<'g> = (Direction, NodeId, usize, &'g Props);

impl Graph {
    /// Returns the ids of nodes that differ between `previous` and `self`.
    ///
    /// A node differs if it exists in only one graph, or if its properties
    /// or incident edges (peer, ordinal and edge properties) differ.
    /// Presentation attributes are ignored. With no previous graph every
    /// node is reported.
    pub fn diff(&self, previous: Option<&Graph>) -> BTreeSet<NodeId> {
        let Some(previous) = previous else {
            return self.node_ids().collect();
        };

        let mut modified = BTreeSet::new();
        for node in self.nodes() {
            let Some(before) = previous.node(node.id) else {
                modified.insert(node.id);
                continue;
            };
            if node.props != before.props || self.incident(node.id) != previous.incident(node.id) {
                modified.insert(node.id);
            }
        }
        modified.extend(previous.node_ids().filter(|&id| !self.contains_node(id)));
        modified
    }

    fn incident(&self, id: NodeId) -> Vec<EdgeKey<'_>> {
        let mut edges: Vec<EdgeKey<'_>> = self
            .incoming(id)
            .map(|edge| (Direction::In, edge.from, edge.ordinal, &edge.props))
            .chain(
                self.outgoing(id)
                    .map(|edge| (Direction::Out, edge.to, edge.ordinal, &edge.props)),
            )
            .collect();
        edges.sort_by_key(|&(direction, peer, ordinal, _)| (direction, peer, ordinal));
        edges
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::model::Value;

    fn graph(nodes: &[(NodeId, i64)], edges: &[(NodeId, NodeId)]) -> Graph {
        let mut graph = Graph::new();
        for &(id, value) in nodes {
            let mut props = Props::new();
            props.insert("value".to_string(), Value::Int(value));
            graph.create_node(id, None, props).unwrap();
        }
        for &(from, to) in edges {
            graph.create_edge(from, to, Props::new()).unwrap();
        }
        graph
    }

    #[test]
    fn test_diff_against_nothing_reports_everything() {
        let g = graph(&[(1, 0), (2, 0)], &[]);
        assert_eq!(g.diff(None), BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_added_and_removed_nodes() {
        let before = graph(&[(1, 0), (2, 0)], &[]);
        let after = graph(&[(1, 0), (3, 0)], &[]);
        assert_eq!(after.diff(Some(&before)), BTreeSet::from([2, 3]));
    }

    #[test]
    fn test_changed_props() {
        let before = graph(&[(1, 0), (2, 0)], &[(1, 2)]);
        let after = graph(&[(1, 0), (2, 5)], &[(1, 2)]);
        assert_eq!(after.diff(Some(&before)), BTreeSet::from([2]));
    }

    #[test]
    fn test_changed_edges_mark_both_ends() {
        let before = graph(&[(1, 0), (2, 0), (3, 0)], &[(1, 2)]);
        let after = graph(&[(1, 0), (2, 0), (3, 0)], &[(1, 3)]);
        assert_eq!(after.diff(Some(&before)), BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn test_nan_property_equals_its_clone() {
        let mut g = graph(&[(1, 0)], &[]);
        g.node_mut(1)
            .unwrap()
            .props
            .insert("probability".to_string(), Value::Float(f64::NAN));
        assert!(g.diff(Some(&g.clone())).is_empty());

        let mut changed = g.clone();
        changed
            .node_mut(1)
            .unwrap()
            .props
            .insert("probability".to_string(), Value::Float(0.5));
        assert_eq!(changed.diff(Some(&g)), BTreeSet::from([1]));
    }

    #[test]
    fn test_presentation_ignored() {
        let before = graph(&[(1, 0)], &[]);
        let mut after = before.clone();
        after.node_mut(1).unwrap().display.label = Some("changed".to_string());
        assert!(after.diff(Some(&before)).is_empty());
    }

    proptest! {
        #[test]
        fn test_diff_against_clone_is_empty(
            values in prop::collection::vec(any::<i64>(), 1..20),
            raw_edges in prop::collection::vec((any::<usize>(), any::<usize>()), 0..40),
        ) {
            let nodes: Vec<(NodeId, i64)> = values
                .iter()
                .enumerate()
                .map(|(i, &v)| (i as NodeId, v))
                .collect();
            let n = nodes.len();
            let edges: Vec<(NodeId, NodeId)> = raw_edges
                .iter()
                .map(|&(a, b)| ((a % n) as NodeId, (b % n) as NodeId))
                .collect();
            let g = graph(&nodes, &edges);
            let clone = g.clone();
            prop_assert!(g.diff(Some(&clone)).is_empty());
            prop_assert!(clone.diff(Some(&g)).is_empty());
        }

        #[test]
        fn test_float_props_diff_against_clone_is_empty(
            values in prop::collection::vec(
                prop_oneof![any::<f64>(), Just(f64::NAN), Just(-0.0), Just(f64::INFINITY)],
                1..20,
            ),
        ) {
            let mut g = Graph::new();
            for (i, &v) in values.iter().enumerate() {
                let mut props = Props::new();
                props.insert("value".to_string(), Value::Float(v));
                props.insert("narrow".to_string(), Value::Float(f64::from(v as f32)));
                g.create_node(i as NodeId, None, props).unwrap();
            }
            for i in 1..values.len() {
                let mut port = Props::new();
                port.insert("weight".to_string(), Value::Float(values[i]));
                g.create_edge((i - 1) as NodeId, i as NodeId, port).unwrap();
            }
            prop_assert!(g.diff(Some(&g.clone())).is_empty());
        }
    }
}
