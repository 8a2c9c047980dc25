// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{Edge, Node, RestrictionKind, TurnRestriction};
use std::collections::btree_map::{BTreeMap, Entry};

/// Represents a routable OpenStreetMap network as a set of [Nodes](Node),
/// directed [Edges](Edge) between them and [turn restrictions](TurnRestriction).
///
/// A graph is built once by the [osm](crate::osm) parser and not mutated afterwards;
/// loading another map produces a new graph. Every node present in the graph
/// is an endpoint of at least one edge.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<i64, (Node, Vec<Edge>)>,
    restrictions: Vec<TurnRestriction>,
}

impl Graph {
    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns an iterator over all [Nodes](Node) in the graph.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(|(node, _)| node)
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: i64) -> Option<&Node> {
        self.nodes.get(&id).map(|(node, _)| node)
    }

    /// Gets all outgoing [Edges](Edge) from a node with a given id,
    /// in the order they were parsed.
    pub fn get_edges(&self, from_id: i64) -> &[Edge] {
        self.nodes
            .get(&from_id)
            .map(|(_, e)| e.as_slice())
            .unwrap_or_default()
    }

    /// Returns an iterator over all directed [Edges](Edge) in the graph.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.nodes.values().flat_map(|(_, edges)| edges.iter())
    }

    /// Returns the number of directed edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|(_, edges)| edges.len()).sum()
    }

    pub fn restrictions(&self) -> &[TurnRestriction] {
        &self.restrictions
    }

    /// Checks whether moving from `from_way` to `to_way` through `via_node`
    /// is forbidden by a prohibitory (`no_*`) turn restriction.
    pub fn is_turn_prohibited(&self, from_way: i64, via_node: i64, to_way: i64) -> bool {
        self.restrictions.iter().any(|r| {
            r.from_way == from_way
                && r.via_node == via_node
                && r.to_way == to_way
                && r.kind() == RestrictionKind::Prohibitory
        })
    }

    /// Creates or updates a [Node] with `node.id`. Outgoing edges are preserved.
    pub(crate) fn set_node(&mut self, node: Node) {
        match self.nodes.entry(node.id) {
            Entry::Vacant(e) => {
                e.insert((node, Vec::default()));
            }
            Entry::Occupied(mut e) => {
                e.get_mut().0 = node;
            }
        }
    }

    /// Appends an [Edge] to the adjacency of `edge.from`.
    /// Edges starting at unknown nodes are dropped.
    pub(crate) fn push_edge(&mut self, edge: Edge) {
        if let Some((_, edges)) = self.nodes.get_mut(&edge.from) {
            edges.push(edge);
        }
    }

    pub(crate) fn push_restriction(&mut self, restriction: TurnRestriction) {
        self.restrictions.push(restriction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64) -> Node {
        Node {
            id,
            lat: 0.0,
            lon: id as f64 * 0.001,
            barrier: None,
        }
    }

    fn edge(way_id: i64, from: i64, to: i64) -> Edge {
        Edge {
            way_id,
            from,
            to,
            highway: "residential".to_string(),
            maxspeed: 0,
            oneway: false,
            oneway_bicycle: true,
            is_reverse: false,
            distance: 111.0,
            geometry: vec![],
            access: None,
            motor_vehicle: None,
            vehicle: None,
            bicycle: None,
            foot: None,
        }
    }

    #[test]
    fn edges_keep_insertion_order() {
        let mut g = Graph::default();
        g.set_node(node(1));
        g.set_node(node(2));
        g.set_node(node(3));
        g.push_edge(edge(10, 1, 3));
        g.push_edge(edge(11, 1, 2));
        g.push_edge(edge(12, 4, 1));

        let targets: Vec<i64> = g.get_edges(1).iter().map(|e| e.to).collect();
        assert_eq!(targets, vec![3, 2]);
        assert_eq!(g.edge_count(), 2);
        assert!(g.get_edges(4).is_empty());
    }

    #[test]
    fn turn_prohibition_requires_exact_match() {
        let mut g = Graph::default();
        g.push_restriction(TurnRestriction {
            from_way: 100,
            via_node: 2,
            to_way: 200,
            restriction: "no_left_turn".to_string(),
        });
        g.push_restriction(TurnRestriction {
            from_way: 300,
            via_node: 2,
            to_way: 400,
            restriction: "only_straight_on".to_string(),
        });

        assert!(g.is_turn_prohibited(100, 2, 200));
        assert!(!g.is_turn_prohibited(200, 2, 100));
        assert!(!g.is_turn_prohibited(100, 3, 200));
        assert!(!g.is_turn_prohibited(300, 2, 400));
    }
}
