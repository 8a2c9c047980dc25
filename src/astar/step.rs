// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Edge;

/// Additional controls for a [search](crate::search).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Allow cars to drive against one-way streets, and disable turn restrictions
    /// and barriers for all modes.
    pub ignore_restrictions: bool,
}

/// A single element of the search trace produced by [Search](crate::Search).
///
/// A trace consists of any number of [Step::Explore] elements followed by
/// exactly one terminal step - [Step::Done] or [Step::NoRoute].
#[derive(Debug, Clone, PartialEq)]
pub enum Step<'g> {
    /// An edge was examined and found usable, in the direction from `from` to `to`.
    Explore { from: i64, to: i64, edge: &'g Edge },

    /// The goal was reached.
    Done(Route),

    /// The goal can't be reached from the start.
    NoRoute,
}

impl<'g> Step<'g> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Explore { .. })
    }
}

/// Shortest-time route found by a [search](crate::search).
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Edges to traverse, in order, from the start to the goal.
    pub edges: Vec<Edge>,

    /// Ids of visited nodes, starting with the start and ending with the goal.
    /// Always one element longer than `edges`.
    pub node_ids: Vec<i64>,

    /// Total travel time, in seconds.
    pub time: f64,
}

impl Route {
    /// Total length of the route, in meters.
    pub fn distance(&self) -> f64 {
        self.edges.iter().map(|e| e.distance).sum()
    }
}
