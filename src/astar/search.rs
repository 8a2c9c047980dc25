// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::iter::FusedIterator;
use std::slice;

use super::step::{Route, SearchOptions, Step};
use crate::{earth_distance, Edge, Graph, Mode, Node};

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: i64,
    cost: f64,
    score: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.score.total_cmp(&other.score).is_eq()
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: We revert the order of comparison,
        // as lower scores are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.score.total_cmp(&self.score)
    }
}

/// Outgoing edges of a node taken from the queue, consumed one [Step] at a time.
#[derive(Debug)]
struct Expansion<'g> {
    at: i64,
    cost: f64,
    arrived_by_way: Option<i64>,
    edges: slice::Iter<'g, Edge>,
}

/// Lazy [A* search](https://en.wikipedia.org/wiki/A*_search_algorithm) over a [Graph],
/// yielding the [Steps](Step) of the exploration.
///
/// Every usable edge of every expanded node produces a [Step::Explore],
/// in the order in which nodes are taken from the priority queue. The last
/// element is always the single terminal step. Afterwards the iterator is exhausted.
///
/// The search can be paused and resumed by pulling from the iterator at any pace,
/// or abandoned by dropping it.
#[derive(Debug)]
pub struct Search<'g> {
    g: &'g Graph,
    mode: Mode,
    options: SearchOptions,
    start: i64,
    goal: Option<&'g Node>,

    queue: BinaryHeap<QueueItem>,
    known_costs: HashMap<i64, f64>,
    came_from: HashMap<i64, &'g Edge>,
    closed: HashSet<i64>,
    expansion: Option<Expansion<'g>>,

    immediate: Option<Step<'g>>,
    finished: bool,
}

/// Starts an A* search for the fastest route from `start` to `end` in the provided [Mode].
///
/// Edges are rejected if [Mode::can_access] or [Mode::can_traverse] disallow them.
/// Unless [SearchOptions::ignore_restrictions] is set, cars additionally obey
/// prohibitory turn restrictions, and no mode may enter a node with a barrier
/// which [blocks](Mode::is_blocked_by) it.
///
/// If either node doesn't exist, the only step is [Step::NoRoute]. If `start == end`,
/// the only step is [Step::Done] with an empty route.
pub fn search(g: &Graph, start: i64, end: i64, mode: Mode, options: SearchOptions) -> Search<'_> {
    let mut s = Search {
        g,
        mode,
        options,
        start,
        goal: g.get_node(end),
        queue: BinaryHeap::default(),
        known_costs: HashMap::default(),
        came_from: HashMap::default(),
        closed: HashSet::default(),
        expansion: None,
        immediate: None,
        finished: false,
    };

    match (g.get_node(start), s.goal) {
        (Some(from_node), Some(_)) if start == end => {
            s.immediate = Some(Step::Done(Route {
                edges: Vec::default(),
                node_ids: vec![from_node.id],
                time: 0.0,
            }));
        }

        (Some(from_node), Some(_)) => {
            let score = s.heuristic(from_node);
            s.queue.push(QueueItem {
                at: start,
                cost: 0.0,
                score,
            });
            s.known_costs.insert(start, 0.0);
        }

        _ => {
            log::debug!("no route from {} to {}: unknown node", start, end);
            s.immediate = Some(Step::NoRoute);
        }
    }

    s
}

/// Runs a [search] to completion, discarding exploration steps.
pub fn find_route(
    g: &Graph,
    start: i64,
    end: i64,
    mode: Mode,
    options: SearchOptions,
) -> Option<Route> {
    search(g, start, end, mode, options).find_map(|step| match step {
        Step::Done(route) => Some(route),
        _ => None,
    })
}

impl<'g> Search<'g> {
    /// Lower bound of the travel time (in seconds) from a node to the goal.
    fn heuristic(&self, node: &Node) -> f64 {
        match self.goal {
            Some(goal) => {
                earth_distance(node.lat, node.lon, goal.lat, goal.lon) / (self.mode.max_speed() / 3.6)
            }
            None => 0.0,
        }
    }

    /// Checks whether `edge` may be taken after arriving at its start node through `arrived_by_way`.
    fn is_usable(&self, edge: &Edge, arrived_by_way: Option<i64>) -> bool {
        let ignore = self.options.ignore_restrictions;

        if !self.mode.can_access(edge) || !self.mode.can_traverse(edge, ignore) {
            return false;
        }

        if self.mode == Mode::Car && !ignore {
            if let Some(way_id) = arrived_by_way {
                if self.g.is_turn_prohibited(way_id, edge.from, edge.way_id) {
                    return false;
                }
            }
        }

        if !ignore {
            if let Some(neighbor) = self.g.get_node(edge.to) {
                if self.mode.is_blocked_by(neighbor) {
                    return false;
                }
            }
        }

        true
    }

    fn relax(&mut self, from_cost: f64, edge: &'g Edge) {
        let cost = from_cost + self.mode.travel_time(edge);
        let known = self
            .known_costs
            .get(&edge.to)
            .cloned()
            .unwrap_or(f64::INFINITY);
        if cost >= known {
            return;
        }

        let Some(neighbor) = self.g.get_node(edge.to) else {
            return;
        };

        let score = cost + self.heuristic(neighbor);
        self.came_from.insert(edge.to, edge);
        self.known_costs.insert(edge.to, cost);
        self.queue.push(QueueItem {
            at: edge.to,
            cost,
            score,
        });
    }

    fn reconstruct_route(&self, goal: i64, time: f64) -> Route {
        let mut edges: Vec<Edge> = Vec::default();
        let mut at = goal;

        while at != self.start {
            match self.came_from.get(&at) {
                Some(&edge) => {
                    edges.push(edge.clone());
                    at = edge.from;
                }
                None => break,
            }
        }

        edges.reverse();

        let mut node_ids = Vec::with_capacity(edges.len() + 1);
        node_ids.push(self.start);
        node_ids.extend(edges.iter().map(|e| e.to));

        Route {
            edges,
            node_ids,
            time,
        }
    }

    fn finish(&mut self, step: Step<'g>) -> Option<Step<'g>> {
        self.finished = true;
        self.expansion = None;
        self.queue.clear();
        Some(step)
    }
}

impl<'g> Iterator for Search<'g> {
    type Item = Step<'g>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if let Some(step) = self.immediate.take() {
            return self.finish(step);
        }

        loop {
            if let Some(mut expansion) = self.expansion.take() {
                while let Some(edge) = expansion.edges.next() {
                    if !self.is_usable(edge, expansion.arrived_by_way) {
                        continue;
                    }

                    self.relax(expansion.cost, edge);
                    let from = expansion.at;
                    self.expansion = Some(expansion);
                    return Some(Step::Explore {
                        from,
                        to: edge.to,
                        edge,
                    });
                }
            }

            let Some(item) = self.queue.pop() else {
                return self.finish(Step::NoRoute);
            };

            if self.closed.contains(&item.at) {
                continue;
            }

            if self.goal.is_some_and(|goal| goal.id == item.at) {
                let route = self.reconstruct_route(item.at, item.cost);
                return self.finish(Step::Done(route));
            }

            self.closed.insert(item.at);
            self.expansion = Some(Expansion {
                at: item.at,
                cost: item.cost,
                arrived_by_way: self.came_from.get(&item.at).map(|e| e.way_id),
                edges: self.g.get_edges(item.at).iter(),
            });
        }
    }
}

impl<'g> FusedIterator for Search<'g> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-6),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    fn run(g: &Graph, start: i64, end: i64, mode: Mode, ignore_restrictions: bool) -> Vec<Step<'_>> {
        let steps: Vec<Step<'_>> =
            search(g, start, end, mode, SearchOptions { ignore_restrictions }).collect();

        let terminal = steps.iter().filter(|s| s.is_terminal()).count();
        assert_eq!(terminal, 1, "trace must contain exactly one terminal step");
        assert!(steps.last().unwrap().is_terminal());
        steps
    }

    fn route(g: &Graph, start: i64, end: i64, mode: Mode, ignore_restrictions: bool) -> Option<Route> {
        match run(g, start, end, mode, ignore_restrictions).pop() {
            Some(Step::Done(r)) => Some(r),
            _ => None,
        }
    }

    /// 1 ─── 2 ─── 3, both segments ~100 m.
    const LINEAR: &str = "<osm>
        <node id='1' lat='0.0' lon='0.0'/>
        <node id='2' lat='0.0' lon='0.0009'/>
        <node id='3' lat='0.0' lon='0.0018'/>
        <way id='10'>
            <nd ref='1'/><nd ref='2'/><nd ref='3'/>
            <tag k='highway' v='residential'/>
        </way>
    </osm>";

    #[test]
    fn linear_route() {
        let g = osm::parse(LINEAR);
        let r = route(&g, 1, 3, Mode::Car, false).unwrap();

        assert_eq!(r.node_ids, vec![1, 2, 3]);
        assert_eq!(r.edges.len(), 2);
        assert_eq!((r.edges[0].from, r.edges[0].to), (1, 2));
        assert_eq!((r.edges[1].from, r.edges[1].to), (2, 3));

        let expected_time: f64 = r.edges.iter().map(|e| Mode::Car.travel_time(e)).sum();
        assert_almost_eq!(r.time, expected_time);
        assert!((r.distance() - 200.151).abs() < 0.01, "got {}", r.distance());
    }

    #[test]
    fn explore_steps_follow_edges() {
        let g = osm::parse(LINEAR);
        let steps = run(&g, 1, 3, Mode::Car, false);
        assert!(steps.len() > 1);

        for step in &steps[..steps.len() - 1] {
            match step {
                Step::Explore { from, to, edge } => {
                    assert_eq!(*from, edge.from);
                    assert_eq!(*to, edge.to);
                }
                _ => panic!("unexpected terminal step"),
            }
        }

        // 1 is expanded first, and only has the edge towards 2
        assert!(matches!(steps[0], Step::Explore { from: 1, to: 2, .. }));
    }

    #[test]
    fn search_is_fused() {
        let g = osm::parse(LINEAR);
        let mut s = search(&g, 1, 3, Mode::Car, SearchOptions::default());
        for step in s.by_ref() {
            if step.is_terminal() {
                break;
            }
        }
        assert!(s.next().is_none());
        assert!(s.next().is_none());
    }

    #[test]
    fn unknown_nodes() {
        let g = osm::parse(LINEAR);
        assert_eq!(run(&g, 1, 42, Mode::Car, false), vec![Step::NoRoute]);
        assert_eq!(run(&g, 42, 1, Mode::Car, false), vec![Step::NoRoute]);
        assert_eq!(run(&g, 42, 42, Mode::Car, false), vec![Step::NoRoute]);
    }

    #[test]
    fn start_equals_end() {
        let g = osm::parse(LINEAR);
        assert_eq!(
            run(&g, 2, 2, Mode::Bicycle, false),
            vec![Step::Done(Route {
                edges: vec![],
                node_ids: vec![2],
                time: 0.0,
            })]
        );
    }

    /// 1 ─── 3 is slow and gets relaxed first, then 1 ─── 2 ─── 3 improves the cost of 3.
    /// 9 is unreachable, so every queued entry (including the stale one for 3) is popped.
    const REVISITED: &str = "<osm>
        <node id='1' lat='0.0' lon='0.0'/>
        <node id='2' lat='0.0001' lon='0.001'/>
        <node id='3' lat='0.0' lon='0.002'/>
        <node id='8' lat='1.0' lon='1.0'/>
        <node id='9' lat='1.0' lon='1.001'/>
        <way id='10'>
            <nd ref='1'/><nd ref='3'/>
            <tag k='highway' v='living_street'/>
            <tag k='maxspeed' v='5'/>
        </way>
        <way id='11'>
            <nd ref='1'/><nd ref='2'/><nd ref='3'/>
            <tag k='highway' v='primary'/>
        </way>
        <way id='12'>
            <nd ref='8'/><nd ref='9'/>
            <tag k='highway' v='residential'/>
        </way>
    </osm>";

    #[test]
    fn closed_nodes_are_expanded_once() {
        let g = osm::parse(REVISITED);
        let steps = run(&g, 1, 9, Mode::Car, false);
        assert_eq!(steps.last(), Some(&Step::NoRoute));

        let mut explored: HashMap<(i64, i64, i64), usize> = HashMap::default();
        for step in &steps {
            if let Step::Explore { from, to, edge } = step {
                *explored.entry((edge.way_id, *from, *to)).or_default() += 1;
            }
        }

        assert!(explored.values().all(|&n| n == 1), "duplicated steps: {:?}", explored);

        // Each of the 3 reachable nodes is expanded exactly once, over all of its edges
        assert_eq!(explored.len(), 6);
        assert_eq!(explored.keys().filter(|(_, from, _)| *from == 3).count(), 2);
    }

    #[test]
    fn faster_path_replaces_slower_one() {
        let g = osm::parse(REVISITED);
        let r = route(&g, 1, 3, Mode::Car, false).unwrap();
        assert_eq!(r.node_ids, vec![1, 2, 3]);
    }

    const ONEWAY: &str = "<osm>
        <node id='1' lat='0.0' lon='0.0'/>
        <node id='2' lat='0.0' lon='0.001'/>
        <way id='10'>
            <nd ref='1'/><nd ref='2'/>
            <tag k='highway' v='residential'/>
            <tag k='oneway' v='yes'/>
        </way>
    </osm>";

    #[test]
    fn oneway() {
        let g = osm::parse(ONEWAY);

        assert_eq!(run(&g, 2, 1, Mode::Car, false), vec![Step::NoRoute]);
        assert_eq!(run(&g, 2, 1, Mode::Bicycle, false), vec![Step::NoRoute]);
        assert!(route(&g, 1, 2, Mode::Car, false).is_some());

        let r = route(&g, 2, 1, Mode::Pedestrian, false).unwrap();
        assert_eq!(r.edges.len(), 1);
        assert!(r.edges[0].is_reverse);

        let r = route(&g, 2, 1, Mode::Car, true).unwrap();
        assert_eq!(r.node_ids, vec![2, 1]);
    }

    #[test]
    fn prefers_faster_route_over_shorter() {
        // Direct 1-3 is 200 m at 10 km/h, detour 1-2-3 is 2 × 150 m at 100 km/h
        let g = osm::parse(
            "<osm>
            <node id='1' lat='0.0' lon='0.0'/>
            <node id='2' lat='0.0010055' lon='0.0008993'/>
            <node id='3' lat='0.0' lon='0.0017986'/>
            <way id='10'>
                <nd ref='1'/><nd ref='3'/>
                <tag k='highway' v='residential'/>
                <tag k='maxspeed' v='10'/>
            </way>
            <way id='11'>
                <nd ref='1'/><nd ref='2'/><nd ref='3'/>
                <tag k='highway' v='primary'/>
                <tag k='maxspeed' v='100'/>
            </way>
        </osm>",
        );

        let r = route(&g, 1, 3, Mode::Car, false).unwrap();
        assert_eq!(r.node_ids, vec![1, 2, 3]);
        assert!(r.distance() > 200.0);
        assert!(r.time < 72.0);

        // Bicycles go at the same speed everywhere, so the shorter road wins
        let r = route(&g, 1, 3, Mode::Bicycle, false).unwrap();
        assert_eq!(r.node_ids, vec![1, 3]);
    }

    #[test]
    fn turn_restriction() {
        //     4 ───────┐
        //    /         3
        //   1 ─── 2 ───┘
        let g = osm::parse(
            "<osm>
            <node id='1' lat='0.0' lon='0.0'/>
            <node id='2' lat='0.0' lon='0.001'/>
            <node id='3' lat='0.001' lon='0.001'/>
            <node id='4' lat='0.0005' lon='-0.0005'/>
            <way id='100'><nd ref='1'/><nd ref='2'/><tag k='highway' v='residential'/></way>
            <way id='200'><nd ref='2'/><nd ref='3'/><tag k='highway' v='residential'/></way>
            <way id='300'><nd ref='1'/><nd ref='4'/><tag k='highway' v='residential'/></way>
            <way id='400'><nd ref='4'/><nd ref='3'/><tag k='highway' v='residential'/></way>
            <relation id='900'>
                <member type='way' ref='100' role='from'/>
                <member type='node' ref='2' role='via'/>
                <member type='way' ref='200' role='to'/>
                <tag k='type' v='restriction'/>
                <tag k='restriction' v='no_left_turn'/>
            </relation>
        </osm>",
        );

        let r = route(&g, 1, 3, Mode::Car, false).unwrap();
        assert_eq!(r.node_ids, vec![1, 4, 3]);
        let ways: Vec<i64> = r.edges.iter().map(|e| e.way_id).collect();
        assert_eq!(ways, vec![300, 400]);

        let r = route(&g, 1, 3, Mode::Bicycle, false).unwrap();
        assert_eq!(r.node_ids, vec![1, 2, 3]);

        let r = route(&g, 1, 3, Mode::Car, true).unwrap();
        assert_eq!(r.node_ids, vec![1, 2, 3]);

        // The restriction only applies when coming from way 100
        let r = route(&g, 2, 3, Mode::Car, false).unwrap();
        assert_eq!(r.node_ids, vec![2, 3]);
    }

    const BOLLARD: &str = "<osm>
        <node id='1' lat='0.0' lon='0.0'/>
        <node id='2' lat='0.0' lon='0.001'><tag k='barrier' v='bollard'/></node>
        <node id='3' lat='0.001' lon='0.001'/>
        <node id='4' lat='0.0005' lon='-0.0005'/>
        <way id='10'><nd ref='1'/><nd ref='2'/><nd ref='3'/><tag k='highway' v='residential'/></way>
        <way id='11'><nd ref='1'/><nd ref='4'/><nd ref='3'/><tag k='highway' v='residential'/></way>
    </osm>";

    #[test]
    fn barrier() {
        let g = osm::parse(BOLLARD);

        let r = route(&g, 1, 3, Mode::Car, false).unwrap();
        assert_eq!(r.node_ids, vec![1, 4, 3]);

        let r = route(&g, 1, 3, Mode::Pedestrian, false).unwrap();
        assert_eq!(r.node_ids, vec![1, 2, 3]);

        let r = route(&g, 1, 3, Mode::Car, true).unwrap();
        assert_eq!(r.node_ids, vec![1, 2, 3]);
    }

    #[test]
    fn blocked_edges_are_not_traced() {
        let g = osm::parse(BOLLARD);
        let steps = run(&g, 1, 3, Mode::Car, false);
        assert!(steps
            .iter()
            .all(|s| !matches!(s, Step::Explore { to: 2, .. })));
    }

    #[test]
    fn inaccessible_roads() {
        let g = osm::parse(
            "<osm>
            <node id='1' lat='0.0' lon='0.0'/>
            <node id='2' lat='0.0' lon='0.001'/>
            <way id='10'><nd ref='1'/><nd ref='2'/><tag k='highway' v='footway'/></way>
        </osm>",
        );

        assert_eq!(run(&g, 1, 2, Mode::Car, false), vec![Step::NoRoute]);
        assert_eq!(run(&g, 1, 2, Mode::Car, true), vec![Step::NoRoute]);
        assert!(route(&g, 1, 2, Mode::Pedestrian, false).is_some());
    }

    #[test]
    fn find_route_matches_trace() {
        let g = osm::parse(BOLLARD);
        let from_trace = route(&g, 1, 3, Mode::Car, false);
        let direct = find_route(&g, 1, 3, Mode::Car, SearchOptions::default());
        assert_eq!(from_trace, direct);

        assert_eq!(find_route(&g, 1, 42, Mode::Car, SearchOptions::default()), None);
    }
}
