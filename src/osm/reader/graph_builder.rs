// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::{earth_distance, Access, Barrier, Edge, Graph, Node, TurnRestriction};

use super::model::{self, FeatureType};

/// Helper object used for storing state related to converting [OSM features](super::model::Feature)
/// into a [Graph].
///
/// Features may arrive in any order: nodes are indexed immediately, while ways and
/// relations are buffered and only resolved in [GraphBuilder::finish].
#[derive(Debug, Default)]
pub(super) struct GraphBuilder {
    nodes: HashMap<i64, Node>,
    ways: Vec<model::Way>,
    relations: Vec<model::Relation>,
}

/// Way-level attributes shared by all edges created from a single way.
#[derive(Debug, Clone, PartialEq)]
struct WayAttributes {
    highway: String,
    maxspeed: u32,
    oneway: bool,
    oneway_bicycle: bool,
    access: Option<Access>,
    motor_vehicle: Option<Access>,
    vehicle: Option<Access>,
    bicycle: Option<Access>,
    foot: Option<Access>,
}

impl WayAttributes {
    /// Interprets tags of a way. Returns `None` for ways without a `highway` tag.
    fn from_tags(tags: &HashMap<String, String>) -> Option<Self> {
        let highway = tags.get("highway")?.clone();
        let access_tag = |key: &str| tags.get(key).map(|v| Access::from_tag(v));

        Some(Self {
            highway,
            maxspeed: tags.get("maxspeed").map_or(0, |v| parse_maxspeed(v)),
            oneway: matches!(
                tags.get("oneway").map(|v| v.as_str()),
                Some("yes") | Some("1") | Some("true")
            ),
            oneway_bicycle: tags.get("oneway:bicycle").map(|v| v.as_str()) != Some("no"),
            access: access_tag("access"),
            motor_vehicle: access_tag("motor_vehicle"),
            vehicle: access_tag("vehicle"),
            bicycle: access_tag("bicycle"),
            foot: access_tag("foot"),
        })
    }

    fn edge(&self, way_id: i64, from: &Node, to: &Node, distance: f64, is_reverse: bool) -> Edge {
        Edge {
            way_id,
            from: from.id,
            to: to.id,
            highway: self.highway.clone(),
            maxspeed: self.maxspeed,
            oneway: self.oneway,
            oneway_bicycle: self.oneway_bicycle,
            is_reverse,
            distance,
            geometry: vec![from.coordinate(), to.coordinate()],
            access: self.access,
            motor_vehicle: self.motor_vehicle,
            vehicle: self.vehicle,
            bicycle: self.bicycle,
            foot: self.foot,
        }
    }
}

/// Reads the leading integer of a `maxspeed` value (`"50 mph"` → 50, `"30;50"` → 30),
/// returning 0 if there is none.
fn parse_maxspeed(value: &str) -> u32 {
    let value = value.trim_start();
    let digits = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
    value[..digits].parse().unwrap_or(0)
}

impl GraphBuilder {
    /// Add all features from the provided iterator, stopping at the first error.
    pub(super) fn add_features<I, E>(&mut self, features: I) -> Result<(), E>
    where
        I: IntoIterator<Item = Result<model::Feature, E>>,
    {
        for f in features {
            self.add_feature(f?);
        }
        Ok(())
    }

    fn add_feature(&mut self, f: model::Feature) {
        match f {
            model::Feature::Node(n) => self.add_node(n),
            model::Feature::Way(w) => self.ways.push(w),
            model::Feature::Relation(r) => self.relations.push(r),
        }
    }

    fn add_node(&mut self, n: model::Node) {
        let barrier = n.tags.get("barrier").map(|v| Barrier::from_tag(v));
        self.nodes.insert(
            n.id,
            Node {
                id: n.id,
                lat: n.lat,
                lon: n.lon,
                barrier,
            },
        );
    }

    /// Resolves all buffered ways and relations into a [Graph].
    /// Only nodes used by at least one edge end up in the graph.
    pub(super) fn finish(self) -> Graph {
        let mut g = Graph::default();

        for w in &self.ways {
            self.add_way(&mut g, w);
        }

        for r in &self.relations {
            if let Some(restriction) = Self::get_restriction(r) {
                g.push_restriction(restriction);
            }
        }

        log::info!(
            "loaded graph with {} nodes, {} edges and {} turn restrictions",
            g.len(),
            g.edge_count(),
            g.restrictions().len(),
        );
        g
    }

    fn add_way(&self, g: &mut Graph, w: &model::Way) {
        let Some(attributes) = WayAttributes::from_tags(&w.tags) else {
            log::debug!("skipping way {}: no highway tag", w.id);
            return;
        };

        for pair in w.nodes.windows(2) {
            let (Some(left), Some(right)) = (self.nodes.get(&pair[0]), self.nodes.get(&pair[1]))
            else {
                log::debug!(
                    "skipping segment {} -> {} of way {}: reference to unknown node",
                    pair[0],
                    pair[1],
                    w.id
                );
                continue;
            };

            let distance = earth_distance(left.lat, left.lon, right.lat, right.lon);

            for node in [left, right] {
                if g.get_node(node.id).is_none() {
                    g.set_node(*node);
                }
            }

            g.push_edge(attributes.edge(w.id, left, right, distance, false));
            g.push_edge(attributes.edge(w.id, right, left, distance, true));
        }
    }

    /// Extracts a from-way, via-node, to-way [TurnRestriction] from a relation.
    fn get_restriction(r: &model::Relation) -> Option<TurnRestriction> {
        if r.tags.get("type").map(|v| v.as_str()) != Some("restriction") {
            return None;
        }

        let restriction = match r.tags.get("restriction") {
            Some(v) if !v.is_empty() => v.clone(),
            _ => {
                log::debug!("skipping restriction {}: no restriction tag", r.id);
                return None;
            }
        };

        let member = |role: &str, type_: FeatureType| {
            r.members
                .iter()
                .find(|m| m.role == role && m.type_ == type_)
                .map(|m| m.ref_)
                .filter(|&ref_| ref_ != 0)
        };

        match (
            member("from", FeatureType::Way),
            member("via", FeatureType::Node),
            member("to", FeatureType::Way),
        ) {
            (Some(from_way), Some(via_node), Some(to_way)) => Some(TurnRestriction {
                from_way,
                via_node,
                to_way,
                restriction,
            }),
            _ => {
                log::debug!("skipping restriction {}: missing from, via or to member", r.id);
                None
            }
        }
    }
}
