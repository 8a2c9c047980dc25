// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Shortest-time routing over [OpenStreetMap](https://www.openstreetmap.org/) data,
//! with the search exposed as a replayable sequence of exploration steps.
//!
//! OSM XML is converted into a directed [Graph] where every way segment is present
//! in both directions, and the legality of using an edge, a direction or a barrier
//! is decided at search time by the rules of a travel [Mode]. Arbitrary coordinates
//! are matched onto the graph with [snap_to_road], and A* ([search]) yields a lazy
//! trace of explored edges ending in exactly one terminal [Step].
//!
//! # Example
//!
//! ```no_run
//! use routetrace::{osm, Mode, SearchOptions, Step};
//!
//! let g = osm::parse_file("path/to/monaco.osm", osm::FileFormat::Unknown)
//!     .expect("failed to load monaco.osm");
//!
//! let start = routetrace::snap_to_road(&g, 43.7384, 7.4246, Mode::Car).unwrap();
//! let end = routetrace::snap_to_road(&g, 43.7478, 7.4323, Mode::Car).unwrap();
//!
//! for step in routetrace::search(&g, start.node_id, end.node_id, Mode::Car, SearchOptions::default()) {
//!     match step {
//!         Step::Explore { from, to, .. } => println!("explored {} -> {}", from, to),
//!         Step::Done(route) => println!("route: {:?}", route.node_ids),
//!         Step::NoRoute => println!("no route"),
//!     }
//! }
//! ```

mod astar;
mod distance;
mod graph;
pub mod osm;
mod profile;
mod snap;

pub use astar::{find_route, search, Route, Search, SearchOptions, Step};
pub use distance::{earth_distance, polyline_length};
pub use graph::Graph;
pub use profile::Mode;
pub use snap::{snap_to_road, trim_route_to_snap_points, SnapResult};

/// A WGS84 position, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to another coordinate, in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        earth_distance(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Represents a point of the [Graph] - an OSM node referenced by at least one routable way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,

    /// Value of the [barrier](https://wiki.openstreetmap.org/wiki/Key:barrier) tag, if any.
    pub barrier: Option<Barrier>,
}

impl Node {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Interpretation of the [barrier](https://wiki.openstreetmap.org/wiki/Key:barrier) tag.
///
/// Values not relevant for routing collapse into [Barrier::Other].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Barrier {
    Bollard,
    Block,
    CycleBarrier,
    BusTrap,
    KissingGate,
    Stile,
    Turnstile,
    Planter,
    HeightRestrictor,
    SallyPort,
    Gate,
    LiftGate,
    CattleGrid,
    /// The bare `barrier=yes` tag.
    Yes,
    Other,
}

impl Barrier {
    pub fn from_tag(value: &str) -> Self {
        match value {
            "bollard" => Self::Bollard,
            "block" => Self::Block,
            "cycle_barrier" => Self::CycleBarrier,
            "bus_trap" => Self::BusTrap,
            "kissing_gate" => Self::KissingGate,
            "stile" => Self::Stile,
            "turnstile" => Self::Turnstile,
            "planter" => Self::Planter,
            "height_restrictor" => Self::HeightRestrictor,
            "sally_port" => Self::SallyPort,
            "gate" => Self::Gate,
            "lift_gate" => Self::LiftGate,
            "cattle_grid" => Self::CattleGrid,
            "yes" => Self::Yes,
            _ => Self::Other,
        }
    }
}

/// Value of a per-way [access tag](https://wiki.openstreetmap.org/wiki/Key:access).
///
/// Edges keep these as `Option<Access>`: a missing tag (`None`) means
/// "no override, fall through to the next rule", which is not the same as [Access::No].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Yes,
    No,
    Private,
    Destination,
    Permissive,
    Designated,
    Other,
}

impl Access {
    pub fn from_tag(value: &str) -> Self {
        match value {
            "yes" => Self::Yes,
            "no" => Self::No,
            "private" => Self::Private,
            "destination" => Self::Destination,
            "permissive" => Self::Permissive,
            "designated" => Self::Designated,
            _ => Self::Other,
        }
    }

    /// Only `no` and `private` deny access. `destination` is treated as allowed.
    pub fn is_denied(self) -> bool {
        matches!(self, Self::No | Self::Private)
    }
}

/// Represents a directed connection between two [Nodes](Node), created from
/// a single segment of an OSM way.
///
/// Every way segment produces two edges: one following the way's node order
/// (`is_reverse == false`) and one against it (`is_reverse == true`). Whether
/// a direction may actually be used is decided by [Mode::can_traverse].
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub way_id: i64,
    pub from: i64,
    pub to: i64,
    pub highway: String,

    /// Speed limit in km/h; 0 if unset.
    pub maxspeed: u32,
    pub oneway: bool,

    /// False only if the way is tagged `oneway:bicycle=no`.
    pub oneway_bicycle: bool,
    pub is_reverse: bool,

    /// Length of the geometry, in meters.
    pub distance: f64,

    /// Shape of the edge, running from `from` to `to`.
    pub geometry: Vec<Coordinate>,

    pub access: Option<Access>,
    pub motor_vehicle: Option<Access>,
    pub vehicle: Option<Access>,
    pub bicycle: Option<Access>,
    pub foot: Option<Access>,
}

impl Edge {
    /// Returns true if both edges were created from the same way segment,
    /// regardless of their direction.
    pub fn same_segment(&self, other: &Edge) -> bool {
        self.way_id == other.way_id
            && ((self.from == other.from && self.to == other.to)
                || (self.from == other.to && self.to == other.from))
    }
}

/// Kind of a [TurnRestriction], taken from the prefix of its `restriction` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionKind {
    /// `no_*` - the turn is prohibited.
    Prohibitory,

    /// `only_*` - the turn is the only one allowed. Not enforced during search.
    Mandatory,

    Unknown,
}

/// A [turn restriction](https://wiki.openstreetmap.org/wiki/Relation:restriction)
/// from one way to another through a single via node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRestriction {
    pub from_way: i64,
    pub via_node: i64,
    pub to_way: i64,

    /// Value of the `restriction` tag, e.g. `no_left_turn`.
    pub restriction: String,
}

impl TurnRestriction {
    pub fn kind(&self) -> RestrictionKind {
        if self.restriction.starts_with("no_") {
            RestrictionKind::Prohibitory
        } else if self.restriction.starts_with("only_") {
            RestrictionKind::Mandatory
        } else {
            RestrictionKind::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restriction_kind() {
        let mut r = TurnRestriction {
            from_way: 1,
            via_node: 2,
            to_way: 3,
            restriction: "no_u_turn".to_string(),
        };
        assert_eq!(r.kind(), RestrictionKind::Prohibitory);

        r.restriction = "only_straight_on".to_string();
        assert_eq!(r.kind(), RestrictionKind::Mandatory);

        r.restriction = "give_way".to_string();
        assert_eq!(r.kind(), RestrictionKind::Unknown);
    }

    #[test]
    fn access_denial() {
        assert!(Access::from_tag("no").is_denied());
        assert!(Access::from_tag("private").is_denied());
        assert!(!Access::from_tag("destination").is_denied());
        assert!(!Access::from_tag("yes").is_denied());
        assert!(!Access::from_tag("customers").is_denied());
    }

    #[test]
    fn barrier_from_tag() {
        assert_eq!(Barrier::from_tag("bollard"), Barrier::Bollard);
        assert_eq!(Barrier::from_tag("yes"), Barrier::Yes);
        assert_eq!(Barrier::from_tag("Bollard"), Barrier::Other);
    }
}
