// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{Access, Barrier, Edge, Node};

/// Travel mode, deciding which edges, directions and barriers may be used,
/// and how fast an edge is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Mode {
    #[default]
    Car,
    Bicycle,
    Pedestrian,
}

/// Routing properties of a single [highway](https://wiki.openstreetmap.org/wiki/Key:highway) value.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HighwayRule<'a> {
    value: &'a str,
    car: bool,
    bicycle: bool,
    pedestrian: bool,

    /// Car speed in km/h used when the edge has no `maxspeed`.
    default_speed: f64,
}

impl<'a> HighwayRule<'a> {
    const fn new(value: &'a str, modes: [bool; 3], default_speed: f64) -> Self {
        Self {
            value,
            car: modes[0],
            bicycle: modes[1],
            pedestrian: modes[2],
            default_speed,
        }
    }
}

const CAR_ONLY: [bool; 3] = [true, false, false];
const ALL: [bool; 3] = [true, true, true];
const NOT_CAR: [bool; 3] = [false, true, true];
const FOOT_ONLY: [bool; 3] = [false, false, true];
const NONE: [bool; 3] = [false, false, false];

/// Highway values usable for routing. Values absent from this table
/// are inaccessible to all modes.
const HIGHWAY_RULES: &[HighwayRule<'static>] = &[
    HighwayRule::new("motorway", CAR_ONLY, 100.0),
    HighwayRule::new("motorway_link", CAR_ONLY, 60.0),
    HighwayRule::new("trunk", CAR_ONLY, 80.0),
    HighwayRule::new("trunk_link", CAR_ONLY, 50.0),
    HighwayRule::new("primary", ALL, 60.0),
    HighwayRule::new("secondary", ALL, 50.0),
    HighwayRule::new("tertiary", ALL, 40.0),
    HighwayRule::new("residential", ALL, 30.0),
    HighwayRule::new("unclassified", ALL, 30.0),
    HighwayRule::new("service", ALL, 20.0),
    HighwayRule::new("living_street", ALL, 10.0),
    HighwayRule::new("cycleway", NOT_CAR, 15.0),
    HighwayRule::new("footway", FOOT_ONLY, 5.0),
    HighwayRule::new("pedestrian", FOOT_ONLY, 5.0),
    HighwayRule::new("path", FOOT_ONLY, 5.0),
    HighwayRule::new("steps", FOOT_ONLY, 3.0),
    HighwayRule::new("busway", NONE, 50.0),
];

/// Car speed (km/h) for highway values missing from [HIGHWAY_RULES].
const FALLBACK_CAR_SPEED: f64 = 30.0;

const BICYCLE_SPEED: f64 = 20.0;
const PEDESTRIAN_SPEED: f64 = 5.0;
const CAR_MAX_SPEED: f64 = 100.0;

fn highway_rule(highway: &str) -> Option<&'static HighwayRule<'static>> {
    HIGHWAY_RULES.iter().find(|r| r.value == highway)
}

impl Mode {
    /// Checks if an edge may be used at all in this mode.
    ///
    /// The highway type decides first. Afterwards, the most specific access override
    /// present wins: `motor_vehicle` then `vehicle` for cars, `bicycle` then `vehicle`
    /// for bicycles, and `foot` for pedestrians, falling back to the general `access` tag.
    pub fn can_access(self, edge: &Edge) -> bool {
        let allowed_by_highway = match highway_rule(&edge.highway) {
            Some(rule) => match self {
                Self::Car => rule.car,
                Self::Bicycle => rule.bicycle,
                Self::Pedestrian => rule.pedestrian,
            },
            None => false,
        };
        if !allowed_by_highway {
            return false;
        }

        let overrides: &[Option<Access>] = match self {
            Self::Car => &[edge.motor_vehicle, edge.vehicle, edge.access],
            Self::Bicycle => &[edge.bicycle, edge.vehicle, edge.access],
            Self::Pedestrian => &[edge.foot, edge.access],
        };

        match overrides.iter().find_map(|&a| a) {
            Some(access) => !access.is_denied(),
            None => true,
        }
    }

    /// Checks if an edge may be used in its own direction (from `edge.from` to `edge.to`).
    ///
    /// Pedestrians ignore one-way restrictions. Bicycles may ride against the flow
    /// only where `oneway:bicycle=no`. Cars may only do so when `ignore_restrictions` is set.
    pub fn can_traverse(self, edge: &Edge, ignore_restrictions: bool) -> bool {
        if self == Self::Pedestrian || !edge.oneway || !edge.is_reverse {
            return true;
        }

        match self {
            Self::Bicycle => !edge.oneway_bicycle,
            Self::Car => ignore_restrictions,
            Self::Pedestrian => true,
        }
    }

    /// Checks if a [Node] carries a barrier impassable in this mode.
    pub fn is_blocked_by(self, node: &Node) -> bool {
        let Some(barrier) = node.barrier else {
            return false;
        };

        match self {
            Self::Pedestrian => false,
            Self::Car => matches!(
                barrier,
                Barrier::Bollard
                    | Barrier::Block
                    | Barrier::CycleBarrier
                    | Barrier::BusTrap
                    | Barrier::KissingGate
                    | Barrier::Stile
                    | Barrier::Turnstile
                    | Barrier::Planter
                    | Barrier::HeightRestrictor
                    | Barrier::SallyPort
                    | Barrier::Yes
            ),
            Self::Bicycle => matches!(
                barrier,
                Barrier::Block | Barrier::KissingGate | Barrier::Stile | Barrier::Turnstile
            ),
        }
    }

    /// Returns the speed (in km/h) at which an edge is traversed.
    pub fn travel_speed(self, edge: &Edge) -> f64 {
        match self {
            Self::Bicycle => BICYCLE_SPEED,
            Self::Pedestrian => PEDESTRIAN_SPEED,
            Self::Car if edge.maxspeed > 0 => edge.maxspeed as f64,
            Self::Car => highway_rule(&edge.highway)
                .map(|r| r.default_speed)
                .unwrap_or(FALLBACK_CAR_SPEED),
        }
    }

    /// Returns the time (in seconds) needed to traverse an edge.
    pub fn travel_time(self, edge: &Edge) -> f64 {
        edge.distance / (self.travel_speed(edge) / 3.6)
    }

    /// Upper bound of [Mode::travel_speed] (km/h) assumed by the search heuristic.
    pub fn max_speed(self) -> f64 {
        match self {
            Self::Car => CAR_MAX_SPEED,
            Self::Bicycle => BICYCLE_SPEED,
            Self::Pedestrian => PEDESTRIAN_SPEED,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Car => write!(f, "car"),
            Self::Bicycle => write!(f, "bicycle"),
            Self::Pedestrian => write!(f, "pedestrian"),
        }
    }
}
