// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use crate::{polyline_length, Coordinate, Edge, Graph, Mode};

/// Position on the road network closest to an arbitrary point, as found by [snap_to_road].
#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    /// The endpoint of `edge` closer to `coordinate`.
    pub node_id: i64,

    /// The projection of the query point onto `edge`.
    pub coordinate: Coordinate,

    pub edge: Edge,

    /// Distance between the query point and `coordinate`, in meters.
    pub distance: f64,
}

/// Projection of a point onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Projection {
    /// Index of the polyline segment (`geometry[segment]..geometry[segment + 1]`)
    /// containing `point`.
    segment: usize,

    /// Distance from the start of the segment to `point`, in meters.
    offset: f64,

    point: Coordinate,

    /// Distance from the projected point to `point`, in meters.
    distance: f64,
}

impl Projection {
    /// Returns true if `self` lies closer to the start of the polyline than `other`.
    fn precedes(&self, other: &Projection) -> bool {
        (self.segment, self.offset) <= (other.segment, other.offset)
    }
}

/// Projects point P onto line segment AB, returning the closest point on AB.
///
/// Longitudes are scaled by the cosine of the latitude, which is accurate
/// enough on the scale of single road segments.
fn project_onto_segment(p: Coordinate, a: Coordinate, b: Coordinate) -> Coordinate {
    let scale_x = ((a.lat + b.lat) * 0.5).to_radians().cos();

    let dx = (b.lon - a.lon) * scale_x;
    let dy = b.lat - a.lat;
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        return a;
    }

    // t = dot(P-A, B-A) / |B-A|²  clamped to [0, 1]
    let t = (((p.lon - a.lon) * scale_x * dx + (p.lat - a.lat) * dy) / len_sq).clamp(0.0, 1.0);

    if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        Coordinate::new(a.lat + t * (b.lat - a.lat), a.lon + t * (b.lon - a.lon))
    }
}

/// Finds the point of a polyline closest to `p`.
/// Returns `None` for an empty polyline.
fn project_onto_polyline(geometry: &[Coordinate], p: Coordinate) -> Option<Projection> {
    if geometry.len() == 1 {
        return Some(Projection {
            segment: 0,
            offset: 0.0,
            point: geometry[0],
            distance: p.distance_to(&geometry[0]),
        });
    }

    let mut best: Option<Projection> = None;

    for (segment, pair) in geometry.windows(2).enumerate() {
        let point = project_onto_segment(p, pair[0], pair[1]);
        let distance = p.distance_to(&point);

        if best.map_or(true, |b| distance < b.distance) {
            best = Some(Projection {
                segment,
                offset: pair[0].distance_to(&point),
                point,
                distance,
            });
        }
    }

    best
}

/// Finds the closest point on any road usable in the provided [Mode].
///
/// Both directed copies of a way segment describe the same physical road,
/// so only edges in the way's own direction are considered.
/// Returns `None` if no edge is [accessible](Mode::can_access).
pub fn snap_to_road(g: &Graph, lat: f64, lon: f64, mode: Mode) -> Option<SnapResult> {
    let query = Coordinate::new(lat, lon);
    let mut seen: HashSet<(i64, i64, i64)> = HashSet::default();
    let mut best: Option<(&Edge, Projection)> = None;

    for edge in g.edges() {
        if edge.is_reverse || !mode.can_access(edge) {
            continue;
        }

        if !seen.insert((edge.way_id, edge.from, edge.to)) {
            continue;
        }

        if let Some(p) = project_onto_polyline(&edge.geometry, query) {
            if best.map_or(true, |(_, b)| p.distance < b.distance) {
                best = Some((edge, p));
            }
        }
    }

    let (edge, projection) = best?;
    Some(SnapResult {
        node_id: nearer_endpoint(g, edge, projection.point),
        coordinate: projection.point,
        edge: edge.clone(),
        distance: projection.distance,
    })
}

/// Picks the endpoint of an edge closer to `point`, preferring `edge.from` on ties.
fn nearer_endpoint(g: &Graph, edge: &Edge, point: Coordinate) -> i64 {
    let distance_to = |id: i64| {
        g.get_node(id)
            .map(|n| point.distance_to(&n.coordinate()))
            .unwrap_or(f64::INFINITY)
    };

    if distance_to(edge.from) <= distance_to(edge.to) {
        edge.from
    } else {
        edge.to
    }
}

/// Clips the route geometry so that it starts and ends exactly at the snapped points,
/// instead of at graph nodes.
///
/// Only the first and last edges are changed, and only if the corresponding snap
/// lies on the same way segment. The discarded part of the geometry is replaced by
/// the snapped coordinate, and `distance` of the trimmed edges is recomputed.
/// Input edges are left untouched.
pub fn trim_route_to_snap_points(
    edges: &[Edge],
    origin: &SnapResult,
    destination: &SnapResult,
) -> Vec<Edge> {
    let mut trimmed = edges.to_vec();

    match trimmed.as_mut_slice() {
        [] => {}

        [only] => {
            let from_origin = locate(only, origin);
            let from_destination = locate(only, destination);

            match (from_origin, from_destination) {
                (Some(o), Some(d)) => {
                    let ((first, first_at), (last, last_at)) = if o.precedes(&d) {
                        ((o, origin.coordinate), (d, destination.coordinate))
                    } else {
                        ((d, destination.coordinate), (o, origin.coordinate))
                    };
                    clip(only, Some((first.segment, first_at)), Some((last.segment, last_at)));
                }
                (Some(o), None) => clip(only, Some((o.segment, origin.coordinate)), None),
                (None, Some(d)) => clip(only, None, Some((d.segment, destination.coordinate))),
                (None, None) => {}
            }
        }

        [first, .., last] => {
            if let Some(o) = locate(first, origin) {
                if origin.node_id == first.from {
                    clip(first, Some((o.segment, origin.coordinate)), None);
                } else {
                    clip(first, None, Some((o.segment, origin.coordinate)));
                }
            }

            if let Some(d) = locate(last, destination) {
                if destination.node_id == last.to {
                    clip(last, None, Some((d.segment, destination.coordinate)));
                } else {
                    clip(last, Some((d.segment, destination.coordinate)), None);
                }
            }
        }
    }

    trimmed
}

/// Finds where on `edge` the snapped point lies, if it was snapped onto the same way segment.
fn locate(edge: &Edge, snap: &SnapResult) -> Option<Projection> {
    if !edge.same_segment(&snap.edge) {
        return None;
    }
    project_onto_polyline(&edge.geometry, snap.coordinate)
}

/// Replaces the geometry before `start` and after `end` with the given points.
/// Each bound is a segment index and the coordinate on that segment.
fn clip(edge: &mut Edge, start: Option<(usize, Coordinate)>, end: Option<(usize, Coordinate)>) {
    let g = &edge.geometry;
    let (first_kept, mut geometry) = match start {
        Some((segment, point)) => (segment + 1, vec![point]),
        None => (0, Vec::with_capacity(g.len())),
    };
    let last_kept = match end {
        Some((segment, _)) => segment,
        None => g.len().saturating_sub(1),
    };

    if first_kept <= last_kept {
        geometry.extend_from_slice(&g[first_kept..=last_kept]);
    }

    if let Some((_, point)) = end {
        geometry.push(point);
    }

    edge.distance = polyline_length(&geometry);
    edge.geometry = geometry;
}
