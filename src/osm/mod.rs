// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Conversion of [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML) data into a [Graph](crate::Graph).
//!
//! Every way with a `highway` tag is split into segments between consecutive nodes,
//! and each segment becomes two directed [Edges](crate::Edge). Nodes keep their
//! `barrier` tag, and `type=restriction` relations with a single via node
//! become [TurnRestrictions](crate::TurnRestriction).

mod reader;

pub use reader::{parse, parse_buffer, parse_file, parse_io, Error, FileFormat};
