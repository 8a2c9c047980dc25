// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod search;
mod step;

pub use search::{find_route, search, Search};
pub use step::{Route, SearchOptions, Step};
