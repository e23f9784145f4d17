// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cafes;
pub mod geometry;
pub mod gpx_file;
pub mod map;
pub mod normalizer;
pub mod track_files;

pub use cafes::{CafeArea, CafeService};
pub use map::{route_map, MapError, RouteMap};
pub use normalizer::{NormalizeReport, RouteNormalizer};
pub use track_files::TrackFiles;
