// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod cafe;
pub mod route;
pub mod track;

pub use cafe::{Cafe, NewCafe};
pub use route::{CafePass, Direction, NewRoute, RouteRecord, RouteSummary, RouteType};
pub use track::{NormalizedTrack, TrackPoint};
