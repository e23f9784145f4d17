// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cafe model. Only the fields the route checks need.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A cafe stop, stored in the `cafes` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Cafe {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Fields supplied when adding a cafe.
#[derive(Debug, Clone)]
pub struct NewCafe {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}
