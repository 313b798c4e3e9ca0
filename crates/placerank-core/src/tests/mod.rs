//! Test module for placerank-core
//!
//! This module contains tests for:
//! - Frecency scoring through recorded visits and aging
//! - Top-site ranking and tie-breaks
//! - The history façade: batches, removal, clearing, decay, events
//! - Snapshot persistence and config reloads

mod config_reload_tests;
mod fixtures;
mod frecency_tests;
