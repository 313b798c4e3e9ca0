//! Frecency-ranked link history with change notification.
//!
//! [`HistoryService`] records visits, keeps each url's frecency current,
//! ranks the top sites, and notifies subscribers as links change.

pub mod clock;
pub mod config;
pub mod link_checker;
pub mod notify;

// Exposed for benchmarks - not part of stable API
#[doc(hidden)]
pub mod index;

pub mod frecency;
pub mod store;

mod error;
mod service;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use link_checker::LinkChecker;
pub use service::{DEFAULT_TITLE_PREFIX, HistoryService, VisitInput};

pub use placerank_types::*;
