//! Shared types for placerank components.
//!
//! This crate provides the data exchanged between the history engine
//! (placerank-core), its subscribers, and the CLI. All types are serializable
//! so events and top-site listings can be printed or persisted as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a visit occurred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Followed a link on another page
    #[default]
    Link,
    /// Typed into the location bar
    Typed,
    /// Opened from a bookmark
    Bookmark,
    /// Inner content loaded by a page (image, iframe)
    Embed,
    RedirectPermanent,
    RedirectTemporary,
    Download,
    /// Link followed inside a frame
    FramedLink,
    Reload,
}

impl TransitionKind {
    pub const ALL: [TransitionKind; 9] = [
        TransitionKind::Link,
        TransitionKind::Typed,
        TransitionKind::Bookmark,
        TransitionKind::Embed,
        TransitionKind::RedirectPermanent,
        TransitionKind::RedirectTemporary,
        TransitionKind::Download,
        TransitionKind::FramedLink,
        TransitionKind::Reload,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionKind::Link => "link",
            TransitionKind::Typed => "typed",
            TransitionKind::Bookmark => "bookmark",
            TransitionKind::Embed => "embed",
            TransitionKind::RedirectPermanent => "redirect_permanent",
            TransitionKind::RedirectTemporary => "redirect_temporary",
            TransitionKind::Download => "download",
            TransitionKind::FramedLink => "framed_link",
            TransitionKind::Reload => "reload",
        }
    }

    /// Redirect sources never rank on their own.
    #[must_use]
    pub fn is_redirect(self) -> bool {
        matches!(
            self,
            TransitionKind::RedirectPermanent | TransitionKind::RedirectTemporary
        )
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        TransitionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseKindError {
                what: "transition",
                value: s.to_string(),
            })
    }
}

/// A single recorded visit. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub url: String,
    pub title: String,

    /// Microseconds since the Unix epoch
    pub visit_time: i64,

    #[serde(default)]
    pub transition: TransitionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// Read-only projection of a ranked url, as returned by top-site queries
/// and carried by `linkChanged` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub url: String,
    pub title: String,
    pub frecency: i64,

    /// Microseconds since the Unix epoch
    pub last_visit_time: i64,
}

/// Event names subscribers register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    LinkChanged,
    ManyLinksChanged,
    DeleteUri,
    ClearHistory,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::LinkChanged,
        EventKind::ManyLinksChanged,
        EventKind::DeleteUri,
        EventKind::ClearHistory,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EventKind::LinkChanged => "linkChanged",
            EventKind::ManyLinksChanged => "manyLinksChanged",
            EventKind::DeleteUri => "deleteURI",
            EventKind::ClearHistory => "clearHistory",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ParseKindError {
                what: "event",
                value: s.to_string(),
            })
    }
}

/// Change notifications emitted by the history engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LinkEvent {
    /// A url's ranking data changed. May fire several times per logical
    /// operation (insertion, frecency update, title settle).
    LinkChanged { link: Link },

    /// Many records changed at once; consumers should re-query.
    ManyLinksChanged,

    /// A single url was removed from history
    #[serde(rename = "deleteURI")]
    DeleteUri { url: String },

    /// All history was removed
    ClearHistory,
}

impl LinkEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            LinkEvent::LinkChanged { .. } => EventKind::LinkChanged,
            LinkEvent::ManyLinksChanged => EventKind::ManyLinksChanged,
            LinkEvent::DeleteUri { .. } => EventKind::DeleteUri,
            LinkEvent::ClearHistory => EventKind::ClearHistory,
        }
    }

    /// The url this event is about, if it names one.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            LinkEvent::LinkChanged { link } => Some(&link.url),
            LinkEvent::DeleteUri { url } => Some(url),
            LinkEvent::ManyLinksChanged | LinkEvent::ClearHistory => None,
        }
    }
}

/// Returned when a transition or event name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKindError {
    what: &'static str,
    value: String,
}

impl ParseKindError {
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} kind: {}", self.what, self.value)
    }
}

impl std::error::Error for ParseKindError {}
