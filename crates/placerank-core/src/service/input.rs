use placerank_types::{TransitionKind, Visit};

/// Prefix of the title recorded when a visit does not carry one
pub const DEFAULT_TITLE_PREFIX: &str = "test visit for ";

/// A visit to record. Everything but the url is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitInput {
    pub url: String,
    pub transition: Option<TransitionKind>,
    pub title: Option<String>,
    /// Microseconds since the Unix epoch
    pub visit_time: Option<i64>,
    pub referrer: Option<String>,
}

impl VisitInput {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn transition(mut self, transition: TransitionKind) -> Self {
        self.transition = Some(transition);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn visit_time(mut self, visit_time: i64) -> Self {
        self.visit_time = Some(visit_time);
        self
    }

    #[must_use]
    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Fill defaults. `next_time` is only called when no time was given.
    pub(crate) fn into_visit(self, next_time: impl FnOnce() -> i64) -> Visit {
        let title = self
            .title
            .unwrap_or_else(|| format!("{DEFAULT_TITLE_PREFIX}{}", self.url));
        Visit {
            visit_time: self.visit_time.unwrap_or_else(next_time),
            transition: self.transition.unwrap_or_default(),
            referrer: self.referrer,
            title,
            url: self.url,
        }
    }
}

impl From<&str> for VisitInput {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for VisitInput {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}
