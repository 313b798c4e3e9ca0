//! Url eligibility for storage and display.
//!
//! Only web content (`http`, `https`, `ftp`) and an allow-list of `about:`
//! pages may enter history. Everything else, including urls that do not parse,
//! is rejected. Classification is pure: it never touches the store.

use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):(.*)$").expect("scheme pattern is valid")
});

const WEB_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

pub const DEFAULT_ALLOWED_ABOUT_PAGES: [&str; 2] = ["newtab", "home"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkChecker {
    allowed_about: Vec<String>,
}

impl Default for LinkChecker {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_ABOUT_PAGES)
    }
}

impl LinkChecker {
    /// Build a checker that accepts the given `about:` pages (case-insensitive)
    pub fn new<I, S>(allowed_about: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_about: allowed_about
                .into_iter()
                .map(|page| page.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn is_eligible(&self, url: &str) -> bool {
        self.classify(url).is_ok()
    }

    /// Like `is_eligible`, but explains the rejection.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` naming the url and the reason it was rejected.
    pub fn check(&self, url: &str) -> Result<()> {
        self.classify(url)
            .map_err(|reason| Error::InvalidInput(format!("{reason}: {url}")))
    }

    fn classify(&self, url: &str) -> std::result::Result<(), &'static str> {
        if url.is_empty() {
            return Err("empty url");
        }
        if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err("url contains whitespace");
        }

        let (scheme, rest) = split_scheme(url).ok_or("malformed url")?;

        if WEB_SCHEMES.contains(&scheme.as_str()) {
            return if has_host(rest) {
                Ok(())
            } else {
                Err("missing host")
            };
        }

        if scheme == "about" {
            let page = rest
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            return if self.allowed_about.contains(&page) {
                Ok(())
            } else {
                Err("about page not allowed")
            };
        }

        Err("scheme not allowed")
    }
}

/// Lowercased scheme and the remainder after `scheme:`
pub(crate) fn split_scheme(url: &str) -> Option<(String, &str)> {
    let caps = SCHEME_RE.captures(url)?;
    let scheme = caps.get(1)?.as_str().to_ascii_lowercase();
    let rest = caps.get(2)?.as_str();
    Some((scheme, rest))
}

fn has_host(rest: &str) -> bool {
    let Some(after_slashes) = rest.strip_prefix("//") else {
        return false;
    };
    let authority = after_slashes
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let host = if host_port.starts_with('[') {
        // IPv6 literal
        host_port.split(']').next().map(|h| h.trim_start_matches('['))
    } else {
        host_port.split(':').next()
    };
    host.is_some_and(|h| !h.is_empty())
}
