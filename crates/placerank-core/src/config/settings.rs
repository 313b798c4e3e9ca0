use crate::link_checker::{DEFAULT_ALLOWED_ABOUT_PAGES, LinkChecker};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub links: LinksConfig,

    #[serde(default)]
    pub frecency: FrecencyConfig,

    /// History snapshot file. In-memory only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl Config {
    /// Load config from file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid JSON,
    /// or holds values that fail validation.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        super::validation::warn_unknown_fields(&content, "config.json");
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the engine cannot rank with.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.links.max_links == 0 {
            return Err(Error::Config("links.maxLinks must be at least 1".into()));
        }
        if self.frecency.sample_size == 0 {
            return Err(Error::Config(
                "frecency.sampleSize must be at least 1".into(),
            ));
        }
        let f = &self.frecency;
        let cutoffs = [
            f.first_bucket_cutoff,
            f.second_bucket_cutoff,
            f.third_bucket_cutoff,
            f.fourth_bucket_cutoff,
        ];
        if cutoffs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Config(format!(
                "frecency bucket cutoffs must be strictly increasing, got {cutoffs:?}"
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn link_checker(&self) -> LinkChecker {
        LinkChecker::new(&self.links.allowed_about_pages)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinksConfig {
    /// Size of the top-sites index (N)
    #[serde(default = "default_max_links")]
    pub max_links: usize,

    /// `about:` pages that may be stored and shown
    #[serde(default = "default_allowed_about_pages")]
    pub allowed_about_pages: Vec<String>,
}

fn default_max_links() -> usize {
    100
}
fn default_allowed_about_pages() -> Vec<String> {
    DEFAULT_ALLOWED_ABOUT_PAGES
        .iter()
        .map(ToString::to_string)
        .collect()
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            max_links: default_max_links(),
            allowed_about_pages: default_allowed_about_pages(),
        }
    }
}

/// Frecency weighting. Cutoffs are visit ages in days, weights are the
/// percentage applied to a visit falling in that bucket, bonuses are per
/// transition kind (100 = one plain link visit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrecencyConfig {
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    #[serde(default = "default_first_cutoff")]
    pub first_bucket_cutoff: i64,
    #[serde(default = "default_second_cutoff")]
    pub second_bucket_cutoff: i64,
    #[serde(default = "default_third_cutoff")]
    pub third_bucket_cutoff: i64,
    #[serde(default = "default_fourth_cutoff")]
    pub fourth_bucket_cutoff: i64,

    #[serde(default = "default_first_weight")]
    pub first_bucket_weight: i64,
    #[serde(default = "default_second_weight")]
    pub second_bucket_weight: i64,
    #[serde(default = "default_third_weight")]
    pub third_bucket_weight: i64,
    #[serde(default = "default_fourth_weight")]
    pub fourth_bucket_weight: i64,
    #[serde(default = "default_default_weight")]
    pub default_bucket_weight: i64,

    #[serde(default = "default_link_bonus")]
    pub link_visit_bonus: i64,
    #[serde(default = "default_typed_bonus")]
    pub typed_visit_bonus: i64,
    #[serde(default = "default_bookmark_bonus")]
    pub bookmark_visit_bonus: i64,
    #[serde(default)]
    pub embed_visit_bonus: i64,
    #[serde(default)]
    pub perm_redirect_visit_bonus: i64,
    #[serde(default)]
    pub temp_redirect_visit_bonus: i64,
    #[serde(default)]
    pub download_visit_bonus: i64,
    #[serde(default)]
    pub framed_link_visit_bonus: i64,
    #[serde(default)]
    pub reload_visit_bonus: i64,
}

fn default_sample_size() -> usize {
    10
}
fn default_first_cutoff() -> i64 {
    4
}
fn default_second_cutoff() -> i64 {
    14
}
fn default_third_cutoff() -> i64 {
    31
}
fn default_fourth_cutoff() -> i64 {
    90
}
fn default_first_weight() -> i64 {
    100
}
fn default_second_weight() -> i64 {
    70
}
fn default_third_weight() -> i64 {
    50
}
fn default_fourth_weight() -> i64 {
    30
}
fn default_default_weight() -> i64 {
    10
}
fn default_link_bonus() -> i64 {
    100
}
fn default_typed_bonus() -> i64 {
    2000
}
fn default_bookmark_bonus() -> i64 {
    75
}

impl Default for FrecencyConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            first_bucket_cutoff: default_first_cutoff(),
            second_bucket_cutoff: default_second_cutoff(),
            third_bucket_cutoff: default_third_cutoff(),
            fourth_bucket_cutoff: default_fourth_cutoff(),
            first_bucket_weight: default_first_weight(),
            second_bucket_weight: default_second_weight(),
            third_bucket_weight: default_third_weight(),
            fourth_bucket_weight: default_fourth_weight(),
            default_bucket_weight: default_default_weight(),
            link_visit_bonus: default_link_bonus(),
            typed_visit_bonus: default_typed_bonus(),
            bookmark_visit_bonus: default_bookmark_bonus(),
            embed_visit_bonus: 0,
            perm_redirect_visit_bonus: 0,
            temp_redirect_visit_bonus: 0,
            download_visit_bonus: 0,
            framed_link_visit_bonus: 0,
            reload_visit_bonus: 0,
        }
    }
}
