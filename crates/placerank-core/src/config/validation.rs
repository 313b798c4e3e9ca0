//! Config validation - warns about unknown fields

use serde_json::{Map, Value};
use tracing::warn;

/// Leaf keys allowed at the top level
const ROOT_FIELDS: &[&str] = &["storePath"];

/// Object sections and the keys each may hold
const SECTIONS: &[(&str, &[&str])] = &[
    ("links", &["maxLinks", "allowedAboutPages"]),
    (
        "frecency",
        &[
            "sampleSize",
            "firstBucketCutoff",
            "secondBucketCutoff",
            "thirdBucketCutoff",
            "fourthBucketCutoff",
            "firstBucketWeight",
            "secondBucketWeight",
            "thirdBucketWeight",
            "fourthBucketWeight",
            "defaultBucketWeight",
            "linkVisitBonus",
            "typedVisitBonus",
            "bookmarkVisitBonus",
            "embedVisitBonus",
            "permRedirectVisitBonus",
            "tempRedirectVisitBonus",
            "downloadVisitBonus",
            "framedLinkVisitBonus",
            "reloadVisitBonus",
        ],
    ),
];

/// Validate JSON config and warn about unknown fields.
pub fn warn_unknown_fields(content: &str, config_name: &str) {
    let Ok(Value::Object(root)) = serde_json::from_str::<Value>(content) else {
        return;
    };

    for path in unknown_paths(&root) {
        warn!("Unknown config field in {config_name}: {path}");
    }
}

/// Dotted paths (`links.typo`) of every key the config does not define
fn unknown_paths(root: &Map<String, Value>) -> Vec<String> {
    let mut unknowns = Vec::new();

    for (key, child) in root {
        let section = SECTIONS.iter().find(|(name, _)| *name == key.as_str());
        match (section, child) {
            (Some((_, fields)), Value::Object(entries)) => unknowns.extend(
                entries
                    .keys()
                    .filter(|field| !fields.contains(&field.as_str()))
                    .map(|field| format!("{key}.{field}")),
            ),
            (Some(_), _) => {}
            (None, _) if ROOT_FIELDS.contains(&key.as_str()) => {}
            (None, _) => unknowns.push(key.clone()),
        }
    }

    unknowns
}
