//! Region code translator
//!
//! Customers are assigned a region code (the upper-cased first character of
//! their external ID). Reports and listings group by the region *label* the
//! code maps to; several codes may share one label.
//!
//! ## Configuration Resolution
//!
//! The table is loaded with a layered resolution:
//! 1. Explicit path (`--regions`), which must exist
//! 2. Override in data dir (~/.local/share/tally/config/regions.toml)
//! 3. Embedded defaults (compiled into binary)
//!
//! A `RegionMap` is immutable once loaded. Build it once and pass it by
//! reference to every component that needs codes or labels.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use feruca::Collator;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/regions.toml");

/// Immutable region code → label table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMap {
    /// Upper-cased code -> label
    labels: BTreeMap<String, String>,
    /// Label for empty or unmapped codes
    default_label: String,
}

impl RegionMap {
    /// Load the table, preferring an override file over the embedded defaults
    ///
    /// An explicit `override_path` must exist; the default data-dir location
    /// is only used when present.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let content = if let Some(path) = override_path {
            fs::read_to_string(path).map_err(|e| {
                Error::Config(format!(
                    "Failed to read region config {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            match default_config_path() {
                Some(default_path) if default_path.exists() => {
                    debug!("Loading region table from {}", default_path.display());
                    fs::read_to_string(&default_path).map_err(|e| {
                        Error::Config(format!("Failed to read region config: {}", e))
                    })?
                }
                _ => DEFAULT_CONFIG.to_string(),
            }
        };

        Self::from_toml(&content)
    }

    /// The table compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Parse a region table from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid region config TOML: {}", e)))?;

        let default_label = raw.default_label.trim().to_string();
        if default_label.is_empty() {
            return Err(Error::Config("default_label must not be empty".into()));
        }

        let mut labels = BTreeMap::new();
        for region in raw.regions {
            let label = region.label.trim().to_string();
            if label.is_empty() {
                return Err(Error::Config("region label must not be empty".into()));
            }
            for code in region.codes {
                let code = code.trim().to_uppercase();
                if code.chars().count() != 1 {
                    return Err(Error::Config(format!(
                        "region code must be a single character, got '{}'",
                        code
                    )));
                }
                if let Some(existing) = labels.insert(code.clone(), label.clone()) {
                    return Err(Error::Config(format!(
                        "region code '{}' is mapped twice ('{}' and '{}')",
                        code, existing, label
                    )));
                }
            }
        }

        Ok(Self {
            labels,
            default_label,
        })
    }

    /// Label for a region code; unknown or empty codes get the default label
    pub fn label(&self, code: &str) -> &str {
        let code = code.trim();
        if code.is_empty() {
            return &self.default_label;
        }
        self.labels
            .get(&code.to_uppercase())
            .map(String::as_str)
            .unwrap_or(&self.default_label)
    }

    /// Region code for a customer external ID: its first character, upper-cased
    pub fn region_code(&self, external_id: &str) -> String {
        external_id
            .trim()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }

    /// Label for a customer external ID
    pub fn label_for_customer(&self, external_id: &str) -> &str {
        self.label(&self.region_code(external_id))
    }

    /// All codes that translate to `label` (reverse lookup)
    pub fn codes_for_label(&self, label: &str) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|(_, l)| l.as_str() == label)
            .map(|(code, _)| code.as_str())
            .collect()
    }

    /// Every mapped code
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    /// Label used for unmapped codes
    pub fn default_label(&self) -> &str {
        &self.default_label
    }

    pub fn is_default_label(&self, label: &str) -> bool {
        label == self.default_label
    }

    /// Distinct labels (including the default), collated
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .labels
            .values()
            .cloned()
            .chain(std::iter::once(self.default_label.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        sort_labels(&mut labels);
        labels
    }

    /// (label, codes) pairs for display, collated by label
    pub fn entries(&self) -> Vec<(String, Vec<String>)> {
        let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (code, label) in &self.labels {
            grouped.entry(label.as_str()).or_default().push(code.clone());
        }
        let mut entries: Vec<(String, Vec<String>)> = grouped
            .into_iter()
            .map(|(label, codes)| (label.to_string(), codes))
            .collect();
        let mut collator = LabelCollator::new();
        entries.sort_by(|a, b| collator.compare(&a.0, &b.0));
        entries
    }
}

/// Locale-aware comparison for region labels (Unicode Collation Algorithm)
pub struct LabelCollator {
    collator: Collator,
}

impl LabelCollator {
    pub fn new() -> Self {
        Self {
            collator: Collator::default(),
        }
    }

    pub fn compare(&mut self, a: &str, b: &str) -> Ordering {
        self.collator.collate(a, b)
    }
}

impl Default for LabelCollator {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort labels in place with the label collator (stable)
pub fn sort_labels<T: AsRef<str>>(items: &mut [T]) {
    let mut collator = LabelCollator::new();
    items.sort_by(|a, b| collator.compare(a.as_ref(), b.as_ref()));
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("regions.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    default_label: String,
    #[serde(default)]
    regions: Vec<RawRegion>,
}

#[derive(Debug, Deserialize)]
struct RawRegion {
    label: String,
    codes: Vec<String>,
}
