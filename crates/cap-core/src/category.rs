//! Category registry shared by the distribution table, aggregation and
//! chart legends.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Keys every estimate had before custom categories existed.
pub const LEGACY_CATEGORIES: [&str; 3] = ["functional", "technical", "governance"];

/// Colors for the legacy keys.
const LEGACY_COLORS: [(&str, &str); 3] = [
    ("functional", "#4e79a7"),
    ("technical", "#f28e2b"),
    ("governance", "#59a14f"),
];

/// Palette cycled for custom keys without an explicit color.
const FALLBACK_PALETTE: [&str; 8] = [
    "#e15759", "#76b7b2", "#edc948", "#b07aa1", "#ff9da7", "#9c755f", "#bab0ac", "#86bcb6",
];

/// Runs of anything that is not a lowercase letter or digit.
static NON_KEY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"));

/// Normalizes a user-typed category name to a machine key.
///
/// Lowercases, collapses whitespace and punctuation runs into `_`, and trims
/// underscores at both ends. Returns `None` when nothing is left.
pub fn normalize_key(name: &str) -> Option<String> {
    let lowered = name.trim().to_lowercase();
    let key = NON_KEY_CHARS.replace_all(&lowered, "_");
    let key = key.trim_matches('_');
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

pub fn is_legacy(key: &str) -> bool {
    LEGACY_CATEGORIES.contains(&key)
}

/// Ordered, de-duplicated category keys plus display colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRegistry {
    keys: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    colors: BTreeMap<String, String>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::legacy()
    }
}

impl CategoryRegistry {
    /// The three legacy keys.
    pub fn legacy() -> Self {
        Self {
            keys: LEGACY_CATEGORIES.iter().map(ToString::to_string).collect(),
            colors: BTreeMap::new(),
        }
    }

    /// Builds a registry from keys in order, dropping duplicates and blanks.
    /// Falls back to the legacy keys when nothing usable remains.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self {
            keys: Vec::new(),
            colors: BTreeMap::new(),
        };
        for key in keys {
            let key = key.as_ref().trim();
            if !key.is_empty() && !registry.contains(key) {
                registry.keys.push(key.to_string());
            }
        }
        if registry.keys.is_empty() {
            return Self::legacy();
        }
        registry
    }

    /// Legacy keys first in their fixed order, then the rest sorted, so the
    /// result does not depend on where each key was first seen.
    pub fn canonical<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut custom: Vec<String> = Vec::new();
        let mut legacy_seen = [false; LEGACY_CATEGORIES.len()];
        for key in keys {
            let key = key.as_ref().trim();
            if key.is_empty() {
                continue;
            }
            if let Some(index) = LEGACY_CATEGORIES.iter().position(|legacy| *legacy == key) {
                legacy_seen[index] = true;
            } else if !custom.iter().any(|existing| existing == key) {
                custom.push(key.to_string());
            }
        }
        custom.sort();

        let ordered = LEGACY_CATEGORIES
            .iter()
            .zip(legacy_seen)
            .filter(|(_, seen)| *seen)
            .map(|(key, _)| (*key).to_string())
            .chain(custom);
        Self::from_keys(ordered)
    }

    #[must_use]
    pub fn with_colors(mut self, colors: BTreeMap<String, String>) -> Self {
        self.colors = colors;
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn colors(&self) -> &BTreeMap<String, String> {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|existing| existing == key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|existing| existing == key)
    }

    /// Appends a key. Returns `false` if it was already present.
    pub(crate) fn push(&mut self, key: String) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    /// Removes a key and its color. Returns `false` if it was absent.
    pub(crate) fn remove(&mut self, key: &str) -> bool {
        let Some(index) = self.position(key) else {
            return false;
        };
        self.keys.remove(index);
        self.colors.remove(key);
        true
    }

    pub fn set_color(&mut self, key: &str, color: impl Into<String>) {
        if self.contains(key) {
            self.colors.insert(key.to_string(), color.into());
        }
    }

    /// Custom (non-legacy) keys in registry order.
    pub fn custom_keys(&self) -> impl Iterator<Item = &str> {
        self.keys
            .iter()
            .map(String::as_str)
            .filter(|key| !is_legacy(key))
    }
}

/// Display metadata lookup for category keys.
pub trait LabelResolver {
    fn resolve_label(&self, key: &str) -> String;

    fn resolve_color(&self, key: &str, registry: &CategoryRegistry) -> String;
}

/// Humanized labels and a fixed palette.
///
/// Explicit registry colors win, legacy keys have fixed colors, and custom
/// keys cycle through the palette by their position among custom keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLabels;

impl LabelResolver for DefaultLabels {
    fn resolve_label(&self, key: &str) -> String {
        key.split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn resolve_color(&self, key: &str, registry: &CategoryRegistry) -> String {
        if let Some(color) = registry.colors.get(key) {
            return color.clone();
        }
        if let Some((_, color)) = LEGACY_COLORS.iter().find(|(legacy, _)| *legacy == key) {
            return (*color).to_string();
        }
        let index = registry
            .custom_keys()
            .position(|custom| custom == key)
            .unwrap_or(0);
        FALLBACK_PALETTE[index % FALLBACK_PALETTE.len()].to_string()
    }
}
