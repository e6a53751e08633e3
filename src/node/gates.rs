//! # Feature gates.
//!
//! [`FeatureGates`] is an immutable map from feature name to enabled flag,
//! threaded explicitly into every component that needs it. Absent names are
//! disabled; unknown names are never an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Pull container images lazily through the soci snapshotter.
pub const FAST_IMAGE_PULL: &str = "fast-image-pull";

/// Named boolean toggles selecting optional behavior, config and daemons.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureGates(BTreeMap<String, bool>);

impl FeatureGates {
    /// Returns an empty gate set (everything disabled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new gate set with `feature` set to `enabled`.
    #[must_use]
    pub fn with(mut self, feature: impl Into<String>, enabled: bool) -> Self {
        self.0.insert(feature.into(), enabled);
        self
    }

    /// True only if `feature` is present and set to `true`.
    pub fn is_enabled(&self, feature: &str) -> bool {
        self.0.get(feature).copied().unwrap_or(false)
    }

    /// Names of the enabled features, sorted.
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for FeatureGates {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
