use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Stickiness applied to variants that don't specify one.
pub const DEFAULT_STICKINESS: &str = "default";

/// An immutable snapshot of all features from one fetch cycle, keyed by feature name.
///
/// Snapshots are never edited in place. A new fetch produces a new `FeatureSet` that replaces the
/// previous one completely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet {
    features: HashMap<String, Feature>,
}

impl FeatureSet {
    pub(crate) fn new(features: HashMap<String, Feature>) -> FeatureSet {
        FeatureSet { features }
    }

    /// Get a feature by name.
    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    /// Returns `true` if the snapshot holds a feature with the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// Number of features in the snapshot.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if the snapshot holds no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterate over all features in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    /// Names of all features in arbitrary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }
}

impl std::ops::Index<&str> for FeatureSet {
    type Output = Feature;

    fn index(&self, name: &str) -> &Feature {
        &self.features[name]
    }
}

/// A named toggle with its enablement state, matching strategies, and variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Feature {
    pub name: String,
    pub enabled: bool,
    pub strategies: Vec<Strategy>,
    /// Feature-level variants. Strategies may override them with their own.
    pub variants: Vec<Variant>,
    /// Whether evaluations of this feature should emit impression events.
    pub impression_data: bool,
}

/// A named matching algorithm with its parameters, constraints, and resolved segments.
///
/// Matching itself happens downstream; the repository only carries the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Strategy {
    pub name: String,
    pub parameters: HashMap<String, String>,
    pub constraints: Vec<Constraint>,
    /// Segments that were found in the segment table, in reference order.
    pub segments: Vec<Segment>,
    /// Set when at least one referenced segment id was not in the segment table.
    ///
    /// A strategy with missing segments must never match, because its segment set is incomplete.
    pub has_missing_segments: bool,
    /// Strategy-level overrides of the feature variants.
    pub variants: Vec<Variant>,
}

/// A single attribute-based match rule.
///
/// Whether `values` or `value` is meaningful depends on the operator. Both are optional here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Constraint {
    pub context_name: String,
    pub operator: String,
    pub values: Option<Vec<String>>,
    pub value: Option<String>,
    pub inverted: bool,
    pub case_insensitive: bool,
}

/// A reusable set of constraints referenced by id from strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Segment {
    pub id: u64,
    pub constraints: Vec<Constraint>,
}

/// A weighted alternative a feature can resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Variant {
    pub name: String,
    pub weight: u32,
    /// Context attribute used for bucketing. [`DEFAULT_STICKINESS`] when not configured.
    pub stickiness: String,
    pub payload: Option<VariantPayload>,
    pub overrides: Vec<VariantOverride>,
}

/// Typed payload attached to a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantPayload {
    /// Payload type, e.g. `"string"` or `"json"`.
    #[serde(rename = "type")]
    pub payload_type: String,
    #[allow(missing_docs)]
    pub value: String,
}

/// Forces a variant for contexts whose `context_name` attribute is one of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct VariantOverride {
    pub context_name: String,
    pub values: Vec<String>,
}
