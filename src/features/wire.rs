//! Wire format of the features endpoint response.
//!
//! These types follow the server payload closely and are only used as an intermediate step. See
//! [`parser`](super::parser) for the conversion into the domain model.
use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeatureWire {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub strategies: Vec<StrategyWire>,
    #[serde(default)]
    pub variants: Vec<VariantWire>,
    #[serde(default)]
    pub impression_data: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StrategyWire {
    pub name: String,
    // Parameter values are strings in the protocol, but older servers send numbers and booleans
    // too. They're normalized to strings during parsing.
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub constraints: Vec<ConstraintWire>,
    /// Segment ids referenced by this strategy.
    #[serde(default)]
    pub segments: Vec<u64>,
    #[serde(default)]
    pub variants: Vec<VariantWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConstraintWire {
    pub context_name: String,
    pub operator: String,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub case_insensitive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SegmentWire {
    pub id: u64,
    #[serde(default)]
    pub constraints: Vec<ConstraintWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariantWire {
    pub name: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub stickiness: Option<String>,
    #[serde(default)]
    pub payload: Option<VariantPayloadWire>,
    #[serde(default)]
    pub overrides: Option<Vec<VariantOverrideWire>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VariantPayloadWire {
    #[serde(rename = "type")]
    pub payload_type: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariantOverrideWire {
    pub context_name: String,
    #[serde(default)]
    pub values: Vec<String>,
}
