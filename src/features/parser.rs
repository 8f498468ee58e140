//! Conversion of a raw features payload into [`FeatureSet`].
//!
//! Parsing runs in two passes. The global segment table is built first, then features are parsed
//! and each strategy resolves its segment references against the finished table.
use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::PayloadError;

use super::{
    wire::{ConstraintWire, FeatureWire, SegmentWire, StrategyWire, VariantWire},
    Constraint, Feature, FeatureSet, Segment, Strategy, Variant, VariantOverride, VariantPayload,
    DEFAULT_STICKINESS,
};

type SegmentTable = HashMap<u64, Segment>;

/// Parse a raw JSON payload into a [`FeatureSet`].
pub fn parse_features(raw: &str) -> Result<FeatureSet, PayloadError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|err| PayloadError::InvalidJson(err.to_string()))?;
    parse_features_value(value)
}

/// Parse an already-decoded JSON payload into a [`FeatureSet`].
pub fn parse_features_value(value: serde_json::Value) -> Result<FeatureSet, PayloadError> {
    let serde_json::Value::Object(mut root) = value else {
        return Err(PayloadError::InvalidShape(
            "expected a JSON object at the top level".to_owned(),
        ));
    };

    let raw_features = match root.remove("features") {
        None | Some(serde_json::Value::Null) => return Err(PayloadError::MissingFeatures),
        Some(serde_json::Value::Array(features)) => features,
        Some(_) => {
            return Err(PayloadError::InvalidShape(
                "\"features\" must be an array".to_owned(),
            ))
        }
    };

    let raw_segments = match root.remove("segments") {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::Array(segments)) => segments,
        Some(_) => {
            return Err(PayloadError::InvalidShape(
                "\"segments\" must be an array".to_owned(),
            ))
        }
    };

    // First pass: segments must be complete before any strategy is resolved.
    let segments = raw_segments
        .into_iter()
        .map(|raw| decode::<SegmentWire>("segment", raw))
        .collect::<Result<Vec<_>, _>>()?;
    let segment_table = build_segment_table(segments);

    // Second pass: features and strategies.
    let mut features = HashMap::with_capacity(raw_features.len());
    for raw in raw_features {
        let feature = parse_feature(decode::<FeatureWire>("feature", raw)?, &segment_table);
        // Duplicate names are resolved last-write-wins.
        features.insert(feature.name.clone(), feature);
    }

    Ok(FeatureSet::new(features))
}

fn decode<T: DeserializeOwned>(what: &str, value: serde_json::Value) -> Result<T, PayloadError> {
    serde_json::from_value(value)
        .map_err(|err| PayloadError::InvalidShape(format!("invalid {what}: {err}")))
}

fn build_segment_table(segments: Vec<SegmentWire>) -> SegmentTable {
    segments
        .into_iter()
        .map(|segment| {
            (
                segment.id,
                Segment {
                    id: segment.id,
                    constraints: segment.constraints.into_iter().map(parse_constraint).collect(),
                },
            )
        })
        .collect()
}

fn parse_feature(feature: FeatureWire, segment_table: &SegmentTable) -> Feature {
    let strategies = feature
        .strategies
        .into_iter()
        .map(|strategy| parse_strategy(&feature.name, strategy, segment_table))
        .collect();

    Feature {
        name: feature.name,
        enabled: feature.enabled,
        strategies,
        variants: feature.variants.into_iter().map(parse_variant).collect(),
        impression_data: feature.impression_data,
    }
}

fn parse_strategy(
    feature_name: &str,
    strategy: StrategyWire,
    segment_table: &SegmentTable,
) -> Strategy {
    let (segments, has_missing_segments) =
        resolve_segments(feature_name, &strategy.name, &strategy.segments, segment_table);

    Strategy {
        parameters: strategy
            .parameters
            .into_iter()
            .filter_map(|(key, value)| parameter_to_string(value).map(|value| (key, value)))
            .collect(),
        constraints: strategy.constraints.into_iter().map(parse_constraint).collect(),
        segments,
        has_missing_segments,
        variants: strategy.variants.into_iter().map(parse_variant).collect(),
        name: strategy.name,
    }
}

/// Look up `segment_ids` in the segment table.
///
/// Returns the segments that were found (in reference order) and whether any id was missing. A
/// missing id does not discard the segments that did resolve.
fn resolve_segments(
    feature_name: &str,
    strategy_name: &str,
    segment_ids: &[u64],
    segment_table: &SegmentTable,
) -> (Vec<Segment>, bool) {
    let mut has_missing_segments = false;
    let mut segments = Vec::with_capacity(segment_ids.len());

    for &segment_id in segment_ids {
        match segment_table.get(&segment_id) {
            Some(segment) => segments.push(segment.clone()),
            None => {
                log::warn!(target: "feature_repository",
                           feature = feature_name,
                           strategy = strategy_name,
                           segment_id;
                           "strategy references an unknown segment");
                has_missing_segments = true;
            }
        }
    }

    (segments, has_missing_segments)
}

fn parameter_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn parse_constraint(constraint: ConstraintWire) -> Constraint {
    Constraint {
        context_name: constraint.context_name,
        operator: constraint.operator,
        values: constraint.values,
        value: constraint.value,
        inverted: constraint.inverted,
        case_insensitive: constraint.case_insensitive,
    }
}

fn parse_variant(variant: VariantWire) -> Variant {
    Variant {
        name: variant.name,
        weight: variant.weight,
        stickiness: variant
            .stickiness
            .unwrap_or_else(|| DEFAULT_STICKINESS.to_owned()),
        payload: variant.payload.map(|payload| VariantPayload {
            payload_type: payload.payload_type,
            value: payload.value,
        }),
        overrides: variant
            .overrides
            .unwrap_or_default()
            .into_iter()
            .map(|o| VariantOverride {
                context_name: o.context_name,
                values: o.values,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_features, parse_features_value};
    use crate::{features::DEFAULT_STICKINESS, PayloadError};

    #[test]
    fn parse_fixture() {
        let raw = std::fs::read_to_string("tests/data/features.json")
            .expect("Failed to open tests/data/features.json");
        let features = parse_features(&raw).unwrap();

        assert_eq!(features.len(), 3);

        let checkout = features.get("new-checkout").unwrap();
        assert!(checkout.enabled);
        assert!(checkout.impression_data);
        assert_eq!(checkout.strategies.len(), 2);
        assert_eq!(checkout.variants.len(), 2);

        let rollout = &checkout.strategies[0];
        assert_eq!(rollout.name, "flexibleRollout");
        assert_eq!(rollout.parameters["rollout"], "50");
        assert_eq!(rollout.parameters["groupId"], "new-checkout");
        assert_eq!(rollout.segments.len(), 1);
        assert_eq!(rollout.segments[0].id, 1);
        assert!(!rollout.has_missing_segments);
    }

    #[test]
    fn minimal_feature() {
        let features = parse_features(
            r#"{"features":[{"name":"a","enabled":true,"strategies":[],"variants":[]}]}"#,
        )
        .unwrap();

        assert!(features["a"].enabled);
        assert!(features["a"].strategies.is_empty());
        assert!(features["a"].variants.is_empty());
        assert!(!features["a"].impression_data);
    }

    #[test]
    fn missing_features_is_an_error() {
        assert_eq!(
            parse_features(r#"{"segments":[]}"#),
            Err(PayloadError::MissingFeatures)
        );
        assert_eq!(
            parse_features(r#"{"features":null}"#),
            Err(PayloadError::MissingFeatures)
        );
    }

    #[test]
    fn wrong_shape_is_an_error() {
        assert!(matches!(
            parse_features(r#"{"features":{"a":{}}}"#),
            Err(PayloadError::InvalidShape(_))
        ));
        assert!(matches!(
            parse_features(r#"[]"#),
            Err(PayloadError::InvalidShape(_))
        ));
        assert!(matches!(
            parse_features(r#"{"features":[{"enabled":true}]}"#),
            Err(PayloadError::InvalidShape(_))
        ));
        assert!(matches!(
            parse_features(r#"{"features":[],"segments":"nope"}"#),
            Err(PayloadError::InvalidShape(_))
        ));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            parse_features("{not json"),
            Err(PayloadError::InvalidJson(_))
        ));
    }

    #[test]
    fn missing_segment_keeps_resolved_ones() {
        let features = parse_features(
            r#"{
              "segments": [
                {"id": 1, "constraints": [{"contextName": "region", "operator": "IN", "values": ["eu"]}]},
                {"id": 3, "constraints": []}
              ],
              "features": [{
                "name": "f",
                "enabled": true,
                "strategies": [{"name": "default", "segments": [3, 2, 1]}]
              }]
            }"#,
        )
        .unwrap();

        let strategy = &features["f"].strategies[0];
        assert!(strategy.has_missing_segments);
        let ids: Vec<u64> = strategy.segments.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(strategy.segments[1].constraints[0].context_name, "region");
    }

    #[test]
    fn segments_after_features_still_resolve() {
        let features = parse_features(
            r#"{
              "features": [{"name": "f", "strategies": [{"name": "default", "segments": [7]}]}],
              "segments": [{"id": 7, "constraints": []}]
            }"#,
        )
        .unwrap();

        let strategy = &features["f"].strategies[0];
        assert!(!strategy.has_missing_segments);
        assert_eq!(strategy.segments.len(), 1);
    }

    #[test]
    fn constraint_fields_are_mapped() {
        let features = parse_features(
            r#"{"features": [{"name": "f", "strategies": [{"name": "default", "constraints": [
                {"contextName": "userId", "operator": "IN", "values": ["1", "2"]},
                {"contextName": "version", "operator": "SEMVER_GT", "value": "1.2.3", "inverted": true, "caseInsensitive": true}
            ]}]}]}"#,
        )
        .unwrap();

        let constraints = &features["f"].strategies[0].constraints;
        assert_eq!(constraints[0].values, Some(vec!["1".to_owned(), "2".to_owned()]));
        assert_eq!(constraints[0].value, None);
        assert!(!constraints[0].inverted);
        assert!(!constraints[0].case_insensitive);

        assert_eq!(constraints[1].values, None);
        assert_eq!(constraints[1].value.as_deref(), Some("1.2.3"));
        assert!(constraints[1].inverted);
        assert!(constraints[1].case_insensitive);
    }

    #[test]
    fn variant_defaults() {
        let features = parse_features(
            r##"{"features": [{"name": "f", "variants": [
                {"name": "blue", "weight": 500},
                {"name": "red", "weight": 500, "stickiness": "userId",
                 "payload": {"type": "string", "value": "#f00"},
                 "overrides": [{"contextName": "userId", "values": ["7"]}]}
            ]}]}"##,
        )
        .unwrap();

        let variants = &features["f"].variants;
        assert_eq!(variants[0].stickiness, DEFAULT_STICKINESS);
        assert_eq!(variants[0].payload, None);
        assert!(variants[0].overrides.is_empty());

        assert_eq!(variants[1].stickiness, "userId");
        let payload = variants[1].payload.as_ref().unwrap();
        assert_eq!(payload.payload_type, "string");
        assert_eq!(payload.value, "#f00");
        assert_eq!(variants[1].overrides[0].values, vec!["7".to_owned()]);
    }

    #[test]
    fn duplicate_feature_names_last_write_wins() {
        let features = parse_features(
            r#"{"features": [{"name": "f", "enabled": false}, {"name": "f", "enabled": true}]}"#,
        )
        .unwrap();

        assert_eq!(features.len(), 1);
        assert!(features["f"].enabled);
    }

    #[test]
    fn non_string_parameters_are_stringified() {
        let features = parse_features(
            r#"{"features": [{"name": "f", "strategies": [{"name": "gradualRollout",
                "parameters": {"percentage": 25, "sticky": true, "groupId": "g", "gone": null}}]}]}"#,
        )
        .unwrap();

        let parameters = &features["f"].strategies[0].parameters;
        assert_eq!(parameters["percentage"], "25");
        assert_eq!(parameters["sticky"], "true");
        assert_eq!(parameters["groupId"], "g");
        assert!(!parameters.contains_key("gone"));
    }

    #[test]
    fn parsing_ignores_collection_order() {
        let a = parse_features_value(serde_json::json!({
            "segments": [{"id": 1, "constraints": []}, {"id": 2, "constraints": []}],
            "features": [
                {"name": "x", "strategies": [{"name": "default", "segments": [1, 2]}]},
                {"name": "y", "enabled": true}
            ]
        }))
        .unwrap();
        let b = parse_features_value(serde_json::json!({
            "features": [
                {"name": "y", "enabled": true},
                {"name": "x", "strategies": [{"name": "default", "segments": [1, 2]}]}
            ],
            "segments": [{"id": 2, "constraints": []}, {"id": 1, "constraints": []}]
        }))
        .unwrap();

        assert_eq!(a, b);
    }
}
