//! Data mapper: projects one step's output onto the next step's input.
//!
//! Only fields named by a mapping are copied: the result never contains a
//! key that is not some mapping's `target_field`. Missing source fields are
//! skipped silently. Duplicate target fields resolve last-write-wins.

use crate::models::{DataMap, DataMapping};
use crate::transform::TransformerRegistry;
use crate::EngineError;

#[derive(Clone)]
pub struct DataMapper {
    transformers: TransformerRegistry,
}

impl DataMapper {
    pub fn new(transformers: TransformerRegistry) -> Self {
        Self { transformers }
    }

    /// Apply every mapping scoped to `(source_service, target_service)`, in order.
    ///
    /// # Errors
    /// - [`EngineError::UnknownTransformer`] if a mapping names an unregistered transformer.
    /// - [`EngineError::TransformFailed`] if a transformer rejects its value.
    pub fn apply_mappings(
        &self,
        source_service: &str,
        source: &DataMap,
        target_service: &str,
        mappings: &[DataMapping],
    ) -> Result<DataMap, EngineError> {
        let mut result = DataMap::new();

        for mapping in mappings.iter().filter(|m| m.applies_to(source_service, target_service)) {
            let Some(value) = source.get(&mapping.source_field) else {
                continue;
            };

            let value = match &mapping.transformer {
                None => value.clone(),
                Some(name) => {
                    let transform = self
                        .transformers
                        .get(name)
                        .ok_or_else(|| EngineError::UnknownTransformer(name.clone()))?;
                    transform(value).map_err(|reason| EngineError::TransformFailed {
                        transformer: name.clone(),
                        field: mapping.source_field.clone(),
                        reason,
                    })?
                }
            };

            result.insert(mapping.target_field.clone(), value);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn mapper() -> DataMapper {
        DataMapper::new(TransformerRegistry::with_builtins())
    }

    fn data(value: Value) -> DataMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn unmapped_fields_are_dropped() {
        let mappings = vec![DataMapping::new("jira", "summary", "slack", "text")];
        let source = data(json!({ "summary": "Server down", "priority": "high" }));

        let out = mapper().apply_mappings("jira", &source, "slack", &mappings).unwrap();
        assert_eq!(out, data(json!({ "text": "Server down" })));
    }

    #[test]
    fn mappings_for_other_service_pairs_are_ignored() {
        let mappings = vec![
            DataMapping::new("jira", "summary", "gmail", "subject"),
            DataMapping::new("slack", "summary", "slack", "text"),
        ];
        let source = data(json!({ "summary": "x" }));

        let out = mapper().apply_mappings("jira", &source, "slack", &mappings).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn missing_source_field_is_skipped() {
        let mappings = vec![
            DataMapping::new("jira", "assignee", "slack", "user"),
            DataMapping::new("jira", "summary", "slack", "text"),
        ];
        let source = data(json!({ "summary": "x" }));

        let out = mapper().apply_mappings("jira", &source, "slack", &mappings).unwrap();
        assert_eq!(out, data(json!({ "text": "x" })));
    }

    #[test]
    fn later_mapping_wins_on_duplicate_target() {
        let mappings = vec![
            DataMapping::new("jira", "summary", "slack", "text"),
            DataMapping::new("jira", "description", "slack", "text"),
        ];
        let source = data(json!({ "summary": "short", "description": "long" }));

        let out = mapper().apply_mappings("jira", &source, "slack", &mappings).unwrap();
        assert_eq!(out["text"], "long");
    }

    #[test]
    fn transformer_is_applied() {
        let mappings = vec![DataMapping::new("jira", "priority", "slack", "level").through("uppercase")];
        let source = data(json!({ "priority": "high" }));

        let out = mapper().apply_mappings("jira", &source, "slack", &mappings).unwrap();
        assert_eq!(out["level"], "HIGH");
    }

    #[test]
    fn unknown_transformer_is_an_error() {
        let mappings = vec![DataMapping::new("jira", "priority", "slack", "level").through("rot13")];
        let source = data(json!({ "priority": "high" }));

        assert!(matches!(
            mapper().apply_mappings("jira", &source, "slack", &mappings),
            Err(EngineError::UnknownTransformer(name)) if name == "rot13"
        ));
    }

    #[test]
    fn transformer_failure_is_transform_failed() {
        let mappings = vec![DataMapping::new("jira", "count", "slack", "n").through("to_number")];
        let source = data(json!({ "count": "many" }));

        assert!(matches!(
            mapper().apply_mappings("jira", &source, "slack", &mappings),
            Err(EngineError::TransformFailed { field, .. }) if field == "count"
        ));
    }

    #[test]
    fn result_keys_are_always_mapped_targets_and_stable_across_runs() {
        let mappings = vec![
            DataMapping::new("a", "x", "b", "one"),
            DataMapping::new("a", "y", "b", "two").through("to_string"),
            DataMapping::new("a", "z", "b", "one"),
            DataMapping::new("a", "w", "c", "three"),
        ];
        let sources = [
            json!({}),
            json!({ "x": 1 }),
            json!({ "x": 1, "y": 2, "z": 3, "extra": true }),
            json!({ "y": null, "w": "skip" }),
        ];

        let m = mapper();
        for source in sources.iter().map(|s| data(s.clone())) {
            let first = m.apply_mappings("a", &source, "b", &mappings).unwrap();
            let second = m.apply_mappings("a", &source, "b", &mappings).unwrap();
            assert_eq!(first, second);
            assert!(first.keys().all(|k| k == "one" || k == "two"));
        }
    }
}
