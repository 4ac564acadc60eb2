//! Layering of the project config and its local override.
//!
//! # Merge Rules
//!
//! - Mappings are merged recursively
//! - Sequences are replaced entirely, so a local `required:` list is authoritative
//! - Null values in the overlay remove the key, restoring the schema default
//! - Scalars in the overlay replace scalars in the base

use serde_yaml::Value;

/// Deep merge `overlay` on top of `base`.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut merged = base_map.clone();

            for (key, value) in overlay_map {
                if value.is_null() {
                    merged.remove(key);
                } else if let Some(existing) = base_map.get(key) {
                    merged.insert(key.clone(), deep_merge(existing, value));
                } else {
                    merged.insert(key.clone(), value.clone());
                }
            }

            Value::Mapping(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Merge layers in order; later layers win.
pub fn merge_layers(layers: &[Value]) -> Value {
    layers
        .iter()
        .fold(Value::Mapping(Default::default()), |acc, layer| {
            deep_merge(&acc, layer)
        })
}
