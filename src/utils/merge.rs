use serde_json::{Map, Value};

/// Recursively overlays `overlay` on `base`. Objects merge key by key;
/// anything else in `overlay` replaces the base value unless it is null.
pub fn merge_deep(base: &Value, overlay: &Value) -> Value {
    let (Value::Object(base_map), Value::Object(overlay_map)) = (base, overlay) else {
        return if overlay.is_null() {
            base.clone()
        } else {
            overlay.clone()
        };
    };

    let mut result: Map<String, Value> = base_map.clone();
    for (key, value) in overlay_map.iter() {
        let merged = match result.get(key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                merge_deep(existing, value)
            }
            Some(existing) if value.is_null() => existing.clone(),
            _ => value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    Value::Object(result)
}
