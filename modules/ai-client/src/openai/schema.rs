use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Trait for types that can be used as OpenAI structured output.
///
/// Automatically implemented for any type that implements `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate an OpenAI-compatible JSON schema for this type.
    ///
    /// OpenAI strict mode requires `additionalProperties: false` on every
    /// object, every property listed in `required`, and no `$ref`.
    fn openai_schema() -> Value {
        let mut value = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = match &mut value {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions")
            }
            _ => None,
        };
        if let Some(defs) = definitions {
            inline_refs(&mut value, &defs);
        }
        close_objects(&mut value);

        value
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                let keys: Option<Vec<Value>> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect());
                if let Some(keys) = keys {
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }
            for (_, v) in map.iter_mut() {
                close_objects(v);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();
            if let Some(def) = target {
                *value = def;
                inline_refs(value, definitions);
                return;
            }

            // schemars wraps a documented `$ref` field in a single-element allOf.
            let single = match map.get_mut("allOf") {
                Some(Value::Array(all_of)) if all_of.len() == 1 => all_of.pop(),
                _ => None,
            };
            if let Some(inner) = single {
                *value = inner;
                inline_refs(value, definitions);
                return;
            }

            for (_, v) in map.iter_mut() {
                inline_refs(v, definitions);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| inline_refs(v, definitions)),
        _ => {}
    }
}
