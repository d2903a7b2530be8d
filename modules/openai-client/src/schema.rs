use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Types that can be requested as strict structured output.
///
/// Blanket-implemented for anything deriving `JsonSchema + Deserialize`.
/// The strict json_schema response format has three requirements beyond
/// what schemars emits: every object must set `additionalProperties: false`,
/// every property must appear in `required` (nullable or not), and the
/// schema must be fully inlined with no `$ref`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn strict_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        let definitions = value
            .as_object()
            .and_then(|m| m.get("definitions"))
            .cloned();
        tighten(&mut value, definitions.as_ref());

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    fn output_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Single recursive pass: inline `$ref`s, collapse single-entry `allOf`
/// wrappers, close objects, and mark all properties required.
fn tighten(value: &mut Value, definitions: Option<&Value>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(path)) = map.get("$ref").cloned() {
                if let Some(name) = path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.and_then(|d| d.get(name)) {
                        *value = def.clone();
                        tighten(value, definitions);
                        return;
                    }
                }
            }

            if let Some(Value::Array(all_of)) = map.get("allOf") {
                if all_of.len() == 1 {
                    let inner = all_of[0].clone();
                    *value = inner;
                    tighten(value, definitions);
                    return;
                }
            }

            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let keys: Vec<Value> =
                        props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }

            for (_, v) in map.iter_mut() {
                tighten(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                tighten(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Finding {
        title: String,
        impact: Option<String>,
        source_urls: Vec<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct FindingsReport {
        findings: Vec<Finding>,
    }

    #[test]
    fn objects_are_closed() {
        let schema = FindingsReport::strict_schema();
        assert_eq!(
            schema.as_object().unwrap().get("additionalProperties"),
            Some(&Value::Bool(false))
        );
    }

    #[test]
    fn optional_fields_still_required() {
        let schema = Finding::strict_schema();
        let required = schema
            .as_object()
            .unwrap()
            .get("required")
            .and_then(|r| r.as_array())
            .expect("required array");
        let names: Vec<&str> = required.iter().filter_map(|v| v.as_str()).collect();
        assert!(names.contains(&"title"));
        assert!(names.contains(&"impact"));
        assert!(names.contains(&"source_urls"));
    }

    #[test]
    fn nested_definitions_are_inlined() {
        let schema = FindingsReport::strict_schema();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("definitions"));
        assert!(!obj.contains_key("$schema"));

        let items = obj
            .get("properties")
            .and_then(|p| p.get("findings"))
            .and_then(|f| f.get("items"))
            .and_then(|i| i.as_object())
            .expect("inlined items schema");
        assert!(!items.contains_key("$ref"));
        assert_eq!(
            items.get("additionalProperties"),
            Some(&Value::Bool(false))
        );
    }
}
