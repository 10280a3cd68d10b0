use serde_json::Value as JsonValue;

/// Clean a tool-parameter JSON Schema for the Gemini dialect.
///
/// Gemini's schema subset rejects `$schema` and `format:"uri"` on
/// string-typed properties; both are stripped recursively through
/// `properties`, `items`, `additionalProperties`, and the combinator arrays.
pub fn clean_schema_for_gemini(schema: &JsonValue) -> JsonValue {
    match schema {
        JsonValue::Object(map) => {
            let mut cleaned = serde_json::Map::new();
            let is_string_type = map.get("type").and_then(JsonValue::as_str) == Some("string");

            for (key, value) in map {
                match key.as_str() {
                    "$schema" => continue,
                    "format" if is_string_type && value.as_str() == Some("uri") => continue,
                    // Map of property name -> schema.
                    "properties" => {
                        let inner = match value {
                            JsonValue::Object(props) => JsonValue::Object(
                                props
                                    .iter()
                                    .map(|(name, prop)| {
                                        (name.clone(), clean_schema_for_gemini(prop))
                                    })
                                    .collect(),
                            ),
                            other => other.clone(),
                        };
                        cleaned.insert(key.clone(), inner);
                    }
                    // Schema, schema list, or (for additionalProperties) a bool.
                    "items" | "additionalProperties" | "anyOf" | "oneOf" | "allOf" => {
                        let inner = match value {
                            JsonValue::Array(entries) => JsonValue::Array(
                                entries.iter().map(clean_schema_for_gemini).collect(),
                            ),
                            JsonValue::Object(_) => clean_schema_for_gemini(value),
                            other => other.clone(),
                        };
                        cleaned.insert(key.clone(), inner);
                    }
                    _ => {
                        cleaned.insert(key.clone(), value.clone());
                    }
                }
            }
            JsonValue::Object(cleaned)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_dollar_schema_and_uri_format() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "url": { "type": "string", "format": "uri" },
                "when": { "type": "string", "format": "date-time" }
            }
        });
        let cleaned = clean_schema_for_gemini(&schema);
        assert!(cleaned.get("$schema").is_none());
        assert!(cleaned["properties"]["url"].get("format").is_none());
        assert_eq!(cleaned["properties"]["when"]["format"], "date-time");
    }

    #[test]
    fn recurses_through_items_and_additional_properties() {
        let schema = json!({
            "type": "object",
            "additionalProperties": {
                "type": "array",
                "items": { "type": "string", "format": "uri", "$schema": "x" }
            }
        });
        let cleaned = clean_schema_for_gemini(&schema);
        let items = &cleaned["additionalProperties"]["items"];
        assert!(items.get("format").is_none());
        assert!(items.get("$schema").is_none());
        assert_eq!(items["type"], "string");
    }

    #[test]
    fn non_string_uri_format_survives() {
        let schema = json!({ "type": "integer", "format": "uri" });
        let cleaned = clean_schema_for_gemini(&schema);
        assert_eq!(cleaned["format"], "uri");
    }

    #[test]
    fn boolean_additional_properties_is_kept() {
        let schema = json!({ "type": "object", "additionalProperties": false });
        let cleaned = clean_schema_for_gemini(&schema);
        assert_eq!(cleaned["additionalProperties"], false);
    }
}
