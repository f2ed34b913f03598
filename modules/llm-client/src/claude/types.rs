use serde::{Deserialize, Serialize};

// --- Messages ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

// --- Tool definition ---

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ToolDefinitionWire {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl ToolDefinitionWire {
    /// Build a tool whose input schema is derived from `T`.
    ///
    /// Forced tool calls only deserialize reliably against a strict schema:
    /// every object refuses extra properties, every property is required
    /// (nullable ones included), and `#/definitions/` references are
    /// expanded in place so the schema is self-contained.
    pub(crate) fn structured<T: schemars::JsonSchema>(name: &str, description: &str) -> Self {
        let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();

        let defs = match &schema {
            serde_json::Value::Object(map) => {
                map.get("definitions").cloned().unwrap_or_default()
            }
            _ => serde_json::Value::Null,
        };
        if let serde_json::Value::Object(map) = &mut schema {
            map.remove("$schema");
            map.remove("definitions");
        }

        tighten_schema(&mut schema, &defs, 0);

        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: schema,
        }
    }
}

/// One walk over the schema tree doing all of the strictness work.
/// Recursive type definitions would expand forever, hence the depth cap.
fn tighten_schema(schema: &mut serde_json::Value, defs: &serde_json::Value, depth: usize) {
    use serde_json::Value;

    if depth > 64 {
        return;
    }

    // Settle this node first: expand a definition reference, then unwrap
    // single-branch allOf shells, repeating until neither applies.
    loop {
        let replacement = match schema {
            Value::Object(map) => {
                if let Some(Value::String(target)) = map.get("$ref") {
                    target
                        .strip_prefix("#/definitions/")
                        .and_then(|name| defs.get(name))
                        .cloned()
                } else if let Some(Value::Array(branches)) = map.get("allOf") {
                    (branches.len() == 1).then(|| branches[0].clone())
                } else {
                    None
                }
            }
            _ => None,
        };
        match replacement {
            Some(value) => *schema = value,
            None => break,
        }
    }

    match schema {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let required = props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(required));
                }
            }
            for child in map.values_mut() {
                tighten_schema(child, defs, depth + 1);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                tighten_schema(item, defs, depth + 1);
            }
        }
        _ => {}
    }
}

// --- Chat request ---

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinitionWire>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 4096,
            messages: Vec::new(),
            system: None,
            temperature: None,
            tools: None,
            tool_choice: None,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn message(mut self, message: WireMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn tool(mut self, tool: ToolDefinitionWire) -> Self {
        self.tools.get_or_insert_with(Vec::new).push(tool);
        self
    }
}

// --- Chat response ---

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    pub content: Vec<ContentBlock>,
    #[allow(dead_code)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    pub fn text(&self) -> Option<String> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.clone()),
                _ => None,
            })
            .next()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Usage {
    #[allow(dead_code)]
    pub input_tokens: u32,
    #[allow(dead_code)]
    pub output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, JsonSchema)]
    struct FoundAssignment {
        title: String,
        description: Option<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct PageResult {
        assignments: Vec<FoundAssignment>,
    }

    #[test]
    fn structured_tool_carries_name_and_schema() {
        let tool = ToolDefinitionWire::structured::<PageResult>("structured_response", "record");
        assert_eq!(tool.name, "structured_response");
        assert!(tool.input_schema.is_object());
        assert!(tool.input_schema.get("$schema").is_none());
        assert!(tool.input_schema.get("definitions").is_none());
    }

    #[test]
    fn optional_properties_are_still_required() {
        let tool = ToolDefinitionWire::structured::<FoundAssignment>("t", "");
        let schema = &tool.input_schema;

        assert_eq!(schema["additionalProperties"], json!(false));
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"title"));
        assert!(required.contains(&"description"));
    }

    #[test]
    fn nested_definitions_are_expanded_in_place() {
        let tool = ToolDefinitionWire::structured::<PageResult>("t", "");
        let items = &tool.input_schema["properties"]["assignments"]["items"];

        assert!(items.get("$ref").is_none());
        assert!(items.get("allOf").is_none());
        assert_eq!(items["type"], json!("object"));
        assert_eq!(items["additionalProperties"], json!(false));
    }
}
