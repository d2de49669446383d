//! Declared input schemas for the tool set

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::ToolName;

/// JSON type of a tool argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    StringArray,
}

impl FieldType {
    fn json_schema(&self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Integer => json!({ "type": "integer" }),
            Self::StringArray => json!({ "type": "array", "items": { "type": "string" } }),
        }
    }
}

/// One declared argument
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub required: bool,
    pub description: &'static str,
}

const fn field(
    name: &'static str,
    kind: FieldType,
    required: bool,
    description: &'static str,
) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required,
        description,
    }
}

/// Input schema of a tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl ToolSchema {
    /// Names of required fields that are absent or null in `args`
    pub fn missing_required(&self, args: &Value) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .filter(|f| args.get(f.name).map_or(true, Value::is_null))
            .map(|f| f.name)
            .collect()
    }

    /// JSON-schema object describing the arguments
    pub fn parameters(&self) -> Value {
        let mut properties = Map::new();
        for f in &self.fields {
            let mut schema = f.kind.json_schema();
            schema["description"] = Value::from(f.description);
            properties.insert(f.name.to_string(), schema);
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Function-tool definition as planners expect it
    pub fn function_definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters(),
            }
        })
    }
}

impl ToolName {
    pub fn schema(&self) -> ToolSchema {
        use FieldType::*;

        let (description, fields) = match self {
            Self::GetBrand => (
                "Fetch a brand profile: name, voice, audience and default hashtags.",
                vec![field("brandId", String, true, "Brand identifier")],
            ),
            Self::GetPlan => (
                "Fetch a content plan and its ordered topics.",
                vec![field("planId", String, true, "Plan identifier")],
            ),
            Self::ListPlans => (
                "List the content plans of a brand, newest first.",
                vec![field("brandId", String, true, "Brand identifier")],
            ),
            Self::ListPosts => (
                "List recent posts of a brand, newest first, to avoid repeating content.",
                vec![
                    field("brandId", String, true, "Brand identifier"),
                    field("limit", Integer, false, "Maximum number of posts (1-50, default 10)"),
                ],
            ),
            Self::GeneratePostCopy => (
                "Prepare the copy of a post: normalizes hashtags and merges brand defaults. Does not publish.",
                vec![
                    field("brandId", String, true, "Brand identifier"),
                    field("planId", String, false, "Plan the post belongs to"),
                    field("topic", String, false, "Plan topic the post covers"),
                    field("content", String, true, "Post body"),
                    field("comment", String, false, "First comment to add under the post"),
                    field("hashtags", StringArray, false, "Hashtags for the post"),
                ],
            ),
            Self::CreatePost => (
                "Publish a post for a brand.",
                vec![
                    field("brandId", String, true, "Brand identifier"),
                    field("planId", String, false, "Plan the post belongs to"),
                    field("topic", String, false, "Plan topic the post covers"),
                    field("content", String, true, "Post body"),
                    field("comment", String, false, "First comment to add under the post"),
                    field("hashtags", StringArray, false, "Hashtags for the post"),
                    field("status", String, false, "draft or published (default published)"),
                ],
            ),
            Self::UpdatePost => (
                "Update fields of an existing post.",
                vec![
                    field("postId", String, true, "Post identifier"),
                    field("content", String, false, "New post body"),
                    field("comment", String, false, "New first comment"),
                    field("hashtags", StringArray, false, "Replacement hashtags"),
                    field("status", String, false, "draft or published"),
                ],
            ),
        };

        ToolSchema {
            name: self.as_str(),
            description,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_fields() {
        let schema = ToolName::CreatePost.schema();
        let missing = schema.missing_required(&json!({"brandId": "brand1", "content": null}));
        assert_eq!(missing, vec!["content"]);
    }

    #[test]
    fn test_function_definition_shape() {
        let def = ToolName::ListPosts.schema().function_definition();
        assert_eq!(def["type"], "function");
        assert_eq!(def["function"]["name"], "list_posts");
        assert_eq!(def["function"]["parameters"]["required"], json!(["brandId"]));
        assert_eq!(
            def["function"]["parameters"]["properties"]["limit"]["type"],
            "integer"
        );
    }
}
