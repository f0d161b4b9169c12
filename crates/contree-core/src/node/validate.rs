//! Structural validation of incoming node documents.
//!
//! Validation runs on the raw JSON value, before any typed decoding, so that a
//! rejection can name the exact field and constraint that failed.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::NodeType;

/// Where a validated document will get its `name` from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    /// The document must carry a non-empty `name` itself.
    Document,
    /// The name is derived from the target path; a `name` field is optional.
    Path,
}

/// The first constraint a node document violates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeViolation {
    field: Cow<'static, str>,
    code: &'static str,
    message: Cow<'static, str>,
}

impl NodeViolation {
    /// Creates a new violation.
    pub fn new(
        field: impl Into<Cow<'static, str>>,
        code: &'static str,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }

    /// Returns the JSON path of the offending field (e.g. `children[2].type`).
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the machine-readable constraint code.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Returns the human-readable description.
    pub fn message(&self) -> &str {
        &self.message
    }

    fn nested(self, prefix: &str) -> Self {
        let field = if self.field.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}.{}", self.field)
        };

        Self {
            field: Cow::Owned(field),
            ..self
        }
    }
}

impl fmt::Display for NodeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl std::error::Error for NodeViolation {}

/// Validates a candidate node document.
///
/// A document is valid when it is a JSON object with a known `type`, a
/// non-empty string `name` (unless the name comes from the path), well-typed
/// `title`, `id` and timestamps, and, for directory types, a `children` array
/// whose elements are themselves valid nodes.
pub fn validate_node(value: &Value, name_source: NameSource) -> Result<(), NodeViolation> {
    let Some(object) = value.as_object() else {
        return Err(NodeViolation::new(
            "",
            "not_an_object",
            "node document must be a JSON object",
        ));
    };

    validate_name(object, name_source)?;
    let node_type = validate_type(object)?;
    validate_optional_string(object, "title")?;
    validate_optional_string(object, "id")?;
    validate_timestamp(object, "createdAt")?;
    validate_timestamp(object, "updatedAt")?;

    let Some(children) = object.get("children") else {
        return Ok(());
    };

    if !node_type.is_directory() {
        return Err(NodeViolation::new(
            "children",
            "unexpected_children",
            "a file node cannot have children",
        ));
    }

    let Some(children) = children.as_array() else {
        return Err(NodeViolation::new(
            "children",
            "invalid_children",
            "children must be an array",
        ));
    };

    for (index, child) in children.iter().enumerate() {
        validate_node(child, NameSource::Document)
            .map_err(|violation| violation.nested(&format!("children[{index}]")))?;
    }

    Ok(())
}

fn validate_name(object: &Map<String, Value>, name_source: NameSource) -> Result<(), NodeViolation> {
    match (object.get("name"), name_source) {
        (Some(Value::String(name)), _) if !name.is_empty() => Ok(()),
        (Some(Value::String(_)), _) => Err(NodeViolation::new(
            "name",
            "empty_name",
            "name must not be empty",
        )),
        (Some(_), _) => Err(NodeViolation::new(
            "name",
            "invalid_name",
            "name must be a string",
        )),
        (None, NameSource::Path) => Ok(()),
        (None, NameSource::Document) => Err(NodeViolation::new(
            "name",
            "required",
            "name is required",
        )),
    }
}

fn validate_type(object: &Map<String, Value>) -> Result<NodeType, NodeViolation> {
    let Some(value) = object.get("type") else {
        return Err(NodeViolation::new("type", "required", "type is required"));
    };

    let Some(value) = value.as_str() else {
        return Err(NodeViolation::new(
            "type",
            "invalid_type",
            "type must be a string",
        ));
    };

    NodeType::from_str(value).map_err(|_| {
        NodeViolation::new(
            "type",
            "unknown_type",
            format!("unknown type '{value}', expected one of file, folder, page, site"),
        )
    })
}

fn validate_optional_string(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<(), NodeViolation> {
    match object.get(field) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(NodeViolation::new(
            field,
            "invalid_string",
            format!("{field} must be a string"),
        )),
    }
}

fn validate_timestamp(object: &Map<String, Value>, field: &'static str) -> Result<(), NodeViolation> {
    match object.get(field) {
        None => Ok(()),
        Some(Value::String(value)) if value.parse::<jiff::Timestamp>().is_ok() => Ok(()),
        Some(Value::Number(number)) if number.is_i64() => Ok(()),
        Some(_) => Err(NodeViolation::new(
            field,
            "invalid_timestamp",
            format!("{field} must be epoch milliseconds or an ISO-8601 string"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_minimal_document_with_path_name() {
        let value = json!({"type": "folder"});
        assert!(validate_node(&value, NameSource::Path).is_ok());
    }

    #[test]
    fn requires_name_for_standalone_documents() {
        let value = json!({"type": "folder"});
        let violation = validate_node(&value, NameSource::Document).unwrap_err();
        assert_eq!(violation.field(), "name");
        assert_eq!(violation.code(), "required");
    }

    #[test]
    fn rejects_non_objects() {
        let violation = validate_node(&json!([1, 2]), NameSource::Path).unwrap_err();
        assert_eq!(violation.code(), "not_an_object");
    }

    #[test]
    fn rejects_unknown_type() {
        let value = json!({"type": "widget"});
        let violation = validate_node(&value, NameSource::Path).unwrap_err();
        assert_eq!(violation.field(), "type");
        assert_eq!(violation.code(), "unknown_type");
    }

    #[test]
    fn rejects_missing_type() {
        let value = json!({"name": "docs"});
        let violation = validate_node(&value, NameSource::Path).unwrap_err();
        assert_eq!(violation.code(), "required");
        assert_eq!(violation.to_string(), "type: type is required");
    }

    #[test]
    fn reports_first_invalid_child_with_path() {
        let value = json!({
            "type": "folder",
            "children": [
                {"type": "file", "name": "a.txt"},
                {"type": "folder", "name": "b", "children": [{"type": "page"}]},
            ],
        });

        let violation = validate_node(&value, NameSource::Path).unwrap_err();
        assert_eq!(violation.field(), "children[1].children[0].name");
        assert_eq!(violation.code(), "required");
    }

    #[test]
    fn rejects_children_on_files() {
        let value = json!({"type": "file", "children": []});
        let violation = validate_node(&value, NameSource::Path).unwrap_err();
        assert_eq!(violation.code(), "unexpected_children");
    }

    #[test]
    fn rejects_mistyped_metadata() {
        let value = json!({"type": "page", "title": 7});
        assert_eq!(
            validate_node(&value, NameSource::Path).unwrap_err().field(),
            "title"
        );

        let value = json!({"type": "page", "updatedAt": 1.5});
        assert_eq!(
            validate_node(&value, NameSource::Path).unwrap_err().code(),
            "invalid_timestamp"
        );
    }

    #[test]
    fn timestamp_strings_must_be_instants() {
        let value = json!({"type": "folder", "createdAt": "banana"});
        let violation = validate_node(&value, NameSource::Path).unwrap_err();
        assert_eq!(violation.field(), "createdAt");
        assert_eq!(violation.code(), "invalid_timestamp");

        let value = json!({"type": "folder", "createdAt": "2024-05-01T12:00:00Z", "updatedAt": 1});
        assert!(validate_node(&value, NameSource::Path).is_ok());
    }
}
