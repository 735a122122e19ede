//! Workflow decoding: raw model text → typed [`Workflow`].
//!
//! Even in JSON mode, models occasionally wrap the document in a
//! ```` ```json ```` fence, so the text is first trimmed and unfenced.
//! Decoding then happens in two steps with distinct errors:
//!
//! 1. parse as generic JSON → [`DecodeError::MalformedJson`]
//! 2. check the workflow schema → [`DecodeError::SchemaMismatch`], naming the
//!    path of the offending value (`workflow[1].id`, `workflow[0].inputs[2]`)
//!
//! Unknown fields are ignored. No cross-node checks beyond id uniqueness.

use crate::error::DecodeError;
use crate::workflow::{Slot, Workflow, WorkflowNode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```$").unwrap());

/// Decode the model's reply into a validated [`Workflow`].
pub fn decode(raw_text: &str) -> Result<Workflow, DecodeError> {
    let text = strip_code_fences(raw_text);

    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::MalformedJson(e.to_string()))?;

    let nodes = value
        .as_object()
        .ok_or_else(|| mismatch("$", format!("expected an object, found {}", type_name(&value))))?
        .get("workflow")
        .ok_or_else(|| mismatch("$", "missing field `workflow`"))?
        .as_array()
        .ok_or_else(|| mismatch("workflow", "expected an array of nodes"))?;

    let mut seen = HashSet::with_capacity(nodes.len());
    let mut workflow = Vec::with_capacity(nodes.len());

    for (i, raw) in nodes.iter().enumerate() {
        let path = format!("workflow[{i}]");
        let node: WorkflowNode =
            serde_json::from_value(raw.clone()).map_err(|e| mismatch(&path, e.to_string()))?;

        if node.id.trim().is_empty() {
            return Err(mismatch(format!("{path}.id"), "node id must not be empty"));
        }
        if !seen.insert(node.id.clone()) {
            return Err(mismatch(
                format!("{path}.id"),
                format!("duplicate node id \"{}\"", node.id),
            ));
        }
        check_slots(&path, "inputs", &node.inputs)?;
        check_slots(&path, "outputs", &node.outputs)?;

        workflow.push(node);
    }

    Ok(Workflow { workflow })
}

/// Trim the reply and remove one outer markdown fence, if any.
fn strip_code_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

fn check_slots(node_path: &str, field: &str, slots: &[Slot]) -> Result<(), DecodeError> {
    for (j, slot) in slots.iter().enumerate() {
        if slot.name.trim().is_empty() {
            return Err(mismatch(
                format!("{node_path}.{field}[{j}]"),
                "slot name must be a non-empty string",
            ));
        }
    }
    Ok(())
}

fn mismatch(path: impl Into<String>, detail: impl Into<String>) -> DecodeError {
    DecodeError::SchemaMismatch {
        path: path.into(),
        detail: detail.into(),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_err(raw: &str) -> (String, String) {
        match decode(raw).unwrap_err() {
            DecodeError::SchemaMismatch { path, detail } => (path, detail),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json() {
        let err = decode("{not valid json").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedJson(_)), "got {err:?}");
    }

    #[test]
    fn single_node() {
        let wf = decode(
            r#"{"workflow":[{"id":"a","title":"t","prompt":"p","inputs":[],"outputs":[]}]}"#,
        )
        .unwrap();
        assert_eq!(wf.len(), 1);
        assert_eq!(wf.workflow[0].id, "a");
        assert_eq!(wf.workflow[0].title, "t");
        assert_eq!(wf.workflow[0].prompt, "p");
    }

    #[test]
    fn empty_workflow() {
        assert!(decode(r#"{"workflow":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn duplicate_ids() {
        let (path, detail) = schema_err(
            r#"{"workflow":[
                {"id":"a","title":"t","prompt":"p","inputs":[],"outputs":[]},
                {"id":"a","title":"t2","prompt":"p2","inputs":[],"outputs":[]}
            ]}"#,
        );
        assert_eq!(path, "workflow[1].id");
        assert!(detail.contains("duplicate node id \"a\""), "got {detail}");
    }

    #[test]
    fn missing_workflow_field() {
        let (path, detail) = schema_err(r#"{"nodes":[]}"#);
        assert_eq!(path, "$");
        assert!(detail.contains("workflow"));
    }

    #[test]
    fn top_level_array_is_rejected() {
        let (_, detail) = schema_err("[]");
        assert!(detail.contains("an array"), "got {detail}");
    }

    #[test]
    fn missing_node_field_names_it() {
        let (path, detail) =
            schema_err(r#"{"workflow":[{"id":"a","prompt":"p","inputs":[],"outputs":[]}]}"#);
        assert_eq!(path, "workflow[0]");
        assert!(detail.contains("title"), "got {detail}");
    }

    #[test]
    fn wrong_type_is_reported() {
        let (path, detail) = schema_err(
            r#"{"workflow":[{"id":7,"title":"t","prompt":"p","inputs":[],"outputs":[]}]}"#,
        );
        assert_eq!(path, "workflow[0]");
        assert!(detail.contains("invalid type"), "got {detail}");
    }

    #[test]
    fn empty_slot_name() {
        let (path, _) = schema_err(
            r#"{"workflow":[{"id":"a","title":"t","prompt":"p","inputs":["ok",""],"outputs":[]}]}"#,
        );
        assert_eq!(path, "workflow[0].inputs[1]");
    }

    #[test]
    fn empty_id() {
        let (path, _) = schema_err(
            r#"{"workflow":[{"id":" ","title":"t","prompt":"p","inputs":[],"outputs":[]}]}"#,
        );
        assert_eq!(path, "workflow[0].id");
    }

    #[test]
    fn fenced_reply_is_unwrapped() {
        let raw = "```json\n{\"workflow\":[{\"id\":\"a\",\"title\":\"t\",\"prompt\":\"p\",\"inputs\":[],\"outputs\":[]}]}\n```\n";
        assert_eq!(decode(raw).unwrap().workflow[0].id, "a");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let wf = decode(
            r#"{"version":2,"workflow":[{"id":"a","title":"t","prompt":"p","inputs":[],"outputs":[],"x":1}]}"#,
        )
        .unwrap();
        assert_eq!(wf.len(), 1);
    }
}
