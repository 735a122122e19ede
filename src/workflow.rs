//! The workflow document returned to callers.
//!
//! A [`Workflow`] is an ordered list of [`WorkflowNode`]s. Each node carries
//! the prompt a GUI agent should run plus named input and output [`Slot`]s.
//! The serialised form is `{"workflow": [ ... ]}`; the HTTP surface wraps it
//! once more as `{"dsl": ...}`.
//!
//! Slots accept two spellings on input, because models produce both:
//!
//! ```json
//! "inputs": ["username", {"name": "password", "type": "string", "desc": "user secret"}]
//! ```
//!
//! A slot without `type` and `desc` is written back as a bare string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An ordered graph of nodes produced from screenshots and a description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub workflow: Vec<WorkflowNode>,
}

impl Workflow {
    pub fn nodes(&self) -> &[WorkflowNode] {
        &self.workflow
    }

    pub fn len(&self) -> usize {
        self.workflow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflow.is_empty()
    }

    /// Look up a node by its identifier.
    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.workflow.iter().find(|n| n.id == id)
    }
}

/// One step of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique within its [`Workflow`].
    pub id: String,
    pub title: String,
    pub prompt: String,
    pub inputs: Vec<Slot>,
    pub outputs: Vec<Slot>,
}

/// A named input or output binding of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub kind: Option<String>,
    pub desc: Option<String>,
}

impl Slot {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            desc: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SlotObject {
    name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged, expecting = "a slot name string or an object with a `name` field")]
enum SlotRepr {
    Name(String),
    Object(SlotObject),
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match SlotRepr::deserialize(deserializer)? {
            SlotRepr::Name(name) => Slot::named(name),
            SlotRepr::Object(o) => Slot {
                name: o.name,
                kind: o.kind,
                desc: o.desc,
            },
        })
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.kind.is_none() && self.desc.is_none() {
            serializer.serialize_str(&self.name)
        } else {
            SlotObject {
                name: self.name.clone(),
                kind: self.kind.clone(),
                desc: self.desc.clone(),
            }
            .serialize(serializer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slot_accepts_both_spellings() {
        let node: WorkflowNode = serde_json::from_value(json!({
            "id": "login",
            "title": "Log in",
            "prompt": "Type the credentials and submit",
            "inputs": ["username", {"name": "password", "type": "string", "desc": "secret"}],
            "outputs": []
        }))
        .unwrap();
        assert_eq!(node.inputs[0], Slot::named("username"));
        assert_eq!(node.inputs[1].kind.as_deref(), Some("string"));
        assert_eq!(node.inputs[1].desc.as_deref(), Some("secret"));
    }

    #[test]
    fn plain_slot_serialises_as_string() {
        let node = WorkflowNode {
            id: "a".into(),
            title: "t".into(),
            prompt: "p".into(),
            inputs: vec![Slot::named("query")],
            outputs: vec![Slot {
                name: "results".into(),
                kind: Some("list".into()),
                desc: None,
            }],
        };
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v["inputs"], json!(["query"]));
        assert_eq!(v["outputs"], json!([{"name": "results", "type": "list"}]));
    }

    #[test]
    fn lookup_by_id() {
        let wf = Workflow {
            workflow: vec![WorkflowNode {
                id: "search".into(),
                title: "Search".into(),
                prompt: "Search for the item".into(),
                inputs: vec![],
                outputs: vec![],
            }],
        };
        assert_eq!(wf.len(), 1);
        assert!(wf.node("search").is_some());
        assert!(wf.node("missing").is_none());
        assert_eq!(serde_json::to_value(Workflow::default()).unwrap(), json!({"workflow": []}));
    }
}
