//! System prompts for screenshot-to-workflow generation.
//!
//! The user turn always carries the caller's description followed by the
//! screenshots; the instructions about *shape* live here instead, so the
//! description reaches the model untouched and the schema the decoder
//! enforces is spelled out in exactly one place.
//!
//! Callers can override the default via [`crate::config::GeneratorConfig::system_prompt`].

use crate::config::GeneratorConfig;

/// Default system prompt describing the workflow JSON the decoder accepts.
///
/// Mentions "JSON" explicitly: OpenAI's `json_object` response format
/// rejects requests whose messages never ask for JSON.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a GUI automation planner. You receive a short scenario description followed by one or more screenshots of an application's user interface. Produce the workflow a GUI agent should follow to carry out the scenario on that interface.

Respond with a single JSON object and nothing else, using exactly this shape:

{
  "workflow": [
    {
      "id": "unique_snake_case_id",
      "title": "Short human-readable step name",
      "prompt": "Instruction the agent executes for this step, referring to visible UI elements",
      "inputs": [{"name": "slot_name", "type": "string", "desc": "what the step consumes"}],
      "outputs": [{"name": "slot_name", "type": "string", "desc": "what the step produces"}]
    }
  ]
}

Rules:
1. Order nodes in the sequence the agent runs them.
2. Every "id" is unique and non-empty.
3. Every input and output has a non-empty "name". Use [] when a step has none.
4. An output consumed by a later step keeps the same "name" in that step's inputs.
5. Do NOT wrap the JSON in markdown fences and do NOT add commentary."#;

/// The system prompt in effect for `config`.
pub fn system_prompt(config: &GeneratorConfig) -> &str {
    config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
}
