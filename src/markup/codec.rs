use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;
use std::collections::BTreeMap;
use crate::dsl::scalar;
use crate::dsl::{
    Branch, Choice, CompositeChoice, ExtensionNode, ParallelState, State, StateKind, SwitchState,
    Workflow,
};
use crate::error::{ModelError, ModelResult};
use crate::extensions::ExtensionRegistry;

/// Fields every state carries; anything else belongs to the variant.
const COMMON_STATE_FIELDS: [&str; 5] = ["name", "type", "start", "end", "nextState"];

/// 类型分派编解码器
///
/// Converts between the typed model and the intermediate `serde_json::Value`
/// tree. State variants are picked by `type`; choices by shape. Any `type`
/// that is not built in must be a registered extension id.
pub struct Codec<'a> {
    registry: &'a ExtensionRegistry,
}

impl<'a> Codec<'a> {
    pub fn new(registry: &'a ExtensionRegistry) -> Self {
        Self { registry }
    }

    // --- Decoding ---

    pub fn decode_workflow(&self, tree: &Value) -> ModelResult<Workflow> {
        let obj = as_object(tree, "")?;

        Ok(Workflow {
            name: required_str(obj, "name", "")?,
            start_at: text(obj, "startAt", "")?.unwrap_or_default(),
            states: self.decode_list(obj.get("states"), "states", Self::decode_state)?,
            event_triggers: field(obj, "eventTriggers", "")?.unwrap_or_default(),
            trigger_definitions: field(obj, "triggerDefinitions", "")?.unwrap_or_default(),
            metadata: text_map(obj, "metadata", "")?,
            extensions: self.decode_list(obj.get("extensions"), "extensions", Self::decode_extension)?,
        })
    }

    pub fn decode_state(&self, value: &Value, path: &str) -> ModelResult<State> {
        let obj = as_object(value, path)?;
        let type_name = required_str(obj, "type", path)?;

        let kind = match type_name.as_str() {
            StateKind::EVENT => StateKind::Event(typed(value, path)?),
            StateKind::OPERATION => StateKind::Operation(typed(value, path)?),
            StateKind::DELAY => StateKind::Delay(typed(value, path)?),
            StateKind::END => StateKind::End(typed(value, path)?),
            StateKind::PARALLEL => StateKind::Parallel(self.decode_parallel(obj, path)?),
            StateKind::SWITCH => StateKind::Switch(self.decode_switch(obj, path)?),
            other => {
                let Some(extension) = self.registry.resolve(other) else {
                    return Err(ModelError::unknown("state", path, other));
                };
                let raw = without(obj, &COMMON_STATE_FIELDS);
                StateKind::Extension(ExtensionNode::new(other, extension.decode(other, raw)?))
            }
        };

        Ok(State {
            name: required_str(obj, "name", path)?,
            start: field(obj, "start", path)?.unwrap_or(false),
            end: field(obj, "end", path)?.unwrap_or(false),
            next_state: text(obj, "nextState", path)?,
            kind,
        })
    }

    fn decode_parallel(&self, obj: &Map<String, Value>, path: &str) -> ModelResult<ParallelState> {
        let branches_path = join(path, "branches");
        Ok(ParallelState {
            branches: self.decode_list(obj.get("branches"), &branches_path, Self::decode_branch)?,
        })
    }

    fn decode_branch(&self, value: &Value, path: &str) -> ModelResult<Branch> {
        let obj = as_object(value, path)?;
        Ok(Branch {
            name: required_str(obj, "name", path)?,
            start_at: text(obj, "startAt", path)?,
            states: self.decode_list(obj.get("states"), &join(path, "states"), Self::decode_state)?,
            wait_for_completion: field(obj, "waitForCompletion", path)?.unwrap_or(false),
        })
    }

    fn decode_switch(&self, obj: &Map<String, Value>, path: &str) -> ModelResult<SwitchState> {
        let choices_path = join(path, "choices");
        Ok(SwitchState {
            choices: self.decode_list(obj.get("choices"), &choices_path, Self::decode_choice)?,
            default: text(obj, "default", path)?,
        })
    }

    pub fn decode_choice(&self, value: &Value, path: &str) -> ModelResult<Choice> {
        let obj = as_object(value, path)?;
        let combinators: Vec<&str> = [Choice::AND, Choice::OR, Choice::NOT]
            .into_iter()
            .filter(|key| obj.contains_key(*key))
            .collect();

        match combinators.as_slice() {
            [key] => {
                let composite = CompositeChoice {
                    choices: self.decode_list(obj.get(*key), &join(path, key), Self::decode_choice)?,
                    next_state: text(obj, "nextState", path)?,
                };
                Ok(match *key {
                    Choice::AND => Choice::And(composite),
                    Choice::OR => Choice::Or(composite),
                    _ => Choice::Not(composite),
                })
            }
            [] if obj.contains_key("operator") => Ok(Choice::Single(typed(value, path)?)),
            [] => Err(ModelError::unknown("choice", path, describe_keys(obj))),
            many => Err(ModelError::invalid(
                path,
                format!("choice mixes combinators: {}", many.join(", ")),
            )),
        }
    }

    fn decode_extension(&self, value: &Value, path: &str) -> ModelResult<ExtensionNode> {
        let obj = as_object(value, path)?;
        let id = required_str(obj, ExtensionNode::ID_FIELD, path)?;
        let raw = without(obj, &[ExtensionNode::ID_FIELD]);

        match self.registry.resolve(&id) {
            Some(extension) => {
                let payload = extension.decode(&id, raw)?;
                Ok(ExtensionNode::new(id, payload))
            }
            None => {
                debug!(extension_id = %id, "Keeping unregistered extension as passthrough");
                Ok(ExtensionNode {
                    id,
                    payload: raw,
                    passthrough: true,
                })
            }
        }
    }

    fn decode_list<T>(
        &self,
        value: Option<&Value>,
        path: &str,
        decode: impl Fn(&Self, &Value, &str) -> ModelResult<T>,
    ) -> ModelResult<Vec<T>> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| decode(self, item, &format!("{}[{}]", path, i)))
                .collect(),
            Some(other) => Err(ModelError::invalid(
                path,
                format!("expected a sequence, found {}", kind_of(other)),
            )),
        }
    }

    // --- Encoding ---

    pub fn encode_workflow(&self, workflow: &Workflow) -> ModelResult<Value> {
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(workflow.name));
        obj.insert("startAt".to_string(), json!(workflow.start_at));

        if !workflow.states.is_empty() {
            obj.insert("states".to_string(), self.encode_states(&workflow.states)?);
        }
        if !workflow.event_triggers.is_empty() {
            obj.insert("eventTriggers".to_string(), to_tree(&workflow.event_triggers)?);
        }
        if !workflow.trigger_definitions.is_empty() {
            obj.insert("triggerDefinitions".to_string(), to_tree(&workflow.trigger_definitions)?);
        }
        if !workflow.metadata.is_empty() {
            obj.insert("metadata".to_string(), to_tree(&workflow.metadata)?);
        }
        if !workflow.extensions.is_empty() {
            let extensions = workflow
                .extensions
                .iter()
                .map(|node| self.encode_extension(node))
                .collect::<ModelResult<Vec<_>>>()?;
            obj.insert("extensions".to_string(), Value::Array(extensions));
        }

        Ok(Value::Object(obj))
    }

    fn encode_states(&self, states: &[State]) -> ModelResult<Value> {
        states
            .iter()
            .map(|s| self.encode_state(s))
            .collect::<ModelResult<Vec<_>>>()
            .map(Value::Array)
    }

    pub fn encode_state(&self, state: &State) -> ModelResult<Value> {
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(state.name));
        obj.insert("type".to_string(), json!(state.type_name()));
        if state.start {
            obj.insert("start".to_string(), json!(true));
        }
        if state.end {
            obj.insert("end".to_string(), json!(true));
        }
        if let Some(next) = &state.next_state {
            obj.insert("nextState".to_string(), json!(next));
        }

        let fields = match &state.kind {
            StateKind::Event(s) => to_object(s)?,
            StateKind::Operation(s) => to_object(s)?,
            StateKind::Delay(s) => to_object(s)?,
            StateKind::End(s) => to_object(s)?,
            StateKind::Parallel(s) => self.encode_parallel(s)?,
            StateKind::Switch(s) => self.encode_switch(s)?,
            StateKind::Extension(node) => self.encode_extension_payload(node)?,
        };
        // Common fields win over a payload that happens to reuse their names.
        for (key, value) in fields {
            obj.entry(key).or_insert(value);
        }

        Ok(Value::Object(obj))
    }

    fn encode_parallel(&self, state: &ParallelState) -> ModelResult<Map<String, Value>> {
        let mut obj = Map::new();
        if !state.branches.is_empty() {
            let branches = state
                .branches
                .iter()
                .map(|b| self.encode_branch(b))
                .collect::<ModelResult<Vec<_>>>()?;
            obj.insert("branches".to_string(), Value::Array(branches));
        }
        Ok(obj)
    }

    fn encode_branch(&self, branch: &Branch) -> ModelResult<Value> {
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(branch.name));
        if let Some(start_at) = &branch.start_at {
            obj.insert("startAt".to_string(), json!(start_at));
        }
        if !branch.states.is_empty() {
            obj.insert("states".to_string(), self.encode_states(&branch.states)?);
        }
        if branch.wait_for_completion {
            obj.insert("waitForCompletion".to_string(), json!(true));
        }
        Ok(Value::Object(obj))
    }

    fn encode_switch(&self, state: &SwitchState) -> ModelResult<Map<String, Value>> {
        let mut obj = Map::new();
        if !state.choices.is_empty() {
            let choices = state
                .choices
                .iter()
                .map(|c| self.encode_choice(c))
                .collect::<ModelResult<Vec<_>>>()?;
            obj.insert("choices".to_string(), Value::Array(choices));
        }
        if let Some(default) = &state.default {
            obj.insert("default".to_string(), json!(default));
        }
        Ok(obj)
    }

    pub fn encode_choice(&self, choice: &Choice) -> ModelResult<Value> {
        let (key, composite) = match choice {
            Choice::Single(single) => return to_tree(single),
            Choice::And(c) => (Choice::AND, c),
            Choice::Or(c) => (Choice::OR, c),
            Choice::Not(c) => (Choice::NOT, c),
        };

        let nested = composite
            .choices
            .iter()
            .map(|c| self.encode_choice(c))
            .collect::<ModelResult<Vec<_>>>()?;
        let mut obj = Map::new();
        obj.insert(key.to_string(), Value::Array(nested));
        if let Some(next) = &composite.next_state {
            obj.insert("nextState".to_string(), json!(next));
        }
        Ok(Value::Object(obj))
    }

    fn encode_extension(&self, node: &ExtensionNode) -> ModelResult<Value> {
        let mut obj = Map::new();
        obj.insert(ExtensionNode::ID_FIELD.to_string(), json!(node.id));
        for (key, value) in self.encode_extension_payload(node)? {
            obj.entry(key).or_insert(value);
        }
        Ok(Value::Object(obj))
    }

    /// Registered ids go through their kind; passthrough payloads are emitted
    /// as read. Anything else would silently lose data, so it fails.
    fn encode_extension_payload(&self, node: &ExtensionNode) -> ModelResult<Map<String, Value>> {
        match self.registry.resolve(&node.id) {
            Some(extension) => extension.encode(&node.id, &node.payload),
            None if node.passthrough => Ok(node.payload.clone()),
            None => Err(ModelError::UnresolvedExtension {
                id: node.id.clone(),
            }),
        }
    }
}

// --- Tree helpers ---

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn describe_keys(obj: &Map<String, Value>) -> String {
    let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    format!("{{{}}}", keys.join(", "))
}

fn as_object<'v>(value: &'v Value, path: &str) -> ModelResult<&'v Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        ModelError::invalid(path, format!("expected a mapping, found {}", kind_of(value)))
    })
}

fn field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str, path: &str) -> ModelResult<Option<T>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(|e| ModelError::invalid(&join(path, key), e.to_string())),
    }
}

/// String fields take any scalar; see [`scalar`].
fn text(obj: &Map<String, Value>, key: &str, path: &str) -> ModelResult<Option<String>> {
    match obj.get(key) {
        None => Ok(None),
        Some(value) => scalar::text::<serde_json::Error>(value.clone())
            .map_err(|e| ModelError::invalid(&join(path, key), e.to_string())),
    }
}

fn text_map(obj: &Map<String, Value>, key: &str, path: &str) -> ModelResult<BTreeMap<String, String>> {
    match obj.get(key) {
        None => Ok(BTreeMap::new()),
        Some(value) => scalar::string_map(value)
            .map_err(|e| ModelError::invalid(&join(path, key), e.to_string())),
    }
}

fn required_str(obj: &Map<String, Value>, key: &str, path: &str) -> ModelResult<String> {
    text(obj, key, path)?
        .ok_or_else(|| ModelError::invalid(path, format!("missing required field '{}'", key)))
}

fn typed<T: DeserializeOwned>(value: &Value, path: &str) -> ModelResult<T> {
    T::deserialize(value).map_err(|e| ModelError::invalid(path, e.to_string()))
}

fn without(obj: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    obj.iter()
        .filter(|(k, _)| !keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn to_tree<T: Serialize>(value: &T) -> ModelResult<Value> {
    serde_json::to_value(value).map_err(|e| ModelError::Render(e.to_string()))
}

fn to_object<T: Serialize>(value: &T) -> ModelResult<Map<String, Value>> {
    match to_tree(value)? {
        Value::Object(obj) => Ok(obj),
        other => Err(ModelError::Render(format!(
            "expected a mapping, found {}",
            kind_of(&other)
        ))),
    }
}
