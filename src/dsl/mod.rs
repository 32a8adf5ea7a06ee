pub mod builder;
pub mod duration;
pub mod query;
pub(crate) mod scalar;

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

/// 工作流文档
///
/// Built programmatically through [`builder::WorkflowBuilder`] or decoded by
/// [`crate::markup::codec::Codec`]. The model tolerates dangling state
/// references; the validator reports them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workflow {
    pub name: String,
    pub start_at: String,
    pub states: Vec<State>,
    pub event_triggers: Vec<EventTrigger>,
    pub trigger_definitions: Vec<TriggerEvent>,
    pub metadata: BTreeMap<String, String>,
    pub extensions: Vec<ExtensionNode>,
}

/// 文档中的状态
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub name: String,
    pub start: bool,
    pub end: bool,
    pub next_state: Option<String>,
    pub kind: StateKind,
}

impl State {
    /// The discriminator written to the `type` field.
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }
}

/// 状态类型
#[derive(Debug, Clone, PartialEq)]
pub enum StateKind {
    Event(EventState),
    Operation(OperationState),
    Delay(DelayState),
    Parallel(ParallelState),
    Switch(SwitchState),
    End(EndState),
    /// Any `type` that names a registered extension instead of a built-in kind.
    Extension(ExtensionNode),
}

impl StateKind {
    pub const EVENT: &'static str = "EVENT";
    pub const OPERATION: &'static str = "OPERATION";
    pub const DELAY: &'static str = "DELAY";
    pub const PARALLEL: &'static str = "PARALLEL";
    pub const SWITCH: &'static str = "SWITCH";
    pub const END: &'static str = "END";

    pub fn type_name(&self) -> &str {
        match self {
            StateKind::Event(_) => Self::EVENT,
            StateKind::Operation(_) => Self::OPERATION,
            StateKind::Delay(_) => Self::DELAY,
            StateKind::Parallel(_) => Self::PARALLEL,
            StateKind::Switch(_) => Self::SWITCH,
            StateKind::End(_) => Self::END,
            StateKind::Extension(node) => &node.id,
        }
    }

    pub fn is_builtin(type_name: &str) -> bool {
        matches!(
            type_name,
            Self::EVENT | Self::OPERATION | Self::DELAY | Self::PARALLEL | Self::SWITCH | Self::END
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionMode {
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventState {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_mode: Option<ActionMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_mode: Option<ActionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayState {
    /// ISO-8601 duration. Integer seconds are accepted on input and normalized.
    #[serde(
        default,
        deserialize_with = "duration::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_delay: Option<String>,
}

/// Branches hold nested states, so this is encoded by the codec rather than derived.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParallelState {
    pub branches: Vec<Branch>,
}

/// 并行块中的一个分支 (嵌套子图)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Branch {
    pub name: String,
    pub start_at: Option<String>,
    pub states: Vec<State>,
    pub wait_for_completion: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwitchState {
    pub choices: Vec<Choice>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndStatus {
    Success,
    Fail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EndStatus>,
}

/// 条件分支
///
/// The discriminator is structural: an object carrying `and`, `or` or `not`
/// is a combinator, an object carrying `operator` is a single predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
    Single(SingleChoice),
    And(CompositeChoice),
    Or(CompositeChoice),
    Not(CompositeChoice),
}

impl Choice {
    pub const AND: &'static str = "and";
    pub const OR: &'static str = "or";
    pub const NOT: &'static str = "not";

    pub fn next_state(&self) -> Option<&str> {
        match self {
            Choice::Single(single) => single.next_state.as_deref(),
            Choice::And(c) | Choice::Or(c) | Choice::Not(c) => c.next_state.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleChoice {
    #[serde(deserialize_with = "scalar::string")]
    pub path: String,
    pub operator: Operator,
    /// Numbers and booleans are accepted on input and kept in their textual form.
    #[serde(default, deserialize_with = "scalar::string")]
    pub value: String,
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub next_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeChoice {
    pub choices: Vec<Choice>,
    pub next_state: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Eq,
    Lt,
    Lteq,
    Gt,
    Gteq,
    StrEq,
    StrLt,
    StrLteq,
    StrGt,
    StrGteq,
    True,
    False,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub event_expression: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub next_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

/// Either `{period, then}` or a bare duration string on input; always the
/// structured form in memory and on output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "duration::RawTimeout")]
pub struct Timeout {
    pub period: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub function: Function,
    /// ISO-8601 duration. Integer seconds are accepted on input and normalized.
    #[serde(
        default,
        deserialize_with = "duration::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<Retry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    #[serde(deserialize_with = "scalar::string")]
    pub name: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "scalar::string_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Retry {
    #[serde(
        rename = "match",
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub matches: Option<String>,
    #[serde(alias = "maxRetry", default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(
        alias = "retryInterval",
        default,
        deserialize_with = "duration::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub interval: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub next_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTrigger {
    #[serde(deserialize_with = "scalar::string")]
    pub name: String,
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "scalar::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    #[serde(deserialize_with = "scalar::string")]
    pub name: String,
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

/// 扩展节点
///
/// The payload shape belongs to whichever extension registered `id`. A
/// `passthrough` node was read from a top-level `extensions` entry without a
/// matching registration and is written back untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionNode {
    pub id: String,
    pub payload: Map<String, Value>,
    pub passthrough: bool,
}

impl ExtensionNode {
    pub const ID_FIELD: &'static str = "extensionid";

    pub fn new(id: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            payload,
            passthrough: false,
        }
    }

    /// Builds a node from any serializable extension value.
    pub fn from_value<T: Serialize>(id: impl Into<String>, value: &T) -> crate::ModelResult<Self> {
        let id = id.into();
        match serde_json::to_value(value) {
            Ok(Value::Object(payload)) => Ok(Self::new(id, payload)),
            Ok(_) => Err(crate::ModelError::invalid(&id, "extension payload must be an object")),
            Err(e) => Err(crate::ModelError::invalid(&id, e.to_string())),
        }
    }

    /// Reads the payload back as the extension's own type.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> crate::ModelResult<T> {
        serde_json::from_value(Value::Object(self.payload.clone()))
            .map_err(|e| crate::ModelError::invalid(&self.id, e.to_string()))
    }
}
