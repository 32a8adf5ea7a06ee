use crate::dsl::{
    Action, ActionMode, Branch, Choice, CompositeChoice, DelayState, EndState, EndStatus, Event,
    EventState, EventTrigger, ExtensionNode, Filter, Function, OperationState, Operator,
    ParallelState, Retry, SingleChoice, State, StateKind, SwitchState, Timeout, TriggerEvent,
    Workflow,
};
use crate::dsl::duration;
use std::collections::BTreeMap;

pub struct WorkflowBuilder {
    name: String,
    start_at: String,
    states: Vec<State>,
    event_triggers: Vec<EventTrigger>,
    trigger_definitions: Vec<TriggerEvent>,
    metadata: BTreeMap<String, String>,
    extensions: Vec<ExtensionNode>,
}

impl WorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start_at: String::new(),
            states: Vec::new(),
            event_triggers: Vec::new(),
            trigger_definitions: Vec::new(),
            metadata: BTreeMap::new(),
            extensions: Vec::new(),
        }
    }

    pub fn start_at(mut self, state_name: &str) -> Self {
        self.start_at = state_name.to_string();
        self
    }

    /// Re-using a key overwrites the earlier value.
    pub fn meta(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn trigger(mut self, trigger: EventTrigger) -> Self {
        self.event_triggers.push(trigger);
        self
    }

    pub fn trigger_definition(mut self, definition: TriggerEvent) -> Self {
        self.trigger_definitions.push(definition);
        self
    }

    pub fn extension(mut self, node: ExtensionNode) -> Self {
        self.extensions.push(node);
        self
    }

    /// 添加一个已构建的状态
    pub fn add_state(mut self, state: State) -> Self {
        self.states.push(state);
        self
    }

    pub fn state(self, name: &str, kind: impl Into<StateKind>) -> StateBuilder<Self> {
        StateBuilder {
            parent: self,
            state: State::new(name, kind),
        }
    }

    pub fn build(self) -> Workflow {
        Workflow {
            name: self.name,
            start_at: self.start_at,
            states: self.states,
            event_triggers: self.event_triggers,
            trigger_definitions: self.trigger_definitions,
            metadata: self.metadata,
            extensions: self.extensions,
        }
    }
}

/// Anything a [`StateBuilder`] can hand its finished state back to.
pub trait StateSink {
    fn push_state(&mut self, state: State);
}

impl StateSink for WorkflowBuilder {
    fn push_state(&mut self, state: State) {
        self.states.push(state);
    }
}

impl StateSink for BranchBuilder {
    fn push_state(&mut self, state: State) {
        self.branch.states.push(state);
    }
}

pub struct StateBuilder<P: StateSink> {
    parent: P,
    state: State,
}

impl<P: StateSink> StateBuilder<P> {
    pub fn start(mut self, start: bool) -> Self {
        self.state.start = start;
        self
    }

    pub fn end(mut self, end: bool) -> Self {
        self.state.end = end;
        self
    }

    pub fn next_state(mut self, next: &str) -> Self {
        self.state.next_state = Some(next.to_string());
        self
    }

    pub fn build(mut self) -> P {
        self.parent.push_state(self.state);
        self.parent
    }
}

/// 并行分支构建器
pub struct BranchBuilder {
    branch: Branch,
}

impl BranchBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            branch: Branch {
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn start_at(mut self, state_name: &str) -> Self {
        self.branch.start_at = Some(state_name.to_string());
        self
    }

    pub fn wait_for_completion(mut self, wait: bool) -> Self {
        self.branch.wait_for_completion = wait;
        self
    }

    pub fn add_state(mut self, state: State) -> Self {
        self.branch.states.push(state);
        self
    }

    pub fn state(self, name: &str, kind: impl Into<StateKind>) -> StateBuilder<Self> {
        StateBuilder {
            parent: self,
            state: State::new(name, kind),
        }
    }

    pub fn build(self) -> Branch {
        self.branch
    }
}

// --- Chainable setters for the leaf types ---

impl State {
    pub fn new(name: impl Into<String>, kind: impl Into<StateKind>) -> Self {
        Self {
            name: name.into(),
            start: false,
            end: false,
            next_state: None,
            kind: kind.into(),
        }
    }

    pub fn with_start(mut self, start: bool) -> Self {
        self.start = start;
        self
    }

    pub fn with_end(mut self, end: bool) -> Self {
        self.end = end;
        self
    }

    pub fn with_next_state(mut self, next: impl Into<String>) -> Self {
        self.next_state = Some(next.into());
        self
    }
}

macro_rules! into_state_kind {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for StateKind {
                fn from(state: $ty) -> Self {
                    StateKind::$variant(state)
                }
            }
        )*
    };
}

into_state_kind!(
    EventState => Event,
    OperationState => Operation,
    DelayState => Delay,
    ParallelState => Parallel,
    SwitchState => Switch,
    EndState => End,
    ExtensionNode => Extension,
);

impl EventState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_action_mode(mut self, mode: ActionMode) -> Self {
        self.action_mode = Some(mode);
        self
    }
}

impl OperationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_action_mode(mut self, mode: ActionMode) -> Self {
        self.action_mode = Some(mode);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl DelayState {
    pub fn new(time_delay: impl Into<String>) -> Self {
        Self {
            time_delay: Some(time_delay.into()),
        }
    }

    pub fn seconds(secs: u64) -> Self {
        Self::new(duration::seconds(secs))
    }
}

impl ParallelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branch(mut self, branch: Branch) -> Self {
        self.branches.push(branch);
        self
    }
}

impl SwitchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_default(mut self, state_name: impl Into<String>) -> Self {
        self.default = Some(state_name.into());
        self
    }
}

impl EndState {
    pub fn new(status: EndStatus) -> Self {
        Self {
            status: Some(status),
        }
    }
}

impl Choice {
    pub fn single(path: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Choice::Single(SingleChoice {
            path: path.into(),
            operator,
            value: value.into(),
            next_state: None,
        })
    }

    pub fn and(choices: Vec<Choice>) -> Self {
        Choice::And(CompositeChoice { choices, next_state: None })
    }

    pub fn or(choices: Vec<Choice>) -> Self {
        Choice::Or(CompositeChoice { choices, next_state: None })
    }

    pub fn not_any(choices: Vec<Choice>) -> Self {
        Choice::Not(CompositeChoice { choices, next_state: None })
    }

    pub fn with_next_state(mut self, next: impl Into<String>) -> Self {
        let next = Some(next.into());
        match &mut self {
            Choice::Single(single) => single.next_state = next,
            Choice::And(c) | Choice::Or(c) | Choice::Not(c) => c.next_state = next,
        }
        self
    }
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input_path(mut self, path: impl Into<String>) -> Self {
        self.input_path = Some(path.into());
        self
    }

    pub fn with_result_path(mut self, path: impl Into<String>) -> Self {
        self.result_path = Some(path.into());
        self
    }

    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

impl Event {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            ..Default::default()
        }
    }

    pub fn from_expression(expression: impl Into<String>) -> Self {
        Self {
            event_expression: Some(expression.into()),
            ..Default::default()
        }
    }

    pub fn with_next_state(mut self, next: impl Into<String>) -> Self {
        self.next_state = Some(next.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

impl Timeout {
    pub fn new(period: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            then: None,
        }
    }

    pub fn with_then(mut self, state_name: impl Into<String>) -> Self {
        self.then = Some(state_name.into());
        self
    }
}

impl Action {
    pub fn new(function: Function) -> Self {
        Self {
            function,
            timeout: None,
            retry: None,
        }
    }

    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Same value [`Action::with_timeout`] would hold for the ISO-8601 form.
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        self.with_timeout(duration::seconds(secs))
    }

    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.retry = Some(retry);
        self
    }
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

impl Retry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match(mut self, matches: impl Into<String>) -> Self {
        self.matches = Some(matches.into());
        self
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = Some(max);
        self
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    pub fn with_interval_secs(self, secs: u64) -> Self {
        self.with_interval(duration::seconds(secs))
    }

    pub fn with_next_state(mut self, next: impl Into<String>) -> Self {
        self.next_state = Some(next.into());
        self
    }
}

impl EventTrigger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_correlation_token(mut self, token: impl Into<String>) -> Self {
        self.correlation_token = Some(token.into());
        self
    }
}

impl TriggerEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn with_correlation_token(mut self, token: impl Into<String>) -> Self {
        self.correlation_token = Some(token.into());
        self
    }
}
