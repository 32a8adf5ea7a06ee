use crate::dsl::{Action, Event, EventState, EventTrigger, Function, State, StateKind, Workflow};
use std::collections::HashMap;

impl Workflow {
    pub fn has_event_triggers(&self) -> bool {
        !self.event_triggers.is_empty()
    }

    /// Triggers keyed by name. A later duplicate shadows an earlier one.
    pub fn event_triggers_by_name(&self) -> HashMap<&str, &EventTrigger> {
        self.event_triggers
            .iter()
            .map(|t| (t.name.as_str(), t))
            .collect()
    }

    pub fn has_states(&self) -> bool {
        !self.states.is_empty()
    }

    pub fn unique_states(&self) -> HashMap<&str, &State> {
        self.states.iter().map(|s| (s.name.as_str(), s)).collect()
    }

    /// Events across all top-level event states that name `trigger` (case-insensitive).
    pub fn events_for_trigger(&self, trigger: &EventTrigger) -> Vec<&Event> {
        self.states
            .iter()
            .filter_map(|state| match &state.kind {
                StateKind::Event(event_state) => Some(&event_state.events),
                _ => None,
            })
            .flatten()
            .filter(|e| {
                e.event
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(&trigger.name))
            })
            .collect()
    }

    pub fn triggers_for_state(&self, event_state: &EventState) -> Vec<&EventTrigger> {
        self.event_triggers
            .iter()
            .filter(|trigger| {
                event_state.events.iter().any(|e| {
                    e.event
                        .as_deref()
                        .is_some_and(|name| name.eq_ignore_ascii_case(&trigger.name))
                })
            })
            .collect()
    }

    pub fn start_state(&self) -> Option<&State> {
        self.state(&self.start_at)
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name == name)
    }

    pub fn has_end_state(&self) -> bool {
        self.states.iter().any(|s| s.end)
    }
}

pub fn functions(actions: &[Action]) -> Vec<&Function> {
    actions.iter().map(|a| &a.function).collect()
}
