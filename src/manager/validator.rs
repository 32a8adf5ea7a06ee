use std::collections::{HashMap, HashSet};
use std::fmt;
use crate::dsl::{Action, Choice, State, StateKind, Workflow};
use crate::extensions::ExtensionRegistry;
use super::WorkflowManager;

/// 工作流校验器接口
///
/// Receives the whole manager so it can see both the document and the
/// extension registrations bound to it.
pub trait WorkflowValidator: Send + Sync {
    fn name(&self) -> &str;
    fn validate(&self, manager: &WorkflowManager) -> ValidationReport;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Whether any issue sits at or below `path`.
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| match issue.path.strip_prefix(path) {
            Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with('['),
            None => false,
        })
    }
}

/// 默认校验器
///
/// State names resolve within the enclosing scope: the top-level state list
/// or the state list of one parallel branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidator;

impl DefaultValidator {
    pub const NAME: &'static str = "default";
}

impl WorkflowValidator for DefaultValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, manager: &WorkflowManager) -> ValidationReport {
        let mut report = ValidationReport::default();
        let Some(workflow) = manager.workflow() else {
            report.push("<root>", "no workflow has been set");
            return report;
        };

        let checker = Checker {
            workflow,
            registry: manager.extensions(),
        };
        checker.check_workflow(&mut report);
        report
    }
}

struct Checker<'a> {
    workflow: &'a Workflow,
    registry: &'a ExtensionRegistry,
}

impl Checker<'_> {
    fn check_workflow(&self, report: &mut ValidationReport) {
        let wf = self.workflow;
        if wf.name.trim().is_empty() {
            report.push("name", "workflow name must not be empty");
        }

        let mut trigger_names = HashSet::new();
        for (i, trigger) in wf.event_triggers.iter().enumerate() {
            if !trigger_names.insert(trigger.name.as_str()) {
                report.push(
                    format!("eventTriggers[{}].name", i),
                    format!("duplicate trigger name '{}'", trigger.name),
                );
            }
        }

        let start_at = (!wf.start_at.is_empty()).then_some(wf.start_at.as_str());
        self.check_scope(&wf.states, start_at, "states", "startAt", report);

        for (i, node) in wf.extensions.iter().enumerate() {
            if !node.passthrough && !self.registry.contains(&node.id) {
                report.push(
                    format!("extensions[{}]", i),
                    format!("extension '{}' is not registered", node.id),
                );
            }
        }
    }

    fn check_scope(
        &self,
        states: &[State],
        start_at: Option<&str>,
        path: &str,
        start_at_path: &str,
        report: &mut ValidationReport,
    ) {
        let mut names: HashMap<&str, usize> = HashMap::new();
        for (i, state) in states.iter().enumerate() {
            if names.insert(state.name.as_str(), i).is_some() {
                report.push(
                    format!("{}[{}].name", path, i),
                    format!("duplicate state name '{}'", state.name),
                );
            }
        }
        let scope = Scope { names };

        if let Some(start_at) = start_at {
            scope.check_ref(start_at, start_at_path, report);
        }

        let starts = states.iter().filter(|s| s.start).count();
        if starts > 1 {
            report.push(path, format!("{} states are marked as start", starts));
        }

        for (i, state) in states.iter().enumerate() {
            self.check_state(state, &scope, &format!("{}[{}]", path, i), report);
        }
    }

    fn check_state(&self, state: &State, scope: &Scope, path: &str, report: &mut ValidationReport) {
        if let Some(next) = &state.next_state {
            scope.check_ref(next, &format!("{}.nextState", path), report);
        }

        let terminal = state.end || matches!(state.kind, StateKind::End(_));
        let routes_itself = match &state.kind {
            StateKind::Switch(_) | StateKind::Extension(_) => true,
            StateKind::Event(s) => !s.events.is_empty() && s.events.iter().all(|e| e.next_state.is_some()),
            _ => false,
        };
        if !terminal && !routes_itself && state.next_state.is_none() {
            report.push(
                path,
                format!("state '{}' is neither an end state nor has a nextState", state.name),
            );
        }

        match &state.kind {
            StateKind::Event(s) => {
                for (i, event) in s.events.iter().enumerate() {
                    let event_path = format!("{}.events[{}]", path, i);
                    match (&event.event, &event.event_expression) {
                        (None, None) => report.push(
                            event_path.as_str(),
                            "event needs either 'event' or 'eventExpression'",
                        ),
                        (Some(_), Some(_)) => report.push(
                            event_path.as_str(),
                            "event sets both 'event' and 'eventExpression'",
                        ),
                        _ => {}
                    }
                    if let Some(name) = &event.event {
                        let known = self
                            .workflow
                            .event_triggers
                            .iter()
                            .any(|t| t.name.eq_ignore_ascii_case(name));
                        if !known {
                            report.push(
                                format!("{}.event", event_path),
                                format!("event '{}' names no event trigger", name),
                            );
                        }
                    }
                    if let Some(next) = &event.next_state {
                        scope.check_ref(next, &format!("{}.nextState", event_path), report);
                    }
                    if let Some(then) = event.timeout.as_ref().and_then(|t| t.then.as_ref()) {
                        scope.check_ref(then, &format!("{}.timeout.then", event_path), report);
                    }
                    self.check_actions(&event.actions, scope, &format!("{}.actions", event_path), report);
                }
            }
            StateKind::Operation(s) => {
                self.check_actions(&s.actions, scope, &format!("{}.actions", path), report);
            }
            StateKind::Parallel(s) => {
                for (i, branch) in s.branches.iter().enumerate() {
                    let branch_path = format!("{}.branches[{}]", path, i);
                    self.check_scope(
                        &branch.states,
                        branch.start_at.as_deref(),
                        &format!("{}.states", branch_path),
                        &format!("{}.startAt", branch_path),
                        report,
                    );
                }
            }
            StateKind::Switch(s) => {
                for (i, choice) in s.choices.iter().enumerate() {
                    check_choice(choice, scope, &format!("{}.choices[{}]", path, i), report);
                }
                if let Some(default) = &s.default {
                    scope.check_ref(default, &format!("{}.default", path), report);
                }
            }
            StateKind::Extension(node) => {
                if !node.passthrough && !self.registry.contains(&node.id) {
                    report.push(path, format!("extension '{}' is not registered", node.id));
                }
            }
            StateKind::Delay(_) | StateKind::End(_) => {}
        }
    }

    fn check_actions(&self, actions: &[Action], scope: &Scope, path: &str, report: &mut ValidationReport) {
        for (i, action) in actions.iter().enumerate() {
            if action.function.name.trim().is_empty() {
                report.push(format!("{}[{}].function.name", path, i), "function name must not be empty");
            }
            if let Some(next) = action.retry.as_ref().and_then(|r| r.next_state.as_ref()) {
                scope.check_ref(next, &format!("{}[{}].retry.nextState", path, i), report);
            }
        }
    }
}

fn check_choice(choice: &Choice, scope: &Scope, path: &str, report: &mut ValidationReport) {
    if let Some(next) = choice.next_state() {
        scope.check_ref(next, &format!("{}.nextState", path), report);
    }
    let (key, nested) = match choice {
        Choice::Single(_) => return,
        Choice::And(c) => (Choice::AND, &c.choices),
        Choice::Or(c) => (Choice::OR, &c.choices),
        Choice::Not(c) => (Choice::NOT, &c.choices),
    };
    for (i, inner) in nested.iter().enumerate() {
        check_choice(inner, scope, &format!("{}.{}[{}]", path, key, i), report);
    }
}

struct Scope<'a> {
    names: HashMap<&'a str, usize>,
}

impl Scope<'_> {
    fn check_ref(&self, target: &str, path: &str, report: &mut ValidationReport) {
        if !self.names.contains_key(target) {
            report.push(path, format!("'{}' names no state in this scope", target));
        }
    }
}
