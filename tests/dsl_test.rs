use flowmark::dsl::builder::{BranchBuilder, WorkflowBuilder};
use flowmark::dsl::query::functions;
use flowmark::dsl::*;

fn sample_workflow() -> Workflow {
    WorkflowBuilder::new("test-wf")
        .start_at("test-state")
        .meta("owner", "ops")
        .trigger(EventTrigger::new("test-event").with_source("orders").with_type("created"))
        .trigger(EventTrigger::new("other-event"))
        .state(
            "test-state",
            EventState::new().with_event(
                Event::new("TEST-EVENT")
                    .with_next_state("testNextState")
                    .with_timeout(Timeout::new("timeoutPeriod").with_then("timeoutState"))
                    .with_action(Action::new(Function::new("notify").with_type("rest"))),
            ),
        )
            .end(true)
            .build()
        .state("work", OperationState::new().with_action(Action::new(Function::new("charge"))))
            .next_state("test-state")
            .build()
        .build()
}

#[test]
fn test_build_event_workflow() {
    let workflow = sample_workflow();

    assert_eq!(workflow.name, "test-wf");
    assert_eq!(workflow.start_at, "test-state");
    assert_eq!(workflow.states.len(), 2);
    assert_eq!(workflow.event_triggers.len(), 2);

    let state = &workflow.states[0];
    assert!(state.end);
    assert_eq!(state.type_name(), StateKind::EVENT);
    if let StateKind::Event(event_state) = &state.kind {
        let event = &event_state.events[0];
        assert_eq!(event.next_state.as_deref(), Some("testNextState"));
        let timeout = event.timeout.as_ref().expect("timeout should be set");
        assert_eq!(timeout.period, "timeoutPeriod");
        assert_eq!(timeout.then.as_deref(), Some("timeoutState"));
    } else {
        panic!("State kind mismatch");
    }
}

#[test]
fn test_sequences_keep_insertion_order() {
    let switch = SwitchState::new()
        .with_choice(Choice::single("$.a", Operator::Eq, "1").with_next_state("x"))
        .with_choice(Choice::single("$.b", Operator::Eq, "2").with_next_state("y"))
        .with_choice(Choice::single("$.c", Operator::Eq, "3").with_next_state("z"));

    let workflow = WorkflowBuilder::new("ordered")
        .state("third", EndState::new(EndStatus::Success)).build()
        .state("first", switch).build()
        .state("second", DelayState::seconds(5)).next_state("third").build()
        .build();

    let names: Vec<&str> = workflow.states.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["third", "first", "second"]);

    if let StateKind::Switch(s) = &workflow.states[1].kind {
        let targets: Vec<_> = s.choices.iter().filter_map(|c| c.next_state()).collect();
        assert_eq!(targets, vec!["x", "y", "z"]);
    } else {
        panic!("State kind mismatch");
    }
}

#[test]
fn test_mapping_fields_overwrite_on_same_key() {
    let workflow = WorkflowBuilder::new("meta")
        .meta("env", "dev")
        .meta("team", "core")
        .meta("env", "prod")
        .build();

    assert_eq!(workflow.metadata.len(), 2);
    assert_eq!(workflow.metadata.get("env").map(String::as_str), Some("prod"));

    let function = Function::new("call")
        .with_parameter("url", "a")
        .with_parameter("url", "b");
    assert_eq!(function.parameters.len(), 1);
    assert_eq!(function.parameters.get("url").map(String::as_str), Some("b"));
}

#[test]
fn test_duration_helpers_use_iso_form() {
    assert_eq!(DelayState::seconds(30).time_delay.as_deref(), Some("PT30S"));

    let action = Action::new(Function::new("slow"))
        .with_timeout_secs(5)
        .with_retry(Retry::new().with_max_retries(3).with_interval_secs(10));
    assert_eq!(action.timeout.as_deref(), Some("PT5S"));
    let retry = action.retry.expect("retry should be set");
    assert_eq!(retry.interval.as_deref(), Some("PT10S"));
    assert_eq!(retry.max_retries, Some(3));
}

#[test]
fn test_build_parallel_branches() {
    let parallel = ParallelState::new()
        .with_branch(
            BranchBuilder::new("left")
                .start_at("wait")
                .wait_for_completion(true)
                .state("wait", DelayState::seconds(1)).next_state("stop").build()
                .state("stop", EndState::new(EndStatus::Success)).end(true).build()
                .build(),
        )
        .with_branch(BranchBuilder::new("right").build());

    let workflow = WorkflowBuilder::new("fan-out")
        .state("split", parallel).start(true).end(true).build()
        .build();

    if let StateKind::Parallel(p) = &workflow.states[0].kind {
        assert_eq!(p.branches.len(), 2);
        assert_eq!(p.branches[0].start_at.as_deref(), Some("wait"));
        assert!(p.branches[0].wait_for_completion);
        assert_eq!(p.branches[0].states.len(), 2);
        assert!(p.branches[1].states.is_empty());
    } else {
        panic!("State kind mismatch");
    }
}

#[test]
fn test_query_helpers() {
    let workflow = sample_workflow();

    assert!(workflow.has_event_triggers());
    assert!(workflow.has_states());
    assert!(workflow.has_end_state());
    assert_eq!(workflow.start_state().map(|s| s.name.as_str()), Some("test-state"));
    assert!(workflow.state("missing").is_none());

    let by_name = workflow.event_triggers_by_name();
    assert_eq!(by_name.get("test-event").and_then(|t| t.source.as_deref()), Some("orders"));

    let unique = workflow.unique_states();
    assert!(unique.contains_key("work"));

    // 事件名匹配不区分大小写
    let trigger = &workflow.event_triggers[0];
    let events = workflow.events_for_trigger(trigger);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some("TEST-EVENT"));
    assert!(workflow.events_for_trigger(&workflow.event_triggers[1]).is_empty());

    if let StateKind::Event(event_state) = &workflow.states[0].kind {
        let triggers = workflow.triggers_for_state(event_state);
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].name, "test-event");

        let names: Vec<_> = functions(&event_state.events[0].actions)
            .into_iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["notify"]);
    } else {
        panic!("State kind mismatch");
    }
}
