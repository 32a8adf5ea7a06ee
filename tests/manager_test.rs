use flowmark::dsl::builder::WorkflowBuilder;
use flowmark::dsl::*;
use flowmark::manager::{
    choice_expression, DefaultValidator, EvalexprEvaluator, ExpressionEvaluator, ValidationReport,
    WorkflowValidator,
};
use flowmark::{ModelError, ModelResult, Providers, WorkflowManager};
use serde_json::{json, Value};
use std::sync::Arc;

const ORDER_FLOW: &str = r#"
{
  "name": "order-flow",
  "startAt": "wait-order",
  "eventTriggers": [{ "name": "order-created", "source": "shop" }],
  "states": [
    { "name": "wait-order", "type": "EVENT", "start": true,
      "events": [{ "event": "order-created", "nextState": "check" }] },
    { "name": "check", "type": "SWITCH", "default": "done",
      "choices": [{ "path": "$.total", "operator": "GT", "value": "100", "nextState": "review" }] },
    { "name": "review", "type": "OPERATION", "nextState": "done",
      "actions": [{ "function": { "name": "notify" }, "timeout": 5 }] },
    { "name": "done", "type": "END", "status": "SUCCESS" }
  ]
}
"#;

struct RejectAll;

impl WorkflowValidator for RejectAll {
    fn name(&self) -> &str {
        "reject-all"
    }

    fn validate(&self, _manager: &WorkflowManager) -> ValidationReport {
        let mut report = ValidationReport::default();
        report.push("<root>", "rejected");
        report
    }
}

struct Fixed(bool);

impl ExpressionEvaluator for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn evaluate(&self, _expression: &str, _data: &Value) -> ModelResult<bool> {
        Ok(self.0)
    }
}

#[test]
fn test_default_providers() {
    let manager = WorkflowManager::new();
    assert_eq!(manager.validator().name(), DefaultValidator::NAME);
    assert_eq!(
        manager.default_evaluator().map(|e| e.name().to_string()),
        Some(EvalexprEvaluator::NAME.to_string())
    );
    assert!(manager.workflow().is_none());
    assert!(manager.last_validation().is_none());
}

#[test]
fn test_providers_without_validator_fail() {
    let result = WorkflowManager::with_providers(Providers::new().with_evaluator(Arc::new(EvalexprEvaluator)));
    assert!(matches!(result, Err(ModelError::ValidatorUnavailable)));
}

#[test]
fn test_injected_validator_is_bound() {
    let providers = Providers::new().with_validator(Arc::new(RejectAll));
    let mut manager = WorkflowManager::with_providers(providers).expect("validator was provided");
    assert_eq!(manager.validator().name(), "reject-all");

    let report = manager.set_markup(ORDER_FLOW).expect("Failed to load markup");
    assert_eq!(report.issues.len(), 1);
    assert!(!manager.is_valid());
    assert!(manager.default_evaluator().is_none());
}

#[test]
fn test_valid_markup_passes_default_validator() {
    let mut manager = WorkflowManager::new();
    let report = manager.set_markup(ORDER_FLOW).expect("Failed to load markup");
    assert!(report.is_valid(), "unexpected issues: {:?}", report.issues);
    assert!(manager.is_valid());
    assert_eq!(manager.last_validation().map(|r| r.is_valid()), Some(true));
}

#[test]
fn test_dangling_reference_is_reported_not_raised() {
    let markup = ORDER_FLOW.replace(r#""nextState": "review""#, r#""nextState": "nowhere""#);
    let mut manager = WorkflowManager::new();

    let report = manager.set_markup(&markup).expect("Reference problems must not fail parsing").clone();
    assert!(!report.is_valid());
    assert!(report.has_issue_at("states[1].choices[0].nextState"));
    assert!(!manager.is_valid());
    assert!(manager.workflow().is_some());
}

#[test]
fn test_default_validator_checks() {
    let workflow = WorkflowBuilder::new("")
        .start_at("ghost")
        .trigger(EventTrigger::new("dup"))
        .trigger(EventTrigger::new("dup"))
        .state("a", EventState::new().with_event(Event::new("unknown-trigger").with_next_state("b")))
            .start(true)
            .build()
        .state("a", DelayState::seconds(1)).start(true).build()
        .state("b", EventState::new().with_event(Event::default()))
            .next_state("a")
            .build()
        .build();

    let mut manager = WorkflowManager::new();
    manager.set_workflow(workflow);
    let report = manager.validate().clone();

    assert!(report.has_issue_at("name"));
    assert!(report.has_issue_at("startAt"));
    assert!(report.has_issue_at("eventTriggers[1].name"));
    assert!(report.has_issue_at("states[1].name"));
    assert!(report.has_issue_at("states[0].events[0].event"));
    assert!(report.has_issue_at("states[2].events[0]"));
    // 第二个 "a" 既不是终止状态也没有 nextState
    assert!(report.issues.iter().any(|i| i.path == "states[1]"));
    assert!(report.issues.iter().any(|i| i.path == "states" && i.message.contains("start")));
}

#[test]
fn test_branch_scope_is_separate() {
    let branch = flowmark::dsl::builder::BranchBuilder::new("inner")
        .start_at("outer")
        .state("step", DelayState::seconds(1)).next_state("outer").build()
        .build();
    let workflow = WorkflowBuilder::new("scoped")
        .state("outer", ParallelState::new().with_branch(branch)).end(true).build()
        .build();

    let mut manager = WorkflowManager::new();
    manager.set_workflow(workflow);
    let report = manager.validate().clone();

    assert!(report.has_issue_at("states[0].branches[0].startAt"));
    assert!(report.has_issue_at("states[0].branches[0].states[0].nextState"));
}

#[test]
fn test_workflow_mut_clears_last_validation() {
    let mut manager = WorkflowManager::new();
    manager.set_markup(ORDER_FLOW).unwrap();
    assert!(manager.last_validation().is_some());

    if let Some(workflow) = manager.workflow_mut() {
        workflow.start_at = "missing".to_string();
    }
    assert!(manager.last_validation().is_none());
    assert!(!manager.is_valid());
}

#[test]
fn test_render_without_workflow_fails() {
    let manager = WorkflowManager::new();
    assert!(matches!(manager.to_json(), Err(ModelError::MissingWorkflow)));
    assert!(matches!(manager.to_yaml(), Err(ModelError::MissingWorkflow)));
}

#[test]
fn test_evaluator_lookup_falls_back_to_default() {
    let mut manager = WorkflowManager::new();
    let fallback = manager.expression_evaluator("no-such-evaluator").unwrap();
    assert_eq!(fallback.name(), EvalexprEvaluator::NAME);

    manager.set_default_evaluator(Arc::new(Fixed(true)));
    assert_eq!(manager.default_evaluator().unwrap().name(), "fixed");
    assert_eq!(manager.expression_evaluator("no-such-evaluator").unwrap().name(), "fixed");
    assert_eq!(
        manager.expression_evaluator(EvalexprEvaluator::NAME).unwrap().name(),
        EvalexprEvaluator::NAME
    );
    assert_eq!(manager.evaluator_names(), vec!["evalexpr", "fixed"]);
}

#[test]
fn test_providers_pick_named_default() {
    let providers = Providers::with_defaults()
        .with_evaluator(Arc::new(Fixed(false)))
        .with_default_evaluator("fixed");
    let manager = WorkflowManager::with_providers(providers).unwrap();
    assert_eq!(manager.default_evaluator().unwrap().name(), "fixed");
}

#[test]
fn test_choice_expressions() {
    let eq = Choice::single("$.total", Operator::Eq, "5");
    let str_eq = Choice::single("$.customer.tier", Operator::StrEq, "gold");
    let loose = Choice::single("$.region", Operator::Eq, "eu");
    let flag = Choice::single("$.express", Operator::True, "");

    let render = |choice: &Choice| match choice {
        Choice::Single(single) => choice_expression(single),
        _ => unreachable!(),
    };
    assert_eq!(render(&eq), "total == 5.0");
    assert_eq!(render(&str_eq), r#"customer.tier == "gold""#);
    assert_eq!(render(&loose), r#"region == "eu""#);
    assert_eq!(render(&flag), "express == true");
}

#[test]
fn test_evaluate_choice() {
    let manager = WorkflowManager::new();
    let data = json!({
        "total": 150,
        "express": true,
        "customer": { "tier": "gold", "age": 31.5 }
    });

    let big = Choice::single("$.total", Operator::Gt, "100");
    let small = Choice::single("$.total", Operator::Lt, "10");
    let gold = Choice::single("$.customer.tier", Operator::StrEq, "gold");
    let silver = Choice::single("$.customer.tier", Operator::StrEq, "silver");
    let express = Choice::single("$.express", Operator::True, "");
    let adult = Choice::single("$.customer.age", Operator::Gteq, "18");

    let check = |choice: &Choice| manager.evaluate_choice(choice, &data, None).unwrap();
    assert!(check(&big));
    assert!(!check(&small));
    assert!(check(&gold));
    assert!(check(&express));
    assert!(check(&adult));
    assert!(check(&Choice::and(vec![big.clone(), gold.clone(), express.clone()])));
    assert!(!check(&Choice::and(vec![big.clone(), silver.clone()])));
    assert!(check(&Choice::or(vec![small.clone(), gold.clone()])));
    assert!(!check(&Choice::or(vec![small.clone(), silver.clone()])));
    assert!(check(&Choice::not_any(vec![small.clone(), silver.clone()])));
    assert!(!check(&Choice::not_any(vec![small, gold])));
}

#[test]
fn test_numeric_equality_ignores_representation() {
    let manager = WorkflowManager::new();
    let five = Choice::single("$.x", Operator::Eq, "5");
    let five_float = Choice::single("$.x", Operator::Eq, "5.0");

    for data in [json!({ "x": 5 }), json!({ "x": 5.0 })] {
        assert!(manager.evaluate_choice(&five, &data, None).unwrap(), "5 == {}", data);
        assert!(manager.evaluate_choice(&five_float, &data, None).unwrap(), "5.0 == {}", data);
    }
    assert!(!manager.evaluate_choice(&five, &json!({ "x": 5.5 }), None).unwrap());
}

#[test]
fn test_issue_lookup_respects_path_segments() {
    let mut report = ValidationReport::default();
    report.push("states[10].name", "duplicate state name");

    assert!(!report.has_issue_at("states[1]"));
    assert!(!report.has_issue_at("states[1].name"));
    assert!(!report.has_issue_at("states[10].nam"));
    assert!(report.has_issue_at("states[10]"));
    assert!(report.has_issue_at("states[10].name"));
    assert!(report.has_issue_at("states"));
}

#[test]
fn test_evaluation_errors() {
    let manager = WorkflowManager::new();
    let data = json!({ "total": 1 });

    let unknown = Choice::single("$.nope", Operator::Eq, "1");
    assert!(matches!(
        manager.evaluate_choice(&unknown, &data, None),
        Err(ModelError::Evaluation { .. })
    ));

    assert!(matches!(
        EvalexprEvaluator.evaluate("total + 1", &data),
        Err(ModelError::Evaluation { .. })
    ));

    let fixed = WorkflowManager::with_providers(
        Providers::new().with_validator(Arc::new(DefaultValidator)),
    )
    .unwrap();
    assert!(matches!(
        fixed.evaluate_choice(&unknown, &data, Some("evalexpr")),
        Err(ModelError::Evaluation { .. })
    ));
}
