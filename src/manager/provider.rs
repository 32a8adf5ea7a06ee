use std::sync::Arc;
use super::evaluator::{EvalexprEvaluator, ExpressionEvaluator};
use super::validator::{DefaultValidator, WorkflowValidator};

/// 显式注入的服务集合
///
/// The first validator becomes the manager's bound validator. Evaluators are
/// keyed by [`ExpressionEvaluator::name`]; a later one with the same name
/// replaces an earlier one.
#[derive(Clone, Default)]
pub struct Providers {
    pub validators: Vec<Arc<dyn WorkflowValidator>>,
    pub evaluators: Vec<Arc<dyn ExpressionEvaluator>>,
    pub default_evaluator: Option<String>,
}

impl Providers {
    /// No validator and no evaluator.
    pub fn new() -> Self {
        Self::default()
    }

    /// [`DefaultValidator`] and [`EvalexprEvaluator`], the latter as default.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_validator(Arc::new(DefaultValidator))
            .with_evaluator(Arc::new(EvalexprEvaluator))
    }

    pub fn with_validator(mut self, validator: Arc<dyn WorkflowValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluators.push(evaluator);
        self
    }

    pub fn with_default_evaluator(mut self, name: &str) -> Self {
        self.default_evaluator = Some(name.to_string());
        self
    }
}
