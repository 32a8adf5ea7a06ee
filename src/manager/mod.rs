pub mod evaluator;
pub mod provider;
pub mod validator;

use std::collections::BTreeMap;
use std::sync::Arc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use crate::dsl::{Choice, Workflow};
use crate::error::{ModelError, ModelResult};
use crate::extensions::{ExtensionKind, ExtensionRegistry};
use crate::markup::{format, resolver, Codec, MarkupFormat};
use crate::properties::PropertySource;

pub use evaluator::{choice_expression, EvalexprEvaluator, ExpressionEvaluator};
pub use provider::Providers;
pub use validator::{DefaultValidator, ValidationIssue, ValidationReport, WorkflowValidator};

/// 工作流文档管理器
///
/// Owns one document together with everything needed to read, write and
/// check it: the bound validator, the expression evaluators, the property
/// source for `${name}` placeholders and the extension registry. Each
/// manager has its own registry.
pub struct WorkflowManager {
    workflow: Option<Workflow>,
    source_format: Option<MarkupFormat>,
    validator: Arc<dyn WorkflowValidator>,
    evaluators: BTreeMap<String, Arc<dyn ExpressionEvaluator>>,
    default_evaluator: Option<String>,
    properties: PropertySource,
    extensions: ExtensionRegistry,
    last_report: Option<ValidationReport>,
}

impl WorkflowManager {
    pub fn new() -> Self {
        let defaults = Providers::with_defaults();
        Self::from_parts(Arc::new(DefaultValidator), defaults)
    }

    /// Fails with [`ModelError::ValidatorUnavailable`] when `providers`
    /// carries no validator.
    pub fn with_providers(providers: Providers) -> ModelResult<Self> {
        let Some(validator) = providers.validators.first().cloned() else {
            return Err(ModelError::ValidatorUnavailable);
        };
        if providers.validators.len() > 1 {
            debug!(
                bound = validator.name(),
                ignored = providers.validators.len() - 1,
                "Several validators provided, binding the first"
            );
        }
        Ok(Self::from_parts(validator, providers))
    }

    fn from_parts(validator: Arc<dyn WorkflowValidator>, providers: Providers) -> Self {
        let mut evaluators = BTreeMap::new();
        let mut first = None;
        for evaluator in providers.evaluators {
            let name = evaluator.name().to_string();
            first.get_or_insert_with(|| name.clone());
            evaluators.insert(name, evaluator);
        }
        let default_evaluator = providers
            .default_evaluator
            .filter(|name| evaluators.contains_key(name))
            .or(first);

        Self {
            workflow: None,
            source_format: None,
            validator,
            evaluators,
            default_evaluator,
            properties: PropertySource::new(),
            extensions: ExtensionRegistry::new(),
            last_report: None,
        }
    }

    pub fn with_property_source(mut self, properties: PropertySource) -> Self {
        self.properties = properties;
        self
    }

    pub fn set_property_source(&mut self, properties: PropertySource) {
        self.properties = properties;
    }

    pub fn properties(&self) -> &PropertySource {
        &self.properties
    }

    // --- Document ---

    pub fn set_workflow(&mut self, workflow: Workflow) {
        self.workflow = Some(workflow);
        self.source_format = None;
        self.last_report = None;
    }

    pub fn workflow(&self) -> Option<&Workflow> {
        self.workflow.as_ref()
    }

    /// Any stored validation report is dropped since the document may change.
    pub fn workflow_mut(&mut self) -> Option<&mut Workflow> {
        self.last_report = None;
        self.workflow.as_mut()
    }

    /// Syntax the current document was parsed from, if it came from markup.
    pub fn source_format(&self) -> Option<MarkupFormat> {
        self.source_format
    }

    /// Resolves placeholders, parses, decodes and validates `markup`, then
    /// keeps the result as the current document.
    ///
    /// Reference problems do not fail the call; they land in
    /// [`last_validation`](Self::last_validation).
    pub fn set_markup(&mut self, markup: &str) -> ModelResult<&ValidationReport> {
        let (workflow, format) = self.decode(markup)?;
        info!(workflow = %workflow.name, %format, states = workflow.states.len(), "Loaded workflow markup");

        self.workflow = Some(workflow);
        self.source_format = Some(format);
        Ok(self.validate())
    }

    /// Decodes `markup` without touching the current document.
    pub fn to_workflow(&self, markup: &str) -> ModelResult<Workflow> {
        self.decode(markup).map(|(workflow, _)| workflow)
    }

    fn decode(&self, markup: &str) -> ModelResult<(Workflow, MarkupFormat)> {
        let resolved = resolver::resolve(markup, &self.properties);
        let (tree, format) = format::parse(&resolved)?;
        debug!(%format, "Parsed markup into intermediate tree");
        let workflow = Codec::new(&self.extensions).decode_workflow(&tree)?;
        Ok((workflow, format))
    }

    pub fn to_json(&self) -> ModelResult<String> {
        self.to_markup(MarkupFormat::Json)
    }

    pub fn to_yaml(&self) -> ModelResult<String> {
        self.to_markup(MarkupFormat::Yaml)
    }

    pub fn to_markup(&self, format: MarkupFormat) -> ModelResult<String> {
        let workflow = self.workflow.as_ref().ok_or(ModelError::MissingWorkflow)?;
        let tree: Value = Codec::new(&self.extensions).encode_workflow(workflow)?;
        format::render(&tree, format)
    }

    // --- Extensions ---

    pub fn register_extension(
        &self,
        id: &str,
        kind: Arc<dyn ExtensionKind>,
    ) -> Option<Arc<dyn ExtensionKind>> {
        let previous = self.extensions.register(id, kind);
        if previous.is_some() {
            debug!(extension_id = id, "Replaced extension registration");
        }
        previous
    }

    pub fn register_extension_type<T>(&self, id: &str) -> Option<Arc<dyn ExtensionKind>>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.extensions.register_type::<T>(id)
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    // --- Validation ---

    pub fn validator(&self) -> &dyn WorkflowValidator {
        self.validator.as_ref()
    }

    /// Runs the bound validator and keeps its report.
    pub fn validate(&mut self) -> &ValidationReport {
        let report = self.validator.validate(self);
        if !report.is_valid() {
            warn!(
                validator = self.validator.name(),
                issues = report.issues.len(),
                "Workflow failed validation"
            );
            for issue in &report.issues {
                debug!(path = %issue.path, "{}", issue.message);
            }
        }
        self.last_report.insert(report)
    }

    /// Runs the bound validator against the current document.
    pub fn is_valid(&self) -> bool {
        self.validator.validate(self).is_valid()
    }

    pub fn last_validation(&self) -> Option<&ValidationReport> {
        self.last_report.as_ref()
    }

    // --- Expressions ---

    /// The evaluator registered as `name`, falling back to the default.
    pub fn expression_evaluator(&self, name: &str) -> Option<Arc<dyn ExpressionEvaluator>> {
        self.evaluators
            .get(name)
            .cloned()
            .or_else(|| self.default_evaluator())
    }

    pub fn default_evaluator(&self) -> Option<Arc<dyn ExpressionEvaluator>> {
        self.default_evaluator
            .as_ref()
            .and_then(|name| self.evaluators.get(name))
            .cloned()
    }

    /// Registers `evaluator` under its own name and makes it the default.
    pub fn set_default_evaluator(&mut self, evaluator: Arc<dyn ExpressionEvaluator>) {
        let name = evaluator.name().to_string();
        self.evaluators.insert(name.clone(), evaluator);
        self.default_evaluator = Some(name);
    }

    pub fn evaluator_names(&self) -> Vec<&str> {
        self.evaluators.keys().map(String::as_str).collect()
    }

    /// Evaluates `choice` against `data`. `and` needs every nested choice to
    /// hold, `or` at least one, `not` none.
    pub fn evaluate_choice(&self, choice: &Choice, data: &Value, evaluator: Option<&str>) -> ModelResult<bool> {
        let evaluator = match evaluator {
            Some(name) => self.expression_evaluator(name),
            None => self.default_evaluator(),
        }
        .ok_or_else(|| ModelError::Evaluation {
            expression: choice_label(choice),
            message: "no expression evaluator available".to_string(),
        })?;

        evaluate(evaluator.as_ref(), choice, data)
    }
}

impl Default for WorkflowManager {
    fn default() -> Self {
        Self::new()
    }
}

fn evaluate(evaluator: &dyn ExpressionEvaluator, choice: &Choice, data: &Value) -> ModelResult<bool> {
    match choice {
        Choice::Single(single) => evaluator.evaluate(&choice_expression(single), data),
        Choice::And(c) => {
            for nested in &c.choices {
                if !evaluate(evaluator, nested, data)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Choice::Or(c) => {
            for nested in &c.choices {
                if evaluate(evaluator, nested, data)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Choice::Not(c) => {
            for nested in &c.choices {
                if evaluate(evaluator, nested, data)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}

fn choice_label(choice: &Choice) -> String {
    match choice {
        Choice::Single(single) => choice_expression(single),
        Choice::And(_) => Choice::AND.to_string(),
        Choice::Or(_) => Choice::OR.to_string(),
        Choice::Not(_) => Choice::NOT.to_string(),
    }
}
