use evalexpr::{eval_with_context, ContextWithMutableVariables, DefaultNumericTypes, HashMapContext};
use serde_json::Value;
use crate::dsl::{Operator, SingleChoice};
use crate::error::{ModelError, ModelResult};

/// 表达式求值器接口
pub trait ExpressionEvaluator: Send + Sync {
    fn name(&self) -> &str;

    /// Evaluates `expression` against `data` and requires a boolean result.
    fn evaluate(&self, expression: &str, data: &Value) -> ModelResult<bool>;
}

/// Evaluator backed by `evalexpr`.
///
/// Object keys of `data` become variables; nested objects are reachable with
/// dotted names (`order.total`). Numbers bind as floats. Arrays and nulls are
/// not bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalexprEvaluator;

impl EvalexprEvaluator {
    pub const NAME: &'static str = "evalexpr";
}

impl ExpressionEvaluator for EvalexprEvaluator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, expression: &str, data: &Value) -> ModelResult<bool> {
        let mut context = HashMapContext::<DefaultNumericTypes>::new();
        if let Value::Object(fields) = data {
            for (key, value) in fields {
                bind(&mut context, key, value).map_err(|e| evaluation(expression, e))?;
            }
        }

        match eval_with_context(expression, &context) {
            Ok(evalexpr::Value::Boolean(result)) => Ok(result),
            Ok(other) => Err(evaluation(
                expression,
                format!("expected a boolean result, got {:?}", other),
            )),
            Err(e) => Err(evaluation(expression, e)),
        }
    }
}

fn bind(
    context: &mut HashMapContext<DefaultNumericTypes>,
    name: &str,
    value: &Value,
) -> Result<(), String> {
    let bound = match value {
        Value::String(s) => evalexpr::Value::String(s.clone()),
        // Ints bind as floats so `5` and `5.0` compare equal.
        Value::Number(n) => match n.as_f64() {
            Some(f) => evalexpr::Value::Float(f),
            None => return Ok(()),
        },
        Value::Bool(b) => evalexpr::Value::Boolean(*b),
        Value::Object(fields) => {
            for (key, nested) in fields {
                bind(context, &format!("{}.{}", name, key), nested)?;
            }
            return Ok(());
        }
        Value::Array(_) | Value::Null => return Ok(()),
    };
    context
        .set_value(name.to_string(), bound)
        .map_err(|e| e.to_string())
}

fn evaluation(expression: &str, message: impl ToString) -> ModelError {
    ModelError::Evaluation {
        expression: expression.to_string(),
        message: message.to_string(),
    }
}

/// Renders a single predicate as an `evalexpr` expression.
///
/// `$.order.total` becomes the variable `order.total`. `STR_*` operators
/// always compare against a string literal. Other comparisons write numbers
/// as float literals and keep booleans unquoted.
pub fn choice_expression(choice: &SingleChoice) -> String {
    let variable = variable_name(&choice.path);
    let value = choice.value.trim();

    match choice.operator {
        Operator::Eq => format!("{} == {}", variable, literal(value)),
        Operator::Lt => format!("{} < {}", variable, literal(value)),
        Operator::Lteq => format!("{} <= {}", variable, literal(value)),
        Operator::Gt => format!("{} > {}", variable, literal(value)),
        Operator::Gteq => format!("{} >= {}", variable, literal(value)),
        Operator::StrEq => format!("{} == {}", variable, quoted(&choice.value)),
        Operator::StrLt => format!("{} < {}", variable, quoted(&choice.value)),
        Operator::StrLteq => format!("{} <= {}", variable, quoted(&choice.value)),
        Operator::StrGt => format!("{} > {}", variable, quoted(&choice.value)),
        Operator::StrGteq => format!("{} >= {}", variable, quoted(&choice.value)),
        Operator::True => format!("{} == true", variable),
        Operator::False => format!("{} == false", variable),
    }
}

fn variable_name(path: &str) -> &str {
    let path = path.trim();
    path.strip_prefix("$.")
        .or_else(|| path.strip_prefix('$'))
        .unwrap_or(path)
}

fn literal(value: &str) -> String {
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => format!("{:?}", number),
        _ if value == "true" || value == "false" => value.to_string(),
        _ => quoted(value),
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
