use serde_json::Value;
use std::fmt;
use crate::error::{ModelError, ModelResult};

/// 标记语法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupFormat {
    Json,
    Yaml,
}

impl fmt::Display for MarkupFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkupFormat::Json => write!(f, "json"),
            MarkupFormat::Yaml => write!(f, "yaml"),
        }
    }
}

impl std::str::FromStr for MarkupFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(MarkupFormat::Json),
            "yaml" | "yml" => Ok(MarkupFormat::Yaml),
            other => Err(format!("unknown markup format '{}'", other)),
        }
    }
}

/// Reads markup into the intermediate tree: JSON first, YAML if that fails.
pub fn parse(markup: &str) -> ModelResult<(Value, MarkupFormat)> {
    let json_err = match serde_json::from_str::<Value>(markup) {
        Ok(tree) => return Ok((tree, MarkupFormat::Json)),
        Err(e) => e,
    };
    match serde_yaml::from_str::<Value>(markup) {
        Ok(tree) => Ok((tree, MarkupFormat::Yaml)),
        Err(yaml_err) => Err(ModelError::UnparseableMarkup {
            json: json_err.to_string(),
            yaml: yaml_err.to_string(),
        }),
    }
}

/// Both syntaxes are rendered from the same tree. YAML comes out without a
/// document-start marker and with serde_yaml's minimal quoting.
pub fn render(tree: &Value, format: MarkupFormat) -> ModelResult<String> {
    match format {
        MarkupFormat::Json => {
            serde_json::to_string_pretty(tree).map_err(|e| ModelError::Render(e.to_string()))
        }
        MarkupFormat::Yaml => {
            let text = serde_yaml::to_string(tree).map_err(|e| ModelError::Render(e.to_string()))?;
            if let Some(body) = text.strip_prefix("---\n") {
                return Ok(body.to_string());
            }
            Ok(text)
        }
    }
}
