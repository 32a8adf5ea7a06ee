/// 文档模型与标记引擎的错误
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Markup is neither valid JSON ({json}) nor valid YAML ({yaml})")]
    UnparseableMarkup { json: String, yaml: String },

    #[error("Unknown {slot} variant '{discriminator}' at {path}")]
    UnknownVariant {
        slot: &'static str,
        path: String,
        discriminator: String,
    },

    #[error("Extension '{id}' is not registered on this manager")]
    UnresolvedExtension { id: String },

    #[error("No workflow validator available")]
    ValidatorUnavailable,

    #[error("Invalid node at {path}: {message}")]
    InvalidNode { path: String, message: String },

    #[error("No workflow has been set")]
    MissingWorkflow,

    #[error("Failed to evaluate expression '{expression}': {message}")]
    Evaluation { expression: String, message: String },

    #[error("Failed to render markup: {0}")]
    Render(String),
}

impl ModelError {
    pub(crate) fn invalid(path: &str, message: impl Into<String>) -> Self {
        ModelError::InvalidNode {
            path: display_path(path),
            message: message.into(),
        }
    }

    pub(crate) fn unknown(slot: &'static str, path: &str, discriminator: impl Into<String>) -> Self {
        ModelError::UnknownVariant {
            slot,
            path: display_path(path),
            discriminator: discriminator.into(),
        }
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
