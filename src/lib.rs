pub mod dsl;
pub mod error;
pub mod extensions;
pub mod loader;
pub mod manager;
pub mod markup;
pub mod properties;

pub use dsl::Workflow;
pub use error::{ModelError, ModelResult};
pub use extensions::{ExtensionKind, ExtensionRegistry, TypedExtension};
pub use manager::{Providers, ValidationReport, WorkflowManager};
pub use markup::MarkupFormat;
pub use properties::{PropertyLoader, PropertySource};
