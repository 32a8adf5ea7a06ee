//! Markup pipeline: placeholder resolution on raw text, JSON/YAML parsing
//! into an intermediate tree, and the typed codec on top of that tree.

pub mod codec;
pub mod format;
pub mod resolver;

pub use codec::Codec;
pub use format::MarkupFormat;
