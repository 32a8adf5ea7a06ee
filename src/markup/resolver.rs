use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;
use crate::properties::PropertySource;

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_.-]*)\}").expect("placeholder pattern is valid")
    })
}

/// 替换原始标记文本中的 `${name}` 占位符
///
/// Names missing from `properties` stay verbatim. Runs on raw text, so it
/// does not care which markup syntax follows.
pub fn resolve<'a>(markup: &'a str, properties: &PropertySource) -> Cow<'a, str> {
    if properties.is_empty() {
        return Cow::Borrowed(markup);
    }
    placeholder().replace_all(markup, |caps: &Captures| {
        properties
            .get(&caps[1])
            .map(str::to_string)
            .unwrap_or_else(|| caps[0].to_string())
    })
}

/// Placeholder names in `markup` that `properties` cannot resolve, in order of appearance.
pub fn unresolved(markup: &str, properties: &PropertySource) -> Vec<String> {
    placeholder()
        .captures_iter(markup)
        .map(|caps| caps[1].to_string())
        .filter(|name| properties.get(name).is_none())
        .collect()
}
