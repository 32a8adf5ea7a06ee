use flowmark::markup::resolver;
use flowmark::{PropertyLoader, PropertySource, WorkflowManager};
use std::borrow::Cow;
use std::fs;

fn properties() -> PropertySource {
    [("wf.name", "resolved-wf"), ("state.first", "begin"), ("retry_count", "4")]
        .into_iter()
        .collect()
}

#[test]
fn test_placeholders_resolve_in_json() {
    let markup = r#"
{
  "name": "${wf.name}",
  "startAt": "${state.first}",
  "metadata": { "owner": "${missing.key}" },
  "states": [{ "name": "begin", "type": "END", "end": true }]
}
"#;

    let manager = WorkflowManager::new().with_property_source(properties());
    let workflow = manager.to_workflow(markup).expect("Failed to decode markup");

    assert_eq!(workflow.name, "resolved-wf");
    assert_eq!(workflow.start_at, "begin");
    assert_eq!(workflow.metadata.get("owner").map(String::as_str), Some("${missing.key}"));
}

#[test]
fn test_placeholders_resolve_in_yaml() {
    let markup = r#"
name: ${wf.name}
startAt: ${state.first}
states:
  - name: begin
    type: OPERATION
    nextState: begin
    actions:
      - function:
          name: call
        retry:
          maxRetries: ${retry_count}
"#;

    let manager = WorkflowManager::new().with_property_source(properties());
    let workflow = manager.to_workflow(markup).expect("Failed to decode markup");

    assert_eq!(workflow.name, "resolved-wf");
    assert_eq!(workflow.start_at, "begin");
    let flowmark::dsl::StateKind::Operation(op) = &workflow.states[0].kind else {
        panic!("Expected an operation state");
    };
    // 占位符在解析前替换, 因此数值字段也能使用
    assert_eq!(op.actions[0].retry.as_ref().and_then(|r| r.max_retries), Some(4));
}

#[test]
fn test_numeric_placeholders_fill_text_fields() {
    let markup = r#"
name: ${wf.version}
startAt: ${wf.version}
metadata:
  version: ${wf.version}
  draft: false
states:
  - name: ${wf.version}
    type: OPERATION
    end: true
    actions:
      - function:
          name: connect
          parameters:
            port: ${port}
            secure: true
"#;

    let source: PropertySource = [("wf.version", "2"), ("port", "8080")].into_iter().collect();
    let manager = WorkflowManager::new().with_property_source(source);
    let workflow = manager.to_workflow(markup).expect("Numeric scalars must decode into text fields");

    assert_eq!(workflow.name, "2");
    assert_eq!(workflow.start_at, "2");
    assert_eq!(workflow.states[0].name, "2");
    assert_eq!(workflow.metadata.get("version").map(String::as_str), Some("2"));
    assert_eq!(workflow.metadata.get("draft").map(String::as_str), Some("false"));

    let flowmark::dsl::StateKind::Operation(op) = &workflow.states[0].kind else {
        panic!("Expected an operation state");
    };
    let parameters = &op.actions[0].function.parameters;
    assert_eq!(parameters.get("port").map(String::as_str), Some("8080"));
    assert_eq!(parameters.get("secure").map(String::as_str), Some("true"));
}

#[test]
fn test_missing_placeholder_stays_verbatim() {
    let empty = PropertySource::new();
    let text = "name: ${missing.key}";

    let resolved = resolver::resolve(text, &empty);
    assert!(matches!(resolved, Cow::Borrowed(_)));
    assert_eq!(resolved, "name: ${missing.key}");

    let partial: PropertySource = [("known", "yes")].into_iter().collect();
    assert_eq!(
        resolver::resolve("${known}/${unknown}/$notaplaceholder", &partial),
        "yes/${unknown}/$notaplaceholder"
    );
    assert_eq!(resolver::unresolved("${known} ${a.b} ${c}", &partial), vec!["a.b", "c"]);

    let manager = WorkflowManager::new();
    let workflow = manager.to_workflow(text).expect("Failed to decode markup");
    assert_eq!(workflow.name, "${missing.key}");
}

#[test]
fn test_loader_reads_properties_file() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("flow.properties");
    fs::write(&file_path, "owner = ops\n\n[db]\nhost = localhost\nport = 5432\n")
        .expect("Failed to write temp file");

    let source = PropertyLoader::new()
        .with_file(&file_path)
        .build()
        .expect("Failed to load properties");

    assert_eq!(source.get("owner"), Some("ops"));
    assert_eq!(source.get("db.host"), Some("localhost"));
    assert_eq!(source.get("db.port"), Some("5432"));

    temp_dir.close().expect("Failed to close temp dir");
}

#[test]
fn test_loader_layers_overrides_last() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("flow.toml");
    fs::write(&file_path, "[app]\nmode = \"dev\"\nworkers = 4\n").expect("Failed to write temp file");

    let source = PropertyLoader::new()
        .with_file(&file_path)
        .with_optional_file(temp_dir.path().join("absent.toml"))
        .with_override("app.mode", "test")
        .unwrap()
        .build()
        .expect("Failed to load properties");

    assert_eq!(source.get("app.mode"), Some("test"));
    assert_eq!(source.get("app.workers"), Some("4"));
}

#[test]
fn test_loader_requires_named_file() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let result = PropertyLoader::new()
        .with_file(temp_dir.path().join("missing.properties"))
        .build();
    assert!(result.is_err());
}
