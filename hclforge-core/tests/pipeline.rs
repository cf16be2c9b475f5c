use std::collections::BTreeMap;

use hclforge_core::builder::ComposeError;
use hclforge_core::normalizer::normalize;
use hclforge_core::path::TemplatePath;
use hclforge_core::registry::RenderError;
use hclforge_core::schema::framework::{Attribute, Schema};
use hclforge_core::schema::sdk::{self, ValueType};
use hclforge_core::schema::{ResourceKind, SchemaDescriptor};
use hclforge_core::store::{SchemaSource, SharedStore, Store, StoreConfig};
use hclforge_core::synthesizer::Synthesizer;
use hclforge_core::value::{Config, Value};

struct TestProvider;

impl SchemaSource for TestProvider {
    fn resources(&self) -> BTreeMap<String, SchemaDescriptor> {
        BTreeMap::from([
            (
                "aiven_thing".to_string(),
                Schema::new()
                    .attribute("name", Attribute::string().required())
                    .attribute("tags", Attribute::map().optional())
                    .into(),
            ),
            (
                "aiven_window".to_string(),
                Schema::new()
                    .attribute("name", Attribute::string().required())
                    .attribute("end", Attribute::string().optional())
                    .attribute("in", Attribute::string().optional())
                    .into(),
            ),
            (
                "aiven_service".to_string(),
                sdk::Resource::new()
                    .attribute("project", sdk::Schema::new(ValueType::String).required())
                    .attribute("service_name", sdk::Schema::new(ValueType::String).required())
                    .attribute(
                        "termination_protection",
                        sdk::Schema::new(ValueType::Bool).optional(),
                    )
                    .attribute(
                        "user_config",
                        sdk::Schema::new(ValueType::List)
                            .optional()
                            .with_max_items(1)
                            .with_block(
                                sdk::Resource::new()
                                    .attribute(
                                        "ip_filter",
                                        sdk::Schema::new(ValueType::Set)
                                            .optional()
                                            .with_elem(sdk::Schema::new(ValueType::String)),
                                    )
                                    .attribute(
                                        "backup_hour",
                                        sdk::Schema::new(ValueType::Int).optional(),
                                    ),
                            ),
                    )
                    .attribute(
                        "depends_on",
                        sdk::Schema::new(ValueType::List)
                            .optional()
                            .with_elem(sdk::Schema::new(ValueType::String)),
                    )
                    .into(),
            ),
        ])
    }

    fn data_sources(&self) -> BTreeMap<String, SchemaDescriptor> {
        BTreeMap::from([(
            "aiven_project".to_string(),
            sdk::Resource::new()
                .attribute("project", sdk::Schema::new(ValueType::String).required())
                .attribute("ca_cert", sdk::Schema::new(ValueType::String).computed())
                .into(),
        )])
    }
}

static STORE: SharedStore = SharedStore::new();

fn store() -> &'static Store {
    STORE
        .get_or_init(
            &TestProvider,
            StoreConfig {
                beta_env_var: None,
                ..Default::default()
            },
        )
        .unwrap()
}

#[test]
fn test_end_to_end_optional_map_omitted_then_rendered() {
    let mut builder = store().builder();
    builder.add_resource(
        "aiven_thing",
        Config::new().with("resource_name", "r").with("name", "x"),
    );
    let out = builder.render().unwrap();
    assert!(out.contains("name = \"x\""));
    assert!(!out.contains("tags"));

    let tags = Value::Map(BTreeMap::from([("a".to_string(), Value::from("1"))]));
    builder.replace(
        "aiven_thing.r",
        Config::new().with("name", "x").with("tags", tags),
    );
    let out = builder.render().unwrap();
    assert!(out.contains("\"a\" = \"1\""));
    assert!(normalize(&out).contains("tags"));
}

#[test]
fn test_required_missing_fails_with_execution_error() {
    let mut builder = store().builder();
    builder.add_resource("aiven_thing", Config::new().with("resource_name", "r"));
    let err = builder.render().unwrap_err();
    let ComposeError::Render { failures, .. } = err else {
        panic!("expected render error");
    };
    assert!(matches!(
        &failures[0].error,
        RenderError::Execution { key, resource_name, .. }
            if key == "resource.aiven_thing" && resource_name == "r"
    ));
}

#[test]
fn test_optional_bool_presence_is_not_truthiness() {
    let base = Config::new()
        .with("resource_name", "svc")
        .with("project", "p")
        .with("service_name", "s");

    let mut builder = store().builder();
    builder.add_resource("aiven_service", base.clone());
    assert!(!builder.render().unwrap().contains("termination_protection"));

    builder.replace(
        "aiven_service.svc",
        base.with("termination_protection", false),
    );
    assert!(builder
        .render()
        .unwrap()
        .contains("termination_protection = false"));
}

#[test]
fn test_nested_block_and_references() {
    let user_config = Value::List(vec![Value::Map(BTreeMap::from([
        ("ip_filter".to_string(), Value::from(vec!["10.0.0.0/8"])),
        ("backup_hour".to_string(), Value::Int(0)),
    ]))]);

    let mut builder = store().builder();
    builder
        .add_data_source(
            "aiven_project",
            Config::new().with("resource_name", "pr").with("project", "p"),
        )
        .add_resource(
            "aiven_service",
            Config::new()
                .with("resource_name", "svc")
                .with("project", Value::reference("data.aiven_project.pr.project"))
                .with("service_name", Value::literal("data.aiven_project.pr.project"))
                .with("user_config", user_config)
                .with(
                    "depends_on",
                    vec![Value::reference("data.aiven_project.pr")],
                ),
        );

    let out = builder.render().unwrap();
    assert!(out.contains("project = data.aiven_project.pr.project"));
    assert!(out.contains("service_name = \"data.aiven_project.pr.project\""));
    assert!(out.contains("backup_hour = 0"));
    assert!(out.contains("\"10.0.0.0/8\","));
    assert!(out.contains("depends_on = [data.aiven_project.pr]"));
    assert!(!out.contains("ca_cert"));
}

#[test]
fn test_normalized_composition_is_order_independent() {
    let project = Config::new().with("resource_name", "pr").with("project", "p");
    let thing = Config::new().with("resource_name", "t").with("name", "x");

    let mut first = store().builder();
    first
        .add_data_source("aiven_project", project.clone())
        .add_resource("aiven_thing", thing.clone());
    let mut second = store().builder();
    second
        .add_resource("aiven_thing", thing)
        .add_data_source("aiven_project", project);

    let a = normalize(&first.render().unwrap());
    let b = normalize(&second.render().unwrap());
    assert_eq!(a, b);
    assert_eq!(normalize(&a), a);
}

#[test]
fn test_synthesis_is_deterministic() {
    let descriptors = TestProvider.resources();
    let descriptor = &descriptors["aiven_service"];
    let synthesizer = Synthesizer::default();
    let first = synthesizer
        .synthesize(descriptor.extractor(), "aiven_service", ResourceKind::Resource)
        .unwrap();
    for _ in 0..3 {
        let again = synthesizer
            .synthesize(descriptor.extractor(), "aiven_service", ResourceKind::Resource)
            .unwrap();
        assert_eq!(first, again);
    }
    assert_eq!(
        store().registry().source("resource.aiven_service"),
        Some(first.as_str())
    );
}

#[test]
fn test_path_expressions() {
    assert_eq!(
        TemplatePath::new("items", true)
            .append("name", false)
            .expression(),
        r#"index(items, 0, "name")"#
    );
    assert_eq!(
        TemplatePath::new("a", false)
            .append("b", false)
            .append("c", true)
            .expression(),
        r#"index(index(a, "b"), "c")"#
    );
}

#[test]
fn test_remove_and_replace_or_append() {
    let mut builder = store().builder();
    builder
        .add_resource(
            "aiven_thing",
            Config::new().with("resource_name", "a").with("name", "1"),
        )
        .add_resource(
            "aiven_thing",
            Config::new().with("resource_name", "b").with("name", "2"),
        );

    builder.remove("aiven_thing.a");
    assert_eq!(builder.len(), 1);
    assert_eq!(builder.entries()[0].resource_name(), Some("b"));

    builder.remove("aiven_thing.zzz").remove("not-a-path");
    assert_eq!(builder.len(), 1);

    builder.replace("aiven_thing.missing", Config::new().with("name", "3"));
    assert_eq!(builder.len(), 2);
    assert!(builder
        .render()
        .unwrap()
        .contains("resource \"aiven_thing\" \"missing\""));
}

#[test]
fn test_keyword_field_names_render() {
    let mut builder = store().builder();
    builder.add_resource(
        "aiven_window",
        Config::new()
            .with("resource_name", "w")
            .with("name", "maintenance")
            .with("end", "06:00"),
    );
    let out = normalize(&builder.render().unwrap());
    assert!(out.contains("end = \"06:00\""));
    assert!(!out.contains("in ="));
}
