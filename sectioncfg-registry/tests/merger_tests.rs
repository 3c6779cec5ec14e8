use pretty_assertions::assert_eq;
use sectioncfg_registry::{InitOptions, PluginDefinition, PluginRegistry, SectionConfig, TypeOption};
use sectioncfg_schema::{Branch, PropertyDescriptor, PropertyMap, PropertyShape};
use serde_json::json;
use std::sync::Arc;

fn base() -> PropertyMap {
    let mut base = PropertyMap::new();
    base.insert("common".into(), PropertyDescriptor::string());
    base.insert("comment".into(), PropertyDescriptor::string().optional());
    base
}

/// `one` requires `common`, `two` uses it optionally. Both use `comment`.
fn requiredness_fixture(options: InitOptions) -> Arc<SectionConfig> {
    let mut registry = PluginRegistry::new(base());
    registry
        .register(
            PluginDefinition::new("one")
                .with_option("common", TypeOption::required())
                .with_option("comment", TypeOption::optional()),
        )
        .unwrap();
    registry
        .register(
            PluginDefinition::new("two")
                .with_option("common", TypeOption::optional())
                .with_option("comment", TypeOption::optional()),
        )
        .unwrap();
    registry.init(options).unwrap()
}

/// Two types declaring their own property without referencing it in options.
fn own_property_fixture(options: InitOptions) -> Arc<SectionConfig> {
    let mut registry = PluginRegistry::new(PropertyMap::new());
    registry
        .register(PluginDefinition::new("one").with_property("prop-one", PropertyDescriptor::string()))
        .unwrap();
    registry
        .register(PluginDefinition::new("two").with_property("prop-two", PropertyDescriptor::integer()))
        .unwrap();
    registry.init(options).unwrap()
}

/// `path` is declared by `dir` and fixed; `nodes` is a plugin property
/// used by both types, fixed only by `nfs`.
fn fixed_fixture(options: InitOptions) -> Arc<SectionConfig> {
    let mut registry = PluginRegistry::new(base());
    registry
        .register(
            PluginDefinition::new("dir")
                .with_property("path", PropertyDescriptor::string())
                .with_property("nodes", PropertyDescriptor::string())
                .with_option("path", TypeOption::required().fixed())
                .with_option("nodes", TypeOption::optional())
                .with_option("common", TypeOption::required().fixed()),
        )
        .unwrap();
    registry
        .register(
            PluginDefinition::new("nfs")
                .with_property("nodes", PropertyDescriptor::string())
                .with_option("nodes", TypeOption::optional().fixed())
                .with_option("common", TypeOption::required().fixed()),
        )
        .unwrap();
    registry.init(options).unwrap()
}

// ── Unified mode ─────────────────────────────────────────────────

#[test]
fn unified_create_keeps_required_base_property() {
    let config = requiredness_fixture(InitOptions::default());
    let common = config.create_schema().uniform("common").unwrap();
    assert!(!common.optional);
    assert!(config.create_schema().uniform("comment").unwrap().optional);
}

#[test]
fn unified_create_upgrades_base_property_required_by_every_user() {
    let mut registry = PluginRegistry::new(base());
    registry
        .register(PluginDefinition::new("a").with_option("comment", TypeOption::required()))
        .unwrap();
    registry
        .register(PluginDefinition::new("b").with_option("comment", TypeOption::required()))
        .unwrap();
    let config = registry.init(InitOptions::default()).unwrap();

    assert!(!config.create_schema().uniform("comment").unwrap().optional);
    // never upgraded in the update schema
    assert!(config.update_schema().uniform("comment").unwrap().optional);
}

#[test]
fn unified_plugin_properties_are_optional_in_create() {
    let config = own_property_fixture(InitOptions::default());
    let schema = config.create_schema();
    assert!(schema.uniform("prop-one").unwrap().optional);
    assert!(schema.uniform("prop-two").unwrap().optional);
}

#[test]
fn unified_update_leaves_out_unused_plugin_properties() {
    let config = own_property_fixture(InitOptions::default());
    let schema = config.update_schema();
    assert!(!schema.contains("prop-one"));
    assert!(!schema.contains("prop-two"));
}

#[test]
fn unified_update_leaves_out_properties_fixed_by_every_user() {
    let config = fixed_fixture(InitOptions::default());
    let create = config.create_schema();
    let update = config.update_schema();

    assert!(create.contains("path"));
    assert!(!update.contains("path"));
    // fixed by nfs only
    assert!(update.uniform("nodes").unwrap().optional);
}

#[test]
fn unified_update_keeps_base_property_fixed_by_every_user() {
    let config = fixed_fixture(InitOptions::default());
    assert!(config.create_schema().contains("common"));

    let common = config.update_schema().uniform("common").unwrap();
    assert!(!common.optional);
    assert!(config.update_schema().uniform("comment").unwrap().optional);
}

#[test]
fn uniform_properties_carry_no_instance_types() {
    let config = requiredness_fixture(InitOptions::default());
    for schema in [config.create_schema(), config.update_schema()] {
        for shape in schema.properties.values() {
            assert_eq!(shape.instance_types(), None);
        }
    }
}

// ── Isolated mode ────────────────────────────────────────────────

#[test]
fn isolated_create_splits_requiredness_per_type() {
    let config = requiredness_fixture(InitOptions::isolated());
    let common = config.create_schema().get("common").unwrap();
    assert_eq!(
        common,
        &PropertyShape::Discriminated {
            branches: vec![
                Branch {
                    section_type: "one".into(),
                    descriptor: PropertyDescriptor::string(),
                },
                Branch {
                    section_type: "two".into(),
                    descriptor: PropertyDescriptor::string().optional(),
                },
            ],
        }
    );

    let json = config.create_schema().to_json();
    assert_eq!(json["properties"]["common"]["type-property"], "type");
    assert_eq!(json["properties"]["common"]["oneOf"][0]["instance-types"], json!(["one"]));
    assert_eq!(json["properties"]["common"]["oneOf"][0]["optional"], false);
    assert_eq!(json["properties"]["common"]["oneOf"][1]["instance-types"], json!(["two"]));
    assert_eq!(json["properties"]["common"]["oneOf"][1]["optional"], true);
}

#[test]
fn isolated_update_never_uses_one_of() {
    let config = requiredness_fixture(InitOptions::isolated());
    let common = config.update_schema().uniform("common").unwrap();
    assert!(common.optional);
    assert!(config.update_schema().to_json()["properties"]["common"].get("oneOf").is_none());
}

#[test]
fn isolated_own_properties_are_restricted_and_optional() {
    let config = own_property_fixture(InitOptions::isolated());
    for schema in [config.create_schema(), config.update_schema()] {
        assert_eq!(
            schema.get("prop-one"),
            Some(&PropertyShape::Restricted {
                types: vec!["one".into()],
                descriptor: PropertyDescriptor::string().optional(),
            })
        );
        assert_eq!(
            schema.get("prop-two"),
            Some(&PropertyShape::Restricted {
                types: vec!["two".into()],
                descriptor: PropertyDescriptor::integer().optional(),
            })
        );
    }

    let json = config.update_schema().to_json();
    assert_eq!(json["properties"]["prop-one"]["instance-types"], json!(["one"]));
    assert_eq!(json["properties"]["prop-one"]["optional"], true);
}

#[test]
fn isolated_update_leaves_out_properties_fixed_by_all_applicable_types() {
    let config = fixed_fixture(InitOptions::isolated());
    let update = config.update_schema();
    assert!(!update.contains("path"));
    assert!(!update.contains("common"));
    assert!(update.uniform("nodes").unwrap().optional);
    assert!(config.create_schema().get("path").is_some());
}

#[test]
fn isolated_restricted_property_is_optional_even_when_required() {
    let config = fixed_fixture(InitOptions::isolated());
    let path = config.create_schema().get("path").unwrap();
    assert_eq!(path.instance_types(), Some(vec!["dir"]));
    assert!(path.is_optional());
}

// ── Common to both modes ─────────────────────────────────────────

#[test]
fn type_property_lists_every_type_and_is_required() {
    for options in [InitOptions::default(), InitOptions::isolated()] {
        let config = requiredness_fixture(options);
        for schema in [config.create_schema(), config.update_schema()] {
            let type_descriptor = schema.uniform("type").unwrap();
            assert!(!type_descriptor.optional);
            assert_eq!(
                type_descriptor.enum_values,
                Some(vec!["one".to_string(), "two".to_string()])
            );
        }
    }
}

#[test]
fn update_schema_carries_digest_and_delete() {
    let config = own_property_fixture(InitOptions::default());
    let update = config.update_schema();

    let digest = update.uniform("digest").unwrap();
    assert!(digest.optional);
    assert_eq!(digest.max_length, Some(40));

    let delete = update.uniform("delete").unwrap();
    assert!(delete.optional);
    assert_eq!(delete.format_name(), Some("pve-configid-list"));
    assert_eq!(delete.max_length, Some(4096));

    assert!(!config.create_schema().contains("digest"));
    assert!(!config.create_schema().contains("delete"));
}

#[test]
fn schemas_reject_additional_properties() {
    let config = requiredness_fixture(InitOptions::default());
    let json = config.create_schema().to_json();
    assert_eq!(json["type"], "object");
    assert_eq!(json["additionalProperties"], false);
}

#[test]
fn empty_registry_still_yields_schemas() {
    let mut registry = PluginRegistry::new(PropertyMap::new());
    let config = registry.init(InitOptions::isolated()).unwrap();
    assert_eq!(config.create_schema().len(), 1);
    assert_eq!(config.update_schema().len(), 3);
}
