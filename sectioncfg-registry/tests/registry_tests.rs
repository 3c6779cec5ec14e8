use pretty_assertions::assert_eq;
use sectioncfg_registry::{
    DefinitionFile, Fields, InitOptions, PluginDefinition, PluginRegistry, RegistryError,
    SectionConfig, SectionPlugin, TypeOption,
};
use sectioncfg_schema::{PropertyDescriptor, PropertyMap};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

/// A storage-like type with a cross-field check and a decode hook.
struct Lvm;

impl SectionPlugin for Lvm {
    fn type_name(&self) -> &str {
        "lvm"
    }

    fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert("vgname".into(), PropertyDescriptor::string().with_pattern("[a-z0-9-]+"));
        props.insert("size".into(), PropertyDescriptor::integer().with_minimum(1.0));
        props.insert("shared".into(), PropertyDescriptor::boolean());
        props.insert(
            "tags".into(),
            PropertyDescriptor::array(PropertyDescriptor::string().with_max_length(8)),
        );
        props
    }

    fn options(&self) -> BTreeMap<String, TypeOption> {
        BTreeMap::from([
            ("vgname".to_string(), TypeOption::required().fixed()),
            ("size".to_string(), TypeOption::optional()),
            ("shared".to_string(), TypeOption::optional()),
            ("tags".to_string(), TypeOption::optional()),
            ("comment".to_string(), TypeOption::optional()),
        ])
    }

    fn decode_value(&self, key: &str, value: Value) -> Result<Value, String> {
        match (key, value) {
            ("vgname", Value::String(name)) => Ok(Value::String(name.to_uppercase())),
            (_, value) => Ok(value),
        }
    }

    fn check_config(&self, id: &str, fields: &Fields, _create: bool) -> Result<(), String> {
        if id == "shared-only" && fields.get("shared") != Some(&Value::Bool(true)) {
            return Err("storage 'shared-only' must be shared".into());
        }
        Ok(())
    }
}

fn base() -> PropertyMap {
    let mut base = PropertyMap::new();
    base.insert("comment".into(), PropertyDescriptor::string().optional());
    base
}

fn config() -> Arc<SectionConfig> {
    let mut registry = PluginRegistry::new(base());
    registry.register(Lvm).unwrap();
    registry
        .register(PluginDefinition::new("dir").with_option("comment", TypeOption::optional()))
        .unwrap();
    registry.init(InitOptions::default()).unwrap()
}

fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

// ── Registration ─────────────────────────────────────────────────

#[test]
fn duplicate_type_is_rejected() {
    let mut registry = PluginRegistry::new(PropertyMap::new());
    registry.register(PluginDefinition::new("dir")).unwrap();
    let err = registry.register(PluginDefinition::new("dir")).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateType(name) if name == "dir"));
}

#[test]
fn type_names_must_fit_in_a_header() {
    let mut registry = PluginRegistry::new(PropertyMap::new());
    for name in ["", "a b", "a:b"] {
        let err = registry.register(PluginDefinition::new(name)).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTypeName(_)));
    }
}

#[test]
fn registration_after_init_is_rejected() {
    let mut registry = PluginRegistry::new(PropertyMap::new());
    registry.register(PluginDefinition::new("dir")).unwrap();
    registry.init(InitOptions::default()).unwrap();

    assert!(matches!(
        registry.register(PluginDefinition::new("nfs")),
        Err(RegistryError::AlreadyInitialized)
    ));
    assert!(matches!(
        registry.init(InitOptions::default()),
        Err(RegistryError::AlreadyInitialized)
    ));
}

#[test]
fn config_requires_init() {
    let mut registry = PluginRegistry::new(PropertyMap::new());
    assert!(matches!(registry.config(), Err(RegistryError::NotInitialized)));
    assert!(!registry.is_initialized());
    registry.init(InitOptions::default()).unwrap();
    assert!(registry.is_initialized());
    assert!(registry.config().is_ok());
}

#[test]
fn options_must_reference_known_properties() {
    let mut registry = PluginRegistry::new(PropertyMap::new());
    registry
        .register(PluginDefinition::new("dir").with_option("path", TypeOption::required()))
        .unwrap();
    let err = registry.init(InitOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::UnknownProperty { ref section_type, ref property }
            if section_type == "dir" && property == "path"
    ));
}

#[test]
fn plugin_may_not_redefine_base_property() {
    let mut registry = PluginRegistry::new(base());
    registry
        .register(PluginDefinition::new("dir").with_property("comment", PropertyDescriptor::string()))
        .unwrap();
    assert!(matches!(
        registry.init(InitOptions::default()),
        Err(RegistryError::DuplicateProperty { .. })
    ));
}

#[test]
fn identical_plugin_properties_are_shared() {
    let mut registry = PluginRegistry::new(PropertyMap::new());
    for name in ["nfs", "cifs"] {
        registry
            .register(PluginDefinition::new(name).with_property("server", PropertyDescriptor::string()))
            .unwrap();
    }
    let config = registry.init(InitOptions::default()).unwrap();
    let server = config.merged_property("server").unwrap();
    assert_eq!(server.definers.len(), 2);
    assert!(server.descriptor.optional);
}

#[test]
fn conflicting_plugin_properties_are_rejected() {
    let mut registry = PluginRegistry::new(PropertyMap::new());
    registry
        .register(PluginDefinition::new("nfs").with_property("port", PropertyDescriptor::integer()))
        .unwrap();
    registry
        .register(PluginDefinition::new("cifs").with_property("port", PropertyDescriptor::string()))
        .unwrap();
    let err = registry.init(InitOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "conflicting definitions of property 'port' in types 'cifs' and 'nfs'"
    );
}

#[test]
fn type_is_always_a_base_property() {
    let config = config();
    assert!(!config.property("type").unwrap().optional);
    assert_eq!(config.types().collect::<Vec<_>>(), vec!["dir", "lvm"]);
    assert!(config.plugin("lvm").is_some());
    assert!(config.plugin("zfs").is_none());
}

// ── Option usage ─────────────────────────────────────────────────

#[test]
fn uses_property_follows_options_in_unified_mode() {
    let mut registry = PluginRegistry::new(PropertyMap::new());
    registry
        .register(PluginDefinition::new("dir").with_property("path", PropertyDescriptor::string()))
        .unwrap();
    let config = registry.init(InitOptions::default()).unwrap();
    assert!(!config.uses_property("dir", "path"));
}

#[test]
fn isolated_types_use_their_own_properties() {
    let mut registry = PluginRegistry::new(PropertyMap::new());
    registry
        .register(PluginDefinition::new("dir").with_property("path", PropertyDescriptor::string()))
        .unwrap();
    let config = registry.init(InitOptions::isolated()).unwrap();
    assert!(config.is_isolated());
    assert!(config.uses_property("dir", "path"));
    assert_eq!(config.options_for("dir").unwrap()["path"], TypeOption::optional());
}

// ── check_value ──────────────────────────────────────────────────

#[test]
fn check_value_coerces_text() {
    let config = config();
    assert_eq!(config.check_value("lvm", "size", Some(&text("32"))).unwrap(), json!(32));
    assert_eq!(config.check_value("lvm", "shared", Some(&text("0"))).unwrap(), json!(false));
    assert_eq!(config.check_value("lvm", "comment", Some(&text("hi"))).unwrap(), json!("hi"));
}

#[test]
fn check_value_applies_decode_hook() {
    let config = config();
    assert_eq!(
        config.check_value("lvm", "vgname", Some(&text("pve-data"))).unwrap(),
        json!("PVE-DATA")
    );
}

#[test]
fn check_value_treats_missing_boolean_as_true() {
    let config = config();
    assert_eq!(config.check_value("lvm", "shared", None).unwrap(), json!(true));
    assert!(config.check_value("lvm", "size", None).is_err());
}

#[test]
fn check_value_rejects_empty_and_invalid_values() {
    let config = config();
    assert_eq!(
        config.check_value("lvm", "size", Some(&text(""))).unwrap_err(),
        "type check ('integer') failed - got empty value"
    );
    assert_eq!(
        config.check_value("lvm", "size", Some(&text("0"))).unwrap_err(),
        "value must have a minimum value of 1"
    );
    assert!(config.check_value("lvm", "shared", Some(&text("yes"))).is_err());
}

#[test]
fn check_value_rejects_unknown_type_and_unused_property() {
    let config = config();
    assert_eq!(
        config.check_value("zfs", "comment", Some(&text("x"))).unwrap_err(),
        "unknown section type 'zfs'"
    );
    assert_eq!(
        config.check_value("dir", "size", Some(&text("1"))).unwrap_err(),
        "unexpected property 'size'"
    );
}

#[test]
fn check_value_checks_array_items() {
    let config = config();
    assert_eq!(config.check_value("lvm", "tags", Some(&text("fast"))).unwrap(), json!("fast"));
    assert!(config.check_value("lvm", "tags", Some(&text("much-too-long"))).is_err());
    assert_eq!(
        config.check_value("lvm", "tags", Some(&json!(["a", "b"]))).unwrap(),
        json!(["a", "b"])
    );
}

#[test]
fn check_value_accepts_matching_type_only() {
    let config = config();
    assert!(config.check_value("lvm", "type", Some(&text("lvm"))).is_ok());
    assert!(config.check_value("lvm", "type", Some(&text("dir"))).is_err());
}

// ── check_config ─────────────────────────────────────────────────

fn fields(value: Value) -> Fields {
    serde_json::from_value(value).unwrap()
}

#[test]
fn check_config_normalizes_create_request() {
    let config = config();
    let settings = config
        .check_config("lvm", "local-lvm", &fields(json!({"vgname": "pve", "size": "8"})), true)
        .unwrap();
    assert_eq!(
        settings,
        fields(json!({"type": "lvm", "vgname": "PVE", "size": 8}))
    );
}

#[test]
fn check_config_reports_every_invalid_field() {
    let config = config();
    let err = config
        .check_config(
            "lvm",
            "local-lvm",
            &fields(json!({"vgname": "pve", "size": "x", "shared": "maybe", "comment": null})),
            true,
        )
        .unwrap_err();
    assert_eq!(err.len(), 3);
    assert!(err.get("size").is_some());
    assert!(err.get("shared").is_some());
    assert_eq!(err.get("comment"), Some("got undefined value for option 'comment'"));
}

#[test]
fn check_config_requires_required_options_on_create() {
    let config = config();
    let err = config.check_config("lvm", "x1", &Fields::new(), true).unwrap_err();
    assert_eq!(err.get("vgname"), Some("missing value for required option 'vgname'"));

    // updates may leave them out
    assert!(config.check_config("lvm", "x1", &Fields::new(), false).is_ok());
}

#[test]
fn check_config_rejects_fixed_option_changes_on_update() {
    let config = config();
    let err = config
        .check_config("lvm", "x1", &fields(json!({"vgname": "other"})), false)
        .unwrap_err();
    assert_eq!(err.get("vgname"), Some("can't change value of fixed parameter 'vgname'"));
}

#[test]
fn check_config_runs_plugin_hook() {
    let config = config();
    let err = config
        .check_config("lvm", "shared-only", &fields(json!({"vgname": "pve"})), true)
        .unwrap_err();
    assert_eq!(err.to_string(), "storage 'shared-only' must be shared");

    assert!(
        config
            .check_config("lvm", "shared-only", &fields(json!({"vgname": "pve", "shared": 1})), true)
            .is_ok()
    );
}

// ── Definition files ─────────────────────────────────────────────

const DEFINITIONS: &str = r#"
[base.comment]
type = "string"
optional = true
maxLength = 64

[[plugin]]
type = "dir"

[plugin.properties.path]
type = "string"
pattern = "/.*"

[plugin.options.path]
required = true
fixed = true

[plugin.options.comment]

[[plugin]]
type = "nfs"

[plugin.properties.server]
type = "string"

[plugin.options.server]
required = true
"#;

#[test]
fn definitions_parse_from_toml() {
    let file = DefinitionFile::from_toml_str(DEFINITIONS).unwrap();
    assert_eq!(file.base["comment"].max_length, Some(64));
    assert_eq!(file.plugins.len(), 2);
    assert_eq!(file.plugins[0].section_type, "dir");
    assert_eq!(file.plugins[0].options["path"], TypeOption::required().fixed());
    assert_eq!(file.plugins[0].options["comment"], TypeOption::optional());
}

#[test]
fn definitions_load_into_registry() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(DEFINITIONS.as_bytes()).unwrap();

    let file = DefinitionFile::load(tmp.path()).unwrap();
    let mut registry = file.into_registry().unwrap();
    let config = registry.init(InitOptions::default()).unwrap();

    assert_eq!(config.types().collect::<Vec<_>>(), vec!["dir", "nfs"]);
    assert!(config.check_value("dir", "path", Some(&text("/srv"))).is_ok());
    assert!(config.check_value("dir", "path", Some(&text("srv"))).is_err());
    assert!(!config.update_schema().contains("path"));
}

#[test]
fn invalid_definitions_are_errors() {
    let err = DefinitionFile::from_toml_str("[[plugin]]\nproperties = 3\n").unwrap_err();
    assert!(matches!(err, RegistryError::TomlDeserialize(_)));

    let err = DefinitionFile::load(std::path::Path::new("/nonexistent/defs.toml")).unwrap_err();
    assert!(matches!(err, RegistryError::Io(_)));
}

// ── Error display ────────────────────────────────────────────────

#[test]
fn registry_error_display() {
    let err = RegistryError::DuplicateType("dir".into());
    assert_eq!(err.to_string(), "duplicate plugin registration (type = dir)");

    let err = RegistryError::UnknownProperty {
        section_type: "dir".into(),
        property: "path".into(),
    };
    assert_eq!(err.to_string(), "undefined property 'path' referenced by type 'dir'");

    assert_eq!(
        RegistryError::AlreadyInitialized.to_string(),
        "plugin registry is already initialized"
    );
}
