#![allow(dead_code)]

use sectioncfg_document::{DocumentCodec, decode_text, encode_text};
use sectioncfg_registry::{
    InitOptions, PluginDefinition, PluginRegistry, SectionConfig, SectionPlugin, TypeOption,
};
use sectioncfg_schema::{PropertyDescriptor, PropertyMap};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Directory storage. Stores its comment escaped.
pub struct Dir;

impl SectionPlugin for Dir {
    fn type_name(&self) -> &str {
        "dir"
    }

    fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert("path".into(), PropertyDescriptor::string().with_pattern("/.*"));
        props.insert("shared".into(), PropertyDescriptor::boolean());
        props
    }

    fn options(&self) -> BTreeMap<String, TypeOption> {
        BTreeMap::from([
            ("path".to_string(), TypeOption::required().fixed()),
            ("shared".to_string(), TypeOption::optional()),
            ("comment".to_string(), TypeOption::optional()),
        ])
    }

    fn decode_value(&self, key: &str, value: Value) -> Result<Value, String> {
        match (key, value) {
            ("comment", Value::String(text)) => Ok(Value::String(decode_text(&text))),
            (_, value) => Ok(value),
        }
    }

    fn encode_value(&self, key: &str, value: &Value) -> Result<Value, String> {
        match (key, value) {
            ("comment", Value::String(text)) => Ok(Value::String(encode_text(text))),
            _ => Ok(value.clone()),
        }
    }
}

fn nfs() -> PluginDefinition {
    PluginDefinition::new("nfs")
        .with_property("server", PropertyDescriptor::string())
        .with_property("export", PropertyDescriptor::string().with_pattern("/.*"))
        .with_option("server", TypeOption::required().fixed())
        .with_option("export", TypeOption::required().fixed())
        .with_option("comment", TypeOption::optional())
        .with_option("tags", TypeOption::optional())
}

fn base() -> PropertyMap {
    let mut base = PropertyMap::new();
    base.insert("comment".into(), PropertyDescriptor::string().optional());
    base.insert(
        "tags".into(),
        PropertyDescriptor::array(PropertyDescriptor::string().with_format("pve-configid")).optional(),
    );
    base
}

pub fn storage_config() -> Arc<SectionConfig> {
    let mut registry = PluginRegistry::new(base());
    registry.register(Dir).unwrap();
    registry.register(nfs()).unwrap();
    registry.init(InitOptions::default()).unwrap()
}

pub fn codec() -> DocumentCodec {
    DocumentCodec::new(storage_config())
}

pub const STORAGE_CFG: &str = "\
# storage config
dir: local
\tpath /var/lib/vz
\tcomment backup%3A daily
\tshared

nfs: backup
\tserver 10.0.0.2
\texport /export
\t# tags are optional
\ttags a1
\ttags b2
";
