//! Builtin provider for JSON content trees.
//!
//! A JSON object describes one node. Nested objects are child nodes, every other member is a
//! property of the node:
//!
//! ```json
//! {
//!     "jcr:primaryType": "nt:unstructured",
//!     "jcr:mixinTypes": ["mix:referenceable"],
//!     "title": "Home",
//!     "jcr:reference:banner": "../assets/banner",
//!     "nav": { "weight": 10 }
//! }
//! ```
//!
//! Members prefixed with `jcr:reference:` hold target paths and become reference properties
//! named by the rest of the key.

use serde_json::{Map, Value as JsonValue};

use crate::{
    error::LoaderError,
    loader::{provider::ImportProvider, ContentCreator},
    properties::{PropertyType, Value},
};

pub const PRIMARY_TYPE_KEY: &str = "jcr:primaryType";
pub const MIXIN_TYPES_KEY: &str = "jcr:mixinTypes";
pub const REFERENCE_PREFIX: &str = "jcr:reference:";

#[derive(Debug, Default, Clone)]
pub struct JsonProvider;

impl ImportProvider for JsonProvider {
    fn import(&self, content: &[u8], creator: &mut dyn ContentCreator) -> Result<(), LoaderError> {
        let document: JsonValue = serde_json::from_slice(content)?;
        match document {
            JsonValue::Object(members) => import_node(None, &members, creator),
            other => Err(LoaderError::Provider(format!(
                "JSON content must be an object, found {}",
                kind_of(&other)
            ))),
        }
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn import_node(
    name: Option<&str>,
    members: &Map<String, JsonValue>,
    creator: &mut dyn ContentCreator,
) -> Result<(), LoaderError> {
    let primary_type = members.get(PRIMARY_TYPE_KEY).and_then(JsonValue::as_str);
    let mixins: Vec<&str> = match members.get(MIXIN_TYPES_KEY) {
        Some(JsonValue::Array(items)) => items.iter().filter_map(JsonValue::as_str).collect(),
        Some(JsonValue::String(mixin)) => vec![mixin.as_str()],
        _ => Vec::new(),
    };
    creator.create_node(name, primary_type, &mixins)?;

    for (key, value) in members {
        if key == PRIMARY_TYPE_KEY || key == MIXIN_TYPES_KEY {
            continue;
        }
        match value {
            JsonValue::Object(children) => import_node(Some(key.as_str()), children, creator)?,
            value => match key.strip_prefix(REFERENCE_PREFIX) {
                Some(property) => import_reference(property, value, creator)?,
                None => import_property(key, value, creator)?,
            },
        }
    }

    creator.finish_node()
}

fn import_reference(
    name: &str,
    value: &JsonValue,
    creator: &mut dyn ContentCreator,
) -> Result<(), LoaderError> {
    match value {
        JsonValue::String(target) => creator.set_property(name, PropertyType::Reference, target),
        JsonValue::Array(items) => {
            let targets = items
                .iter()
                .map(|item| {
                    item.as_str().ok_or_else(|| {
                        LoaderError::Provider(format!(
                            "Reference {name} must list target paths, found {}",
                            kind_of(item)
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            creator.set_properties(name, PropertyType::Reference, &targets)
        }
        other => Err(LoaderError::Provider(format!(
            "Reference {name} must be a path or a list of paths, found {}",
            kind_of(other)
        ))),
    }
}

fn scalar(name: &str, value: &JsonValue) -> Result<Option<Value>, LoaderError> {
    Ok(match value {
        JsonValue::Null => None,
        JsonValue::Bool(flag) => Some(Value::Boolean(*flag)),
        JsonValue::Number(number) => match number.as_i64() {
            Some(long) => Some(Value::Long(long)),
            None => number.as_f64().map(Value::Double),
        },
        JsonValue::String(text) => Some(Value::String(text.clone())),
        other => {
            return Err(LoaderError::Provider(format!(
                "Property {name} can not hold {}",
                kind_of(other)
            )))
        }
    })
}

fn import_property(
    name: &str,
    value: &JsonValue,
    creator: &mut dyn ContentCreator,
) -> Result<(), LoaderError> {
    let JsonValue::Array(items) = value else {
        return creator.set_value(name, scalar(name, value)?);
    };

    let mut values = Vec::with_capacity(items.len());
    for item in items {
        if let Some(value) = scalar(name, item)? {
            values.push(value);
        }
    }
    // Mixed arrays fall back to their string form
    let uniform = values
        .windows(2)
        .all(|pair| pair[0].property_type() == pair[1].property_type());
    if !uniform {
        tracing::debug!("Mixed value types in {}, storing as strings", name);
        values = items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                JsonValue::String(text) => Value::String(text.clone()),
                other => Value::String(other.to_string()),
            })
            .collect();
    }
    creator.set_values(name, Some(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ImportOptions,
        loader::{mime::ExtensionMimeTable, TreeBuilder, CHECKED_OUT_PROPERTY},
        properties::{PropertyValue, REFERENCEABLE_TAG},
        store::{ContentStore, MemoryStore},
    };
    use std::sync::Arc;
    use test_log::test;

    fn import(store: &mut MemoryStore, source: &str) -> Result<(), LoaderError> {
        let mut builder = TreeBuilder::new(
            store,
            ImportOptions::default(),
            Arc::new(ExtensionMimeTable::new()),
        );
        let anchor = builder.store().root();
        builder.prepare(anchor, Some("page"));
        JsonProvider.import(source.as_bytes(), &mut builder)
    }

    #[test]
    fn test_nodes_and_properties() {
        let mut store = MemoryStore::new();
        import(
            &mut store,
            r#"{
                "jcr:primaryType": "sling:Folder",
                "title": "Home",
                "weight": 3,
                "ratio": 0.5,
                "hidden": false,
                "tags": ["a", "b"],
                "mixed": [1, "two"],
                "gone": null,
                "child": { "jcr:mixinTypes": "mix:referenceable" }
            }"#,
        )
        .unwrap();

        let page = store.node_at("/page").unwrap();
        assert_eq!(store.primary_type(page).unwrap(), "sling:Folder");
        assert_eq!(
            store.property(page, "title").unwrap(),
            Some(Value::String("Home".to_string()).into())
        );
        assert_eq!(store.property(page, "weight").unwrap(), Some(Value::Long(3).into()));
        assert_eq!(store.property(page, "ratio").unwrap(), Some(Value::Double(0.5).into()));
        assert_eq!(
            store.property(page, "hidden").unwrap(),
            Some(Value::Boolean(false).into())
        );
        assert_eq!(
            store.property(page, "tags").unwrap(),
            Some(PropertyValue::Multi(
                PropertyType::String,
                vec![Value::String("a".to_string()), Value::String("b".to_string())]
            ))
        );
        assert_eq!(
            store.property(page, "mixed").unwrap(),
            Some(PropertyValue::Multi(
                PropertyType::String,
                vec![Value::String("1".to_string()), Value::String("two".to_string())]
            ))
        );
        assert!(!store.has_property(page, "gone").unwrap());

        let child = store.node_at("/page/child").unwrap();
        assert!(store.is_referenceable(child).unwrap());
    }

    #[test]
    fn test_references() {
        let mut store = MemoryStore::new();
        import(
            &mut store,
            &format!(
                r#"{{
                    "jcr:reference:first": "target",
                    "jcr:reference:all": ["target", "/elsewhere"],
                    "target": {{ "jcr:mixinTypes": ["{REFERENCEABLE_TAG}"] }}
                }}"#
            ),
        )
        .unwrap();

        let page = store.node_at("/page").unwrap();
        let target = store.node_at("/page/target").unwrap();
        let id = store.stable_id(target).unwrap().unwrap();
        assert_eq!(
            store.property(page, "first").unwrap(),
            Some(Value::Reference(id).into())
        );
        assert_eq!(
            store.property(page, "all").unwrap(),
            Some(PropertyValue::Multi(
                PropertyType::Reference,
                vec![Value::Reference(id)]
            ))
        );
    }

    #[test]
    fn test_checked_out_string_tracks_node() {
        let mut store = MemoryStore::new();
        let mut builder = TreeBuilder::new(
            &mut store,
            ImportOptions::default(),
            Arc::new(ExtensionMimeTable::new()),
        );
        let anchor = builder.store().root();
        builder.prepare(anchor, Some("page"));
        JsonProvider
            .import(
                br#"{ "jcr:isCheckedOut": "false", "draft": { "jcr:isCheckedOut": [true] } }"#,
                &mut builder,
            )
            .unwrap();
        assert_eq!(builder.versionables(), &["/page".to_string()]);

        let page = store.node_at("/page").unwrap();
        let draft = store.node_at("/page/draft").unwrap();
        assert!(!store.has_property(page, CHECKED_OUT_PROPERTY).unwrap());
        assert!(!store.has_property(draft, CHECKED_OUT_PROPERTY).unwrap());
    }

    #[test]
    fn test_rejects_malformed_content() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            import(&mut store, "[1, 2]"),
            Err(LoaderError::Provider(_))
        ));
        assert!(matches!(
            import(&mut store, "{ not json"),
            Err(LoaderError::Provider(_))
        ));
        assert!(matches!(
            import(&mut store, r#"{ "jcr:reference:bad": 1 }"#),
            Err(LoaderError::Provider(_))
        ));
    }
}
