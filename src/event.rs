use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    error::LoaderError,
    loader::ContentCreator,
    properties::{PropertyType, Value},
};

/// One step of a structural event stream, as produced by an import source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentEvent {
    /// Open a node below the current one. A missing name selects the configured default root
    /// name, which is only legal for the top-level node.
    StartNode {
        name: Option<String>,
        primary_type: Option<String>,
        capabilities: Vec<String>,
    },
    /// A string-encoded property on the current node. More than one value, or `multiple`, makes
    /// it a multi-valued property.
    SetProperty {
        name: String,
        property_type: PropertyType,
        values: Vec<String>,
        multiple: bool,
    },
    /// An already typed property value. `None` removes the property.
    SetValue { name: String, value: Option<Value> },
    /// A file payload stored as a container node with a content child. Both nodes are closed
    /// again when the event has been applied.
    BinaryResource {
        name: String,
        data: Vec<u8>,
        media_type: Option<String>,
        last_modified: i64,
    },
    EndNode,
}

impl ContentEvent {
    pub fn start<N: Into<String>>(name: N) -> Self {
        ContentEvent::StartNode {
            name: Some(name.into()),
            primary_type: None,
            capabilities: Vec::default(),
        }
    }

    pub fn start_typed<N: Into<String>, T: Into<String>>(
        name: Option<N>,
        primary_type: T,
        capabilities: &[&str],
    ) -> Self {
        ContentEvent::StartNode {
            name: name.map(Into::into),
            primary_type: Some(primary_type.into()),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn property<N: Into<String>, V: Into<String>>(
        name: N,
        property_type: PropertyType,
        value: V,
    ) -> Self {
        ContentEvent::SetProperty {
            name: name.into(),
            property_type,
            values: vec![value.into()],
            multiple: false,
        }
    }

    pub fn properties<N: Into<String>>(
        name: N,
        property_type: PropertyType,
        values: &[&str],
    ) -> Self {
        ContentEvent::SetProperty {
            name: name.into(),
            property_type,
            values: values.iter().map(|v| v.to_string()).collect(),
            multiple: true,
        }
    }

    /// Feed this event to a [ContentCreator].
    pub fn apply(self, creator: &mut dyn ContentCreator) -> Result<(), LoaderError> {
        match self {
            ContentEvent::StartNode {
                name,
                primary_type,
                capabilities,
            } => {
                let capabilities = capabilities.iter().map(String::as_str).collect::<Vec<_>>();
                creator.create_node(name.as_deref(), primary_type.as_deref(), &capabilities)
            }
            ContentEvent::SetProperty {
                name,
                property_type,
                values,
                multiple,
            } => {
                if multiple || values.len() != 1 {
                    let values = values.iter().map(String::as_str).collect::<Vec<_>>();
                    creator.set_properties(&name, property_type, &values)
                } else {
                    creator.set_property(&name, property_type, &values[0])
                }
            }
            ContentEvent::SetValue { name, value } => creator.set_value(&name, value),
            ContentEvent::BinaryResource {
                name,
                data,
                media_type,
                last_modified,
            } => {
                creator.import_binary_resource(&name, data, media_type.as_deref(), last_modified)?;
                creator.finish_node()?;
                creator.finish_node()
            }
            ContentEvent::EndNode => creator.finish_node(),
        }
    }
}

impl Display for ContentEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ContentEvent::StartNode { name, .. } => {
                write!(f, "StartNode({})", name.as_deref().unwrap_or("<default>"))
            }
            ContentEvent::SetProperty { name, .. } => write!(f, "SetProperty({name})"),
            ContentEvent::SetValue { name, .. } => write!(f, "SetValue({name})"),
            ContentEvent::BinaryResource { name, .. } => write!(f, "BinaryResource({name})"),
            ContentEvent::EndNode => write!(f, "EndNode"),
        }
    }
}
