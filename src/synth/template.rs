//! CloudFormation template document model.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};

/// Template format version every synthesized template declares.
pub const FORMAT_VERSION: &str = "2010-09-09";

/// Serialization format of a template file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    #[default]
    Json,
    Yaml,
}

impl TemplateFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            TemplateFormat::Json => "json",
            TemplateFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TemplateFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(TemplateFormat::Json),
            "yaml" | "yml" => Ok(TemplateFormat::Yaml),
            other => Err(Error::Config(format!(
                "unknown template format '{}' (expected json or yaml)",
                other
            ))),
        }
    }
}

/// One entry of the `Resources` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub metadata: Value,
}

impl CfnResource {
    /// Property by name, if present.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// A synthesized template for one stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(skip)]
    stack_id: String,
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub resources: IndexMap<String, CfnResource>,
}

impl Template {
    pub fn new(stack_id: impl Into<String>, description: Option<String>) -> Self {
        Self {
            stack_id: stack_id.into(),
            format_version: FORMAT_VERSION.to_string(),
            description,
            resources: IndexMap::new(),
        }
    }

    pub fn stack_id(&self) -> &str {
        &self.stack_id
    }

    pub fn resource(&self, logical_id: &str) -> Option<&CfnResource> {
        self.resources.get(logical_id)
    }

    pub(crate) fn resource_mut(&mut self, logical_id: &str) -> Option<&mut CfnResource> {
        self.resources.get_mut(logical_id)
    }

    /// Resources of a CloudFormation type, in template order.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a CfnResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
            .map(|(id, r)| (id.as_str(), r))
    }

    /// Number of resources of a CloudFormation type.
    pub fn count_of_type(&self, resource_type: &str) -> usize {
        self.resources_of_type(resource_type).count()
    }

    /// Render the template in the given format.
    pub fn render(&self, format: TemplateFormat) -> Result<String> {
        match format {
            TemplateFormat::Json => self.to_json(),
            TemplateFormat::Yaml => self.to_yaml(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| self.serialization_error(e))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| self.serialization_error(e))
    }

    fn serialization_error(&self, e: impl fmt::Display) -> Error {
        Error::Serialization {
            stack: self.stack_id.clone(),
            message: e.to_string(),
        }
    }
}

// ============================================================================
// Intrinsic functions
// ============================================================================

/// `{"Ref": id}`
pub fn cfn_ref(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// The `index`-th availability zone of the deployment region.
pub fn availability_zone(index: u8) -> Value {
    json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
}

/// `{"Key": key, "Value": value}`
pub fn tag(key: &str, value: &str) -> Value {
    json!({ "Key": key, "Value": value })
}
