//! Cloud assembly: the directory of templates handed to the deployment engine.
//!
//! ```text
//! <out>/
//!   manifest.json
//!   <Stack>.template.json   (or .template.yaml)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use super::template::{Template, TemplateFormat};
use crate::error::{Error, Result};

/// Version of the manifest schema written to `manifest.json`.
pub const MANIFEST_VERSION: &str = "36.0.0";

pub const MANIFEST_FILE: &str = "manifest.json";

/// One stack artifact in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: ArtifactProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactProperties {
    pub template_file: String,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    version: &'static str,
    artifacts: &'a IndexMap<String, Artifact>,
}

/// A written assembly.
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    pub directory: PathBuf,
    pub artifacts: IndexMap<String, Artifact>,
}

impl CloudAssembly {
    /// Write every template plus the manifest into `directory`, creating it if needed.
    pub fn write(
        directory: impl AsRef<Path>,
        region: &str,
        templates: &[Template],
        format: TemplateFormat,
    ) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|source| Error::Io {
            path: directory.clone(),
            source,
        })?;

        let mut artifacts = IndexMap::new();
        for template in templates {
            let file_name = format!("{}.template.{}", template.stack_id(), format.extension());
            let path = directory.join(&file_name);
            write_file(&path, &template.render(format)?)?;
            debug!(path = %path.display(), "template written");

            artifacts.insert(
                template.stack_id().to_string(),
                Artifact {
                    artifact_type: "aws:cloudformation:stack".to_string(),
                    environment: format!("aws://unknown-account/{}", region),
                    properties: ArtifactProperties {
                        template_file: file_name,
                    },
                },
            );
        }

        let manifest = Manifest {
            version: MANIFEST_VERSION,
            artifacts: &artifacts,
        };
        let rendered = serde_json::to_string_pretty(&manifest).map_err(|e| Error::Serialization {
            stack: MANIFEST_FILE.to_string(),
            message: e.to_string(),
        })?;
        write_file(&directory.join(MANIFEST_FILE), &rendered)?;

        info!(
            directory = %directory.display(),
            stacks = artifacts.len(),
            "cloud assembly written"
        );
        Ok(Self {
            directory,
            artifacts,
        })
    }

    /// Path of a stack's template file.
    pub fn template_path(&self, stack_id: &str) -> Option<PathBuf> {
        self.artifacts
            .get(stack_id)
            .map(|a| self.directory.join(&a.properties.template_file))
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
