use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::document::{self, Document, Mapping};
use crate::error::{ManifestError, Result};

/// Declaration of one multilib variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSpec {
    pub name: String,
    /// Holder property carrying this variant's override document.
    pub prop: String,
    /// Appended to every module name produced for this variant.
    pub name_suffix: Option<String>,
}

/// A declared variant together with its resolved override mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub spec: VariantSpec,
    pub overrides: Mapping,
}

impl Variant {
    pub fn module_name(&self, base_name: &str) -> String {
        format!("{}{}", base_name, self.spec.name_suffix.as_deref().unwrap_or(""))
    }
}

/// Options for one entry of a variant table file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VariantOptions {
    prop: String,
    #[serde(rename = "name-suffix")]
    name_suffix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VariantTable {
    variants: Vec<VariantSpec>,
}

impl VariantTable {
    pub fn new() -> Self {
        let variants = vec![
            VariantSpec {
                name: "native".to_string(),
                prop: "x-native-module".to_string(),
                name_suffix: None,
            },
            VariantSpec {
                name: "compat".to_string(),
                prop: "x-compat32-module".to_string(),
                name_suffix: Some("-32bit".to_string()),
            },
        ];

        Self { variants }
    }

    pub fn from_specs(variants: Vec<VariantSpec>) -> Self {
        Self { variants }
    }

    /// Read a table shaped like `{"compat": {"prop": "...", "name-suffix": "..."}}`.
    /// Variants keep the order they are declared in.
    pub fn from_document(document: Document, context: &str) -> Result<Self> {
        let entries = document::into_mapping(document, context)?;
        let mut variants = Vec::with_capacity(entries.len());

        for (name, options) in entries {
            let options: VariantOptions = serde_json::from_value(options).map_err(|e| {
                ManifestError::UnexpectedShape {
                    context: format!("{}: variant `{}` ({})", context, name, e),
                    expected: "a mapping with `prop` and optional `name-suffix`",
                }
            })?;

            variants.push(VariantSpec {
                name,
                prop: options.prop,
                name_suffix: options.name_suffix,
            });
        }

        Ok(Self { variants })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let document = document::load_document(path)?;
        let table = Self::from_document(document, &path.display().to_string())?;
        info!("Using {} variants from {}", table.variants.len(), path.display());
        Ok(table)
    }

    pub fn specs(&self) -> &[VariantSpec] {
        &self.variants
    }

    /// Pull every declared variant's override out of the holder.
    ///
    /// A string property is a file path relative to `holder_dir`; a missing
    /// property means no overrides. The properties are removed from the holder.
    pub fn extract(&self, holder: &mut Mapping, holder_dir: &Path) -> Result<Vec<Variant>> {
        let mut resolved = Vec::with_capacity(self.variants.len());

        for spec in &self.variants {
            let overrides = match holder.shift_remove(&spec.prop) {
                None => Mapping::new(),
                Some(Document::String(file)) => {
                    let override_file = holder_dir.join(&file);
                    let loaded = document::load_document(&override_file)?;
                    document::into_mapping(loaded, override_file.display().to_string())?
                }
                Some(inline) => document::into_mapping(inline, format!("`{}`", spec.prop))?,
            };

            debug!("Variant {}: {} override keys", spec.name, overrides.len());
            resolved.push(Variant {
                spec: spec.clone(),
                overrides,
            });
        }

        Ok(resolved)
    }
}

impl Default for VariantTable {
    fn default() -> Self {
        Self::new()
    }
}
