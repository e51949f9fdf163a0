use std::path::{Path, PathBuf};
use std::slice;
use tracing::{debug, info};

use crate::document::{self, Document, Mapping};
use crate::error::{ManifestError, Result};
use crate::merge::merge_mappings;
use crate::paths;
use crate::variant::{Variant, VariantTable};

/// Per-holder and per-module opt-out flag.
pub const MULTILIB_PROP: &str = "x-multilib";

/// Modules read and written by one expansion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionStats {
    pub modules_seen: usize,
    pub modules_emitted: usize,
}

struct Expander {
    /// Directory of the top-level manifest. Every rewritten source path is
    /// relative to it.
    base_dir: PathBuf,
    stats: ExpansionStats,
}

/// Expand the manifest `holder` loaded from `holder_file`.
pub fn multilibify(
    holder: Document,
    holder_file: &Path,
    table: &VariantTable,
) -> Result<(Document, ExpansionStats)> {
    let holder_file = paths::absolutize(holder_file)?;
    let base_dir = paths::parent_dir(&holder_file);

    let mut holder = document::into_mapping(holder, holder_file.display().to_string())?;
    let variants = table.extract(&mut holder, &base_dir)?;

    let mut expander = Expander {
        base_dir,
        stats: ExpansionStats::default(),
    };
    let holder = expander.expand_holder(holder, &holder_file, &variants)?;

    info!(
        "Expanded {} modules into {} using {} variants",
        expander.stats.modules_seen,
        expander.stats.modules_emitted,
        variants.len()
    );

    Ok((Document::Object(holder), expander.stats))
}

impl Expander {
    fn expand_holder(
        &mut self,
        mut holder: Mapping,
        holder_file: &Path,
        variants: &[Variant],
    ) -> Result<Mapping> {
        let context = holder_context(&holder, holder_file);
        let holder_multilib = document::take_flag(&mut holder, MULTILIB_PROP, true, &context)?;

        let entries = std::mem::take(document::sequence_mut(&mut holder, "modules", &context)?);
        let mut modules = Vec::with_capacity(entries.len() * variants.len().max(1));

        for entry in entries {
            self.stats.modules_seen += 1;

            let (mut module, module_file) = self.resolve_module(entry, holder_file)?;
            let module_context = holder_context(&module, &module_file);

            self.rebase_sources(&mut module, &module_file, &module_context)?;

            let multilib =
                document::take_flag(&mut module, MULTILIB_PROP, holder_multilib, &module_context)?;

            if !multilib || variants.is_empty() {
                debug!("{}: kept as a single module", module_context);
                if module.contains_key("modules") {
                    module = self.expand_holder(module, &module_file, &[])?;
                }
                modules.push(Document::Object(module));
                self.stats.modules_emitted += 1;
                continue;
            }

            let name = module
                .get("name")
                .and_then(Document::as_str)
                .ok_or_else(|| ManifestError::missing_key("name", module_context.as_str()))?
                .to_string();

            for variant in variants {
                let mut new_module = merge_mappings(&module, &variant.overrides);
                let new_name = variant.module_name(&name);
                debug!("{}: {} variant -> {}", module_context, variant.spec.name, new_name);
                new_module.insert("name".to_string(), Document::String(new_name));

                if new_module.contains_key("modules") {
                    new_module =
                        self.expand_holder(new_module, &module_file, slice::from_ref(variant))?;
                }

                modules.push(Document::Object(new_module));
                self.stats.modules_emitted += 1;
            }
        }

        *document::sequence_mut(&mut holder, "modules", &context)? = modules;
        Ok(holder)
    }

    /// Turn a `modules` entry into a module mapping plus the file it was
    /// defined in. String entries are loaded relative to the holder's file.
    fn resolve_module(&self, entry: Document, holder_file: &Path) -> Result<(Mapping, PathBuf)> {
        match entry {
            Document::String(reference) => {
                let module_file = paths::parent_dir(holder_file).join(&reference);
                let loaded = document::load_document(&module_file)?;
                let module = document::into_mapping(loaded, module_file.display().to_string())?;
                Ok((module, module_file))
            }
            Document::Object(module) => Ok((module, holder_file.to_path_buf())),
            _ => Err(ManifestError::shape(
                format!("{}: module entry", holder_file.display()),
                "a file name or a mapping",
            )),
        }
    }

    fn rebase_sources(&self, module: &mut Mapping, module_file: &Path, context: &str) -> Result<()> {
        for source in document::sequence_mut(module, "sources", context)? {
            let Some(path) = source.get_mut("path") else {
                continue;
            };

            let Document::String(source_path) = path else {
                return Err(ManifestError::shape(format!("{}: source `path`", context), "a string"));
            };

            let rebased = paths::rebase(source_path, module_file, &self.base_dir);
            if rebased != *source_path {
                debug!("{}: source {} -> {}", context, source_path, rebased);
                *source_path = rebased;
            }
        }

        Ok(())
    }
}

fn holder_context(holder: &Mapping, file: &Path) -> String {
    match holder.get("name").and_then(Document::as_str) {
        Some(name) => format!("module `{}` ({})", name, file.display()),
        None => file.display().to_string(),
    }
}
