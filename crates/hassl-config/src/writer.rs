//! Package output
//!
//! Each module is written to its own `hassl__<pkg>.yaml`. Helper cells from
//! every module are merged into a shared `helpers.yaml`, keeping whatever
//! else that file already holds.

use crate::error::{ConfigError, ConfigResult};
use hassl_codegen::naming::sanitize;
use hassl_codegen::{Document, Helpers};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the shared helper file
pub const HELPERS_FILE: &str = "helpers.yaml";

/// Writes generated documents into an output directory
pub struct PackageWriter {
    output_dir: PathBuf,
}

impl PackageWriter {
    /// Create the writer, creating `output_dir` if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| ConfigError::WriteFile {
            path: output_dir.clone(),
            source: e,
        })?;
        Ok(Self { output_dir })
    }

    /// File name of the package for `package`
    pub fn package_file_name(package: &str) -> String {
        format!("hassl__{}.yaml", sanitize(package))
    }

    /// Write every document plus the merged helper file.
    pub fn write_all(&self, docs: &[Document]) -> ConfigResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(docs.len() + 1);
        for doc in docs {
            written.push(self.write_package(doc)?);
        }
        written.push(self.merge_helpers(docs.iter().map(|d| &d.helpers))?);
        info!(files = written.len(), "Wrote output to {:?}", self.output_dir);
        Ok(written)
    }

    /// Validate and write one package file.
    pub fn write_package(&self, doc: &Document) -> ConfigResult<PathBuf> {
        for automation in &doc.automations {
            automation
                .validate()
                .map_err(|e| ConfigError::ValidationFailed {
                    package: doc.package.clone(),
                    message: e.to_string(),
                })?;
        }

        let path = self
            .output_dir
            .join(Self::package_file_name(&doc.package));
        write_yaml(&path, &doc.package_file())?;
        debug!(
            package = %doc.package,
            scripts = doc.scripts.len(),
            automations = doc.automations.len(),
            "Wrote package {:?}",
            path
        );
        Ok(path)
    }

    /// Merge `helpers` into `helpers.yaml`.
    ///
    /// Generated keys overwrite existing ones; other entries and other
    /// top-level keys are preserved.
    pub fn merge_helpers<'a>(
        &self,
        helpers: impl IntoIterator<Item = &'a Helpers>,
    ) -> ConfigResult<PathBuf> {
        let path = self.output_dir.join(HELPERS_FILE);
        let mut root = read_mapping(&path)?;

        for set in helpers {
            let generated = to_value(&path, set)?;
            let Value::Mapping(families) = generated else {
                continue;
            };
            for (family, entries) in families {
                let Value::Mapping(entries) = entries else {
                    continue;
                };
                if entries.is_empty() {
                    continue;
                }
                let slot = root
                    .entry(family)
                    .or_insert_with(|| Value::Mapping(Mapping::new()));
                if !slot.is_mapping() {
                    *slot = Value::Mapping(Mapping::new());
                }
                if let Value::Mapping(existing) = slot {
                    for (key, value) in entries {
                        existing.insert(key, value);
                    }
                }
            }
        }

        write_yaml(&path, &root)?;
        Ok(path)
    }
}

fn read_mapping(path: &Path) -> ConfigResult<Mapping> {
    if !path.exists() {
        return Ok(Mapping::new());
    }
    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseYaml {
        path: path.to_path_buf(),
        source: e,
    })?;
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(ConfigError::InvalidValue {
            key: HELPERS_FILE.into(),
            reason: "top level must be a mapping".into(),
        }),
    }
}

fn to_value<T: Serialize>(path: &Path, value: &T) -> ConfigResult<Value> {
    serde_yaml::to_value(value).map_err(|e| ConfigError::SerializeYaml {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> ConfigResult<()> {
    let content = serde_yaml::to_string(value).map_err(|e| ConfigError::SerializeYaml {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, content).map_err(|e| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hassl_codegen::naming;
    use tempfile::TempDir;

    fn helpers_with_gate(rule: &str) -> Helpers {
        let mut helpers = Helpers::default();
        helpers.add_boolean(&naming::gate_cell("home", rule), format!("gate {rule}"), Some(true));
        helpers
    }

    #[test]
    fn test_package_file_name() {
        assert_eq!(
            PackageWriter::package_file_name("std.shared"),
            "hassl__std_shared.yaml"
        );
    }

    #[test]
    fn test_merge_preserves_unrelated_entries() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(HELPERS_FILE),
            "input_boolean:\n  guest_mode:\n    name: Guest mode\n  hassl_gate__home__motion:\n    name: stale\ninput_select:\n  scene:\n    options: [a, b]\n",
        )
        .unwrap();

        let writer = PackageWriter::new(dir.path()).unwrap();
        let path = writer.merge_helpers([&helpers_with_gate("motion")]).unwrap();

        let merged: Value = serde_yaml::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(merged["input_boolean"]["guest_mode"]["name"], Value::from("Guest mode"));
        assert_eq!(
            merged["input_boolean"]["hassl_gate__home__motion"]["name"],
            Value::from("gate motion")
        );
        assert_eq!(merged["input_select"]["scene"]["options"][1], Value::from("b"));
        // empty families are not introduced
        assert!(merged.get("input_number").is_none());
    }

    #[test]
    fn test_write_all() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("packages");
        let writer = PackageWriter::new(&out).unwrap();

        let mut doc = Document::new("home");
        doc.helpers = helpers_with_gate("motion");
        let written = writer.write_all(&[doc]).unwrap();

        assert_eq!(
            written,
            vec![out.join("hassl__home.yaml"), out.join(HELPERS_FILE)]
        );
        assert_eq!(fs::read_to_string(&written[0]).unwrap().trim(), "{}");
    }
}
