//! Project file and module loading
//!
//! A project directory holds one serialized `Program` per file (YAML or
//! JSON) and an optional `hassl.yaml` with output and generator settings.

use crate::error::{ConfigError, ConfigResult};
use hassl_codegen::GeneratorOptions;
use hassl_core::ast::Program;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Name of the project file inside the source directory
pub const PROJECT_FILE: &str = "hassl.yaml";

/// Settings read from `hassl.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Where packages and `helpers.yaml` are written; relative paths are
    /// taken from the source directory
    pub output_dir: Option<PathBuf>,
    /// Generator tunables
    pub codegen: GeneratorOptions,
}

impl ProjectConfig {
    /// Load `hassl.yaml` from `dir`, falling back to defaults when absent.
    pub fn load(dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = dir.as_ref().join(PROJECT_FILE);
        if !path.exists() {
            debug!("No project file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        // An empty file deserializes to null
        let config: Option<Self> =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseYaml {
                path: path.clone(),
                source: e,
            })?;
        let config = config.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Check generator settings against what the platform accepts.
    pub fn validate(&self) -> ConfigResult<()> {
        let codegen = &self.codegen;
        if codegen.sync_max_queued == 0 {
            return Err(ConfigError::InvalidValue {
                key: "codegen.sync_max_queued".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !(1..=59).contains(&codegen.maintain_minutes) {
            return Err(ConfigError::InvalidValue {
                key: "codegen.maintain_minutes".into(),
                reason: "must be between 1 and 59".into(),
            });
        }
        // context ids are 26 characters
        if !(26..=255).contains(&codegen.guard_max_len) {
            return Err(ConfigError::InvalidValue {
                key: "codegen.guard_max_len".into(),
                reason: "must be between 26 and 255".into(),
            });
        }
        Ok(())
    }

    /// Output directory resolved against `source_dir`
    pub fn output_dir_in(&self, source_dir: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => source_dir.join(dir),
            None => source_dir.join("packages"),
        }
    }
}

/// Reads serialized modules from a source directory
pub struct ModuleLoader {
    source_dir: PathBuf,
}

impl ModuleLoader {
    pub fn new(source_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let source_dir = source_dir.into();
        if !source_dir.is_dir() {
            return Err(ConfigError::DirectoryNotFound { path: source_dir });
        }
        Ok(Self { source_dir })
    }

    /// Load every module file, in file name order.
    pub fn load_all(&self) -> ConfigResult<Vec<Program>> {
        let files = self.module_files()?;
        debug!(count = files.len(), "Loading modules from {:?}", self.source_dir);
        files.iter().map(|f| self.load_file(f)).collect()
    }

    /// Load one module file. JSON is read as YAML.
    pub fn load_file(&self, path: impl AsRef<Path>) -> ConfigResult<Program> {
        let path = self.source_dir.join(path.as_ref());
        trace!("Loading module: {:?}", path);
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseYaml { path, source: e })
    }

    /// `.yaml`, `.yml` and `.json` files other than the project file, sorted
    fn module_files(&self) -> ConfigResult<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.source_dir)
            .map_err(|e| ConfigError::ReadFile {
                path: self.source_dir.clone(),
                source: e,
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext == "yaml" || ext == "yml" || ext == "json")
                    .unwrap_or(false)
            })
            .filter(|path| path.file_name().map(|n| n != PROJECT_FILE).unwrap_or(false))
            .collect();

        files.sort();
        Ok(files)
    }
}
